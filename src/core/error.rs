// src/core/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Failures the scanning pipeline can run into.
///
/// Only `DirectoryUnavailable` ends a general scan early. DNS and transport
/// failures are folded into the affected `HostOutcome`; report and task
/// failures are logged and the batch still completes.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("could not resolve {target}: {reason}")]
    DnsResolution { target: String, reason: String },

    #[error("transport error on port {port}: {message}")]
    Transport { port: u16, message: String },

    #[error("could not write report to {}: {source}", .path.display())]
    ReportWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no targets available: {0}")]
    DirectoryUnavailable(String),

    #[error("could not submit task '{title}': {reason}")]
    TaskSubmission { title: String, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

