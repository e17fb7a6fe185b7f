// src/core/models.rs

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use strum::Display;

// --- Targets ---

/// A logical host to scan: a DNS name (usually a DDNS entry) or a literal IP.
///
/// `label` is the registry's human name for the link, when there is one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    pub label: Option<String>,
}

impl Target {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        let label = label.into();
        let label = label.trim();
        self.label = (!label.is_empty()).then(|| label.to_string());
        self
    }

    /// The registry name if known, otherwise the host itself.
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}

/// One entry of the link registry as returned by the directory service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub name: String,
    pub host: String,
}

// --- Probe Results ---

/// Outcome of a single connect attempt that completed without a transport error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortState {
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "snake_case")]
pub enum HostStatus {
    Success,
    DnsError,
    OtherError,
}

/// A socket-level failure on one port, kept so the UI and the log can show it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortError {
    pub port: u16,
    pub message: String,
}

/// Aggregated result of scanning one target.
///
/// When `status` is `Success` every probed port is in exactly one of
/// `open_ports` / `closed_ports`. A port whose probe hit a transport error
/// counts as closed and is additionally listed in `port_errors`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostOutcome {
    pub target: Target,
    pub ip: Option<Ipv4Addr>,
    pub open_ports: BTreeSet<u16>,
    pub closed_ports: BTreeSet<u16>,
    pub status: HostStatus,
    pub error_detail: Option<String>,
    pub port_errors: Vec<PortError>,
}

impl HostOutcome {
    pub fn success(target: Target, ip: Ipv4Addr) -> Self {
        Self {
            target,
            ip: Some(ip),
            open_ports: BTreeSet::new(),
            closed_ports: BTreeSet::new(),
            status: HostStatus::Success,
            error_detail: None,
            port_errors: Vec::new(),
        }
    }

    pub fn dns_error(target: Target, reason: impl Into<String>) -> Self {
        Self::failed(target, HostStatus::DnsError, reason.into())
    }

    pub fn other_error(target: Target, reason: impl Into<String>) -> Self {
        Self::failed(target, HostStatus::OtherError, reason.into())
    }

    fn failed(target: Target, status: HostStatus, reason: String) -> Self {
        Self {
            target,
            ip: None,
            open_ports: BTreeSet::new(),
            closed_ports: BTreeSet::new(),
            status,
            error_detail: Some(reason),
            port_errors: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == HostStatus::Success
    }

    /// Ports considered for this host; error rows always count zero.
    pub fn total_ports(&self) -> usize {
        if self.is_success() {
            self.open_ports.len() + self.closed_ports.len()
        } else {
            0
        }
    }

    /// Resolved and probed, but nothing on the candidate list answered.
    pub fn is_unreachable(&self) -> bool {
        self.is_success() && self.open_ports.is_empty()
    }
}

/// Ordered per-host outcomes of one batch run, in input-target order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub hosts: Vec<HostOutcome>,
}

impl BatchResult {
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HostOutcome> {
        self.hosts.iter()
    }

    pub fn success_count(&self) -> usize {
        self.hosts.iter().filter(|h| h.is_success()).count()
    }
}

// --- Report ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowClass {
    Success,
    Error,
}

impl From<HostStatus> for RowClass {
    fn from(status: HostStatus) -> Self {
        match status {
            HostStatus::Success => RowClass::Success,
            HostStatus::DnsError | HostStatus::OtherError => RowClass::Error,
        }
    }
}

/// One rendered line of the tabular report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    pub target: String,
    pub ip: String,
    pub status: String,
    pub open_ports: String,
    pub closed_ports: String,
    pub total_ports: usize,
    pub class: RowClass,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub rows: Vec<ReportRow>,
    pub generated_at: DateTime<Local>,
    pub storage_path: PathBuf,
}

// --- Follow-up Tasks ---

/// Tracking item submitted to the task service for a host with no open port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUpTask {
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskReceipt {
    pub success: bool,
    pub message: String,
}

/// Tally of one follow-up pass, kept for display only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FollowUpSummary {
    pub qualifying: usize,
    pub created: usize,
    pub failed: usize,
}
