// src/core/mod.rs

/// Data structures shared by the scanner, the reporter and the UI:
/// targets, per-host outcomes, batch results, report rows and follow-up tasks.
pub mod models;

/// The error taxonomy of the scanning pipeline.
pub mod error;

/// Port prober, host scanner, batch orchestrator and the general/single
/// scan entry points.
pub mod scanner;

/// Spreadsheet report generation.
pub mod report;

/// Follow-up task creation for hosts with no open port.
pub mod followup;

/// Traits for the external directory (link registry) and task services.
pub mod services;

/// reqwest implementation of the directory and task services.
pub mod api_client;
