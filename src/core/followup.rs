// src/core/followup.rs

use chrono::{Local, NaiveDate};
use tracing::{error, info};

use crate::core::models::{BatchResult, FollowUpSummary, FollowUpTask, HostOutcome};
use crate::core::services::TaskService;

/// Files one tracking task per host that resolved but answered on no port.
///
/// Best effort: each submission stands alone, failures are only logged and
/// nothing is retried or rolled back. Hosts with DNS or other errors are not
/// followed up.
///
/// # Arguments
/// * `tasks` - The task service the tracking items are filed with.
/// * `result` - The completed batch to inspect.
///
/// # Returns
/// A `FollowUpSummary` counting qualifying hosts and how many submissions
/// succeeded or failed.
pub async fn create_followups(tasks: &dyn TaskService, result: &BatchResult) -> FollowUpSummary {
    let qualifying: Vec<&HostOutcome> = result.iter().filter(|h| h.is_unreachable()).collect();
    let mut summary = FollowUpSummary {
        qualifying: qualifying.len(),
        ..Default::default()
    };

    if qualifying.is_empty() {
        info!("No hosts without open ports, no follow-up tasks needed.");
        return summary;
    }

    info!(count = qualifying.len(), "Creating follow-up tasks for hosts without open ports.");
    // Every task of one pass carries the same date.
    let today = Local::now().date_naive();
    for outcome in qualifying {
        let task = build_task(outcome, today);
        match tasks.create_task(&task).await {
            Ok(receipt) if receipt.success => {
                info!(host = %outcome.target.name, "Follow-up task created.");
                summary.created += 1;
            }
            Ok(receipt) => {
                error!(host = %outcome.target.name, message = %receipt.message, "Task service declined follow-up task.");
                summary.failed += 1;
            }
            Err(e) => {
                error!(host = %outcome.target.name, error = %e, "Could not create follow-up task.");
                summary.failed += 1;
            }
        }
    }

    info!(created = summary.created, failed = summary.failed, "Follow-up pass finished.");
    summary
}

fn build_task(outcome: &HostOutcome, date: NaiveDate) -> FollowUpTask {
    let ip = outcome
        .ip
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    FollowUpTask {
        title: format!("Review: {}", outcome.target.display_name()),
        description: format!(
            "The general scan found that link {} ({}, IP: {}) has no open port among the monitored ports.",
            outcome.target.display_name(),
            outcome.target.name,
            ip
        ),
        date,
    }
}
