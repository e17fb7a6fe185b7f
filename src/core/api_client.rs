// src/core/api_client.rs

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::Settings;
use crate::core::error::ScanError;
use crate::core::models::{FollowUpTask, LinkRecord, TaskReceipt};
use crate::core::services::{DirectoryService, TaskService};

/// REST client for the link registry and the activity (task) backend.
pub struct ApiClient {
    client: reqwest::Client,
    base: Url,
}

impl ApiClient {
    pub fn new(settings: &Settings) -> Result<Self, ScanError> {
        // A trailing slash makes `Url::join` append instead of replacing the last segment.
        let base = Url::parse(&format!("{}/", settings.api_url.trim_end_matches('/')))
            .map_err(|e| ScanError::Config(format!("API_URL is not a valid URL: {e}")))?;

        let client = reqwest::Client::builder()
            .user_agent(concat!("Linkwatch/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.api_timeout)
            .danger_accept_invalid_certs(settings.api_accept_invalid_certs)
            .build()
            .map_err(|e| ScanError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client, base })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ScanError> {
        self.base
            .join(path)
            .map_err(|e| ScanError::Config(format!("Bad endpoint '{path}': {e}")))
    }
}

#[async_trait]
impl DirectoryService for ApiClient {
    async fn get_targets(&self) -> Result<Vec<LinkRecord>, ScanError> {
        let url = self
            .endpoint("links.json")
            .map_err(|e| ScanError::DirectoryUnavailable(e.to_string()))?;
        info!(url = %url, "Fetching link registry.");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                error!(url = %url, error = %e, "Link registry request failed.");
                ScanError::DirectoryUnavailable(format!("request failed: {e}"))
            })?;

        let body: Value = response.json().await.map_err(|e| {
            error!(error = %e, "Link registry returned invalid JSON.");
            ScanError::DirectoryUnavailable(format!("invalid JSON: {e}"))
        })?;

        let links = parse_links(&body);
        info!(count = links.len(), "Link registry loaded.");
        Ok(links)
    }
}

#[async_trait]
impl TaskService for ApiClient {
    async fn create_task(&self, task: &FollowUpTask) -> Result<TaskReceipt, ScanError> {
        let fail = |reason: String| ScanError::TaskSubmission {
            title: task.title.clone(),
            reason,
        };
        let url = self.endpoint("activities").map_err(|e| fail(e.to_string()))?;
        debug!(url = %url, title = %task.title, "Submitting follow-up task.");

        let response = self
            .client
            .post(url)
            .json(task)
            .send()
            .await
            .map_err(|e| fail(format!("connection error: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, title = %task.title, "Task service rejected the task.");
            return Err(fail(format!("HTTP {status}: {body}")));
        }

        Ok(TaskReceipt {
            success: true,
            message: format!("Task created ({status})"),
        })
    }
}

/// Accepts a bare array or an object wrapping it in `links` / `data`.
/// Field names are tolerated in both the English and the legacy spelling.
pub fn parse_links(body: &Value) -> Vec<LinkRecord> {
    let entries = match body {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => map
            .get("links")
            .or_else(|| map.get("data"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default(),
        _ => &[],
    };

    entries
        .iter()
        .map(|entry| LinkRecord {
            name: first_str(entry, &["name", "nombre"]),
            host: first_str(entry, &["host", "ddns"]),
        })
        .collect()
}

fn first_str(entry: &Value, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|k| entry.get(*k).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .unwrap_or_default()
        .trim()
        .to_string()
}
