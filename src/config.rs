// src/config.rs

use crate::core::error::ScanError;
use crate::logging::{get_data_dir, PROJECT_NAME};
use directories::UserDirs;
use config::Environment;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Ports probed for every registry entry: HTTP and alt-HTTP, RTSP, and the
/// management ports DVRs usually expose.
pub const REGISTRY_PORTS: &[u16] = &[
    80, 81, 82, 83, 84, 85, 86, 87, 88, 554, 1024, 1025, 1026, 1027, 1028, 1029,
];

/// Ports probed when an operator scans a single address by hand.
pub const SINGLE_TARGET_PORTS: &[u16] = &[80, 81, 82, 554, 1024, 1025];

const DEFAULT_API_URL: &str = "http://localhost:3000/api";
const DEFAULT_WAN_IP_URL: &str = "https://api.ipify.org";

/// Runtime settings, read once from `LINKWATCH_*` environment variables.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_url: String,
    pub api_timeout: Duration,
    pub api_accept_invalid_certs: bool,
    pub reports_dir: PathBuf,
    pub batch_timeout: Duration,
    pub single_timeout: Duration,
    pub concurrency: usize,
    pub wan_ip_url: String,
}

/// The environment-facing shape of [`Settings`]: flat keys, plain numbers.
/// `LINKWATCH_BATCH_TIMEOUT_MS=250` lands in `batch_timeout_ms`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct RawSettings {
    api_url: String,
    api_timeout_secs: u64,
    api_accept_invalid_certs: bool,
    reports_dir: Option<PathBuf>,
    batch_timeout_ms: u64,
    single_timeout_ms: u64,
    concurrency: usize,
    wan_ip_url: String,
}

impl Default for RawSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_timeout_secs: 10,
            api_accept_invalid_certs: false,
            reports_dir: None,
            batch_timeout_ms: 1000,
            single_timeout_ms: 5000,
            concurrency: 1,
            wan_ip_url: DEFAULT_WAN_IP_URL.to_string(),
        }
    }
}

impl TryFrom<RawSettings> for Settings {
    type Error = ScanError;

    fn try_from(raw: RawSettings) -> Result<Self, Self::Error> {
        if raw.concurrency == 0 {
            return Err(ScanError::Config("CONCURRENCY must be at least 1".to_string()));
        }
        Ok(Self {
            api_url: raw.api_url.trim_end_matches('/').to_string(),
            api_timeout: Duration::from_secs(raw.api_timeout_secs),
            api_accept_invalid_certs: raw.api_accept_invalid_certs,
            reports_dir: raw.reports_dir.unwrap_or_else(default_reports_dir),
            batch_timeout: Duration::from_millis(raw.batch_timeout_ms),
            single_timeout: Duration::from_millis(raw.single_timeout_ms),
            concurrency: raw.concurrency,
            wan_ip_url: raw.wan_ip_url,
        })
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_timeout: Duration::from_secs(10),
            api_accept_invalid_certs: false,
            reports_dir: default_reports_dir(),
            batch_timeout: Duration::from_millis(1000),
            single_timeout: Duration::from_millis(5000),
            concurrency: 1,
            wan_ip_url: DEFAULT_WAN_IP_URL.to_string(),
        }
    }
}

impl Settings {
    /// Loads settings from the process environment.
    ///
    /// # Returns
    /// The defaults overlaid with every `LINKWATCH_*` variable that is set, or
    /// `ScanError::Config` when a value does not parse or fails validation.
    pub fn from_env() -> Result<Self, ScanError> {
        Self::load(None)
    }

    /// Same as [`Settings::from_env`], but reads the variables from `vars`
    /// instead of the process environment.
    ///
    /// # Arguments
    /// * `vars` - Full variable names (`LINKWATCH_CONCURRENCY`, ...) and their raw values.
    pub fn from_vars(vars: config::Map<String, String>) -> Result<Self, ScanError> {
        Self::load(Some(vars))
    }

    fn load(vars: Option<config::Map<String, String>>) -> Result<Self, ScanError> {
        let environment = Environment::with_prefix(PROJECT_NAME.as_str())
            .try_parsing(true)
            .source(vars);

        let raw: RawSettings = config::Config::builder()
            .add_source(environment)
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| ScanError::Config(e.to_string()))?;

        let settings = Settings::try_from(raw)?;
        debug!(?settings, "Settings loaded.");
        Ok(settings)
    }
}

/// `<Documents>/Linkwatch_Reports`, or `<data dir>/reports` when the platform
/// has no documents folder.
fn default_reports_dir() -> PathBuf {
    UserDirs::new()
        .and_then(|dirs| dirs.document_dir().map(|d| d.join("Linkwatch_Reports")))
        .unwrap_or_else(|| get_data_dir().join("reports"))
}
