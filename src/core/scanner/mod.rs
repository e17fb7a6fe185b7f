// src/core/scanner/mod.rs

pub mod batch;
pub mod host_scanner;
pub mod local_net;
pub mod port_prober;

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use self::batch::{BatchOrchestrator, BatchRun, CancelToken, ScanObserver};
use self::host_scanner::HostScanner;
use crate::config::{Settings, REGISTRY_PORTS};
use crate::core::error::ScanError;
use crate::core::followup::create_followups;
use crate::core::models::{BatchResult, FollowUpSummary, HostOutcome, Report, Target};
use crate::core::report::Reporter;
use crate::core::services::{DirectoryService, TaskService};

/// How a general scan ended.
#[derive(Debug, Clone)]
pub enum GeneralScanOutcome {
    /// The registry could not be read or had no usable hosts; nothing was scanned.
    NoTargets(String),
    Completed {
        result: BatchResult,
        report: Option<Report>,
        followups: FollowUpSummary,
    },
    Cancelled(BatchResult),
}

/// Scan of every host in the link registry, followed by the report and the
/// follow-up tasks.
pub struct GeneralScan {
    directory: Arc<dyn DirectoryService>,
    tasks: Arc<dyn TaskService>,
    orchestrator: BatchOrchestrator,
    reporter: Reporter,
    ports: Vec<u16>,
    timeout: Duration,
}

impl GeneralScan {
    pub fn new(
        directory: Arc<dyn DirectoryService>,
        tasks: Arc<dyn TaskService>,
        orchestrator: BatchOrchestrator,
        reporter: Reporter,
    ) -> Self {
        Self {
            directory,
            tasks,
            orchestrator,
            reporter,
            ports: REGISTRY_PORTS.to_vec(),
            timeout: Duration::from_secs(1),
        }
    }

    pub fn with_ports(mut self, ports: &[u16]) -> Self {
        self.ports = ports.to_vec();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Wires the registry client, system resolver and configured reports
    /// directory together.
    pub fn from_settings<S>(settings: &Settings, services: Arc<S>) -> Self
    where
        S: DirectoryService + TaskService + 'static,
    {
        let orchestrator =
            BatchOrchestrator::new(HostScanner::system()).with_concurrency(settings.concurrency);
        Self::new(
            services.clone(),
            services,
            orchestrator,
            Reporter::new(&settings.reports_dir),
        )
        .with_timeout(settings.batch_timeout)
    }

    /// Runs the whole pipeline once.
    ///
    /// # Arguments
    /// * `observer` - Receives per-host progress and, for a completed run, the report.
    /// * `cancel` - Stops the batch between hosts; a cancelled run writes nothing.
    ///
    /// # Returns
    /// The outcome of the run, see [`GeneralScanOutcome`].
    pub async fn run(&self, observer: &dyn ScanObserver, cancel: &CancelToken) -> GeneralScanOutcome {
        // Fail fast only here: no registry, no scan.
        let targets = match acquire_targets(self.directory.as_ref()).await {
            Ok(targets) => targets,
            Err(e) => {
                warn!(error = %e, "General scan aborted before scanning.");
                return GeneralScanOutcome::NoTargets(e.to_string());
            }
        };

        let result = match self
            .orchestrator
            .run_batch(&targets, &self.ports, self.timeout, observer, cancel)
            .await
        {
            BatchRun::Completed(result) => result,
            BatchRun::Cancelled(partial) => return GeneralScanOutcome::Cancelled(partial),
            BatchRun::NoTargets => {
                return GeneralScanOutcome::NoTargets("no usable host names".to_string());
            }
        };

        // Report and follow-ups are best effort; neither can fail the run.
        let report = self.reporter.try_generate(&result);
        let followups = create_followups(self.tasks.as_ref(), &result).await;
        observer.on_batch_complete(report.as_ref());

        GeneralScanOutcome::Completed {
            result,
            report,
            followups,
        }
    }
}

/// Reads the registry and keeps the entries that carry a host name.
///
/// # Returns
/// One `Target` per usable entry, labelled with the registry name, or
/// `ScanError::DirectoryUnavailable` when the registry is unreachable or has
/// no entry with a host.
pub async fn acquire_targets(directory: &dyn DirectoryService) -> Result<Vec<Target>, ScanError> {
    let links = directory.get_targets().await?;
    let mut targets = Vec::with_capacity(links.len());
    for link in links {
        let host = link.host.trim();
        if host.is_empty() {
            warn!(link = %link.name, "Registry entry has no host, skipping.");
            continue;
        }
        debug!(link = %link.name, host, "Registry entry queued.");
        targets.push(Target::new(host).with_label(&link.name));
    }

    if targets.is_empty() {
        return Err(ScanError::DirectoryUnavailable(
            "the registry has no entries with a host".to_string(),
        ));
    }
    info!(count = targets.len(), "Targets acquired.");
    Ok(targets)
}

/// Interactive scan of one operator-chosen address.
///
/// `input` may be an IP, a host name or a URL; when it is blank the host's
/// own public address is scanned. No report and no follow-up are produced.
pub async fn run_single_scan(
    scanner: &HostScanner,
    input: &str,
    ports: &[u16],
    timeout: Duration,
    settings: &Settings,
) -> HostOutcome {
    let target = match normalize_target(input) {
        Some(target) => target,
        None => match local_net::wan_ip(&settings.wan_ip_url, settings.api_timeout).await {
            Some(ip) => Target::new(ip.to_string()),
            None => {
                return HostOutcome::other_error(
                    Target::new("public address"),
                    "could not determine the public IP address",
                );
            }
        },
    };
    info!(host = %target.name, "Starting single-target scan.");
    scanner.scan_host(&target, ports, timeout).await
}

/// Strips scheme, credentials, port and path from operator input.
pub fn normalize_target(input: &str) -> Option<Target> {
    let raw = input.trim();
    if raw.is_empty() {
        return None;
    }
    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{raw}")
    };
    let host = Url::parse(&with_scheme)
        .ok()
        .and_then(|url| url.host_str().map(String::from))
        .unwrap_or_else(|| raw.to_string());
    Some(Target::new(host))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::followup::tests::RecordingTasks;
    use crate::core::models::{FollowUpTask, HostStatus, LinkRecord, TaskReceipt};
    use crate::core::scanner::batch::tests::NoopObserver;
    use crate::core::scanner::host_scanner::tests::{StubConnector, StubResolver};
    use async_trait::async_trait;
    use std::net::Ipv4Addr;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::{SystemTime, UNIX_EPOCH};

    const A: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 1);
    const C: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 3);

    struct StaticDirectory(Result<Vec<LinkRecord>, String>);

    #[async_trait]
    impl DirectoryService for StaticDirectory {
        async fn get_targets(&self) -> Result<Vec<LinkRecord>, ScanError> {
            self.0.clone().map_err(ScanError::DirectoryUnavailable)
        }
    }

    struct SharedTasks(Arc<RecordingTasks>);

    #[async_trait]
    impl TaskService for SharedTasks {
        async fn create_task(&self, task: &FollowUpTask) -> Result<TaskReceipt, ScanError> {
            self.0.create_task(task).await
        }
    }

    #[derive(Default)]
    struct CompletionRecorder {
        completed: Mutex<Vec<Option<PathBuf>>>,
    }

    impl ScanObserver for CompletionRecorder {
        fn on_batch_complete(&self, report: Option<&Report>) {
            self.completed.lock().unwrap().push(report.map(|r| r.storage_path.clone()));
        }
    }

    fn link(name: &str, host: &str) -> LinkRecord {
        LinkRecord {
            name: name.to_string(),
            host: host.to_string(),
        }
    }

    fn reports_dir() -> PathBuf {
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
        std::env::temp_dir().join(format!("linkwatch-general-{}-{nanos}", std::process::id()))
    }

    fn general_scan(links: Result<Vec<LinkRecord>, String>, tasks: Arc<RecordingTasks>, dir: PathBuf) -> GeneralScan {
        let resolver = StubResolver::with(&[("a.example", A), ("c.example", C)]);
        let connector = StubConnector::with_open(&[(A, 80)]);
        let orchestrator = BatchOrchestrator::new(HostScanner::new(Arc::new(resolver), Arc::new(connector)));
        GeneralScan::new(
            Arc::new(StaticDirectory(links)),
            Arc::new(SharedTasks(tasks)),
            orchestrator,
            Reporter::new(dir),
        )
    }

    #[tokio::test]
    async fn resolvable_and_unresolvable_hosts_produce_no_followups() {
        let tasks = Arc::new(RecordingTasks::default());
        let dir = reports_dir();
        let recorder = CompletionRecorder::default();
        let scan = general_scan(
            Ok(vec![link("A", "a.example"), link("B", "b.example")]),
            tasks.clone(),
            dir.clone(),
        )
        .with_ports(&[80, 81]);

        let outcome = scan.run(&recorder, &CancelToken::new()).await;

        let GeneralScanOutcome::Completed { result, report, followups } = outcome else {
            panic!("expected a completed scan");
        };
        assert_eq!(result.hosts[0].status, HostStatus::Success);
        assert_eq!(result.hosts[1].status, HostStatus::DnsError);
        let report = report.expect("report should be written");
        assert_eq!(report.rows.len(), 2);
        assert_eq!(followups.qualifying, 0);
        assert!(tasks.submitted.lock().unwrap().is_empty());
        assert_eq!(*recorder.completed.lock().unwrap(), vec![Some(report.storage_path.clone())]);

        std::fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn host_with_every_port_closed_gets_one_followup() {
        let tasks = Arc::new(RecordingTasks::default());
        let dir = reports_dir();
        let scan = general_scan(Ok(vec![link("C", "c.example")]), tasks.clone(), dir.clone())
            .with_ports(&[80, 554]);

        let outcome = scan.run(&NoopObserver, &CancelToken::new()).await;

        assert!(matches!(outcome, GeneralScanOutcome::Completed { .. }));
        let submitted = tasks.submitted.lock().unwrap();
        assert_eq!(submitted.len(), 1);
        assert!(submitted[0].title.contains("c.example"));

        std::fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn empty_registry_is_reported_as_no_targets() {
        let tasks = Arc::new(RecordingTasks::default());
        let dir = reports_dir();
        let recorder = CompletionRecorder::default();

        for links in [Ok(vec![]), Ok(vec![link("blank", "  ")]), Err("connection refused".to_string())] {
            let scan = general_scan(links, tasks.clone(), dir.clone());
            let outcome = scan.run(&recorder, &CancelToken::new()).await;
            assert!(matches!(outcome, GeneralScanOutcome::NoTargets(_)));
        }

        assert!(!dir.exists(), "no report may be generated");
        assert!(recorder.completed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn cancelled_scan_skips_report_and_followups() {
        let tasks = Arc::new(RecordingTasks::default());
        let dir = reports_dir();
        let cancel = CancelToken::new();
        cancel.cancel();
        let scan = general_scan(Ok(vec![link("C", "c.example")]), tasks.clone(), dir.clone());

        let outcome = scan.run(&NoopObserver, &cancel).await;

        assert!(matches!(outcome, GeneralScanOutcome::Cancelled(ref partial) if partial.is_empty()));
        assert!(tasks.submitted.lock().unwrap().is_empty());
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn registry_names_travel_with_the_targets() {
        let directory = StaticDirectory(Ok(vec![
            link("Warehouse North", " cam7.ddns.net "),
            link("", "10.0.0.9"),
            link("Dead entry", ""),
        ]));

        let targets = acquire_targets(&directory).await.unwrap();

        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].name, "cam7.ddns.net");
        assert_eq!(targets[0].display_name(), "Warehouse North");
        assert_eq!(targets[1].label, None);
        assert_eq!(targets[1].display_name(), "10.0.0.9");
    }

    #[test]
    fn operator_input_is_reduced_to_a_host() {
        assert_eq!(normalize_target("  "), None);
        assert_eq!(normalize_target("10.0.0.5"), Some(Target::new("10.0.0.5")));
        assert_eq!(
            normalize_target("https://cam.ddns.net:8080/view"),
            Some(Target::new("cam.ddns.net"))
        );
        assert_eq!(normalize_target("cam.ddns.net"), Some(Target::new("cam.ddns.net")));
    }

    #[tokio::test]
    async fn single_scan_uses_the_given_ports_and_timeout() {
        let resolver = StubResolver::with(&[("10.0.0.5", Ipv4Addr::new(10, 0, 0, 5))]);
        let connector = Arc::new(StubConnector::default());
        let scanner = HostScanner::new(Arc::new(resolver), connector.clone());

        let outcome = run_single_scan(
            &scanner,
            "10.0.0.5",
            &[80, 554],
            Duration::from_secs(5),
            &Settings::default(),
        )
        .await;

        assert_eq!(outcome.status, HostStatus::Success);
        assert_eq!(outcome.closed_ports.len(), 2);
        assert!(connector.calls.lock().unwrap().iter().all(|c| c.2 == Duration::from_secs(5)));
    }
}
