// src/core/scanner/batch.rs

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::host_scanner::HostScanner;
use crate::core::models::{BatchResult, HostOutcome, Report, Target};

/// Receives scan events in input-target order.
///
/// Callbacks run synchronously on the scanning task, so implementations
/// should only hand the event off (e.g. over a channel).
pub trait ScanObserver: Send + Sync {
    fn on_progress(&self, _completed: usize, _total: usize) {}
    fn on_host_result(&self, _outcome: &HostOutcome) {}
    fn on_batch_complete(&self, _report: Option<&Report>) {}
}

/// Cooperative cancellation flag, checked between hosts.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchRun {
    /// Every target was attempted.
    Completed(BatchResult),
    /// Stopped between hosts; holds the outcomes gathered so far.
    Cancelled(BatchResult),
    /// Nothing usable to scan.
    NoTargets,
}

/// Drives the host scanner over a list of targets.
#[derive(Clone)]
pub struct BatchOrchestrator {
    scanner: HostScanner,
    concurrency: usize,
}

impl BatchOrchestrator {
    pub fn new(scanner: HostScanner) -> Self {
        Self { scanner, concurrency: 1 }
    }

    /// Allows up to `limit` hosts in flight; 1 keeps the scan strictly sequential.
    pub fn with_concurrency(mut self, limit: usize) -> Self {
        self.concurrency = limit.max(1);
        self
    }

    /// Scans every usable target and collects the outcomes in input order.
    ///
    /// # Arguments
    /// * `targets` - Hosts to scan; entries with a blank name are skipped.
    /// * `ports` - Candidate port list, the same for every host.
    /// * `timeout` - Per-attempt connect timeout.
    /// * `observer` - Receives one result and one progress event per host.
    /// * `cancel` - Checked before each host starts.
    ///
    /// # Returns
    /// `NoTargets` when nothing usable was given, `Cancelled` with the
    /// outcomes gathered so far, or `Completed` with one outcome per target.
    pub async fn run_batch(
        &self,
        targets: &[Target],
        ports: &[u16],
        timeout: Duration,
        observer: &dyn ScanObserver,
        cancel: &CancelToken,
    ) -> BatchRun {
        // Blank names are dropped up front so progress totals count real hosts.
        let targets: Vec<Target> = targets
            .iter()
            .filter(|t| !t.name.trim().is_empty())
            .cloned()
            .collect();
        if targets.is_empty() {
            warn!("Batch requested with no usable targets.");
            return BatchRun::NoTargets;
        }

        info!(
            hosts = targets.len(),
            ports = ports.len(),
            timeout_ms = timeout.as_millis() as u64,
            concurrency = self.concurrency,
            "Starting batch scan."
        );
        let ports: Arc<[u16]> = Arc::from(ports);

        let run = if self.concurrency == 1 {
            self.run_sequential(&targets, ports, timeout, observer, cancel).await
        } else {
            self.run_pooled(&targets, ports, timeout, observer, cancel).await
        };

        match &run {
            BatchRun::Completed(result) => info!(
                hosts = result.len(),
                succeeded = result.success_count(),
                "Batch scan finished."
            ),
            BatchRun::Cancelled(partial) => warn!(scanned = partial.len(), "Batch scan cancelled."),
            BatchRun::NoTargets => {}
        }
        run
    }

    async fn run_sequential(
        &self,
        targets: &[Target],
        ports: Arc<[u16]>,
        timeout: Duration,
        observer: &dyn ScanObserver,
        cancel: &CancelToken,
    ) -> BatchRun {
        let total = targets.len();
        let mut result = BatchResult::default();

        for (index, target) in targets.iter().enumerate() {
            if cancel.is_cancelled() {
                return BatchRun::Cancelled(result);
            }
            let outcome = scan_isolated(self.scanner.clone(), target.clone(), ports.clone(), timeout).await;
            observer.on_host_result(&outcome);
            result.hosts.push(outcome);
            observer.on_progress(index + 1, total);
        }
        BatchRun::Completed(result)
    }

    /// Outcomes land in indexed slots and are released as a contiguous
    /// prefix, so observers and the result see input order.
    async fn run_pooled(
        &self,
        targets: &[Target],
        ports: Arc<[u16]>,
        timeout: Duration,
        observer: &dyn ScanObserver,
        cancel: &CancelToken,
    ) -> BatchRun {
        let total = targets.len();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();
        let mut slots: Vec<Option<HostOutcome>> = vec![None; total];
        let mut released = BatchResult::default();
        let mut cancelled = false;

        for (index, target) in targets.iter().enumerate() {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                error!("Scan semaphore closed unexpectedly.");
                break;
            };
            // Cancellation may have arrived while waiting for a free slot.
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            let scanner = self.scanner.clone();
            let target = target.clone();
            let ports = ports.clone();
            tasks.spawn(async move {
                let _permit = permit;
                (index, scan_isolated(scanner, target, ports, timeout).await)
            });

            while let Some(joined) = tasks.try_join_next() {
                store_slot(joined, &mut slots);
            }
            release_ready(&mut slots, &mut released, observer, total);
        }

        while let Some(joined) = tasks.join_next().await {
            store_slot(joined, &mut slots);
            release_ready(&mut slots, &mut released, observer, total);
        }

        if cancelled || released.len() < total {
            BatchRun::Cancelled(released)
        } else {
            BatchRun::Completed(released)
        }
    }
}

/// Runs one host scan on its own task so a panic inside it becomes an
/// `OtherError` outcome instead of tearing down the batch.
async fn scan_isolated(scanner: HostScanner, target: Target, ports: Arc<[u16]>, timeout: Duration) -> HostOutcome {
    let fallback = target.clone();
    let handle = tokio::spawn(async move { scanner.scan_host(&target, &ports, timeout).await });
    match handle.await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(host = %fallback.name, error = %e, "Host scan task failed.");
            HostOutcome::other_error(fallback, format!("scan task failed: {e}"))
        }
    }
}

fn store_slot(
    joined: Result<(usize, HostOutcome), tokio::task::JoinError>,
    slots: &mut [Option<HostOutcome>],
) {
    match joined {
        Ok((index, outcome)) => {
            debug!(index, host = %outcome.target.name, "Host outcome ready.");
            slots[index] = Some(outcome);
        }
        Err(e) => error!(error = %e, "Pooled scan task aborted."),
    }
}

fn release_ready(
    slots: &mut [Option<HostOutcome>],
    released: &mut BatchResult,
    observer: &dyn ScanObserver,
    total: usize,
) {
    while released.len() < total {
        let Some(outcome) = slots[released.len()].take() else {
            break;
        };
        observer.on_host_result(&outcome);
        released.hosts.push(outcome);
        observer.on_progress(released.len(), total);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::models::HostStatus;
    use crate::core::scanner::host_scanner::tests::{StubConnector, StubResolver};
    use std::net::Ipv4Addr;
    use std::sync::Mutex;

    const A: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 1);
    const C: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 3);
    const D: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 4);

    /// Observer that ignores everything.
    pub struct NoopObserver;

    impl ScanObserver for NoopObserver {}

    #[derive(Default)]
    struct Recorder {
        progress: Mutex<Vec<(usize, usize)>>,
        hosts: Mutex<Vec<String>>,
        cancel_after: Option<(usize, CancelToken)>,
    }

    impl ScanObserver for Recorder {
        fn on_progress(&self, completed: usize, total: usize) {
            self.progress.lock().unwrap().push((completed, total));
            if let Some((n, token)) = &self.cancel_after {
                if completed == *n {
                    token.cancel();
                }
            }
        }

        fn on_host_result(&self, outcome: &HostOutcome) {
            self.hosts.lock().unwrap().push(outcome.target.name.clone());
        }
    }

    fn orchestrator() -> BatchOrchestrator {
        let resolver = StubResolver::with(&[("a.example", A), ("c.example", C), ("d.example", D)]);
        let connector = StubConnector::with_open(&[(A, 80), (D, 554)]);
        BatchOrchestrator::new(HostScanner::new(Arc::new(resolver), Arc::new(connector)))
    }

    fn targets(names: &[&str]) -> Vec<Target> {
        names.iter().map(|n| Target::new(*n)).collect()
    }

    #[tokio::test]
    async fn mixed_batch_keeps_input_order() {
        let recorder = Recorder::default();
        let run = orchestrator()
            .run_batch(
                &targets(&["a.example", "b.example"]),
                &[80, 81],
                Duration::from_secs(1),
                &recorder,
                &CancelToken::new(),
            )
            .await;

        let BatchRun::Completed(result) = run else {
            panic!("expected a completed batch");
        };
        assert_eq!(result.len(), 2);
        let a = &result.hosts[0];
        assert_eq!(a.target.name, "a.example");
        assert_eq!(a.status, HostStatus::Success);
        assert_eq!(a.open_ports.iter().copied().collect::<Vec<_>>(), vec![80]);
        assert_eq!(a.closed_ports.iter().copied().collect::<Vec<_>>(), vec![81]);
        let b = &result.hosts[1];
        assert_eq!(b.status, HostStatus::DnsError);
        assert!(b.open_ports.is_empty() && b.closed_ports.is_empty());

        assert_eq!(*recorder.progress.lock().unwrap(), vec![(1, 2), (2, 2)]);
        assert_eq!(*recorder.hosts.lock().unwrap(), vec!["a.example", "b.example"]);
    }

    #[tokio::test]
    async fn empty_or_blank_target_list_is_no_targets() {
        let recorder = Recorder::default();
        let cancel = CancelToken::new();
        let orchestrator = orchestrator();

        let empty = orchestrator.run_batch(&[], &[80], Duration::from_secs(1), &recorder, &cancel).await;
        assert_eq!(empty, BatchRun::NoTargets);

        let blank = orchestrator
            .run_batch(&targets(&["", "  "]), &[80], Duration::from_secs(1), &recorder, &cancel)
            .await;
        assert_eq!(blank, BatchRun::NoTargets);
        assert!(recorder.progress.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_names_are_skipped_among_real_ones() {
        let recorder = Recorder::default();
        let run = orchestrator()
            .run_batch(
                &targets(&["a.example", "", "  "]),
                &[80],
                Duration::from_secs(1),
                &recorder,
                &CancelToken::new(),
            )
            .await;

        let BatchRun::Completed(result) = run else {
            panic!("expected a completed batch");
        };
        assert_eq!(result.len(), 1);
        assert_eq!(result.hosts[0].target.name, "a.example");
        assert_eq!(*recorder.progress.lock().unwrap(), vec![(1, 1)]);
    }

    #[tokio::test]
    async fn panicking_host_scan_becomes_other_error() {
        let resolver = StubResolver::with(&[("a.example", A), ("c.example", C)]);
        let mut connector = StubConnector::with_open(&[(C, 80)]);
        connector.panicking.insert((A, 80));
        let orchestrator = BatchOrchestrator::new(HostScanner::new(Arc::new(resolver), Arc::new(connector)));

        let run = orchestrator
            .run_batch(
                &targets(&["a.example", "c.example"]),
                &[80],
                Duration::from_secs(1),
                &NoopObserver,
                &CancelToken::new(),
            )
            .await;

        let BatchRun::Completed(result) = run else {
            panic!("expected a completed batch");
        };
        assert_eq!(result.hosts[0].status, HostStatus::OtherError);
        assert!(result.hosts[0].error_detail.as_deref().unwrap().contains("scan task failed"));
        assert_eq!(result.hosts[1].status, HostStatus::Success);
        assert!(result.hosts[1].open_ports.contains(&80));
    }

    #[tokio::test]
    async fn pooled_cancellation_keeps_an_ordered_prefix() {
        let names: Vec<&str> = ["a.example", "c.example", "d.example", "b.example"]
            .iter()
            .cycle()
            .take(8)
            .copied()
            .collect();
        let cancel = CancelToken::new();
        let recorder = Recorder {
            cancel_after: Some((1, cancel.clone())),
            ..Default::default()
        };

        let run = orchestrator()
            .with_concurrency(2)
            .run_batch(&targets(&names), &[80], Duration::from_secs(1), &recorder, &cancel)
            .await;

        let BatchRun::Cancelled(partial) = run else {
            panic!("expected a cancelled batch");
        };
        assert!(!partial.is_empty() && partial.len() < names.len());
        let scanned: Vec<&str> = partial.iter().map(|h| h.target.name.as_str()).collect();
        assert_eq!(scanned, &names[..partial.len()]);
    }

    #[tokio::test]
    async fn repeated_runs_are_identical() {
        let input = targets(&["c.example", "b.example", "a.example", "d.example"]);
        let orchestrator = orchestrator();
        let cancel = CancelToken::new();

        let first = orchestrator
            .run_batch(&input, &[80, 554], Duration::from_secs(1), &NoopObserver, &cancel)
            .await;
        let second = orchestrator
            .run_batch(&input, &[80, 554], Duration::from_secs(1), &NoopObserver, &cancel)
            .await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn cancellation_is_observed_between_hosts() {
        let cancel = CancelToken::new();
        let recorder = Recorder {
            cancel_after: Some((1, cancel.clone())),
            ..Default::default()
        };

        let run = orchestrator()
            .run_batch(
                &targets(&["a.example", "c.example", "d.example"]),
                &[80],
                Duration::from_secs(1),
                &recorder,
                &cancel,
            )
            .await;

        let BatchRun::Cancelled(partial) = run else {
            panic!("expected a cancelled batch");
        };
        assert_eq!(partial.len(), 1);
        assert_eq!(partial.hosts[0].target.name, "a.example");
    }

    #[tokio::test]
    async fn pooled_batch_matches_sequential_order() {
        let names: Vec<&str> = ["a.example", "b.example", "c.example", "d.example"]
            .iter()
            .cycle()
            .take(12)
            .copied()
            .collect();
        let input = targets(&names);
        let cancel = CancelToken::new();

        let sequential = orchestrator()
            .run_batch(&input, &[80, 554], Duration::from_secs(1), &NoopObserver, &cancel)
            .await;

        let recorder = Recorder::default();
        let pooled = orchestrator()
            .with_concurrency(4)
            .run_batch(&input, &[80, 554], Duration::from_secs(1), &recorder, &cancel)
            .await;

        assert_eq!(sequential, pooled);
        let progress = recorder.progress.lock().unwrap();
        assert_eq!(progress.len(), 12);
        assert!(progress.windows(2).all(|w| w[0].0 < w[1].0));
        assert_eq!(*recorder.hosts.lock().unwrap(), names);
    }
}
