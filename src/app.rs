// src/app.rs

use ratatui::widgets::{ScrollbarState, TableState};
use std::net::IpAddr;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::core::models::{FollowUpSummary, HostOutcome, HostStatus, Report};
use crate::core::scanner::batch::{CancelToken, ScanObserver};
use crate::core::scanner::GeneralScanOutcome;
use crate::logging::LogTail;

pub const SPINNER_CHARS: [&str; 8] = ["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"];
const LOG_LINES: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanKind {
    /// Every host in the link registry.
    General,
    /// One operator-chosen address.
    Single,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppState {
    Idle,
    Scanning(ScanKind),
    Finished,
    NoTargets(String),
    Cancelled,
}

/// Messages from a running scan task to the UI loop.
#[derive(Debug)]
pub enum ScanEvent {
    Progress { completed: usize, total: usize },
    HostResult(HostOutcome),
    BatchComplete(Option<Report>),
    GeneralFinished(GeneralScanOutcome),
    SingleFinished(HostOutcome),
}

/// Forwards observer callbacks to the UI over an unbounded channel, so the
/// scanning task never waits on rendering.
pub struct ChannelObserver {
    tx: UnboundedSender<ScanEvent>,
}

impl ChannelObserver {
    pub fn new(tx: UnboundedSender<ScanEvent>) -> Self {
        Self { tx }
    }
}

impl ChannelObserver {
    fn forward(&self, event: ScanEvent) {
        // Only fails once the UI loop has exited; the scan just runs out.
        if let Err(e) = self.tx.send(event) {
            debug!(event = ?e.0, "UI receiver gone, dropping scan event.");
        }
    }
}

impl ScanObserver for ChannelObserver {
    fn on_progress(&self, completed: usize, total: usize) {
        self.forward(ScanEvent::Progress { completed, total });
    }

    fn on_host_result(&self, outcome: &HostOutcome) {
        self.forward(ScanEvent::HostResult(outcome.clone()));
    }

    fn on_batch_complete(&self, report: Option<&Report>) {
        self.forward(ScanEvent::BatchComplete(report.cloned()));
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub total: usize,
    pub succeeded: usize,
    pub unreachable: usize,
    pub dns_errors: usize,
    pub other_errors: usize,
    /// Ports whose probe failed at the socket level.
    pub port_errors: usize,
}

pub struct App {
    pub should_quit: bool,
    pub state: AppState,
    pub input: String,
    pub outcomes: Vec<HostOutcome>,
    pub progress: (usize, usize),
    pub report: Option<Report>,
    pub followups: Option<FollowUpSummary>,
    pub summary: ScanSummary,
    pub table_state: TableState,
    pub report_scroll_state: ScrollbarState,
    pub log_tail: LogTail,
    pub show_logs: bool,
    pub spinner_frame: usize,
    /// Address of this machine on the local network, shown next to the input.
    pub local_ip: Option<IpAddr>,
    cancel: Option<CancelToken>,
}

impl App {
    pub fn new() -> Self {
        Self {
            should_quit: false,
            state: AppState::Idle,
            input: String::new(),
            outcomes: Vec::new(),
            progress: (0, 0),
            report: None,
            followups: None,
            summary: ScanSummary::default(),
            table_state: TableState::default(),
            report_scroll_state: ScrollbarState::default(),
            log_tail: LogTail::for_log_file(LOG_LINES),
            show_logs: true,
            spinner_frame: 0,
            local_ip: None,
            cancel: None,
        }
    }

    pub fn is_scanning(&self) -> bool {
        matches!(self.state, AppState::Scanning(_))
    }

    /// Clears the previous results and returns the token the new scan should watch.
    pub fn start_scan(&mut self, kind: ScanKind) -> CancelToken {
        self.clear_results();
        self.state = AppState::Scanning(kind);
        let token = CancelToken::new();
        self.cancel = Some(token.clone());
        token
    }

    pub fn cancel_scan(&mut self) {
        if let Some(token) = &self.cancel {
            token.cancel();
        }
    }

    pub fn apply(&mut self, event: ScanEvent) {
        match event {
            ScanEvent::Progress { completed, total } => self.progress = (completed, total),
            ScanEvent::HostResult(outcome) => {
                self.outcomes.push(outcome);
                self.report_scroll_state = self.report_scroll_state.content_length(self.outcomes.len());
                self.update_summary();
            }
            ScanEvent::BatchComplete(report) => self.report = report,
            ScanEvent::GeneralFinished(outcome) => {
                self.cancel = None;
                match outcome {
                    GeneralScanOutcome::NoTargets(reason) => self.state = AppState::NoTargets(reason),
                    GeneralScanOutcome::Cancelled(partial) => {
                        self.outcomes = partial.hosts;
                        self.state = AppState::Cancelled;
                    }
                    GeneralScanOutcome::Completed { result, report, followups } => {
                        self.outcomes = result.hosts;
                        self.report = report;
                        self.followups = Some(followups);
                        self.state = AppState::Finished;
                    }
                }
                self.update_summary();
            }
            ScanEvent::SingleFinished(outcome) => {
                self.cancel = None;
                self.outcomes = vec![outcome];
                self.progress = (1, 1);
                self.state = AppState::Finished;
                self.update_summary();
            }
        }
    }

    pub fn update_summary(&mut self) {
        let count = |status: HostStatus| self.outcomes.iter().filter(|o| o.status == status).count();
        self.summary = ScanSummary {
            total: self.outcomes.len(),
            succeeded: count(HostStatus::Success),
            unreachable: self.outcomes.iter().filter(|o| o.is_unreachable()).count(),
            dns_errors: count(HostStatus::DnsError),
            other_errors: count(HostStatus::OtherError),
            port_errors: self.outcomes.iter().map(|o| o.port_errors.len()).sum(),
        };
        self.report_scroll_state = self.report_scroll_state.content_length(self.outcomes.len());
    }

    pub fn scroll_up(&mut self) {
        let selected = self.table_state.selected().map_or(0, |i| i.saturating_sub(1));
        self.select_row(selected);
    }

    pub fn scroll_down(&mut self) {
        let last = self.outcomes.len().saturating_sub(1);
        let selected = self.table_state.selected().map_or(0, |i| (i + 1).min(last));
        self.select_row(selected);
    }

    fn select_row(&mut self, index: usize) {
        if self.outcomes.is_empty() {
            return;
        }
        self.table_state.select(Some(index));
        self.report_scroll_state = self.report_scroll_state.position(index);
    }

    pub fn on_tick(&mut self) {
        if self.is_scanning() {
            self.spinner_frame = (self.spinner_frame + 1) % SPINNER_CHARS.len();
        }
        if self.show_logs {
            self.log_tail.refresh();
        }
    }

    pub fn toggle_logs(&mut self) {
        self.show_logs = !self.show_logs;
    }

    pub fn quit(&mut self) {
        self.cancel_scan();
        self.should_quit = true;
    }

    pub fn reset(&mut self) {
        self.state = AppState::Idle;
        self.input = String::new();
        self.clear_results();
    }

    fn clear_results(&mut self) {
        self.outcomes.clear();
        self.progress = (0, 0);
        self.report = None;
        self.followups = None;
        self.summary = ScanSummary::default();
        self.table_state = TableState::default();
        self.report_scroll_state = ScrollbarState::default();
        self.cancel = None;
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{BatchResult, Target};
    use std::net::Ipv4Addr;

    fn closed_host(name: &str) -> HostOutcome {
        let mut outcome = HostOutcome::success(Target::new(name), Ipv4Addr::new(192, 0, 2, 1));
        outcome.closed_ports.insert(80);
        outcome
    }

    #[test]
    fn streamed_results_update_the_summary() {
        let mut app = App::new();
        app.start_scan(ScanKind::General);

        app.apply(ScanEvent::HostResult(closed_host("c.example")));
        app.apply(ScanEvent::Progress { completed: 1, total: 2 });
        app.apply(ScanEvent::HostResult(HostOutcome::dns_error(Target::new("b.example"), "NXDOMAIN")));
        app.apply(ScanEvent::Progress { completed: 2, total: 2 });

        assert_eq!(app.progress, (2, 2));
        assert_eq!(
            app.summary,
            ScanSummary { total: 2, succeeded: 1, unreachable: 1, dns_errors: 1, other_errors: 0, port_errors: 0 }
        );
        assert!(app.is_scanning());
    }

    #[test]
    fn no_targets_is_its_own_state() {
        let mut app = App::new();
        app.start_scan(ScanKind::General);
        app.apply(ScanEvent::GeneralFinished(GeneralScanOutcome::NoTargets("empty registry".into())));
        assert_eq!(app.state, AppState::NoTargets("empty registry".into()));
        assert!(app.outcomes.is_empty());
    }

    #[test]
    fn completed_scan_keeps_report_and_followups() {
        let mut app = App::new();
        app.start_scan(ScanKind::General);
        app.apply(ScanEvent::GeneralFinished(GeneralScanOutcome::Completed {
            result: BatchResult { hosts: vec![closed_host("c.example")] },
            report: None,
            followups: FollowUpSummary { qualifying: 1, created: 1, failed: 0 },
        }));

        assert_eq!(app.state, AppState::Finished);
        assert!(app.report.is_none());
        assert_eq!(app.followups.map(|f| f.created), Some(1));
    }

    #[test]
    fn cancel_flips_the_token_handed_to_the_scan() {
        let mut app = App::new();
        let token = app.start_scan(ScanKind::General);
        app.cancel_scan();
        assert!(token.is_cancelled());
    }

    #[test]
    fn scrolling_stays_within_results() {
        let mut app = App::new();
        app.scroll_down();
        assert_eq!(app.table_state.selected(), None);

        app.outcomes = vec![closed_host("a"), closed_host("b")];
        app.scroll_down();
        app.scroll_down();
        app.scroll_down();
        assert_eq!(app.table_state.selected(), Some(1));
        app.scroll_up();
        app.scroll_up();
        assert_eq!(app.table_state.selected(), Some(0));
    }
}
