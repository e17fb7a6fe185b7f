// src/main.rs

use color_eyre::eyre::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::prelude::*;
use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{error, info};

mod app;
mod config;
mod core;
mod logging;
mod ui;

use app::{App, AppState, ChannelObserver, ScanEvent, ScanKind};
use config::{Settings, SINGLE_TARGET_PORTS};
use crate::core::api_client::ApiClient;
use crate::core::scanner::host_scanner::HostScanner;
use crate::core::scanner::local_net::lan_ip;
use crate::core::scanner::{run_single_scan, GeneralScan};

/// Everything a scan task needs, shared between runs.
struct Scanners {
    settings: Arc<Settings>,
    general: Arc<GeneralScan>,
    single: HostScanner,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    logging::initialize_logging()?;

    let settings = Arc::new(Settings::from_env()?);
    let api = Arc::new(ApiClient::new(&settings)?);
    let scanners = Scanners {
        general: Arc::new(GeneralScan::from_settings(&settings, api)),
        single: HostScanner::system(),
        settings,
    };
    info!(reports = %scanners.settings.reports_dir.display(), "Linkwatch started.");

    // --- Setup ---
    stdout().execute(EnterAlternateScreen)?;
    enable_raw_mode()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.clear()?;

    let result = run(&mut terminal, &scanners).await;

    // --- Restore Terminal ---
    stdout().execute(LeaveAlternateScreen)?;
    disable_raw_mode()?;
    result
}

async fn run(terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>, scanners: &Scanners) -> Result<()> {
    let mut app = App::new();
    app.local_ip = Some(lan_ip());
    let (tx, mut rx) = mpsc::unbounded_channel();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(&mut app, frame))?;

        if event::poll(Duration::from_millis(100))? {
            handle_events(&mut app, &tx, scanners)?;
        }
        drain_scan_events(&mut app, &mut rx);
        app.on_tick();
    }
    Ok(())
}

fn drain_scan_events(app: &mut App, rx: &mut UnboundedReceiver<ScanEvent>) {
    while let Ok(event) = rx.try_recv() {
        app.apply(event);
    }
}

fn handle_events(app: &mut App, tx: &UnboundedSender<ScanEvent>, scanners: &Scanners) -> Result<()> {
    if let Event::Key(key) = event::read()? {
        if key.kind == KeyEventKind::Press {
            match app.state {
                AppState::Idle => handle_idle_input(app, key.code, tx, scanners),
                AppState::Scanning(_) => {
                    if key.code == KeyCode::Esc {
                        app.cancel_scan();
                    }
                }
                AppState::Finished | AppState::NoTargets(_) | AppState::Cancelled => {
                    handle_finished_input(app, key.code)
                }
            }
        }
    }
    Ok(())
}

/// While idle every printable key goes to the target box, so commands use
/// Enter, function keys and Esc.
fn handle_idle_input(app: &mut App, key_code: KeyCode, tx: &UnboundedSender<ScanEvent>, scanners: &Scanners) {
    match key_code {
        KeyCode::Esc => app.quit(),
        KeyCode::Char(c) => app.input.push(c),
        KeyCode::Backspace => {
            app.input.pop();
        }
        KeyCode::Enter => start_single_scan(app, tx, scanners),
        KeyCode::F(2) => start_general_scan(app, tx, scanners),
        KeyCode::F(3) => app.toggle_logs(),
        _ => {}
    }
}

fn handle_finished_input(app: &mut App, key_code: KeyCode) {
    match key_code {
        KeyCode::Char('q') | KeyCode::Esc => app.quit(),
        KeyCode::Char('n') => app.reset(),
        KeyCode::Char('l') => app.toggle_logs(),
        KeyCode::Up => app.scroll_up(),
        KeyCode::Down => app.scroll_down(),
        _ => {}
    }
}

fn start_general_scan(app: &mut App, tx: &UnboundedSender<ScanEvent>, scanners: &Scanners) {
    let cancel = app.start_scan(ScanKind::General);
    let general = scanners.general.clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        let observer = ChannelObserver::new(tx.clone());
        let outcome = general.run(&observer, &cancel).await;
        if tx.send(ScanEvent::GeneralFinished(outcome)).is_err() {
            error!("UI went away before the general scan finished.");
        }
    });
}

fn start_single_scan(app: &mut App, tx: &UnboundedSender<ScanEvent>, scanners: &Scanners) {
    app.start_scan(ScanKind::Single);
    let input = app.input.clone();
    let scanner = scanners.single.clone();
    let settings = scanners.settings.clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        let outcome =
            run_single_scan(&scanner, &input, SINGLE_TARGET_PORTS, settings.single_timeout, &settings).await;
        if tx.send(ScanEvent::SingleFinished(outcome)).is_err() {
            error!("UI went away before the single scan finished.");
        }
    });
}
