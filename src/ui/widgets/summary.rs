// src/ui/widgets/summary.rs

use crate::app::{App, AppState};
use ratatui::{
    prelude::*,
    text::Line,
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
};

/// Renders progress, outcome counts, the report location and the follow-up tally.
pub fn render_summary(frame: &mut Frame, app: &App, area: Rect) {
    let summary_container = Block::default().borders(Borders::ALL).title("Summary");
    frame.render_widget(summary_container, area);

    let summary_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(1), // Progress label
            Constraint::Length(1), // Gauge
            Constraint::Length(1), // Spacer
            Constraint::Length(7), // Counts
            Constraint::Length(1), // Spacer
            Constraint::Min(0),    // Report & follow-ups
        ])
        .split(area);

    let (completed, total) = app.progress;
    let percent = if total == 0 { 0 } else { (completed * 100 / total) as u16 };
    frame.render_widget(
        Paragraph::new(format!("Progress: {completed}/{total}")).alignment(Alignment::Center),
        summary_chunks[0],
    );
    let gauge_color = match app.state {
        AppState::Cancelled | AppState::NoTargets(_) => Color::Red,
        AppState::Finished => Color::Green,
        _ => Color::Cyan,
    };
    frame.render_widget(
        Gauge::default()
            .percent(percent.min(100))
            .label("")
            .style(Style::default().fg(gauge_color)),
        summary_chunks[1],
    );

    let s = &app.summary;
    let counts = Text::from(vec![
        Line::from("HOSTS".bold()),
        Line::from(format!("Scanned: {}", s.total)),
        count_line("Reachable: ", s.succeeded, Color::Green),
        count_line("No open port: ", s.unreachable, Color::Yellow),
        count_line("DNS errors: ", s.dns_errors, Color::Red),
        count_line("Other errors: ", s.other_errors, Color::Red),
        count_line("Port errors: ", s.port_errors, Color::Magenta),
    ]);
    frame.render_widget(Paragraph::new(counts), summary_chunks[3]);

    let mut details = Vec::new();
    if matches!(app.state, AppState::Finished) {
        details.push(Line::from("REPORT".bold()));
        match &app.report {
            Some(report) => {
                details.push(Line::from(Span::styled(
                    report.storage_path.display().to_string(),
                    Style::default().fg(Color::Cyan),
                )));
                details.push(Line::from(format!(
                    "Generated {}",
                    report.generated_at.format("%Y-%m-%d %H:%M:%S")
                )));
            }
            None if app.followups.is_some() => details.push(Line::from("Not produced (see logs).")),
            None => {}
        }
    }
    if let Some(followups) = app.followups {
        details.push(Line::from(""));
        details.push(Line::from("FOLLOW-UP TASKS".bold()));
        details.push(Line::from(format!(
            "{} needed, {} created, {} failed",
            followups.qualifying, followups.created, followups.failed
        )));
    }
    frame.render_widget(Paragraph::new(details).wrap(Wrap { trim: true }), summary_chunks[5]);
}

fn count_line(label: &str, value: usize, color: Color) -> Line<'static> {
    Line::from(vec![
        Span::raw(label.to_string()),
        Span::styled(value.to_string(), Style::default().fg(color)),
    ])
}
