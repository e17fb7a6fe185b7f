// src/ui/widgets/footer.rs

use crate::app::{App, AppState, ScanKind};
use ratatui::{
    prelude::*,
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::Paragraph,
};

fn key(label: &str) -> Span<'_> {
    Span::styled(label, Style::new().bold().fg(Color::Yellow))
}

/// Renders the footer with the keys valid in the current state.
pub fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let spans = match app.state {
        AppState::Idle => Line::from(vec![
            key("Enter"),
            Span::raw(" scan target, "),
            key("F2"),
            Span::raw(" scan registry, "),
            key("F3"),
            Span::raw(" logs, "),
            key("Esc"),
            Span::raw(" quit"),
        ]),
        AppState::Scanning(ScanKind::General) => Line::from(vec![
            Span::raw("Scanning registry... "),
            key("Esc"),
            Span::raw(" to cancel after the current host."),
        ]),
        AppState::Scanning(ScanKind::Single) => Line::from("Scanning target..."),
        AppState::Finished | AppState::NoTargets(_) | AppState::Cancelled => Line::from(vec![
            key("[N]"),
            Span::raw("ew scan, "),
            key("[↑↓]"),
            Span::raw(" select, "),
            key("[L]"),
            Span::raw("ogs, "),
            key("[Q]"),
            Span::raw("uit"),
        ]),
    };

    let footer = Paragraph::new(spans).alignment(Alignment::Center);
    frame.render_widget(footer, area);
}
