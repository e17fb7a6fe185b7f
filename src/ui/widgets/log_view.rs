// src/ui/widgets/log_view.rs

use crate::app::App;
use ratatui::{
    prelude::*,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

/// Renders the tail of the log file, newest line at the bottom.
///
/// Lines look like "DATE TIME LEVEL MESSAGE"; the timestamp is dimmed and
/// the level coloured.
pub fn render_log_view(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().title("Logs").borders(Borders::ALL);
    let inner_area = block.inner(area);
    frame.render_widget(block, area);

    let visible = inner_area.height as usize;
    let lines = app.log_tail.lines();
    let skip = lines.len().saturating_sub(visible);

    let log_lines: Vec<Line> = lines
        .iter()
        .skip(skip)
        .map(|line_str| {
            let mut parts = line_str.splitn(3, ' ');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(date), Some(time), Some(rest)) => {
                    // The level is right-aligned, so it may carry leading spaces.
                    let (level, message) = rest.trim_start().split_once(' ').unwrap_or((rest, ""));
                    Line::from(vec![
                        Span::styled(format!("{date} {time} "), Style::default().fg(Color::DarkGray)),
                        Span::styled(format!("{level:>5} "), level_style(level)),
                        Span::raw(message),
                    ])
                }
                _ => Line::from(line_str.as_str()),
            }
        })
        .collect();

    frame.render_widget(Paragraph::new(log_lines), inner_area);
}

fn level_style(level: &str) -> Style {
    match level.trim() {
        "ERROR" => Style::default().fg(Color::Red),
        "WARN" => Style::default().fg(Color::Yellow),
        "INFO" => Style::default().fg(Color::Green),
        _ => Style::default().fg(Color::Blue),
    }
}
