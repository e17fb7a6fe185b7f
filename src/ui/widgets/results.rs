// src/ui/widgets/results.rs

use crate::app::{App, AppState, SPINNER_CHARS};
use crate::core::models::{BatchResult, RowClass};
use crate::core::report::build_rows;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, Paragraph, Row, Scrollbar, ScrollbarOrientation, Table, Wrap},
};

/// Renders the per-host results table, or a placeholder when there is none yet.
pub fn render_results(frame: &mut Frame, app: &mut App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Scan Results (Navigate with ↑ ↓)");

    if app.outcomes.is_empty() {
        let placeholder = match &app.state {
            AppState::Idle => Paragraph::new(
                "Type a target and press Enter, or press F2 to scan every link in the registry.",
            ),
            AppState::Scanning(_) => Paragraph::new(Line::from(vec![
                Span::styled(
                    format!("{} ", SPINNER_CHARS[app.spinner_frame]),
                    Style::default().fg(Color::Cyan),
                ),
                Span::raw("Scanning... Please wait."),
            ])),
            AppState::NoTargets(reason) => Paragraph::new(vec![
                Line::from("No targets available.".bold().fg(Color::Red)),
                Line::from(""),
                Line::from(reason.as_str()),
                Line::from("Check the registry service and your connection."),
            ]),
            AppState::Cancelled => Paragraph::new("Scan cancelled before any host finished."),
            AppState::Finished => Paragraph::new("No results."),
        };
        frame.render_widget(
            placeholder.block(block).alignment(Alignment::Center).wrap(Wrap { trim: true }),
            area,
        );
        return;
    }

    // Same rows as the report workbook, so screen and file agree.
    let batch = BatchResult { hosts: app.outcomes.clone() };
    let rows: Vec<Row> = build_rows(&batch)
        .into_iter()
        .map(|row| {
            let style = match row.class {
                RowClass::Success => Style::default().fg(Color::Green),
                RowClass::Error => Style::default().fg(Color::Red),
            };
            Row::new(vec![
                Cell::from(row.target),
                Cell::from(row.ip),
                Cell::from(row.status),
                Cell::from(row.open_ports),
                Cell::from(row.total_ports.to_string()),
            ])
            .style(style)
        })
        .collect();

    let header = Row::new(vec!["Target", "IP", "Status", "Open Ports", "Total"])
        .style(Style::default().bold().fg(Color::White).bg(Color::Blue));

    let table = Table::new(
        rows,
        [
            Constraint::Percentage(28),
            Constraint::Length(16),
            Constraint::Percentage(30),
            Constraint::Percentage(22),
            Constraint::Length(6),
        ],
    )
    .header(header)
    .block(block)
    .row_highlight_style(Style::new().bg(Color::DarkGray).add_modifier(Modifier::BOLD));

    frame.render_stateful_widget(table, area, &mut app.table_state);
    frame.render_stateful_widget(
        Scrollbar::new(ScrollbarOrientation::VerticalRight),
        area,
        &mut app.report_scroll_state,
    );
}
