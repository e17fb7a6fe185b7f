// src/core/report.rs

use chrono::Local;
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, XlsxError};
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{error, info};

use crate::core::error::ScanError;
use crate::core::models::{BatchResult, HostOutcome, Report, ReportRow, RowClass};

const PLACEHOLDER: &str = "-";
const HEADERS: [&str; 6] = ["Target", "IP", "Status", "Open Ports", "Closed Ports", "Total Ports"];
const COLUMN_WIDTHS: [f64; 6] = [32.0, 16.0, 48.0, 28.0, 28.0, 12.0];
const FILE_PREFIX: &str = "general_scan";
const SHEET_NAME: &str = "General Scan";

/// Writes one workbook per batch run into a fixed reports directory.
#[derive(Debug, Clone)]
pub struct Reporter {
    dir: PathBuf,
}

impl Reporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Renders and persists a batch as a spreadsheet.
    ///
    /// Each call gets its own timestamped file; an existing report is never
    /// overwritten.
    ///
    /// # Arguments
    /// * `result` - The finished batch, one row is written per host in batch order.
    ///
    /// # Returns
    /// The rendered `Report` with its storage path, or `ScanError::ReportWrite`
    /// when the directory or the file cannot be written.
    pub fn generate_report(&self, result: &BatchResult) -> Result<Report, ScanError> {
        let generated_at = Local::now();
        let rows = build_rows(result);

        fs::create_dir_all(&self.dir).map_err(|source| ScanError::ReportWrite {
            path: self.dir.clone(),
            source,
        })?;

        let stamp = generated_at.format("%Y%m%d_%H%M%S").to_string();
        let (path, file) = self.create_unique(&stamp)?;
        if let Err(e) = write_workbook(file, &rows) {
            // Don't leave a truncated workbook behind under a valid name.
            fs::remove_file(&path).ok();
            return Err(ScanError::ReportWrite {
                path,
                source: std::io::Error::other(e.to_string()),
            });
        }

        info!(path = %path.display(), rows = rows.len(), "Report written.");
        Ok(Report {
            rows,
            generated_at,
            storage_path: path,
        })
    }

    /// Like `generate_report`, but a failure is logged and turned into `None`.
    pub fn try_generate(&self, result: &BatchResult) -> Option<Report> {
        match self.generate_report(result) {
            Ok(report) => Some(report),
            Err(e) => {
                error!(error = %e, "No report produced.");
                None
            }
        }
    }

    fn create_unique(&self, stamp: &str) -> Result<(PathBuf, File), ScanError> {
        let mut attempt = 0u32;
        loop {
            let name = if attempt == 0 {
                format!("{FILE_PREFIX}_{stamp}.xlsx")
            } else {
                format!("{FILE_PREFIX}_{stamp}_{attempt}.xlsx")
            };
            let path = self.dir.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(source) => return Err(ScanError::ReportWrite { path, source }),
            }
        }
    }
}

fn header_format() -> Format {
    Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(0x366092))
        .set_align(FormatAlign::Center)
        .set_border(FormatBorder::Thin)
}

/// Cell style for a data row: green fill for hosts that were probed, red for
/// hosts that failed before probing.
pub fn row_format(class: RowClass) -> Format {
    let base = Format::new().set_border(FormatBorder::Thin);
    match class {
        RowClass::Success => base
            .set_background_color(Color::RGB(0xC6EFCE))
            .set_font_color(Color::RGB(0x006100)),
        RowClass::Error => base
            .set_background_color(Color::RGB(0xFFC7CE))
            .set_font_color(Color::RGB(0x9C0006)),
    }
}

fn write_workbook(file: File, rows: &[ReportRow]) -> Result<(), XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    // Header row.
    let header = header_format();
    for (col, (title, width)) in HEADERS.iter().zip(COLUMN_WIDTHS).enumerate() {
        let col = col as u16;
        worksheet.write_string_with_format(0, col, *title, &header)?;
        worksheet.set_column_width(col, width)?;
    }

    // One styled row per host.
    for (index, row) in rows.iter().enumerate() {
        let line = index as u32 + 1;
        let format = row_format(row.class);
        let cells = [&row.target, &row.ip, &row.status, &row.open_ports, &row.closed_ports];
        for (col, value) in cells.into_iter().enumerate() {
            worksheet.write_string_with_format(line, col as u16, value.as_str(), &format)?;
        }
        worksheet.write_number_with_format(line, 5, row.total_ports as f64, &format)?;
    }

    workbook.save_to_writer(file)
}

/// One row per outcome, in batch order.
pub fn build_rows(result: &BatchResult) -> Vec<ReportRow> {
    result.iter().map(build_row).collect()
}

fn build_row(outcome: &HostOutcome) -> ReportRow {
    let class = RowClass::from(outcome.status);
    let (status, open_ports, closed_ports) = match class {
        RowClass::Success => (
            "✓ Success".to_string(),
            join_ports(outcome.open_ports.iter()),
            join_ports(outcome.closed_ports.iter()),
        ),
        RowClass::Error => (
            format!(
                "✗ {}: {}",
                outcome.status,
                outcome.error_detail.as_deref().unwrap_or("unknown error")
            ),
            PLACEHOLDER.to_string(),
            PLACEHOLDER.to_string(),
        ),
    };

    ReportRow {
        target: outcome.target.name.clone(),
        ip: outcome
            .ip
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| PLACEHOLDER.to_string()),
        status,
        open_ports,
        closed_ports,
        total_ports: outcome.total_ports(),
        class,
    }
}

fn join_ports<'a>(ports: impl Iterator<Item = &'a u16>) -> String {
    let joined = ports.map(u16::to_string).collect::<Vec<_>>().join(", ");
    if joined.is_empty() {
        PLACEHOLDER.to_string()
    } else {
        joined
    }
}
