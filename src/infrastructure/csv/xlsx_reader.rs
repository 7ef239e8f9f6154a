// ============================================================
// XLSX READER
// ============================================================
// First worksheet of an Excel workbook as a TabularSource

use crate::domain::error::{AppError, Result};
use crate::domain::tabular::TabularSource;
use calamine::{open_workbook, Data, Reader, Xlsx};
use std::path::Path;
use tracing::debug;

#[derive(Default)]
pub struct XlsxReader;

impl XlsxReader {
    pub fn new() -> Self {
        Self
    }

    /// Read the first worksheet; its first row is the header.
    pub fn read_file(&self, path: &Path) -> Result<TabularSource> {
        if !path.exists() {
            return Err(AppError::InputError(format!(
                "Excel file not found at {}",
                path.display()
            )));
        }

        let mut workbook: Xlsx<_> = open_workbook(path)
            .map_err(|e| AppError::InputError(format!("Failed to open Excel file: {}", e)))?;

        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| AppError::InputError("No worksheet found".to_string()))?
            .map_err(|e| AppError::ParseError(format!("Failed to read Excel range: {}", e)))?;

        let mut rows = range
            .rows()
            .map(|row| row.iter().map(render_cell).collect::<Vec<String>>());

        let header = rows
            .next()
            .ok_or_else(|| AppError::InputError("Worksheet has no header row".to_string()))?;
        let rows: Vec<Vec<String>> = rows.collect();

        debug!(path = %path.display(), rows = rows.len(), "Read Excel worksheet");
        TabularSource::new(header, rows)
    }
}

/// Render a cell the way it would appear in a CSV export.
fn render_cell(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}
