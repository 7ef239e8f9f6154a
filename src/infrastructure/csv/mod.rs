// ============================================================
// TABULAR INPUT LAYER
// ============================================================
// CSV and XLSX readers producing a TabularSource

mod csv_parser;
mod xlsx_reader;

pub use csv_parser::CsvParser;
pub use xlsx_reader::XlsxReader;

use crate::domain::error::{AppError, Result};
use crate::domain::tabular::TabularSource;
use std::path::Path;

/// Upload formats accepted by the dataset pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabularFormat {
    Csv,
    Xlsx,
}

impl TabularFormat {
    pub fn from_file_name(file_name: &str) -> Result<Self> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match extension.as_deref() {
            Some("csv") => Ok(TabularFormat::Csv),
            Some("xlsx") => Ok(TabularFormat::Xlsx),
            _ => Err(AppError::InputError(format!(
                "Unsupported file type '{}', expected .csv or .xlsx",
                file_name
            ))),
        }
    }
}

/// Read a CSV or XLSX file, picking the reader from the extension.
pub fn read_path(path: &Path) -> Result<TabularSource> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();

    match TabularFormat::from_file_name(file_name)? {
        TabularFormat::Csv => CsvParser::new().parse_file(path),
        TabularFormat::Xlsx => XlsxReader::new().read_file(path),
    }
}
