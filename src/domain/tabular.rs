// ============================================================
// TABULAR SOURCE
// ============================================================
// Header + rows extracted from a CSV or spreadsheet upload

use crate::domain::error::{AppError, Result};
use crate::domain::schema::sanitize_identifier;
use serde::Serialize;
use std::collections::HashMap;

/// Header plus rows of string cells, every row aligned to the header width.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TabularSource {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
    /// Rows that had more or fewer cells than the header before normalization
    ragged_rows: usize,
}

impl TabularSource {
    /// Build a source from raw records.
    ///
    /// Header cells are trimmed and must be non-blank and distinct once turned
    /// into SQL identifiers. Rows longer than the header are truncated and
    /// shorter rows are padded with empty cells; each such row is counted in
    /// [`TabularSource::ragged_rows`].
    pub fn new(header: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        let header: Vec<String> = header.into_iter().map(|h| h.trim().to_string()).collect();

        if header.is_empty() || header.iter().all(|h| h.is_empty()) {
            return Err(AppError::InputError("Header row is empty".to_string()));
        }
        check_header_names(&header)?;

        let width = header.len();
        let mut ragged_rows = 0;
        let rows = rows
            .into_iter()
            .map(|mut row| {
                if row.len() != width {
                    ragged_rows += 1;
                    row.resize(width, String::new());
                }
                row
            })
            .collect();

        Ok(Self {
            header,
            rows,
            ragged_rows,
        })
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn column_count(&self) -> usize {
        self.header.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn ragged_rows(&self) -> usize {
        self.ragged_rows
    }

    /// Fails when any row needed normalization.
    pub fn ensure_rectangular(&self) -> Result<()> {
        if self.ragged_rows > 0 {
            return Err(AppError::InputError(format!(
                "{} row(s) do not match the header width of {}",
                self.ragged_rows,
                self.header.len()
            )));
        }
        Ok(())
    }
}

/// Every header cell must name a column, and no two may collapse to one identifier.
fn check_header_names(header: &[String]) -> Result<()> {
    let mut seen: HashMap<String, &str> = HashMap::new();
    for (index, name) in header.iter().enumerate() {
        if name.is_empty() {
            return Err(AppError::InputError(format!(
                "Header cell {} is blank",
                index + 1
            )));
        }
        let identifier = sanitize_identifier(name);
        if let Some(previous) = seen.insert(identifier.clone(), name) {
            return Err(AppError::InputError(format!(
                "Headers '{}' and '{}' both map to column '{}'",
                previous, name, identifier
            )));
        }
    }
    Ok(())
}
