// ============================================================
// CSV PARSER
// ============================================================
// Parse CSV uploads with encoding fallback and ragged-row tolerance

use crate::domain::error::{AppError, Result};
use crate::domain::tabular::TabularSource;
use csv::{ReaderBuilder, Trim};
use encoding_rs::WINDOWS_1252;
use std::borrow::Cow;
use std::path::Path;
use tracing::{debug, warn};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// CSV parser producing a [`TabularSource`]
pub struct CsvParser {
    /// Delimiter character (default: comma)
    delimiter: u8,

    /// Whether to trim whitespace around header names
    trim_headers: bool,
}

impl Default for CsvParser {
    fn default() -> Self {
        Self {
            delimiter: b',',
            trim_headers: true,
        }
    }
}

impl CsvParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set custom delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Parse a CSV file from disk
    pub fn parse_file(&self, path: &Path) -> Result<TabularSource> {
        if !path.exists() {
            return Err(AppError::InputError(format!(
                "CSV file not found at {}",
                path.display()
            )));
        }

        let bytes = std::fs::read(path).map_err(|e| {
            AppError::IoError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        self.parse_bytes(&bytes)
    }

    /// Parse raw CSV bytes (UTF-8 expected, Windows-1252 fallback)
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<TabularSource> {
        let content = decode(bytes);
        self.parse_content(&content)
    }

    /// Parse CSV content from string
    pub fn parse_content(&self, content: &str) -> Result<TabularSource> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .trim(if self.trim_headers {
                Trim::Headers
            } else {
                Trim::None
            })
            .flexible(true) // ragged rows are normalized by TabularSource
            .from_reader(content.as_bytes());

        let header: Vec<String> = reader
            .headers()
            .map_err(|e| AppError::InputError(format!("Failed to read CSV header: {}", e)))?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let mut rows = Vec::new();
        for (index, result) in reader.records().enumerate() {
            let record = result.map_err(|e| {
                AppError::ParseError(format!("Failed to parse CSV row {}: {}", index + 1, e))
            })?;
            rows.push(record.iter().map(|v| v.to_string()).collect());
        }

        let source = TabularSource::new(header, rows)?;
        debug!(
            columns = source.column_count(),
            rows = source.row_count(),
            "Parsed CSV content"
        );
        Ok(source)
    }
}

/// Decode upload bytes, stripping a UTF-8 BOM and falling back to Windows-1252.
fn decode(bytes: &[u8]) -> Cow<'_, str> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    match std::str::from_utf8(bytes) {
        Ok(content) => Cow::Borrowed(content),
        Err(_) => {
            warn!("CSV content is not valid UTF-8, decoding as Windows-1252");
            let (content, _, _) = WINDOWS_1252.decode(bytes);
            content
        }
    }
}
