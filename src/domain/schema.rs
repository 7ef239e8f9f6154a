use crate::domain::error::{AppError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

static NON_IDENTIFIER_CHAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_]").unwrap());

/// Storage type inferred for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnType {
    Integer,
    Float,
    Text,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Integer => write!(f, "INTEGER"),
            ColumnType::Float => write!(f, "FLOAT"),
            ColumnType::Text => write!(f, "TEXT"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    /// SQL identifier used in DDL and inserts
    pub name: String,
    /// Header text as it appeared in the upload
    pub source_name: String,
    pub column_type: ColumnType,
    pub is_primary_key: bool,
}

impl ColumnSchema {
    pub fn new(source_name: &str, column_type: ColumnType) -> Self {
        Self {
            name: sanitize_identifier(source_name),
            source_name: source_name.to_string(),
            column_type,
            is_primary_key: false,
        }
    }
}

/// Non-fatal findings raised while shaping a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaWarning {
    PrimaryKeyNotFound { requested: String },
    RaggedRows { count: usize },
}

impl fmt::Display for SchemaWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaWarning::PrimaryKeyNotFound { requested } => write!(
                f,
                "Primary key column '{}' not found; table created without a primary key",
                requested
            ),
            SchemaWarning::RaggedRows { count } => write!(
                f,
                "{} row(s) did not match the header width and were padded or truncated",
                count
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub table_name: String,
    pub columns: Vec<ColumnSchema>,
}

impl TableSchema {
    pub fn new(table_name: impl Into<String>, columns: Vec<ColumnSchema>) -> Self {
        Self {
            table_name: table_name.into(),
            columns,
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns
            .iter()
            .find(|c| c.name == name || c.source_name == name)
    }

    pub fn primary_key(&self) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.is_primary_key)
    }

    /// Check that the schema can be rendered as one valid `CREATE TABLE`.
    pub fn validate(&self) -> Result<()> {
        if self.table_name.is_empty() {
            return Err(AppError::SchemaError("Table name is empty".to_string()));
        }
        if self.columns.is_empty() {
            return Err(AppError::SchemaError(format!(
                "Table {} has no columns",
                self.table_name
            )));
        }

        let mut names = std::collections::HashSet::new();
        for column in &self.columns {
            if column.name.is_empty() {
                return Err(AppError::SchemaError(format!(
                    "Table {} has a column without a name",
                    self.table_name
                )));
            }
            if !names.insert(column.name.as_str()) {
                return Err(AppError::SchemaError(format!(
                    "Column {} appears more than once in {}",
                    column.name, self.table_name
                )));
            }
        }

        if self.columns.iter().filter(|c| c.is_primary_key).count() > 1 {
            return Err(AppError::SchemaError(format!(
                "Table {} has more than one primary key column",
                self.table_name
            )));
        }
        Ok(())
    }

    /// Mark `requested` as the primary key, clearing any previous marker.
    ///
    /// The column may be named by its SQL identifier or by its header text.
    /// When no column matches, the schema is left without a primary key and a
    /// warning is returned instead of an error.
    pub fn set_primary_key(&mut self, requested: &str) -> Option<SchemaWarning> {
        let requested = requested.trim();
        if requested.is_empty() {
            return None;
        }

        let position = self
            .columns
            .iter()
            .position(|c| c.name == requested || c.source_name == requested);

        for column in &mut self.columns {
            column.is_primary_key = false;
        }

        match position {
            Some(idx) => {
                self.columns[idx].is_primary_key = true;
                None
            }
            None => {
                let warning = SchemaWarning::PrimaryKeyNotFound {
                    requested: requested.to_string(),
                };
                tracing::warn!(table = %self.table_name, requested, "{}", warning);
                Some(warning)
            }
        }
    }
}

/// Turn arbitrary text into an unquoted SQL identifier.
///
/// Characters outside `[A-Za-z0-9_]` become `_`, and a leading digit gets a `_`
/// prefix. Applying it twice gives the same result as applying it once.
pub fn sanitize_identifier(raw: &str) -> String {
    let replaced = NON_IDENTIFIER_CHAR.replace_all(raw.trim(), "_");
    if replaced.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{}", replaced)
    } else {
        replaced.into_owned()
    }
}

/// Derive a table name from an uploaded file name.
///
/// The stem is cut at the first `.` so `sales.2024.csv` becomes `sales`.
pub fn table_name_from_file(file_name: &str) -> Result<String> {
    let base = Path::new(file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(file_name);
    let stem = base.split('.').next().unwrap_or("");

    let table_name = sanitize_identifier(stem);
    if table_name.is_empty() {
        return Err(AppError::InputError(format!(
            "Cannot derive a table name from '{}'",
            file_name
        )));
    }
    Ok(table_name)
}
