//! Render a [`TableSchema`] as a `CREATE TABLE IF NOT EXISTS` statement.

use crate::domain::error::Result;
use crate::domain::schema::{ColumnSchema, ColumnType, TableSchema};
use crate::infrastructure::storage::atomic_write_bytes;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::info;

pub const DEFAULT_VARCHAR_LENGTH: u32 = 255;

#[derive(Debug, Clone)]
pub struct DdlEmitter {
    varchar_length: u32,
    /// Text columns emitted as unbounded `TEXT` instead of `VARCHAR(n)`
    unbounded_text: HashSet<String>,
}

impl Default for DdlEmitter {
    fn default() -> Self {
        Self {
            varchar_length: DEFAULT_VARCHAR_LENGTH,
            unbounded_text: HashSet::new(),
        }
    }
}

impl DdlEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_varchar_length(mut self, length: u32) -> Self {
        self.varchar_length = length.max(1);
        self
    }

    /// Columns (SQL or header name) to emit as `TEXT`. Ignored for numeric columns.
    pub fn with_unbounded_text<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unbounded_text
            .extend(columns.into_iter().map(Into::into));
        self
    }

    fn sql_type(&self, column: &ColumnSchema) -> String {
        match column.column_type {
            ColumnType::Integer => "INT".to_string(),
            ColumnType::Float => "FLOAT".to_string(),
            ColumnType::Text
                if self.unbounded_text.contains(&column.name)
                    || self.unbounded_text.contains(&column.source_name) =>
            {
                "TEXT".to_string()
            }
            ColumnType::Text => format!("VARCHAR({})", self.varchar_length),
        }
    }

    pub fn emit(&self, schema: &TableSchema) -> String {
        let definitions: Vec<String> = schema
            .columns
            .iter()
            .map(|column| {
                let mut definition = format!("    {} {}", column.name, self.sql_type(column));
                if column.is_primary_key {
                    definition.push_str(" PRIMARY KEY");
                }
                definition
            })
            .collect();

        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{}\n);",
            schema.table_name,
            definitions.join(",\n")
        )
    }

    /// Write the emitted statement to `<output_dir>/<table_name>_ddl.sql`.
    pub fn write(&self, schema: &TableSchema, output_dir: &Path) -> Result<PathBuf> {
        schema.validate()?;
        let ddl = self.emit(schema);
        let path = ddl_file_path(output_dir, &schema.table_name);
        atomic_write_bytes(&path, ddl.as_bytes())?;
        info!(table = %schema.table_name, path = %path.display(), "Wrote DDL file");
        Ok(path)
    }
}

pub fn ddl_file_path(output_dir: &Path, table_name: &str) -> PathBuf {
    output_dir.join(format!("{}_ddl.sql", table_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> TableSchema {
        TableSchema::new(
            "people",
            vec![
                ColumnSchema::new("id", ColumnType::Integer),
                ColumnSchema::new("name", ColumnType::Text),
                ColumnSchema::new("score", ColumnType::Float),
            ],
        )
    }

    #[test]
    fn test_emit_shape() {
        let ddl = DdlEmitter::new().emit(&schema());
        assert_eq!(
            ddl,
            "CREATE TABLE IF NOT EXISTS people (\n    id INT,\n    name VARCHAR(255),\n    score FLOAT\n);"
        );
    }

    #[test]
    fn test_emit_with_primary_key() {
        let mut s = schema();
        assert!(s.set_primary_key("id").is_none());
        let ddl = DdlEmitter::new().emit(&s);
        assert!(ddl.contains("    id INT PRIMARY KEY,\n"));
        assert_eq!(ddl.matches("PRIMARY KEY").count(), 1);
    }

    #[test]
    fn test_missing_primary_key_emits_without_clause() {
        let mut s = schema();
        let warning = s.set_primary_key("missing_col");
        assert!(warning.is_some());
        let ddl = DdlEmitter::new().emit(&s);
        assert!(!ddl.contains("PRIMARY KEY"));
    }

    #[test]
    fn test_emit_is_deterministic() {
        let emitter = DdlEmitter::new().with_unbounded_text(["name"]);
        let s = schema();
        let first = emitter.emit(&s);
        for _ in 0..5 {
            assert_eq!(emitter.emit(&s), first);
        }
    }

    #[test]
    fn test_unbounded_text_override() {
        let ddl = DdlEmitter::new()
            .with_unbounded_text(["name", "score"])
            .emit(&schema());
        assert!(ddl.contains("    name TEXT,\n"));
        assert!(ddl.contains("    score FLOAT\n"));
    }

    #[test]
    fn test_custom_varchar_length() {
        let ddl = DdlEmitter::new().with_varchar_length(64).emit(&schema());
        assert!(ddl.contains("name VARCHAR(64)"));
    }

    #[test]
    fn test_write_refuses_invalid_schema() {
        let dir = tempfile::tempdir().unwrap();
        let schema = TableSchema::new(
            "dupes",
            vec![
                ColumnSchema::new("x", ColumnType::Integer),
                ColumnSchema::new("x", ColumnType::Text),
            ],
        );

        let result = DdlEmitter::new().write(&schema, dir.path());
        assert!(matches!(result, Err(crate::domain::error::AppError::SchemaError(_))));
        assert!(!dir.path().join("dupes_ddl.sql").exists());
    }

    #[test]
    fn test_write_ddl_file() {
        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().join("ddl");
        let emitter = DdlEmitter::new();

        let path = emitter.write(&schema(), &output_dir).unwrap();

        assert_eq!(path, output_dir.join("people_ddl.sql"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), emitter.emit(&schema()));
    }
}
