use crate::domain::error::{AppError, Result};
use crate::domain::query::QueryResult;
use crate::infrastructure::db::connection::{close_connection, DbConnector};
use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::any::AnyRow;
use sqlx::{Column, Row};
use std::collections::HashMap;
use tracing::{info, warn};

static WRITE_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(INSERT|UPDATE|DELETE|DROP|ALTER|TRUNCATE|CREATE|GRANT|REVOKE|REPLACE|MERGE|ATTACH|DETACH|PRAGMA)\b",
    )
    .unwrap()
});

/// Runs generated SQL on a connection opened for the call.
pub struct QueryExecutor {
    connector: DbConnector,
    read_only: bool,
}

impl QueryExecutor {
    pub fn new(connector: DbConnector, read_only: bool) -> Self {
        Self {
            connector,
            read_only,
        }
    }

    /// Reject anything but a single read statement.
    pub fn check_read_only(sql: &str) -> Result<()> {
        let trimmed = sql.trim().trim_end_matches(';').trim();
        let upper = trimmed.to_uppercase();

        if !(upper.starts_with("SELECT") || upper.starts_with("WITH") || upper.starts_with("SHOW")) {
            return Err(AppError::SecurityError(
                "Only SELECT queries are allowed".to_string(),
            ));
        }
        if trimmed.contains(';') {
            return Err(AppError::SecurityError(
                "Multiple statements are not allowed".to_string(),
            ));
        }
        if let Some(found) = WRITE_KEYWORD.find(trimmed) {
            return Err(AppError::SecurityError(format!(
                "Query contains forbidden keyword: {}",
                found.as_str().to_uppercase()
            )));
        }
        Ok(())
    }

    pub async fn execute(&self, sql: &str) -> Result<QueryResult> {
        if self.read_only {
            Self::check_read_only(sql)?;
        }

        let mut conn = self.connector.connect().await?;
        let fetched = sqlx::query(sql).fetch_all(&mut conn).await;
        close_connection(conn).await;

        let rows = fetched
            .map_err(|e| AppError::DatabaseError(format!("Query execution failed: {}", e)))?;

        let result = rows_to_result(&rows);
        info!(rows = result.row_count, "Executed generated query");
        Ok(result)
    }
}

fn rows_to_result(rows: &[AnyRow]) -> QueryResult {
    let columns: Vec<String> = rows
        .first()
        .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
        .unwrap_or_default();

    let rows: Vec<HashMap<String, serde_json::Value>> = rows
        .iter()
        .map(|row| {
            row.columns()
                .iter()
                .enumerate()
                .map(|(i, column)| (column.name().to_string(), extract_column_value(row, i)))
                .collect()
        })
        .collect();

    QueryResult {
        columns,
        row_count: rows.len(),
        rows,
    }
}

/// Extract a column value as JSON, trying the types the `Any` driver can decode.
fn extract_column_value(row: &AnyRow, index: usize) -> serde_json::Value {
    if let Ok(v) = row.try_get::<Option<String>, _>(index) {
        return v
            .map(serde_json::Value::String)
            .unwrap_or(serde_json::Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
        return v
            .map(|n| serde_json::Value::Number(n.into()))
            .unwrap_or(serde_json::Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<i32>, _>(index) {
        return v
            .map(|n| serde_json::Value::Number(n.into()))
            .unwrap_or(serde_json::Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<i16>, _>(index) {
        return v
            .map(|n| serde_json::Value::Number(n.into()))
            .unwrap_or(serde_json::Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(index) {
        return v
            .and_then(serde_json::Number::from_f64)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<f32>, _>(index) {
        return v
            .and_then(|n| serde_json::Number::from_f64(n as f64))
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(index) {
        return v
            .map(serde_json::Value::Bool)
            .unwrap_or(serde_json::Value::Null);
    }

    warn!(column = index, "Unsupported column type, returning null");
    serde_json::Value::Null
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_only_accepts_selects() {
        assert!(QueryExecutor::check_read_only("SELECT * FROM voters").is_ok());
        assert!(QueryExecutor::check_read_only("  select created_at from t;").is_ok());
        assert!(QueryExecutor::check_read_only(
            "WITH x AS (SELECT 1 AS a) SELECT a FROM x"
        )
        .is_ok());
    }

    #[test]
    fn test_read_only_rejects_writes() {
        assert!(matches!(
            QueryExecutor::check_read_only("DELETE FROM voters"),
            Err(AppError::SecurityError(_))
        ));
        assert!(matches!(
            QueryExecutor::check_read_only("SELECT 1; DROP TABLE voters"),
            Err(AppError::SecurityError(_))
        ));
        assert!(matches!(
            QueryExecutor::check_read_only("WITH d AS (DELETE FROM t RETURNING *) SELECT * FROM d"),
            Err(AppError::SecurityError(_))
        ));
    }

    #[tokio::test]
    async fn test_execute_select_on_sqlite() {
        let executor = QueryExecutor::new(DbConnector::new("sqlite::memory:").unwrap(), true);
        let result = executor
            .execute("SELECT 1 AS one, 'two' AS two, 2.5 AS three, NULL AS four")
            .await
            .unwrap();

        assert_eq!(result.row_count, 1);
        assert_eq!(result.columns, vec!["one", "two", "three", "four"]);
        let row = &result.rows[0];
        assert_eq!(row["one"], serde_json::json!(1));
        assert_eq!(row["two"], serde_json::json!("two"));
        assert_eq!(row["three"], serde_json::json!(2.5));
        assert_eq!(row["four"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_execute_reports_driver_errors() {
        let executor = QueryExecutor::new(DbConnector::new("sqlite::memory:").unwrap(), true);
        let result = executor.execute("SELECT * FROM no_such_table").await;
        assert!(matches!(result, Err(AppError::DatabaseError(_))));
    }
}
