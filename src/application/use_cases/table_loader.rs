//! Create a table from emitted DDL and fill it from a [`TabularSource`].
//!
//! The DDL runs first. All inserts then share one transaction, so a load either
//! commits every row or none of them. Values are always bound as parameters.

use crate::domain::error::{AppError, Result};
use crate::domain::load::{LoadReport, LoadState};
use crate::domain::schema::{ColumnType, TableSchema};
use crate::domain::tabular::TabularSource;
use crate::infrastructure::db::connection::SqlDialect;
use sqlx::any::{Any, AnyArguments};
use sqlx::AnyConnection;
use sqlx::query::Query;
use sqlx::{Connection, Executor};
use tracing::{debug, error, info};

pub struct TableLoader {
    dialect: SqlDialect,
}

impl TableLoader {
    pub fn new(dialect: SqlDialect) -> Self {
        Self { dialect }
    }

    /// `INSERT INTO t (a, b) VALUES (?, ?)` with placeholders for this dialect.
    pub fn insert_statement(&self, schema: &TableSchema) -> String {
        let columns: Vec<&str> = schema.columns.iter().map(|c| c.name.as_str()).collect();
        let placeholders: Vec<String> = (1..=columns.len())
            .map(|i| self.dialect.placeholder(i))
            .collect();

        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            schema.table_name,
            columns.join(", "),
            placeholders.join(", ")
        )
    }

    pub async fn load(
        &self,
        conn: &mut AnyConnection,
        schema: &TableSchema,
        ddl: &str,
        source: &TabularSource,
    ) -> Result<LoadReport> {
        let mut state = LoadState::SchemaInferred;
        debug!(table = %schema.table_name, %state, "Starting table load");

        match self.run(conn, schema, ddl, source, &mut state).await {
            Ok(rows_inserted) => {
                info!(
                    table = %schema.table_name,
                    rows = rows_inserted,
                    %state,
                    "Table load committed"
                );
                Ok(LoadReport {
                    table_name: schema.table_name.clone(),
                    rows_inserted,
                    state,
                })
            }
            Err(e) => {
                error!(
                    table = %schema.table_name,
                    reached = %state,
                    error = %e,
                    "Table load aborted"
                );
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        conn: &mut AnyConnection,
        schema: &TableSchema,
        ddl: &str,
        source: &TabularSource,
        state: &mut LoadState,
    ) -> Result<u64> {
        if let Err(e) = schema.validate() {
            *state = LoadState::Aborted;
            return Err(e);
        }
        if schema.columns.len() != source.column_count() {
            *state = LoadState::Aborted;
            return Err(AppError::InputError(format!(
                "Schema has {} columns but the source has {}",
                schema.columns.len(),
                source.column_count()
            )));
        }

        (&mut *conn).execute(ddl).await.map_err(|e| {
            *state = LoadState::Aborted;
            AppError::DatabaseError(format!(
                "Failed to create table {}: {}",
                schema.table_name, e
            ))
        })?;
        *state = LoadState::TableCreated;

        let insert_sql = self.insert_statement(schema);
        let mut tx = conn.begin().await.map_err(|e| {
            *state = LoadState::Aborted;
            AppError::DatabaseError(format!("Failed to begin transaction: {}", e))
        })?;

        let mut inserted: u64 = 0;
        for (index, row) in source.rows().iter().enumerate() {
            let query = bind_row(sqlx::query(&insert_sql), schema, row);
            if let Err(e) = query.execute(&mut *tx).await {
                *state = LoadState::Aborted;
                if let Err(rollback_err) = tx.rollback().await {
                    error!(error = %rollback_err, "Rollback failed");
                }
                return Err(AppError::DatabaseError(format!(
                    "Failed to insert row {} into {}: {}",
                    index + 1,
                    schema.table_name,
                    e
                )));
            }
            inserted += 1;
            *state = LoadState::RowsInserted(inserted);
        }

        tx.commit().await.map_err(|e| {
            *state = LoadState::Aborted;
            AppError::DatabaseError(format!("Failed to commit {}: {}", schema.table_name, e))
        })?;
        *state = LoadState::Committed;

        Ok(inserted)
    }
}

/// Bind each cell with the Rust type matching its column; blank numeric cells bind NULL.
fn bind_row<'q>(
    mut query: Query<'q, Any, AnyArguments<'q>>,
    schema: &TableSchema,
    row: &[String],
) -> Query<'q, Any, AnyArguments<'q>> {
    for (column, cell) in schema.columns.iter().zip(row.iter()) {
        let value = cell.trim();
        query = match column.column_type {
            ColumnType::Integer => query.bind(value.parse::<i32>().ok()),
            ColumnType::Float => query.bind(value.parse::<f64>().ok()),
            ColumnType::Text => query.bind(cell.clone()),
        };
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::ddl_emitter::DdlEmitter;
    use crate::application::use_cases::schema_inference::SchemaInferencer;
    use sqlx::any::install_default_drivers;

    async fn memory_conn() -> AnyConnection {
        install_default_drivers();
        AnyConnection::connect("sqlite::memory:").await.unwrap()
    }

    fn source(header: &[&str], rows: &[Vec<String>]) -> TabularSource {
        TabularSource::new(header.iter().map(|h| h.to_string()).collect(), rows.to_vec()).unwrap()
    }

    fn people(n: usize) -> TabularSource {
        let rows: Vec<Vec<String>> = (1..=n)
            .map(|i| vec![i.to_string(), format!("person {}", i), format!("{}.5", i)])
            .collect();
        source(&["id", "name", "score"], &rows)
    }

    async fn count(conn: &mut AnyConnection, table: &str) -> i64 {
        sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(conn)
            .await
            .unwrap()
    }

    #[test]
    fn test_insert_statement_placeholders() {
        let src = people(1);
        let schema = SchemaInferencer::infer("people", &src);

        assert_eq!(
            TableLoader::new(SqlDialect::Sqlite).insert_statement(&schema),
            "INSERT INTO people (id, name, score) VALUES (?, ?, ?)"
        );
        assert_eq!(
            TableLoader::new(SqlDialect::Postgres).insert_statement(&schema),
            "INSERT INTO people (id, name, score) VALUES ($1, $2, $3)"
        );
    }

    #[tokio::test]
    async fn test_load_inserts_every_row() {
        let mut conn = memory_conn().await;
        let src = people(7);
        let schema = SchemaInferencer::infer("people", &src);
        let ddl = DdlEmitter::new().emit(&schema);

        let report = TableLoader::new(SqlDialect::Sqlite)
            .load(&mut conn, &schema, &ddl, &src)
            .await
            .unwrap();

        assert_eq!(report.rows_inserted, 7);
        assert_eq!(report.state, LoadState::Committed);
        assert_eq!(count(&mut conn, "people").await, 7);
    }

    #[tokio::test]
    async fn test_failure_midway_leaves_no_rows() {
        let mut conn = memory_conn().await;
        let n = 9;
        let mut rows: Vec<Vec<String>> = (1..=n)
            .map(|i| vec![i.to_string(), format!("person {}", i)])
            .collect();
        // duplicate key on row ceil(n/2)
        let failing = (n + 1) / 2;
        rows[failing - 1][0] = "1".to_string();
        let src = source(&["id", "name"], &rows);

        let mut schema = SchemaInferencer::infer("people", &src);
        assert!(schema.set_primary_key("id").is_none());
        let ddl = DdlEmitter::new().emit(&schema);

        let result = TableLoader::new(SqlDialect::Sqlite)
            .load(&mut conn, &schema, &ddl, &src)
            .await;

        match result {
            Err(AppError::DatabaseError(msg)) => {
                assert!(msg.contains(&format!("row {}", failing)), "{}", msg)
            }
            other => panic!("expected database error, got {:?}", other),
        }
        assert_eq!(count(&mut conn, "people").await, 0);
    }

    #[tokio::test]
    async fn test_values_are_bound_not_interpolated() {
        let mut conn = memory_conn().await;
        let rows = vec![vec!["1".to_string(), "O'Brien'); DROP TABLE notes; --".to_string()]];
        let src = source(&["id", "note"], &rows);
        let schema = SchemaInferencer::infer("notes", &src);
        let ddl = DdlEmitter::new().emit(&schema);

        TableLoader::new(SqlDialect::Sqlite)
            .load(&mut conn, &schema, &ddl, &src)
            .await
            .unwrap();

        let stored: String = sqlx::query_scalar("SELECT note FROM notes WHERE id = 1")
            .fetch_one(&mut conn)
            .await
            .unwrap();
        assert_eq!(stored, "O'Brien'); DROP TABLE notes; --");
    }

    #[tokio::test]
    async fn test_blank_numeric_cells_become_null() {
        let mut conn = memory_conn().await;
        let rows = vec![
            vec!["1".to_string(), "9.5".to_string()],
            vec!["2".to_string(), "".to_string()],
        ];
        let src = source(&["id", "score"], &rows);
        let schema = SchemaInferencer::infer("scores", &src);
        let ddl = DdlEmitter::new().emit(&schema);

        TableLoader::new(SqlDialect::Sqlite)
            .load(&mut conn, &schema, &ddl, &src)
            .await
            .unwrap();

        let nulls: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM scores WHERE score IS NULL")
            .fetch_one(&mut conn)
            .await
            .unwrap();
        assert_eq!(nulls, 1);
    }

    #[tokio::test]
    async fn test_existing_table_is_reused() {
        let mut conn = memory_conn().await;
        let src = people(3);
        let schema = SchemaInferencer::infer("people", &src);
        let ddl = DdlEmitter::new().emit(&schema);
        let loader = TableLoader::new(SqlDialect::Sqlite);

        loader.load(&mut conn, &schema, &ddl, &src).await.unwrap();
        loader.load(&mut conn, &schema, &ddl, &src).await.unwrap();

        assert_eq!(count(&mut conn, "people").await, 6);
    }

    #[tokio::test]
    async fn test_invalid_schema_is_rejected_before_ddl() {
        let mut conn = memory_conn().await;
        let src = source(&["x", "y"], &[vec!["1".to_string(), "2".to_string()]]);
        let mut schema = SchemaInferencer::infer("pairs", &src);
        schema.columns[1].name = "x".to_string();
        let ddl = DdlEmitter::new().emit(&schema);

        let result = TableLoader::new(SqlDialect::Sqlite)
            .load(&mut conn, &schema, &ddl, &src)
            .await;
        assert!(matches!(result, Err(AppError::SchemaError(_))));

        let tables: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE name = 'pairs'")
                .fetch_one(&mut conn)
                .await
                .unwrap();
        assert_eq!(tables, 0);
    }

    #[tokio::test]
    async fn test_invalid_ddl_is_database_error() {
        let mut conn = memory_conn().await;
        let src = people(1);
        let schema = SchemaInferencer::infer("people", &src);

        let result = TableLoader::new(SqlDialect::Sqlite)
            .load(&mut conn, &schema, "CREATE TABLE (", &src)
            .await;
        assert!(matches!(result, Err(AppError::DatabaseError(_))));
    }
}
