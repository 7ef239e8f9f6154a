//! Upload pipeline: store the file, infer a schema, write its DDL, load the rows.

use crate::application::use_cases::ddl_emitter::DdlEmitter;
use crate::application::use_cases::schema_inference::SchemaInferencer;
use crate::application::use_cases::table_loader::TableLoader;
use crate::domain::error::{AppError, Result};
use crate::domain::schema::{sanitize_identifier, table_name_from_file, SchemaWarning, TableSchema};
use crate::domain::tabular::TabularSource;
use crate::infrastructure::config::IngestConfig;
use crate::infrastructure::csv::{read_path, TabularFormat};
use crate::infrastructure::db::{close_connection, DbConnector};
use crate::infrastructure::storage::{sha256_hex, DatasetStore};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadOptions {
    /// Use this table name instead of deriving one from the file name
    #[serde(default)]
    pub table_name: Option<String>,
    #[serde(default)]
    pub primary_key: Option<String>,
    /// Text columns to create as unbounded `TEXT`
    #[serde(default)]
    pub unbounded_text: Vec<String>,
}

/// Schema and DDL derived from one tabular file, before any database work.
#[derive(Debug, Clone)]
pub struct PreparedDataset {
    pub source: TabularSource,
    pub schema: TableSchema,
    pub ddl: String,
    pub ddl_path: PathBuf,
    pub warnings: Vec<SchemaWarning>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadReport {
    pub table_name: String,
    pub schema: TableSchema,
    pub ddl_path: PathBuf,
    pub stored_path: PathBuf,
    pub sha256: String,
    pub rows_inserted: u64,
    pub ragged_rows: usize,
    pub warnings: Vec<SchemaWarning>,
}

/// First rows of a stored dataset.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetPreview {
    pub file_name: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub total_rows: usize,
}

pub struct DatasetUploadUseCase {
    store: DatasetStore,
    connector: DbConnector,
    ingest: IngestConfig,
}

impl DatasetUploadUseCase {
    pub fn new(store: DatasetStore, connector: DbConnector, ingest: IngestConfig) -> Self {
        Self {
            store,
            connector,
            ingest,
        }
    }

    pub fn store(&self) -> &DatasetStore {
        &self.store
    }

    fn emitter(&self, options: &UploadOptions) -> DdlEmitter {
        DdlEmitter::new()
            .with_varchar_length(self.ingest.varchar_length)
            .with_unbounded_text(options.unbounded_text.iter().cloned())
    }

    /// Read `path`, infer its schema and write `<table>_ddl.sql`. Touches no database.
    pub fn prepare(
        &self,
        file_name: &str,
        path: &Path,
        options: &UploadOptions,
    ) -> Result<PreparedDataset> {
        let source = read_path(path)?;
        let mut warnings = Vec::new();

        if source.ragged_rows() > 0 {
            if self.ingest.reject_ragged_rows {
                source.ensure_rectangular()?;
            }
            warn!(
                file = file_name,
                ragged_rows = source.ragged_rows(),
                "Rows do not match the header width"
            );
            warnings.push(SchemaWarning::RaggedRows {
                count: source.ragged_rows(),
            });
        }

        let table_name = match options.table_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => sanitize_identifier(name),
            _ => table_name_from_file(file_name)?,
        };

        let mut schema = SchemaInferencer::infer(&table_name, &source);
        if let Some(primary_key) = &options.primary_key {
            warnings.extend(schema.set_primary_key(primary_key));
        }

        let emitter = self.emitter(options);
        let ddl = emitter.emit(&schema);
        let ddl_path = emitter.write(&schema, self.store.ddl_dir())?;

        Ok(PreparedDataset {
            source,
            schema,
            ddl,
            ddl_path,
            warnings,
        })
    }

    /// Store the uploaded bytes, then create and fill the table in one go.
    pub async fn upload(
        &self,
        file_name: &str,
        bytes: &[u8],
        options: &UploadOptions,
    ) -> Result<UploadReport> {
        TabularFormat::from_file_name(file_name)?;

        let stored = self.store.save_upload(file_name, bytes)?;
        let prepared = self.prepare(&stored.file_name, &stored.path, options)?;

        let mut conn = self.connector.connect().await?;
        let loaded = TableLoader::new(self.connector.dialect())
            .load(&mut conn, &prepared.schema, &prepared.ddl, &prepared.source)
            .await;
        close_connection(conn).await;
        let load = loaded?;

        info!(
            table = %load.table_name,
            rows = load.rows_inserted,
            warnings = prepared.warnings.len(),
            "Dataset uploaded"
        );

        Ok(UploadReport {
            table_name: load.table_name,
            ddl_path: prepared.ddl_path,
            stored_path: stored.path,
            sha256: stored.sha256,
            rows_inserted: load.rows_inserted,
            ragged_rows: prepared.source.ragged_rows(),
            schema: prepared.schema,
            warnings: prepared.warnings,
        })
    }

    pub fn preview(&self, file_name: &str, limit: usize) -> Result<DatasetPreview> {
        let path = self.store.find_upload(file_name)?;
        let source = read_path(&path)?;
        Ok(DatasetPreview {
            file_name: file_name.to_string(),
            header: source.header().to_vec(),
            rows: source.rows().iter().take(limit).cloned().collect(),
            total_rows: source.row_count(),
        })
    }

    /// Upload a file that already lives on disk.
    pub async fn upload_path(&self, path: &Path, options: &UploadOptions) -> Result<UploadReport> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let bytes = std::fs::read(path)
            .map_err(|e| AppError::InputError(format!("Cannot read {}: {}", path.display(), e)))?;
        info!(file = %file_name, sha256 = %sha256_hex(&bytes), "Uploading dataset from disk");
        self.upload(&file_name, &bytes, options).await
    }
}
