use serde::Serialize;
use std::fmt;

/// Progress of a single table load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "rows", rename_all = "snake_case")]
pub enum LoadState {
    Unloaded,
    SchemaInferred,
    TableCreated,
    RowsInserted(u64),
    Committed,
    Aborted,
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadState::Unloaded => write!(f, "unloaded"),
            LoadState::SchemaInferred => write!(f, "schema_inferred"),
            LoadState::TableCreated => write!(f, "table_created"),
            LoadState::RowsInserted(n) => write!(f, "rows_inserted({})", n),
            LoadState::Committed => write!(f, "committed"),
            LoadState::Aborted => write!(f, "aborted"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub table_name: String,
    pub rows_inserted: u64,
    pub state: LoadState,
}
