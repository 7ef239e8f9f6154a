use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Tabular result of an executed statement, rows keyed by column name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<HashMap<String, serde_json::Value>>,
    pub row_count: usize,
}

impl QueryResult {
    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }
}
