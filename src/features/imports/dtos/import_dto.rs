use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One external tabular row, keyed by normalized column name. Columns that
/// match no schema field are simply carried along and ignored by the
/// reconciler.
#[derive(Debug, Clone, Default)]
pub struct ImportRow {
    pub cells: HashMap<String, String>,
}

/// Result of reconciling one dataset. Row-level failures are collected here
/// rather than aborting the batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportOutcome {
    pub inserted: u64,
    pub updated: u64,
    /// Fully blank rows, silently ignored.
    pub skipped: u64,
    pub errors: Vec<ImportRowError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRowError {
    /// 1-based data row number (header not counted).
    pub row: usize,
    pub message: String,
}
