use chrono::{DateTime, Utc};
use serde::Serialize;

/// Summary of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub dry_run: bool,
    pub seed: u64,
    pub tables: Vec<TableReport>,
    pub statements: Vec<StatementReport>,
    pub duration_ms: u64,
}

impl RunReport {
    pub fn new(dry_run: bool, seed: u64) -> Self {
        Self {
            started_at: Utc::now(),
            dry_run,
            seed,
            tables: Vec::new(),
            statements: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn rows_masked(&self) -> u64 {
        self.tables.iter().map(|table| table.masked_rows).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableReport {
    pub table: String,
    /// Rows counted before streaming.
    pub expected_rows: u64,
    pub masked_rows: u64,
    /// Rows the store reported as updated; zero in dry-run mode.
    pub written_rows: u64,
    pub batches: u64,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatementReport {
    pub name: String,
    /// `None` when the statement was skipped by a dry run.
    pub rows_affected: Option<u64>,
    pub duration_ms: u64,
}
