//! Storage traits and error types

use crate::state::UnitStatus;
use crate::storage::{DocumentTotals, RunRecord, RunStatus, UnitRecord};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Journal of runs and per-unit outcomes
///
/// The ledger is informational. Resume decisions are made from the on-disk
/// artifacts alone, so a missing or stale ledger never changes what gets
/// crawled.
pub trait Ledger {
    // ===== Run Management =====

    /// Creates a new run in the `running` state
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Sets the final status and finish timestamp of a run
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    // ===== Unit Outcomes =====

    /// Records a unit outcome, replacing any earlier record for the same
    /// run, date and region
    fn record_unit(&mut self, run_id: i64, record: &UnitRecord) -> StorageResult<()>;

    /// Units recorded by one run, in crawl order
    fn units_for_run(&self, run_id: i64) -> StorageResult<Vec<UnitRecord>>;

    /// Most recently updated unit records across all runs
    fn recent_units(&self, limit: usize) -> StorageResult<Vec<UnitRecord>>;

    // ===== Statistics =====

    /// Counts units whose latest recorded outcome is `status`
    fn count_units_by_status(&self, status: UnitStatus) -> StorageResult<u64>;

    /// Document counters summed over every recorded unit
    fn document_totals(&self) -> StorageResult<DocumentTotals>;
}
