//! Run summary types
//!
//! This module defines the data a run report is built from and the error
//! type for writing reports.

use crate::state::UnitStatus;
use crate::storage::UnitRecord;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Summary of one crawl run, assembled from the ledger
#[derive(Debug, Clone, Default)]
pub struct CrawlSummary {
    /// Run ID
    pub run_id: i64,

    /// Start time (RFC 3339)
    pub started_at: String,

    /// Finish time (RFC 3339), if the run ended cleanly or was interrupted
    pub finished_at: Option<String>,

    /// Duration in seconds, if finished
    pub duration_seconds: Option<u64>,

    /// Final run status
    pub status: String,

    /// Configuration hash
    pub config_hash: String,

    /// Units recorded by the run, per status, in `UnitStatus::all_states` order
    pub units_by_status: Vec<(UnitStatus, u64)>,

    pub pages_visited: u64,
    pub links_found: u64,
    pub documents_saved: u64,
    pub documents_failed: u64,
    pub documents_skipped: u64,

    /// Every unit the run recorded, in crawl order
    pub units: Vec<UnitRecord>,
}

impl CrawlSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the per-status counts and document totals from unit records
    pub fn from_units(units: Vec<UnitRecord>) -> Self {
        let mut summary = Self::new();

        for status in UnitStatus::all_states() {
            let count = units.iter().filter(|unit| unit.status == status).count() as u64;
            if count > 0 {
                summary.units_by_status.push((status, count));
            }
        }

        for unit in &units {
            summary.pages_visited += u64::from(unit.tally.pages_visited);
            summary.links_found += u64::from(unit.tally.links_found);
            summary.documents_saved += u64::from(unit.tally.documents_saved);
            summary.documents_failed += u64::from(unit.tally.documents_failed);
            summary.documents_skipped += u64::from(unit.tally.documents_skipped);
        }

        summary.units = units;
        summary
    }

    pub fn total_units(&self) -> u64 {
        self.units_by_status.iter().map(|(_, count)| count).sum()
    }

    /// Percentage of attempted documents that were saved
    pub fn success_rate(&self) -> f64 {
        let attempted = self.documents_saved + self.documents_failed;
        if attempted == 0 {
            return 0.0;
        }
        (self.documents_saved as f64 / attempted as f64) * 100.0
    }
}
