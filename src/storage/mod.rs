//! Storage module for persisting crawl results
//!
//! Two stores live here:
//! - the on-disk artifacts (link-list files and per-date document folders)
//!   that double as resume markers
//! - the SQLite run ledger journaling runs and per-unit outcomes

mod files;
mod schema;
mod sqlite;
mod traits;

pub use files::{
    document_filename, parse_link_list, render_document, render_link_list, sanitize_filename,
    title_filename, ArtifactStore, SaveOutcome, UNKNOWN_CASE_CATEGORY, UNKNOWN_CASE_NUMBER,
};
pub use sqlite::SqliteLedger;
pub use traits::{Ledger, StorageError, StorageResult};

use crate::state::{CrawlUnit, UnitStatus, UnitTally};
use crate::TrawlError;
use chrono::{NaiveDate, Utc};
use std::path::Path;

/// Opens or creates the run ledger
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
pub fn open_ledger(path: &Path) -> Result<SqliteLedger, TrawlError> {
    SqliteLedger::new(path)
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            _ => None,
        }
    }
}

/// A unit's outcome as journaled in the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitRecord {
    pub date: NaiveDate,
    pub region: String,
    pub case_category: Option<String>,
    pub status: UnitStatus,
    pub tally: UnitTally,
    pub updated_at: String,
}

impl UnitRecord {
    pub fn new(unit: &CrawlUnit, status: UnitStatus, tally: UnitTally) -> Self {
        Self {
            date: unit.date,
            region: unit.region.clone(),
            case_category: unit.case_category.clone(),
            status,
            tally,
            updated_at: Utc::now().to_rfc3339(),
        }
    }
}

/// Document counters summed across unit records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DocumentTotals {
    pub links_found: u64,
    pub saved: u64,
    pub failed: u64,
    pub skipped: u64,
}
