//! Output module for generating run summaries and reports
//!
//! This module handles:
//! - Assembling a summary of the latest run from the ledger
//! - Generating markdown summaries
//! - Loading and printing ledger statistics

mod markdown;
pub mod stats;
mod summary;

pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use stats::{load_statistics, print_statistics, CrawlStatistics};
pub use summary::{CrawlSummary, OutputError, OutputResult};

use crate::storage::Ledger;
use crate::TrawlError;

/// Generates a summary of the latest run from the ledger
///
/// # Arguments
///
/// * `ledger` - The run ledger
///
/// # Returns
///
/// * `Ok(CrawlSummary)` - Successfully generated summary
/// * `Err(TrawlError)` - No runs are recorded, or the ledger query failed
pub fn generate_summary(ledger: &dyn Ledger) -> Result<CrawlSummary, TrawlError> {
    let run = ledger
        .get_latest_run()?
        .ok_or_else(|| OutputError::Storage("No crawl runs found in database".to_string()))?;

    // Calculate duration if finished
    let duration_seconds = if let (Ok(started), Some(finished_str)) = (
        run.started_at.parse::<chrono::DateTime<chrono::Utc>>(),
        &run.finished_at,
    ) {
        finished_str
            .parse::<chrono::DateTime<chrono::Utc>>()
            .ok()
            .and_then(|finished| u64::try_from((finished - started).num_seconds()).ok())
    } else {
        None
    };

    let mut summary = CrawlSummary::from_units(ledger.units_for_run(run.id)?);
    summary.run_id = run.id;
    summary.started_at = run.started_at;
    summary.finished_at = run.finished_at;
    summary.duration_seconds = duration_seconds;
    summary.status = run.status.to_db_string().to_string();
    summary.config_hash = run.config_hash;

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{CrawlUnit, UnitStatus, UnitTally};
    use crate::storage::{RunStatus, SqliteLedger, UnitRecord};
    use chrono::NaiveDate;

    #[test]
    fn test_generate_summary_without_runs() {
        let ledger = SqliteLedger::new_in_memory().unwrap();
        assert!(generate_summary(&ledger).is_err());
    }

    #[test]
    fn test_generate_summary_latest_run() {
        let mut ledger = SqliteLedger::new_in_memory().unwrap();
        let old_run = ledger.create_run("old").unwrap();
        ledger.finish_run(old_run, RunStatus::Interrupted).unwrap();

        let run_id = ledger.create_run("new").unwrap();
        let unit = CrawlUnit::new(NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(), "浙江省", None);
        let tally = UnitTally {
            links_found: 5,
            documents_saved: 5,
            ..UnitTally::default()
        };
        ledger
            .record_unit(run_id, &UnitRecord::new(&unit, UnitStatus::Completed, tally))
            .unwrap();
        ledger.finish_run(run_id, RunStatus::Completed).unwrap();

        let summary = generate_summary(&ledger).unwrap();
        assert_eq!(summary.run_id, run_id);
        assert_eq!(summary.status, "completed");
        assert_eq!(summary.config_hash, "new");
        assert_eq!(summary.documents_saved, 5);
        assert_eq!(summary.units.len(), 1);
        assert!(summary.duration_seconds.is_some());
    }
}
