//! Statistics generation from the run ledger
//!
//! This module provides functionality for extracting and displaying
//! crawl statistics from the ledger.

use crate::state::UnitStatus;
use crate::storage::{DocumentTotals, Ledger, RunRecord, UnitRecord};
use crate::TrawlError;
use std::collections::HashMap;

/// How many recent unit outcomes `load_statistics` includes
const RECENT_UNITS: usize = 10;

/// Crawl statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// Units by their latest recorded status, across all runs
    pub units_by_status: HashMap<UnitStatus, u64>,

    /// Total number of distinct units recorded
    pub total_units: u64,

    /// Document counters summed over every recorded unit
    pub documents: DocumentTotals,

    /// The most recent run, if any
    pub latest_run: Option<RunRecord>,

    /// Most recently updated unit outcomes
    pub recent_units: Vec<UnitRecord>,
}

/// Loads statistics from the ledger
///
/// # Arguments
///
/// * `ledger` - The run ledger to query
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(TrawlError)` - Failed to query statistics
pub fn load_statistics(ledger: &dyn Ledger) -> Result<CrawlStatistics, TrawlError> {
    let mut units_by_status = HashMap::new();
    for status in UnitStatus::all_states() {
        let count = ledger.count_units_by_status(status)?;
        if count > 0 {
            units_by_status.insert(status, count);
        }
    }

    let total_units = units_by_status.values().sum();

    Ok(CrawlStatistics {
        units_by_status,
        total_units,
        documents: ledger.document_totals()?,
        latest_run: ledger.get_latest_run()?,
        recent_units: ledger.recent_units(RECENT_UNITS)?,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    if let Some(run) = &stats.latest_run {
        println!("Latest run:");
        println!("  ID: {}", run.id);
        println!("  Started: {}", run.started_at);
        if let Some(finished) = &run.finished_at {
            println!("  Finished: {}", finished);
        }
        println!("  Status: {}", run.status.to_db_string());
        println!();
    }

    println!("Overview:");
    println!("  Units recorded: {}", stats.total_units);
    println!("  Links collected: {}", stats.documents.links_found);
    println!("  Documents saved: {}", stats.documents.saved);
    println!("  Documents failed: {}", stats.documents.failed);
    println!("  Documents skipped: {}", stats.documents.skipped);
    println!();

    println!("Units by Status:");
    // Sort states by count (descending)
    let mut status_counts: Vec<_> = stats.units_by_status.iter().collect();
    status_counts.sort_by(|a, b| b.1.cmp(a.1));

    for (status, count) in status_counts {
        let percentage = if stats.total_units > 0 {
            (*count as f64 / stats.total_units as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", status, count, percentage);
    }
    println!();

    if !stats.recent_units.is_empty() {
        println!("Recent Units:");
        for unit in &stats.recent_units {
            println!(
                "  {} {} - {} ({} saved, {} failed)",
                unit.date, unit.region, unit.status, unit.tally.documents_saved, unit.tally.documents_failed
            );
        }
        println!();
    }
}
