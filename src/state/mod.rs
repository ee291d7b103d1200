//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlUnit` / `UnitKey`: one date within one region, and its resume key
//! - `UnitPhase`: the per-unit search/paginate/done state machine
//! - `UnitStatus`: the outcome journaled for a unit
//! - `DedupIndex`: document URLs already collected
//! - `BackoffState`: active, night-paused or cooling down

mod backoff;
mod dedup;
mod phase;
mod unit;
mod unit_status;

// Re-export main types
pub use backoff::{curfew_remaining, BackoffMode, BackoffState};
pub use dedup::DedupIndex;
pub use phase::{DoneReason, NextPage, UnitPhase};
pub use unit::{enumerate_units, CrawlUnit, DocumentRecord, LinkRecord, UnitKey, UnitTally};
pub use unit_status::UnitStatus;
