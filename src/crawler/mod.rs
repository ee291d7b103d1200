//! Crawler module for driving the portal
//!
//! This module contains the core crawling logic, including:
//! - Pacing, curfew, cooldown and the shutdown signal
//! - Client identity rotation
//! - Portal actions composed from browser-driver primitives
//! - The per-unit search, pagination and download stages
//! - Overall crawl coordination

mod context;
mod coordinator;
mod identity;
mod pacing;
mod portal;
mod shutdown;
mod unit;

pub use context::{close_session, open_session, CrawlContext};
pub use coordinator::{plan_units, run_crawl, Coordinator, RunSummary};
pub use identity::IdentityRotator;
pub use pacing::{
    ActionKind, BlockSignal, Clock, FixedClock, NoDelay, Pacer, PacingPolicy, RandomPacing,
    SkipScope, SystemClock,
};
pub use portal::Portal;
pub use shutdown::Shutdown;
pub use unit::UnitCrawler;
