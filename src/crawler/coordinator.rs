//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the main crawl loop that coordinates all aspects of
//! the crawling process, including:
//! - Enumerating units and skipping the ones already on disk
//! - Seeding the dedup index from completed units
//! - Rotating the client identity between units
//! - Opening one browser session per unit and always closing it
//! - Journaling unit outcomes in the run ledger
//! - Handling interrupts

use crate::config::{load_identity_token, Config};
use crate::crawler::context::{close_session, open_session};
use crate::crawler::identity::IdentityRotator;
use crate::crawler::pacing::{
    ActionKind, Clock, Pacer, PacingPolicy, RandomPacing, SkipScope, SystemClock,
};
use crate::crawler::portal::Portal;
use crate::crawler::unit::UnitCrawler;
use crate::crawler::Shutdown;
use crate::driver::{parse_cookie_header, BrowserDriver, Cookie};
use crate::extract::Extractor;
use crate::state::{
    enumerate_units, BackoffState, CrawlUnit, DedupIndex, DoneReason, UnitStatus, UnitTally,
};
use crate::storage::{open_ledger, ArtifactStore, Ledger, RunStatus, SqliteLedger, UnitRecord};
use crate::TrawlError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// What a run did, unit by unit
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Ledger run ID, if the ledger was available
    pub run_id: Option<i64>,
    pub units_total: usize,
    pub units_by_status: HashMap<UnitStatus, usize>,
    pub documents: UnitTally,
    pub interrupted: bool,
}

impl RunSummary {
    pub fn count(&self, status: UnitStatus) -> usize {
        self.units_by_status.get(&status).copied().unwrap_or(0)
    }

    fn add(&mut self, status: UnitStatus, tally: &UnitTally) {
        *self.units_by_status.entry(status).or_insert(0) += 1;
        self.documents.pages_visited += tally.pages_visited;
        self.documents.links_found += tally.links_found;
        self.documents.documents_saved += tally.documents_saved;
        self.documents.documents_failed += tally.documents_failed;
        self.documents.documents_skipped += tally.documents_skipped;
    }
}

/// Main crawler coordinator structure
pub struct Coordinator<D: BrowserDriver, P: PacingPolicy, C: Clock> {
    config: Arc<Config>,
    config_hash: String,
    driver: D,
    pacer: Pacer<P, C>,
    store: ArtifactStore,
    ledger: Option<SqliteLedger>,
    dedup: DedupIndex,
    identity: IdentityRotator,
    extractor: Extractor,
    cookies: Vec<Cookie>,
    backoff: BackoffState,
    sessions_opened: usize,
    run_id: Option<i64>,
}

impl<D: BrowserDriver, P: PacingPolicy, C: Clock> Coordinator<D, P, C> {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration
    /// * `config_hash` - Hash of the configuration file, journaled with the run
    /// * `driver` - Browser backend
    /// * `policy` - Delay and skip policy
    /// * `clock` - Local wall clock
    /// * `shutdown` - Stop signal shared with the Ctrl-C handler
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(TrawlError)` - The selectors or identity token are unusable, or
    ///   the output directories cannot be created
    pub fn new(
        config: Config,
        config_hash: String,
        driver: D,
        policy: P,
        clock: C,
        shutdown: Shutdown,
    ) -> Result<Self, TrawlError> {
        let extractor = Extractor::from_site(&config.site)?;

        let store = ArtifactStore::new(
            &config.output.url_dir,
            &config.output.doc_dir,
            config.output.filename_max_len,
        );
        store.init()?;

        let cookies = match load_identity_token(&config.identity)? {
            Some(header) => parse_cookie_header(&header, &config.site.cookie_domain),
            None => {
                tracing::warn!("No identity token configured; the portal may refuse searches");
                Vec::new()
            }
        };
        tracing::info!("Loaded {} identity cookies", cookies.len());

        let ledger = match open_ledger(Path::new(&config.output.database_path)) {
            Ok(ledger) => Some(ledger),
            Err(e) => {
                tracing::warn!("Run ledger unavailable, continuing without it: {}", e);
                None
            }
        };

        let pacer = Pacer::new(
            policy,
            clock,
            shutdown,
            &config.pacing,
            config.site.block_phrases.clone(),
        );

        Ok(Self {
            identity: IdentityRotator::new(&config.identity),
            config: Arc::new(config),
            config_hash,
            driver,
            pacer,
            store,
            ledger,
            dedup: DedupIndex::new(),
            extractor,
            cookies,
            backoff: BackoffState::active(),
            sessions_opened: 0,
            run_id: None,
        })
    }

    /// Units this run covers, in crawl order
    pub fn units(&self) -> Vec<CrawlUnit> {
        let today = self.pacer.now().date();
        let (start, end) = self.config.crawl.date_range(today);
        enumerate_units(
            start,
            end,
            &self.config.crawl.regions,
            self.config.crawl.case_category.as_deref(),
        )
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Runs the main crawl loop
    ///
    /// This is the core crawling logic that:
    /// 1. Enumerates units and seeds the dedup index from completed ones
    /// 2. Opens a run in the ledger
    /// 3. Processes each unit in order until done or interrupted
    /// 4. Journals every unit outcome and the final run status
    pub async fn run(&mut self) -> Result<RunSummary, TrawlError> {
        let units = self.units();
        let seeded = self.dedup.seed(self.store.completed_urls(&units));

        tracing::info!(
            units = units.len(),
            seeded_urls = seeded,
            "Starting crawl of {} regions",
            self.config.crawl.regions.len()
        );

        self.run_id = self.ledger.as_mut().and_then(|ledger| {
            ledger
                .create_run(&self.config_hash)
                .map_err(|e| tracing::warn!("Could not journal run start: {}", e))
                .ok()
        });

        let mut summary = RunSummary {
            run_id: self.run_id,
            units_total: units.len(),
            ..RunSummary::default()
        };

        let start_time = std::time::Instant::now();

        for (index, unit) in units.iter().enumerate() {
            if self.pacer.shutdown().is_triggered() {
                summary.interrupted = true;
                break;
            }

            let (status, tally) = self.process_unit(unit).await;

            tracing::info!(
                progress = %format!("{}/{}", index + 1, units.len()),
                unit = %unit,
                status = %status,
                links = tally.links_found,
                saved = tally.documents_saved,
                failed = tally.documents_failed,
                "Unit finished"
            );

            self.journal_unit(unit, status, tally);
            summary.add(status, &tally);

            if status == UnitStatus::Interrupted {
                summary.interrupted = true;
                break;
            }
        }

        let run_status = if summary.interrupted {
            RunStatus::Interrupted
        } else {
            RunStatus::Completed
        };

        if let (Some(ledger), Some(run_id)) = (self.ledger.as_mut(), self.run_id) {
            if let Err(e) = ledger.finish_run(run_id, run_status) {
                tracing::warn!("Could not journal run end: {}", e);
            }
        }

        tracing::info!(
            "Crawl {}: {} units in {:?}, {} documents saved",
            run_status.to_db_string(),
            summary.units_total,
            start_time.elapsed(),
            summary.documents.documents_saved
        );

        Ok(summary)
    }

    /// Processes a single unit
    ///
    /// Completed units are recognised from disk before anything else happens,
    /// so resuming over finished work costs no browser calls and no delays.
    async fn process_unit(&mut self, unit: &CrawlUnit) -> (UnitStatus, UnitTally) {
        if self.store.is_unit_complete(unit) {
            tracing::debug!(unit = %unit, "Already on disk");
            return (UnitStatus::AlreadyDone, UnitTally::default());
        }

        if self.pacer.should_skip(SkipScope::Unit) {
            tracing::info!(unit = %unit, "Skipping unit this run");
            return (UnitStatus::Skipped, UnitTally::default());
        }

        if !self.pacer.gate(&mut self.backoff).await {
            return (UnitStatus::Interrupted, UnitTally::default());
        }

        if self.sessions_opened > 0 && !self.pacer.pause(ActionKind::Unit).await {
            return (UnitStatus::Interrupted, UnitTally::default());
        }

        let profile = self.identity.maybe_rotate(self.pacer.now());
        let portal = Portal::new(&self.driver, &self.config.site);

        self.sessions_opened += 1;
        let mut context = match open_session(
            &portal,
            &self.driver,
            &self.pacer,
            unit.clone(),
            profile,
            &self.cookies,
            self.backoff,
        )
        .await
        {
            Ok(context) => context,
            Err(e) => {
                tracing::error!(unit = %unit, "Error opening session: {}", e);
                return (UnitStatus::Abandoned, UnitTally::default());
            }
        };

        let crawler = UnitCrawler {
            driver: &self.driver,
            portal: &portal,
            pacer: &self.pacer,
            extractor: &self.extractor,
            store: &self.store,
            max_pages: self.config.crawl.max_pages,
            page_size: self.config.crawl.page_size,
            screenshot_dir: self.config.browser.screenshot_dir.as_deref().map(Path::new),
        };

        let (links, reason) = crawler.collect_links(&mut context, &mut self.dedup).await;
        context.tally.links_found = links.len() as u32;

        let status = match reason {
            DoneReason::Interrupted => UnitStatus::Interrupted,
            DoneReason::SearchFailed => UnitStatus::SearchFailed,
            DoneReason::Blocked => UnitStatus::Abandoned,
            DoneReason::AlreadyComplete => UnitStatus::AlreadyDone,
            DoneReason::PageLimit | DoneReason::LastPage if links.is_empty() => UnitStatus::Empty,
            DoneReason::PageLimit | DoneReason::LastPage => {
                if let Err(e) = self.store.ensure_date_folder(unit.date) {
                    tracing::error!(unit = %unit, "Cannot create document folder: {}", e);
                }

                if !crawler.download_documents(&mut context, &links).await {
                    UnitStatus::Interrupted
                } else {
                    match self.store.write_link_list(unit, &links) {
                        Ok(path) => {
                            tracing::debug!(path = %path.display(), "Wrote link list");
                            UnitStatus::Completed
                        }
                        Err(e) => {
                            tracing::error!(unit = %unit, "Failed to write link list: {}", e);
                            UnitStatus::Abandoned
                        }
                    }
                }
            }
        };

        let (backoff, tally) = close_session(&self.driver, context).await;
        self.backoff = backoff;

        (status, tally)
    }

    fn journal_unit(&mut self, unit: &CrawlUnit, status: UnitStatus, tally: UnitTally) {
        if let (Some(ledger), Some(run_id)) = (self.ledger.as_mut(), self.run_id) {
            if let Err(e) = ledger.record_unit(run_id, &UnitRecord::new(unit, status, tally)) {
                tracing::warn!(unit = %unit, "Could not journal unit: {}", e);
            }
        }
    }
}

/// Builds a production coordinator and runs it
///
/// Uses randomized pacing and the local system clock.
///
/// # Arguments
///
/// * `config` - The validated configuration
/// * `config_hash` - Hash of the configuration file
/// * `driver` - Browser backend
/// * `shutdown` - Stop signal shared with the Ctrl-C handler
pub async fn run_crawl<D: BrowserDriver>(
    config: Config,
    config_hash: String,
    driver: D,
    shutdown: Shutdown,
) -> Result<RunSummary, TrawlError> {
    let policy = RandomPacing::new(config.pacing.clone());
    let mut coordinator = Coordinator::new(config, config_hash, driver, policy, SystemClock, shutdown)?;
    coordinator.run().await
}

/// Resume status of every unit, without touching the network
///
/// Used by `--dry-run`.
pub fn plan_units(config: &Config, today: chrono::NaiveDate) -> Vec<(CrawlUnit, bool)> {
    let store = ArtifactStore::new(
        PathBuf::from(&config.output.url_dir),
        PathBuf::from(&config.output.doc_dir),
        config.output.filename_max_len,
    );
    let (start, end) = config.crawl.date_range(today);

    enumerate_units(
        start,
        end,
        &config.crawl.regions,
        config.crawl.case_category.as_deref(),
    )
    .into_iter()
    .map(|unit| {
        let complete = store.is_unit_complete(&unit);
        (unit, complete)
    })
    .collect()
}
