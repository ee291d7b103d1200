//! One unit's work inside an open session
//!
//! [`UnitCrawler`] drives the `SearchSetup -> Paginating -> Done` state
//! machine to collect document links, then downloads, cleans and saves each
//! document. It borrows everything from the orchestrator and owns nothing
//! but its settings.

use crate::crawler::context::CrawlContext;
use crate::crawler::pacing::{ActionKind, BlockSignal, Clock, Pacer, PacingPolicy, SkipScope};
use crate::crawler::portal::Portal;
use crate::driver::{BrowserDriver, WaitPolicy};
use crate::extract::Extractor;
use crate::state::{DedupIndex, DocumentRecord, DoneReason, LinkRecord, NextPage, UnitPhase};
use crate::storage::{ArtifactStore, SaveOutcome};
use crate::TrawlError;
use std::path::Path;

/// Timestamp format for fetch times in document headers
const FETCHED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Result of reading the page currently loaded in the session
enum PageRead {
    Content(String),
    /// Still blocked after a cooldown and a reload
    Blocked,
    Interrupted,
    Failed(String),
}

/// Result of fetching one document
enum DocumentFetch {
    Fetched(DocumentRecord),
    Failed(String),
    Interrupted,
}

pub struct UnitCrawler<'a, D, P, C> {
    pub driver: &'a D,
    pub portal: &'a Portal<'a, D>,
    pub pacer: &'a Pacer<P, C>,
    pub extractor: &'a Extractor,
    pub store: &'a ArtifactStore,
    pub max_pages: u32,
    pub page_size: u32,
    pub screenshot_dir: Option<&'a Path>,
}

impl<'a, D, P, C> UnitCrawler<'a, D, P, C>
where
    D: BrowserDriver,
    P: PacingPolicy,
    C: Clock,
{
    /// Searches the unit and pages through its results
    ///
    /// Every link is offered to `dedup`; only links it had not seen before
    /// are returned, in site order.
    pub async fn collect_links(
        &self,
        context: &mut CrawlContext<D::Session>,
        dedup: &mut DedupIndex,
    ) -> (Vec<LinkRecord>, DoneReason) {
        let mut links = Vec::new();
        let mut phase = UnitPhase::SearchSetup;

        loop {
            phase = match phase {
                UnitPhase::Done(reason) => return (links, reason),

                UnitPhase::SearchSetup => {
                    if !self.pacer.gate(&mut context.backoff).await {
                        UnitPhase::Done(DoneReason::Interrupted)
                    } else {
                        match self
                            .portal
                            .configure_search(&context.session, &context.unit, self.page_size, self.pacer)
                            .await
                        {
                            Ok(()) => UnitPhase::after_setup(true),
                            Err(TrawlError::Interrupted) => UnitPhase::Done(DoneReason::Interrupted),
                            Err(e) => {
                                tracing::warn!(unit = %context.unit, "Search setup failed: {}", e);
                                UnitPhase::after_setup(false)
                            }
                        }
                    }
                }

                UnitPhase::Paginating { page } => {
                    if !self.pacer.gate(&mut context.backoff).await
                        || !self.pacer.pause(ActionKind::Page).await
                    {
                        UnitPhase::Done(DoneReason::Interrupted)
                    } else {
                        self.paginate(context, dedup, &mut links, page).await
                    }
                }
            };
        }
    }

    async fn paginate(
        &self,
        context: &mut CrawlContext<D::Session>,
        dedup: &mut DedupIndex,
        links: &mut Vec<LinkRecord>,
        page: u32,
    ) -> UnitPhase {
        let content = match self.read_page(context).await {
            PageRead::Content(content) => content,
            PageRead::Blocked => return UnitPhase::Done(DoneReason::Blocked),
            PageRead::Interrupted => return UnitPhase::Done(DoneReason::Interrupted),
            PageRead::Failed(reason) => {
                tracing::warn!(unit = %context.unit, page, "Could not read result page: {}", reason);
                return UnitPhase::after_page(page, self.max_pages, NextPage::Unavailable);
            }
        };

        context.tally.pages_visited += 1;

        let batch = self.extractor.links(&content);
        let found = batch.len();
        let before = links.len();
        links.extend(batch.into_iter().filter(|link| dedup.insert(&link.url)));

        tracing::info!(
            unit = %context.unit,
            page,
            found,
            new = links.len() - before,
            total = links.len(),
            "Result page"
        );

        let next = if !UnitPhase::wants_next(page, self.max_pages) {
            NextPage::NotRequested
        } else if self.pacer.shutdown().is_triggered() {
            NextPage::Interrupted
        } else {
            match self.portal.next_page(&context.session, self.pacer).await {
                Ok(next) => next,
                Err(e) => {
                    tracing::warn!(unit = %context.unit, page, "Next page failed: {}", e);
                    NextPage::Unavailable
                }
            }
        };

        UnitPhase::after_page(page, self.max_pages, next)
    }

    /// Downloads every link into the unit's date folder
    ///
    /// Returns `false` if shutdown cut the downloads short.
    pub async fn download_documents(
        &self,
        context: &mut CrawlContext<D::Session>,
        links: &[LinkRecord],
    ) -> bool {
        let total = links.len();
        let date = context.unit.date;

        for (index, link) in links.iter().enumerate() {
            if !self.pacer.gate(&mut context.backoff).await {
                return false;
            }

            if self.pacer.should_skip(SkipScope::Document) {
                tracing::info!(url = %link.url, "Skipping document this run");
                context.tally.documents_skipped += 1;
                continue;
            }

            if self.store.title_exists(date, &link.title) {
                tracing::debug!(url = %link.url, "Document already on disk");
                context.tally.documents_saved += 1;
                continue;
            }

            if !self.pacer.pause(ActionKind::Document).await {
                return false;
            }

            match self.fetch_document(context, link).await {
                DocumentFetch::Fetched(record) => match self.store.save_document(date, &record) {
                    Ok(SaveOutcome::Written(path)) => {
                        context.tally.documents_saved += 1;
                        tracing::info!(
                            progress = %format!("{}/{}", index + 1, total),
                            path = %path.display(),
                            "Saved document"
                        );
                    }
                    Ok(SaveOutcome::AlreadyExists(path)) => {
                        context.tally.documents_saved += 1;
                        tracing::debug!(path = %path.display(), "Document file already exists");
                    }
                    Err(e) => {
                        context.tally.documents_failed += 1;
                        tracing::error!(url = %link.url, "Failed to save document: {}", e);
                    }
                },
                DocumentFetch::Failed(reason) => {
                    context.tally.documents_failed += 1;
                    tracing::warn!(url = %link.url, "Document failed: {}", reason);
                }
                DocumentFetch::Interrupted => return false,
            }
        }

        true
    }

    async fn fetch_document(
        &self,
        context: &mut CrawlContext<D::Session>,
        link: &LinkRecord,
    ) -> DocumentFetch {
        let navigation = match self
            .driver
            .navigate(&context.session, &link.url, WaitPolicy::NetworkIdle, self.portal.timeout())
            .await
        {
            Ok(navigation) => navigation,
            Err(e) => return DocumentFetch::Failed(e.to_string()),
        };

        if !navigation.is_ok() {
            return DocumentFetch::Failed(format!("HTTP {}", navigation.status));
        }

        let markup = match self.read_page(context).await {
            PageRead::Content(markup) => markup,
            PageRead::Blocked => return DocumentFetch::Failed("blocked".to_string()),
            PageRead::Interrupted => return DocumentFetch::Interrupted,
            PageRead::Failed(reason) => return DocumentFetch::Failed(reason),
        };

        let cleaned_text = match self.extractor.clean(&markup) {
            Ok(text) => text,
            Err(e) => return DocumentFetch::Failed(e.to_string()),
        };

        let metadata = self.extractor.metadata(&markup);

        let title = if link.title.is_empty() {
            self.driver.title(&context.session).await.unwrap_or_default()
        } else {
            link.title.clone()
        };

        DocumentFetch::Fetched(DocumentRecord {
            url: link.url.clone(),
            title,
            case_number: metadata.case_number,
            case_category: metadata.case_category,
            cleaned_text,
            fetched_at: self.pacer.now().format(FETCHED_AT_FORMAT).to_string(),
        })
    }

    /// Reads the loaded page, sitting out one cooldown if it is a block page
    async fn read_page(&self, context: &mut CrawlContext<D::Session>) -> PageRead {
        let content = match self.driver.content(&context.session).await {
            Ok(content) => content,
            Err(e) => return PageRead::Failed(e.to_string()),
        };

        let signal = match self.pacer.observe(&content) {
            Some(signal) => signal,
            None => return PageRead::Content(content),
        };

        if !self.handle_block(context, &signal).await {
            return PageRead::Interrupted;
        }

        let url = match self.driver.current_url(&context.session).await {
            Ok(url) => url,
            Err(e) => return PageRead::Failed(e.to_string()),
        };

        if let Err(e) = self
            .driver
            .navigate(&context.session, &url, WaitPolicy::NetworkIdle, self.portal.timeout())
            .await
        {
            return PageRead::Failed(e.to_string());
        }

        match self.driver.content(&context.session).await {
            Ok(content) if self.pacer.observe(&content).is_none() => PageRead::Content(content),
            Ok(_) => {
                tracing::warn!(unit = %context.unit, url = %url, "Still blocked after cooldown");
                context.backoff = self.pacer.enter_cooldown();
                PageRead::Blocked
            }
            Err(e) => PageRead::Failed(e.to_string()),
        }
    }

    /// Enters a cooldown and waits it out
    ///
    /// Returns `false` if shutdown was requested during the wait.
    async fn handle_block(&self, context: &mut CrawlContext<D::Session>, signal: &BlockSignal) -> bool {
        tracing::warn!(unit = %context.unit, phrase = %signal.phrase, "Block signal detected");

        if let Some(dir) = self.screenshot_dir {
            self.capture_screenshot(context, dir).await;
        }

        context.backoff = self.pacer.enter_cooldown();
        self.pacer.gate(&mut context.backoff).await
    }

    async fn capture_screenshot(&self, context: &CrawlContext<D::Session>, dir: &Path) {
        if let Err(e) = std::fs::create_dir_all(dir) {
            tracing::debug!("Cannot create screenshot directory: {}", e);
            return;
        }

        let name = format!(
            "blocked_{}_{}.png",
            context.unit.key(),
            self.pacer.now().format("%Y%m%d_%H%M%S")
        );
        let path = dir.join(name);

        match self.driver.screenshot(&context.session, &path).await {
            Ok(()) => tracing::info!(path = %path.display(), "Saved block screenshot"),
            Err(e) => tracing::debug!("Screenshot failed: {}", e),
        }
    }
}
