//! Site-specific actions on the judgment portal
//!
//! Each action is a short composition of [`BrowserDriver`] primitives driven
//! by the configured selectors: loading the landing page with the identity
//! cookies in place, filling in the advanced search for one unit, and
//! stepping to the next result page.

use crate::config::{SelectorConfig, SiteConfig};
use crate::crawler::pacing::{ActionKind, Clock, Pacer, PacingPolicy};
use crate::driver::{BrowserDriver, Cookie, WaitPolicy};
use crate::state::{CrawlUnit, NextPage};
use crate::{DriverResult, TrawlError};
use std::time::Duration;

pub struct Portal<'a, D> {
    driver: &'a D,
    site: &'a SiteConfig,
}

impl<'a, D: BrowserDriver> Portal<'a, D> {
    pub fn new(driver: &'a D, site: &'a SiteConfig) -> Self {
        Self { driver, site }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.site.navigation_timeout_secs)
    }

    fn selectors(&self) -> &SelectorConfig {
        &self.site.selectors
    }

    /// Loads the landing page and makes sure the identity cookies are set
    ///
    /// The page is loaded once to establish the origin, any identity cookies
    /// the browser does not hold yet are added, and the page is reloaded so
    /// the portal sees the session.
    ///
    /// # Returns
    ///
    /// The landing page content after the reload
    pub async fn land(&self, session: &D::Session, cookies: &[Cookie]) -> DriverResult<String> {
        let base_url = self.site.base_url.as_str();

        let first = self
            .driver
            .navigate(session, base_url, WaitPolicy::DomContentLoaded, self.timeout())
            .await?;
        tracing::debug!(status = first.status, final_url = %first.final_url, "Landing page reached");

        if !cookies.is_empty() {
            let present = self.driver.cookies(session).await.unwrap_or_default();
            let missing: Vec<Cookie> = cookies
                .iter()
                .filter(|cookie| !present.iter().any(|p| p.name == cookie.name))
                .cloned()
                .collect();

            if !missing.is_empty() {
                tracing::debug!(count = missing.len(), "Installing identity cookies");
                self.driver.add_cookies(session, &missing).await?;
            }
        }

        self.driver
            .navigate(session, base_url, WaitPolicy::NetworkIdle, self.timeout())
            .await?;

        let content = self.driver.content(session).await?;

        if !self.site.landing_marker.is_empty() && !content.contains(&self.site.landing_marker) {
            let title = self.driver.title(session).await.unwrap_or_default();
            tracing::warn!(title = %title, "Landing page does not look like the portal");
        }

        let login_indicator = &self.selectors().login_indicator;
        if !login_indicator.is_empty()
            && self.driver.query_one(session, login_indicator).await?.is_some()
        {
            tracing::warn!("Login prompt is visible; the identity token may have expired");
        }

        Ok(content)
    }

    /// Runs the advanced search for one unit
    ///
    /// Opening the form, entering the date range and pressing search must all
    /// succeed. Region, case category and page size are best effort: a
    /// failure there is logged and the search continues.
    ///
    /// # Errors
    ///
    /// * `TrawlError::SearchSetup` - A required step failed
    /// * `TrawlError::Interrupted` - Shutdown was requested between steps
    pub async fn configure_search<P: PacingPolicy, C: Clock>(
        &self,
        session: &D::Session,
        unit: &CrawlUnit,
        page_size: u32,
        pacer: &Pacer<P, C>,
    ) -> Result<(), TrawlError> {
        let selectors = self.selectors();
        let date = unit.date_string();

        self.click_required(session, &selectors.advanced_search, "advanced search")
            .await?;
        pace(pacer, ActionKind::Passive).await?;

        self.fill_required(session, &selectors.date_start, &date, "start date")
            .await?;
        pace(pacer, ActionKind::Passive).await?;

        self.fill_required(session, &selectors.date_end, &date, "end date")
            .await?;
        pace(pacer, ActionKind::Passive).await?;

        self.click_required(session, &selectors.search_button, "search button")
            .await?;
        self.settle(session).await;
        pace(pacer, ActionKind::Passive).await?;

        match self
            .pick_option(session, &selectors.region_options, &unit.region)
            .await
        {
            Ok(true) => pace(pacer, ActionKind::Passive).await?,
            Ok(false) => tracing::warn!(region = %unit.region, "Region option not found"),
            Err(e) => tracing::warn!(region = %unit.region, "Region selection failed: {}", e),
        }

        if let Some(category) = &unit.case_category {
            match self
                .pick_option(session, &selectors.category_options, category)
                .await
            {
                Ok(true) => pace(pacer, ActionKind::Passive).await?,
                Ok(false) => tracing::warn!(category = %category, "Case category option not found"),
                Err(e) => tracing::warn!(category = %category, "Case category selection failed: {}", e),
            }
        }

        match self.set_page_size(session, page_size).await {
            Ok(true) => pace(pacer, ActionKind::Passive).await?,
            Ok(false) => tracing::warn!("Page size control not found"),
            Err(e) => tracing::warn!("Setting page size failed: {}", e),
        }

        Ok(())
    }

    /// Clicks the "next page" control if it is present and enabled
    pub async fn next_page<P: PacingPolicy, C: Clock>(
        &self,
        session: &D::Session,
        pacer: &Pacer<P, C>,
    ) -> DriverResult<NextPage> {
        let selectors = self.selectors();
        let buttons = self.driver.query_all(session, &selectors.next_page).await?;

        for button in &buttons {
            let text = self.driver.text(button).await?;
            if !text.contains(&selectors.next_page_text) {
                continue;
            }

            let class = self
                .driver
                .attribute(button, "class")
                .await?
                .unwrap_or_default();
            if class.contains("disabled") {
                return Ok(NextPage::Unavailable);
            }

            self.driver.scroll_into_view(button).await?;
            if !pacer.pause(ActionKind::Passive).await {
                return Ok(NextPage::Interrupted);
            }
            self.driver.click(button).await?;
            self.settle(session).await;
            return Ok(NextPage::Advanced);
        }

        Ok(NextPage::Unavailable)
    }

    /// Waits for the result list to finish reloading; a slow page is read as is
    async fn settle(&self, session: &D::Session) {
        if let Err(e) = self.driver.wait_for_idle(session, self.timeout()).await {
            tracing::warn!("Result list did not settle: {}", e);
        }
    }

    async fn click_required(&self, session: &D::Session, selector: &str, step: &str) -> Result<(), TrawlError> {
        let element = self
            .driver
            .query_one(session, selector)
            .await
            .map_err(|e| setup_error(step, e))?
            .ok_or_else(|| TrawlError::SearchSetup(format!("{} not found ({})", step, selector)))?;

        self.driver
            .click(&element)
            .await
            .map_err(|e| setup_error(step, e))
    }

    async fn fill_required(
        &self,
        session: &D::Session,
        selector: &str,
        text: &str,
        step: &str,
    ) -> Result<(), TrawlError> {
        let element = self
            .driver
            .query_one(session, selector)
            .await
            .map_err(|e| setup_error(step, e))?
            .ok_or_else(|| TrawlError::SearchSetup(format!("{} not found ({})", step, selector)))?;

        self.driver
            .fill(&element, text)
            .await
            .map_err(|e| setup_error(step, e))
    }

    /// Clicks the first option whose trimmed text equals `wanted`
    async fn pick_option(&self, session: &D::Session, selector: &str, wanted: &str) -> DriverResult<bool> {
        for option in self.driver.query_all(session, selector).await? {
            if self.driver.text(&option).await?.trim() == wanted {
                self.driver.scroll_into_view(&option).await?;
                self.driver.click(&option).await?;
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn set_page_size(&self, session: &D::Session, page_size: u32) -> DriverResult<bool> {
        match self.driver.query_one(session, &self.selectors().page_size).await? {
            Some(select) => {
                self.driver
                    .select_option(&select, &page_size.to_string())
                    .await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

async fn pace<P: PacingPolicy, C: Clock>(pacer: &Pacer<P, C>, kind: ActionKind) -> Result<(), TrawlError> {
    if pacer.pause(kind).await {
        Ok(())
    } else {
        Err(TrawlError::Interrupted)
    }
}

fn setup_error(step: &str, e: impl std::fmt::Display) -> TrawlError {
    TrawlError::SearchSetup(format!("{}: {}", step, e))
}
