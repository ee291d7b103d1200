//! Browser driver abstraction
//!
//! The crawler never talks to a browser directly. Everything it needs (navigate,
//! query, click, fill, read content, manage cookies) goes through the
//! [`BrowserDriver`] trait, so the production Chromium backend and the scripted
//! portal used in tests are interchangeable.

#[cfg(feature = "browser")]
mod chromium;
mod cookies;

#[cfg(feature = "browser")]
pub use chromium::ChromiumDriver;
pub use cookies::{parse_cookie_header, Cookie};

use crate::DriverResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Browser window dimensions in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// The simulated client identity applied to a browser session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintProfile {
    pub user_agent: String,
    pub viewport: Viewport,
    pub languages: Vec<String>,
}

impl FingerprintProfile {
    /// Builds an `Accept-Language` header value with descending q-values
    ///
    /// ```
    /// use wenshu_trawl::driver::{FingerprintProfile, Viewport};
    ///
    /// let profile = FingerprintProfile {
    ///     user_agent: "UA".to_string(),
    ///     viewport: Viewport::new(1920, 1080),
    ///     languages: vec!["zh-CN".into(), "zh".into(), "en".into()],
    /// };
    /// assert_eq!(profile.accept_language(), "zh-CN,zh;q=0.9,en;q=0.8");
    /// ```
    pub fn accept_language(&self) -> String {
        self.languages
            .iter()
            .enumerate()
            .map(|(i, lang)| {
                if i == 0 {
                    lang.clone()
                } else {
                    let q = (10usize.saturating_sub(i)).max(1);
                    format!("{};q=0.{}", lang, q)
                }
            })
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Script that makes `navigator.languages` agree with the profile
    pub fn languages_script(&self) -> String {
        let languages = serde_json::to_string(&self.languages).unwrap_or_else(|_| "[]".to_string());
        format!(
            "Object.defineProperty(navigator, 'languages', {{ get: () => {}, configurable: true }});",
            languages
        )
    }
}

/// How long `navigate` waits before returning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPolicy {
    /// Return once the DOM is parsed
    DomContentLoaded,
    /// Return once the page has settled and stopped loading resources
    NetworkIdle,
}

/// Outcome of a navigation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub status: u16,
    pub final_url: String,
}

impl Navigation {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Primitive browser actions the crawler is built from
///
/// One `Session` corresponds to one isolated browser context with a single
/// page. Elements are handles into that page and stay valid until the page
/// navigates.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    type Session: Send + Sync;
    type Element: Send + Sync;

    /// Opens a session with the given identity and preloaded cookies
    async fn new_session(
        &self,
        profile: &FingerprintProfile,
        cookies: &[Cookie],
    ) -> DriverResult<Self::Session>;

    async fn navigate(
        &self,
        session: &Self::Session,
        url: &str,
        wait: WaitPolicy,
        timeout: Duration,
    ) -> DriverResult<Navigation>;

    async fn query_one(
        &self,
        session: &Self::Session,
        selector: &str,
    ) -> DriverResult<Option<Self::Element>>;

    async fn query_all(
        &self,
        session: &Self::Session,
        selector: &str,
    ) -> DriverResult<Vec<Self::Element>>;

    async fn click(&self, element: &Self::Element) -> DriverResult<()>;

    /// Replaces the element's value with `text`
    async fn fill(&self, element: &Self::Element, text: &str) -> DriverResult<()>;

    async fn select_option(&self, element: &Self::Element, value: &str) -> DriverResult<()>;

    async fn scroll_into_view(&self, element: &Self::Element) -> DriverResult<()>;

    async fn text(&self, element: &Self::Element) -> DriverResult<String>;

    async fn attribute(&self, element: &Self::Element, name: &str)
        -> DriverResult<Option<String>>;

    /// Waits until an in-page update has finished loading
    ///
    /// Used after clicks that refresh part of the page without navigating.
    async fn wait_for_idle(&self, session: &Self::Session, timeout: Duration) -> DriverResult<()>;

    /// Serialized markup of the current page
    async fn content(&self, session: &Self::Session) -> DriverResult<String>;

    async fn title(&self, session: &Self::Session) -> DriverResult<String>;

    async fn current_url(&self, session: &Self::Session) -> DriverResult<String>;

    async fn cookies(&self, session: &Self::Session) -> DriverResult<Vec<Cookie>>;

    async fn add_cookies(&self, session: &Self::Session, cookies: &[Cookie]) -> DriverResult<()>;

    /// Saves a full-page screenshot for diagnostics
    async fn screenshot(&self, session: &Self::Session, path: &Path) -> DriverResult<()>;

    async fn close(&self, session: Self::Session) -> DriverResult<()>;
}
