//! Headless Chromium backend over the DevTools protocol

use crate::config::BrowserConfig;
use crate::driver::{BrowserDriver, Cookie, FingerprintProfile, Navigation, WaitPolicy};
use crate::{DriverError, DriverResult};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::{CookieParam, SetUserAgentOverrideParams};
use chromiumoxide::element::Element;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, BrowserConfig as LaunchConfig, Page};
use futures::StreamExt;
use std::path::Path;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Resolves once the page is complete and no new resources loaded for half a second
const IDLE_SCRIPT: &str = r#"
    new Promise((resolve) => {
        let seen = performance.getEntriesByType('resource').length;
        let quiet = 0;
        const timer = setInterval(() => {
            const now = performance.getEntriesByType('resource').length;
            quiet = now === seen ? quiet + 1 : 0;
            seen = now;
            if (quiet >= 5 && document.readyState === 'complete') {
                clearInterval(timer);
                resolve('idle');
            }
        }, 100);
    })
"#;

/// Evasions installed before any page script runs
const STEALTH_SCRIPTS: &[&str] = &[
    r#"Object.defineProperty(navigator, 'webdriver', { get: () => undefined, configurable: true });"#,
    r#"window.chrome = { runtime: {}, loadTimes: function() {}, csi: function() {}, app: {} };"#,
    r#"
    Object.defineProperty(navigator, 'plugins', {
        get: () => [
            { name: 'Chrome PDF Plugin', filename: 'internal-pdf-viewer', description: 'Portable Document Format' },
            { name: 'Chrome PDF Viewer', filename: 'mhjfbmdgcfjbbpaeojofohoefgiehjai', description: '' }
        ],
        configurable: true
    });
    "#,
];

const CHROME_ARGS: &[&str] = &[
    "--disable-blink-features=AutomationControlled",
    "--disable-infobars",
    "--disable-dev-shm-usage",
    "--no-first-run",
    "--no-default-browser-check",
    "--disable-sync",
    "--disable-translate",
    "--no-sandbox",
    "--disable-gpu",
];

/// Extra settle time after the load event for `WaitPolicy::NetworkIdle`
const SETTLE_DELAY: Duration = Duration::from_millis(1500);

/// One browser process (or remote connection) with a single page
pub struct ChromiumSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    remote: bool,
}

/// [`BrowserDriver`] backed by chromiumoxide
pub struct ChromiumDriver {
    config: BrowserConfig,
}

impl ChromiumDriver {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }

    async fn launch(&self, profile: &FingerprintProfile) -> DriverResult<(Browser, JoinHandle<()>)> {
        if let Some(remote_url) = &self.config.remote_url {
            return connect_remote(remote_url).await;
        }

        info!(headless = self.config.headless, "Launching browser");

        let mut builder = LaunchConfig::builder()
            .window_size(profile.viewport.width, profile.viewport.height);

        if !self.config.headless {
            builder = builder.with_head();
        }

        for arg in CHROME_ARGS {
            builder = builder.arg(*arg);
        }
        builder = builder.arg(format!("--lang={}", profile.languages.join(",")));

        for arg in &self.config.chrome_args {
            builder = builder.arg(arg);
        }

        let launch_config = builder.build().map_err(DriverError::Launch)?;

        let (browser, mut handler) = Browser::launch(launch_config)
            .await
            .map_err(|e| DriverError::Launch(e.to_string()))?;

        let handle = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok((browser, handle))
    }
}

/// Connects to a running browser, discovering its WebSocket endpoint
async fn connect_remote(url: &str) -> DriverResult<(Browser, JoinHandle<()>)> {
    info!("Connecting to remote browser at {}", url);

    let http_url = url
        .replace("ws://", "http://")
        .replace("wss://", "https://");
    let version_url = format!("{}/json/version", http_url.trim_end_matches('/'));

    let resp: serde_json::Value = reqwest::Client::new()
        .get(&version_url)
        .send()
        .await
        .map_err(|e| DriverError::Launch(format!("remote browser unreachable: {}", e)))?
        .json()
        .await
        .map_err(|e| DriverError::Launch(format!("bad /json/version response: {}", e)))?;

    let ws_url = resp
        .get("webSocketDebuggerUrl")
        .and_then(|v| v.as_str())
        .ok_or_else(|| DriverError::Launch("no webSocketDebuggerUrl in response".to_string()))?;

    let (browser, mut handler) = Browser::connect(ws_url)
        .await
        .map_err(|e| DriverError::Launch(e.to_string()))?;

    let handle = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if event.is_err() {
                break;
            }
        }
    });

    Ok((browser, handle))
}

async fn apply_profile(page: &Page, profile: &FingerprintProfile) -> DriverResult<()> {
    let user_agent = SetUserAgentOverrideParams::builder()
        .user_agent(profile.user_agent.clone())
        .accept_language(profile.accept_language())
        .build()
        .map_err(DriverError::Launch)?;
    page.execute(user_agent)
        .await
        .map_err(|e| DriverError::Launch(e.to_string()))?;

    let metrics = SetDeviceMetricsOverrideParams::new(
        i64::from(profile.viewport.width),
        i64::from(profile.viewport.height),
        1.0,
        false,
    );
    page.execute(metrics)
        .await
        .map_err(|e| DriverError::Launch(e.to_string()))?;

    for script in STEALTH_SCRIPTS {
        if let Err(e) = page.evaluate_on_new_document(script.to_string()).await {
            debug!("Stealth script skipped: {}", e);
        }
    }

    page.evaluate_on_new_document(profile.languages_script())
        .await
        .map_err(|e| DriverError::Launch(e.to_string()))?;

    Ok(())
}

/// HTTP status of the main document response
///
/// Same-document and cache-only navigations carry no response and count as 200.
fn navigation_status(response_status: Option<i64>) -> u16 {
    response_status
        .and_then(|status| u16::try_from(status).ok())
        .unwrap_or(200)
}

fn interaction(e: impl std::fmt::Display) -> DriverError {
    DriverError::Interaction(e.to_string())
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    type Session = ChromiumSession;
    type Element = Element;

    async fn new_session(
        &self,
        profile: &FingerprintProfile,
        cookies: &[Cookie],
    ) -> DriverResult<ChromiumSession> {
        let (browser, handler) = self.launch(profile).await?;

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler.abort();
                return Err(DriverError::Launch(e.to_string()));
            }
        };

        let session = ChromiumSession {
            browser,
            page,
            handler,
            remote: self.config.remote_url.is_some(),
        };

        if let Err(e) = apply_profile(&session.page, profile).await {
            let _ = self.close(session).await;
            return Err(e);
        }

        if let Err(e) = self.add_cookies(&session, cookies).await {
            let _ = self.close(session).await;
            return Err(e);
        }

        Ok(session)
    }

    async fn navigate(
        &self,
        session: &ChromiumSession,
        url: &str,
        wait: WaitPolicy,
        timeout: Duration,
    ) -> DriverResult<Navigation> {
        debug!(url = %url, ?wait, "Navigating");

        match tokio::time::timeout(timeout, session.page.goto(url)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                return Err(DriverError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                })
            }
            Err(_) => {
                return Err(DriverError::Timeout {
                    url: url.to_string(),
                })
            }
        }

        if wait == WaitPolicy::NetworkIdle {
            tokio::time::sleep(SETTLE_DELAY).await;
        }

        let response = match tokio::time::timeout(timeout, session.page.wait_for_navigation_response()).await {
            Ok(Ok(request)) => request
                .as_ref()
                .and_then(|request| request.response.as_ref())
                .map(|response| response.status),
            Ok(Err(e)) => {
                debug!(url = %url, "No navigation response: {}", e);
                None
            }
            Err(_) => None,
        };

        let final_url = self.current_url(session).await.unwrap_or_else(|_| url.to_string());

        Ok(Navigation {
            status: navigation_status(response),
            final_url,
        })
    }

    async fn wait_for_idle(&self, session: &ChromiumSession, timeout: Duration) -> DriverResult<()> {
        match tokio::time::timeout(timeout, session.page.evaluate(IDLE_SCRIPT.to_string())).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(interaction(e)),
            Err(_) => Err(DriverError::Timeout {
                url: self.current_url(session).await.unwrap_or_default(),
            }),
        }
    }

    async fn query_one(&self, session: &ChromiumSession, selector: &str) -> DriverResult<Option<Element>> {
        Ok(self.query_all(session, selector).await?.into_iter().next())
    }

    async fn query_all(&self, session: &ChromiumSession, selector: &str) -> DriverResult<Vec<Element>> {
        match session.page.find_elements(selector).await {
            Ok(elements) => Ok(elements),
            Err(e) => {
                let message = e.to_string();
                if message.contains("No node") || message.contains("not found") {
                    Ok(Vec::new())
                } else {
                    Err(DriverError::Selector(format!("{}: {}", selector, message)))
                }
            }
        }
    }

    async fn click(&self, element: &Element) -> DriverResult<()> {
        element.click().await.map_err(interaction)?;
        Ok(())
    }

    async fn fill(&self, element: &Element, text: &str) -> DriverResult<()> {
        element
            .call_js_fn("function() { this.value = ''; }", false)
            .await
            .map_err(interaction)?;
        element.click().await.map_err(interaction)?;
        element.type_str(text).await.map_err(interaction)?;
        Ok(())
    }

    async fn select_option(&self, element: &Element, value: &str) -> DriverResult<()> {
        let literal = serde_json::to_string(value).map_err(interaction)?;
        let function = format!(
            "function() {{ this.value = {}; this.dispatchEvent(new Event('change', {{ bubbles: true }})); }}",
            literal
        );
        element.call_js_fn(function, false).await.map_err(interaction)?;
        Ok(())
    }

    async fn scroll_into_view(&self, element: &Element) -> DriverResult<()> {
        element.scroll_into_view().await.map_err(interaction)?;
        Ok(())
    }

    async fn text(&self, element: &Element) -> DriverResult<String> {
        Ok(element
            .inner_text()
            .await
            .map_err(interaction)?
            .unwrap_or_default())
    }

    async fn attribute(&self, element: &Element, name: &str) -> DriverResult<Option<String>> {
        element.attribute(name).await.map_err(interaction)
    }

    async fn content(&self, session: &ChromiumSession) -> DriverResult<String> {
        session.page.content().await.map_err(interaction)
    }

    async fn title(&self, session: &ChromiumSession) -> DriverResult<String> {
        Ok(session
            .page
            .get_title()
            .await
            .map_err(interaction)?
            .unwrap_or_default())
    }

    async fn current_url(&self, session: &ChromiumSession) -> DriverResult<String> {
        Ok(session
            .page
            .url()
            .await
            .map_err(interaction)?
            .unwrap_or_default())
    }

    async fn cookies(&self, session: &ChromiumSession) -> DriverResult<Vec<Cookie>> {
        let cookies = session
            .page
            .get_cookies()
            .await
            .map_err(|e| DriverError::Cookies(e.to_string()))?;

        Ok(cookies
            .into_iter()
            .map(|c| Cookie {
                name: c.name,
                value: c.value,
                domain: c.domain,
                path: c.path,
            })
            .collect())
    }

    async fn add_cookies(&self, session: &ChromiumSession, cookies: &[Cookie]) -> DriverResult<()> {
        for cookie in cookies {
            let param = CookieParam::builder()
                .name(cookie.name.clone())
                .value(cookie.value.clone())
                .domain(cookie.domain.clone())
                .path(cookie.path.clone())
                .build()
                .map_err(DriverError::Cookies)?;

            if let Err(e) = session.page.set_cookie(param).await {
                warn!("Failed to set cookie {}: {}", cookie.name, e);
            }
        }
        Ok(())
    }

    async fn screenshot(&self, session: &ChromiumSession, path: &Path) -> DriverResult<()> {
        let params = ScreenshotParams::builder().full_page(true).build();
        session
            .page
            .save_screenshot(params, path)
            .await
            .map_err(interaction)?;
        Ok(())
    }

    async fn close(&self, session: ChromiumSession) -> DriverResult<()> {
        let ChromiumSession {
            mut browser,
            page,
            handler,
            remote,
        } = session;

        if let Err(e) = page.close().await {
            debug!("Page close failed: {}", e);
        }

        if !remote {
            if let Err(e) = browser.close().await {
                debug!("Browser close failed: {}", e);
            }
            let _ = browser.wait().await;
        }

        handler.abort();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_status_reports_error_responses() {
        assert_eq!(navigation_status(Some(404)), 404);
        assert_eq!(navigation_status(Some(503)), 503);
        assert!(!Navigation {
            status: navigation_status(Some(404)),
            final_url: String::new(),
        }
        .is_ok());
    }

    #[test]
    fn test_navigation_status_without_response() {
        assert_eq!(navigation_status(Some(200)), 200);
        assert_eq!(navigation_status(None), 200);
        assert_eq!(navigation_status(Some(-1)), 200);
    }
}
