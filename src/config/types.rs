use crate::driver::Viewport;
use chrono::{Duration, NaiveDate};
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str =
    "https://wenshu.court.gov.cn/website/wenshu/181029CR4M5A62CH/index.html?";
pub const DEFAULT_LINK_PREFIX: &str = "https://wenshu.court.gov.cn/website/wenshu/";
pub const DEFAULT_COOKIE_DOMAIN: &str = "wenshu.court.gov.cn";

/// Main configuration structure for Wenshu-Trawl
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub pacing: PacingConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
}

/// Which units to crawl
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    /// Regions to search, in crawl order (e.g. "上海市")
    pub regions: Vec<String>,

    /// Optional case category filter applied to every search
    #[serde(rename = "case-category", default)]
    pub case_category: Option<String>,

    /// First judgment date, inclusive. Defaults to `years-back` before `end-date`
    #[serde(rename = "start-date", default)]
    pub start_date: Option<NaiveDate>,

    /// Last judgment date, inclusive. Defaults to today
    #[serde(rename = "end-date", default)]
    pub end_date: Option<NaiveDate>,

    #[serde(rename = "years-back", default = "default_years_back")]
    pub years_back: u32,

    /// Maximum result pages visited per unit
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: u32,

    /// Results per page requested from the portal
    #[serde(rename = "page-size", default = "default_page_size")]
    pub page_size: u32,
}

impl CrawlConfig {
    /// Resolves the inclusive date range to crawl, relative to `today`
    pub fn date_range(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let end = self.end_date.unwrap_or(today);
        let start = self
            .start_date
            .unwrap_or_else(|| end - Duration::days(i64::from(self.years_back) * 365));
        (start, end)
    }
}

/// Portal addresses and page structure
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Landing page with the search form
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,

    /// Replacement for the leading `../` of result-list links
    #[serde(rename = "link-prefix", default = "default_link_prefix")]
    pub link_prefix: String,

    /// Domain the identity cookies are scoped to
    #[serde(rename = "cookie-domain", default = "default_cookie_domain")]
    pub cookie_domain: String,

    #[serde(rename = "navigation-timeout-secs", default = "default_navigation_timeout")]
    pub navigation_timeout_secs: u64,

    /// Text the landing page must contain to be considered the right site
    #[serde(rename = "landing-marker", default = "default_landing_marker")]
    pub landing_marker: String,

    /// Phrases whose presence in a page means the portal is throttling us
    #[serde(rename = "block-phrases", default = "default_block_phrases")]
    pub block_phrases: Vec<String>,

    #[serde(default)]
    pub selectors: SelectorConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            link_prefix: default_link_prefix(),
            cookie_domain: default_cookie_domain(),
            navigation_timeout_secs: default_navigation_timeout(),
            landing_marker: default_landing_marker(),
            block_phrases: default_block_phrases(),
            selectors: SelectorConfig::default(),
        }
    }
}

/// CSS selectors for the portal's search form, result list and documents
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SelectorConfig {
    pub advanced_search: String,
    pub date_start: String,
    pub date_end: String,
    pub search_button: String,
    /// Candidates scanned for an element whose text equals the region name
    pub region_options: String,
    /// Candidates scanned for an element whose text equals the case category
    pub category_options: String,
    pub page_size: String,
    /// Tried in order; the first selector with any match wins
    pub result_links: Vec<String>,
    pub next_page: String,
    pub next_page_text: String,
    pub content: String,
    pub summary: String,
    pub category_label: String,
    pub login_indicator: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            advanced_search: ".advenced-search, div[class*=\"advanced-search\"]".to_string(),
            date_start: "#cprqStart".to_string(),
            date_end: "#cprqEnd".to_string(),
            search_button: "#searchBtn".to_string(),
            region_options: ".region-list a, div[class*=\"region\"] a, div[class*=\"area\"] a, div[class*=\"region\"] span"
                .to_string(),
            category_options: "div[class*=\"reason\"] a, div[class*=\"ay\"] a, div[class*=\"reason\"] span"
                .to_string(),
            page_size: "select.pageSizeSelect, select[class*=\"pageSize\"]".to_string(),
            result_links: vec![
                "h4 a.caseName".to_string(),
                "h4 a[href*=\"docId\"]".to_string(),
                "h4 a".to_string(),
            ],
            next_page: "a.pageButton, a[class*=\"pageButton\"]".to_string(),
            next_page_text: "下一页".to_string(),
            content: "div.PDF_pox".to_string(),
            summary: "div.gaiyao_center".to_string(),
            category_label: "案由：".to_string(),
            login_indicator: "a[href*=\"login\"], button[class*=\"login\"], .login-btn".to_string(),
        }
    }
}

/// Simulated client identities and the session token
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    /// `name=value; name=value` cookie header captured from a logged-in browser
    #[serde(rename = "cookie-header", default)]
    pub cookie_header: Option<String>,

    /// File holding the cookie header, used when `cookie-header` is unset
    #[serde(rename = "cookie-file", default)]
    pub cookie_file: Option<String>,

    #[serde(rename = "user-agents", default = "default_user_agents")]
    pub user_agents: Vec<String>,

    #[serde(default = "default_viewports")]
    pub viewports: Vec<Viewport>,

    #[serde(rename = "language-sets", default = "default_language_sets")]
    pub language_sets: Vec<Vec<String>>,

    #[serde(rename = "rotation-days-min", default = "default_rotation_min")]
    pub rotation_days_min: u32,

    #[serde(rename = "rotation-days-max", default = "default_rotation_max")]
    pub rotation_days_max: u32,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            cookie_header: None,
            cookie_file: None,
            user_agents: default_user_agents(),
            viewports: default_viewports(),
            language_sets: default_language_sets(),
            rotation_days_min: default_rotation_min(),
            rotation_days_max: default_rotation_max(),
        }
    }
}

/// Inclusive bounds of a uniformly drawn wait, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DelayRange {
    #[serde(rename = "min-secs")]
    pub min_secs: u64,
    #[serde(rename = "max-secs")]
    pub max_secs: u64,
}

impl DelayRange {
    pub const fn new(min_secs: u64, max_secs: u64) -> Self {
        Self { min_secs, max_secs }
    }
}

/// Waits, curfew and skip rates
#[derive(Debug, Clone, Deserialize)]
pub struct PacingConfig {
    #[serde(default = "default_passive")]
    pub passive: DelayRange,

    #[serde(default = "default_page")]
    pub page: DelayRange,

    #[serde(default = "default_document")]
    pub document: DelayRange,

    #[serde(default = "default_unit")]
    pub unit: DelayRange,

    /// Pause after a block signal
    #[serde(default = "default_cooldown")]
    pub cooldown: DelayRange,

    /// First local hour of the nightly pause
    #[serde(rename = "curfew-start", default = "default_curfew_start")]
    pub curfew_start: u32,

    /// Local hour the nightly pause ends (exclusive)
    #[serde(rename = "curfew-end", default = "default_curfew_end")]
    pub curfew_end: u32,

    #[serde(rename = "document-skip-rate", default = "default_document_skip")]
    pub document_skip_rate: f64,

    #[serde(rename = "unit-skip-rate", default = "default_unit_skip")]
    pub unit_skip_rate: f64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            passive: default_passive(),
            page: default_page(),
            document: default_document(),
            unit: default_unit(),
            cooldown: default_cooldown(),
            curfew_start: default_curfew_start(),
            curfew_end: default_curfew_end(),
            document_skip_rate: default_document_skip(),
            unit_skip_rate: default_unit_skip(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory for per-unit link-list files
    #[serde(rename = "url-dir", default = "default_url_dir")]
    pub url_dir: String,

    /// Directory for per-date document folders
    #[serde(rename = "doc-dir", default = "default_doc_dir")]
    pub doc_dir: String,

    /// Path to the SQLite run ledger
    #[serde(rename = "database-path", default = "default_database_path")]
    pub database_path: String,

    /// Path to the markdown summary file
    #[serde(rename = "summary-path", default = "default_summary_path")]
    pub summary_path: String,

    /// Longest document filename, in characters, before falling back to case number
    #[serde(rename = "filename-max-len", default = "default_filename_max_len")]
    pub filename_max_len: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            url_dir: default_url_dir(),
            doc_dir: default_doc_dir(),
            database_path: default_database_path(),
            summary_path: default_summary_path(),
            filename_max_len: default_filename_max_len(),
        }
    }
}

/// Browser process settings
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserConfig {
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Connect to an already running browser instead of launching one
    #[serde(rename = "remote-url", default)]
    pub remote_url: Option<String>,

    #[serde(rename = "chrome-args", default)]
    pub chrome_args: Vec<String>,

    /// Where diagnostic screenshots go; none are taken when unset
    #[serde(rename = "screenshot-dir", default)]
    pub screenshot_dir: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            remote_url: None,
            chrome_args: Vec::new(),
            screenshot_dir: None,
        }
    }
}

fn default_years_back() -> u32 {
    3
}

fn default_max_pages() -> u32 {
    40
}

fn default_page_size() -> u32 {
    15
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_link_prefix() -> String {
    DEFAULT_LINK_PREFIX.to_string()
}

fn default_cookie_domain() -> String {
    DEFAULT_COOKIE_DOMAIN.to_string()
}

fn default_navigation_timeout() -> u64 {
    30
}

fn default_landing_marker() -> String {
    "裁判文书网".to_string()
}

fn default_block_phrases() -> Vec<String> {
    vec![
        "验证码".to_string(),
        "请完成安全验证".to_string(),
        "访问过于频繁".to_string(),
    ]
}

fn default_user_agents() -> Vec<String> {
    [
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.0.0 Safari/537.36 Edg/132.0.0.0",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:123.0) Gecko/20100101 Firefox/123.0",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_viewports() -> Vec<Viewport> {
    vec![
        Viewport::new(1920, 1080),
        Viewport::new(1366, 768),
        Viewport::new(1536, 864),
        Viewport::new(1440, 900),
        Viewport::new(1600, 900),
    ]
}

fn default_language_sets() -> Vec<Vec<String>> {
    [
        vec!["zh-CN", "zh", "en-US", "en"],
        vec!["zh-CN", "zh", "en"],
        vec!["zh-CN", "en-US", "en"],
        vec!["zh-CN", "zh"],
    ]
    .iter()
    .map(|set| set.iter().map(|s| s.to_string()).collect())
    .collect()
}

fn default_rotation_min() -> u32 {
    1
}

fn default_rotation_max() -> u32 {
    3
}

fn default_passive() -> DelayRange {
    DelayRange::new(2, 8)
}

fn default_page() -> DelayRange {
    DelayRange::new(15, 60)
}

fn default_document() -> DelayRange {
    DelayRange::new(30, 90)
}

fn default_unit() -> DelayRange {
    DelayRange::new(180, 600)
}

fn default_cooldown() -> DelayRange {
    DelayRange::new(30 * 60, 120 * 60)
}

fn default_curfew_start() -> u32 {
    0
}

fn default_curfew_end() -> u32 {
    7
}

fn default_document_skip() -> f64 {
    0.02
}

fn default_unit_skip() -> f64 {
    0.01
}

fn default_url_dir() -> String {
    "url_lists".to_string()
}

fn default_doc_dir() -> String {
    "documents".to_string()
}

fn default_database_path() -> String {
    "wenshu_trawl.db".to_string()
}

fn default_summary_path() -> String {
    "wenshu_trawl_summary.md".to_string()
}

fn default_filename_max_len() -> usize {
    100
}

fn default_headless() -> bool {
    true
}
