use crate::config::types::{
    BrowserConfig, Config, CrawlConfig, DelayRange, IdentityConfig, OutputConfig, PacingConfig,
    SiteConfig,
};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawl_config(&config.crawl)?;
    validate_site_config(&config.site)?;
    validate_identity_config(&config.identity)?;
    validate_pacing_config(&config.pacing)?;
    validate_output_config(&config.output)?;
    validate_browser_config(&config.browser)?;
    Ok(())
}

/// Validates crawl scope
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.regions.is_empty() {
        return Err(ConfigError::Validation(
            "crawl.regions must list at least one region".to_string(),
        ));
    }

    if config.regions.iter().any(|r| r.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "crawl.regions cannot contain empty names".to_string(),
        ));
    }

    if let Some(category) = &config.case_category {
        if category.trim().is_empty() {
            return Err(ConfigError::Validation(
                "crawl.case-category cannot be empty when set".to_string(),
            ));
        }
    }

    if let (Some(start), Some(end)) = (config.start_date, config.end_date) {
        if start > end {
            return Err(ConfigError::InvalidDateRange(format!(
                "start-date {} is after end-date {}",
                start, end
            )));
        }
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max-pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.page_size < 1 || config.page_size > 100 {
        return Err(ConfigError::Validation(format!(
            "page-size must be between 1 and 100, got {}",
            config.page_size
        )));
    }

    Ok(())
}

/// Validates portal addresses and selectors
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    validate_http_url("base-url", &config.base_url)?;
    validate_http_url("link-prefix", &config.link_prefix)?;

    if !config.link_prefix.ends_with('/') {
        return Err(ConfigError::Validation(format!(
            "link-prefix must end with '/', got '{}'",
            config.link_prefix
        )));
    }

    if config.cookie_domain.trim().is_empty() {
        return Err(ConfigError::Validation(
            "cookie-domain cannot be empty".to_string(),
        ));
    }

    if config.navigation_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "navigation-timeout-secs must be > 0".to_string(),
        ));
    }

    if config.block_phrases.iter().any(|p| p.is_empty()) {
        return Err(ConfigError::Validation(
            "block-phrases cannot contain empty phrases".to_string(),
        ));
    }

    let selectors = &config.selectors;
    if selectors.result_links.is_empty() {
        return Err(ConfigError::Validation(
            "selectors.result-links must list at least one selector".to_string(),
        ));
    }

    let named = [
        ("advanced-search", &selectors.advanced_search),
        ("date-start", &selectors.date_start),
        ("date-end", &selectors.date_end),
        ("search-button", &selectors.search_button),
        ("region-options", &selectors.region_options),
        ("category-options", &selectors.category_options),
        ("page-size", &selectors.page_size),
        ("next-page", &selectors.next_page),
        ("content", &selectors.content),
        ("summary", &selectors.summary),
        ("login-indicator", &selectors.login_indicator),
    ];

    for (name, selector) in named {
        validate_selector(name, selector)?;
    }

    for selector in &selectors.result_links {
        validate_selector("result-links", selector)?;
    }

    Ok(())
}

/// Validates the identity pools
fn validate_identity_config(config: &IdentityConfig) -> Result<(), ConfigError> {
    if config.user_agents.is_empty() || config.user_agents.iter().any(|ua| ua.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "identity.user-agents must contain non-empty entries".to_string(),
        ));
    }

    if config.viewports.is_empty() {
        return Err(ConfigError::Validation(
            "identity.viewports cannot be empty".to_string(),
        ));
    }

    if config
        .viewports
        .iter()
        .any(|v| v.width == 0 || v.height == 0)
    {
        return Err(ConfigError::Validation(
            "identity.viewports must have non-zero dimensions".to_string(),
        ));
    }

    if config.language_sets.is_empty() || config.language_sets.iter().any(|set| set.is_empty()) {
        return Err(ConfigError::Validation(
            "identity.language-sets must contain non-empty sets".to_string(),
        ));
    }

    if config.rotation_days_min < 1 || config.rotation_days_min > config.rotation_days_max {
        return Err(ConfigError::Validation(format!(
            "identity rotation days must satisfy 1 <= min <= max, got {}..{}",
            config.rotation_days_min, config.rotation_days_max
        )));
    }

    Ok(())
}

/// Validates pacing bounds
fn validate_pacing_config(config: &PacingConfig) -> Result<(), ConfigError> {
    let ranges = [
        ("passive", config.passive),
        ("page", config.page),
        ("document", config.document),
        ("unit", config.unit),
        ("cooldown", config.cooldown),
    ];

    for (name, range) in ranges {
        validate_delay_range(name, range)?;
    }

    if config.curfew_start > 24 || config.curfew_end > 24 {
        return Err(ConfigError::Validation(format!(
            "curfew hours must be within 0..=24, got {}..{}",
            config.curfew_start, config.curfew_end
        )));
    }

    if config.curfew_start > config.curfew_end {
        return Err(ConfigError::Validation(format!(
            "curfew-start ({}) must not be after curfew-end ({})",
            config.curfew_start, config.curfew_end
        )));
    }

    for (name, rate) in [
        ("document-skip-rate", config.document_skip_rate),
        ("unit-skip-rate", config.unit_skip_rate),
    ] {
        if !(0.0..=1.0).contains(&rate) {
            return Err(ConfigError::Validation(format!(
                "{} must be between 0 and 1, got {}",
                name, rate
            )));
        }
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("url-dir", &config.url_dir),
        ("doc-dir", &config.doc_dir),
        ("database-path", &config.database_path),
        ("summary-path", &config.summary_path),
    ] {
        if value.is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    if config.filename_max_len < 16 {
        return Err(ConfigError::Validation(format!(
            "filename-max-len must be >= 16, got {}",
            config.filename_max_len
        )));
    }

    Ok(())
}

/// Validates browser process settings
fn validate_browser_config(config: &BrowserConfig) -> Result<(), ConfigError> {
    if let Some(remote) = &config.remote_url {
        let url = Url::parse(remote)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid remote-url '{}': {}", remote, e)))?;

        if !matches!(url.scheme(), "http" | "https" | "ws" | "wss") {
            return Err(ConfigError::Validation(format!(
                "remote-url '{}' must use http(s) or ws(s)",
                remote
            )));
        }
    }

    Ok(())
}

fn validate_http_url(name: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", name, value, e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::Validation(format!(
            "{} '{}' must use http or https",
            name, value
        )));
    }

    Ok(())
}

fn validate_selector(name: &str, selector: &str) -> Result<(), ConfigError> {
    Selector::parse(selector).map_err(|e| {
        ConfigError::Validation(format!("Invalid selector {} '{}': {:?}", name, selector, e))
    })?;
    Ok(())
}

fn validate_delay_range(name: &str, range: DelayRange) -> Result<(), ConfigError> {
    if range.min_secs > range.max_secs {
        return Err(ConfigError::Validation(format!(
            "pacing.{} min-secs ({}) exceeds max-secs ({})",
            name, range.min_secs, range.max_secs
        )));
    }
    Ok(())
}
