//! Wenshu-Trawl: a patient, resumable judgment-document collector
//!
//! This crate drives a browser through a search-driven legal-document portal one
//! date and region at a time, paginates the result lists, deduplicates document
//! links, and turns each document's markup into clean, paragraphed plain text.
//! Progress lives on disk so an interrupted run picks up where it left off.

pub mod config;
pub mod crawler;
pub mod driver;
pub mod extract;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Wenshu-Trawl operations
#[derive(Debug, Error)]
pub enum TrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Browser driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    StorageError(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Search setup failed: {0}")]
    SearchSetup(String),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Run interrupted")]
    Interrupted,
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid date range: {0}")]
    InvalidDateRange(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Errors surfaced by a browser driver implementation
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Failed to start browser session: {0}")]
    Launch(String),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Navigation to {url} timed out")]
    Timeout { url: String },

    #[error("Invalid selector '{0}'")]
    Selector(String),

    #[error("Element interaction failed: {0}")]
    Interaction(String),

    #[error("Cookie operation failed: {0}")]
    Cookies(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Wenshu-Trawl operations
pub type Result<T> = std::result::Result<T, TrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

/// Result type alias for browser driver operations
pub type DriverResult<T> = std::result::Result<T, DriverError>;

// Re-export commonly used types
pub use config::Config;
pub use driver::BrowserDriver;
pub use state::{CrawlUnit, LinkRecord, UnitKey};
pub use url::normalize_url;
