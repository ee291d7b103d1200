//! Document extraction pipeline
//!
//! Pure functions over page markup:
//! - result-list pages yield [`LinkRecord`](crate::state::LinkRecord)s
//! - document pages yield cleaned, paragraphed text and metadata
//!
//! Nothing here touches the network or the filesystem.

mod cleaner;
mod links;
mod metadata;

pub use cleaner::{classify_line, format_paragraphs, normalize_lines, LineLayout};
pub use links::extract_links_with;
pub use metadata::DocumentMetadata;

use crate::config::SiteConfig;
use crate::state::LinkRecord;
use crate::ConfigError;
use scraper::{Html, Selector};
use std::sync::LazyLock;
use thiserror::Error;

/// The document page has no content container
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("document content container not found")]
pub struct ContentNotFound;

/// Page-structure knowledge needed to pull data out of portal markup
#[derive(Debug, Clone)]
pub struct Extractor {
    result_links: Vec<Selector>,
    content: Selector,
    summary: Selector,
    category_label: String,
    link_prefix: String,
}

impl Extractor {
    /// Builds an extractor from the configured selectors
    pub fn from_site(site: &SiteConfig) -> Result<Self, ConfigError> {
        let parse = |s: &str| {
            Selector::parse(s)
                .map_err(|e| ConfigError::Validation(format!("Invalid selector '{}': {:?}", s, e)))
        };

        Ok(Self {
            result_links: site
                .selectors
                .result_links
                .iter()
                .map(|s| parse(s))
                .collect::<Result<_, _>>()?,
            content: parse(&site.selectors.content)?,
            summary: parse(&site.selectors.summary)?,
            category_label: site.selectors.category_label.clone(),
            link_prefix: site.link_prefix.clone(),
        })
    }

    pub fn link_prefix(&self) -> &str {
        &self.link_prefix
    }

    /// Document links on a result-list page, in page order
    pub fn links(&self, markup: &str) -> Vec<LinkRecord> {
        extract_links_with(markup, &self.result_links, &self.link_prefix)
    }

    /// Cleaned, paragraphed text of a document page
    pub fn clean(&self, markup: &str) -> Result<String, ContentNotFound> {
        let document = Html::parse_document(markup);
        let container = document
            .select(&self.content)
            .next()
            .ok_or(ContentNotFound)?;

        let lines = normalize_lines(container.text());
        let line_refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        Ok(format_paragraphs(&line_refs))
    }

    /// Case number and category of a document page
    pub fn metadata(&self, markup: &str) -> DocumentMetadata {
        let document = Html::parse_document(markup);
        DocumentMetadata {
            case_number: metadata::case_number(&document, &self.content),
            case_category: metadata::case_category(&document, &self.summary, &self.category_label),
        }
    }
}

/// Extractor for the portal's stock page structure
static PORTAL: LazyLock<Extractor> = LazyLock::new(|| {
    Extractor::from_site(&SiteConfig::default()).expect("default selectors are valid")
});

/// Extracts document links with the portal's default selectors
pub fn extract_links(markup: &str, link_prefix: &str) -> Vec<LinkRecord> {
    extract_links_with(markup, &PORTAL.result_links, link_prefix)
}

/// Cleans a document page with the portal's default content selector
pub fn clean_document(markup: &str) -> Result<String, ContentNotFound> {
    PORTAL.clean(markup)
}

/// Extracts metadata with the portal's default selectors
pub fn extract_metadata(markup: &str) -> DocumentMetadata {
    PORTAL.metadata(markup)
}
