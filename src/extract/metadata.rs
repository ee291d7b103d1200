use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;

static CASE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"（\d{4}）.*?号").expect("valid case number pattern"));

/// Identifying details of a judgment document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentMetadata {
    pub case_number: Option<String>,
    pub case_category: Option<String>,
}

/// First bracketed-year case number in the content container's text
pub(crate) fn case_number(document: &Html, content: &Selector) -> Option<String> {
    let container = document.select(content).next()?;
    let text: String = container.text().collect();
    CASE_NUMBER.find(&text).map(|m| m.as_str().to_string())
}

/// Link text inside the summary heading carrying `label`
pub(crate) fn case_category(document: &Html, summary: &Selector, label: &str) -> Option<String> {
    let heading = Selector::parse("h4").ok()?;
    let anchor = Selector::parse("a").ok()?;

    let section = document.select(summary).next()?;
    section
        .select(&heading)
        .find(|h4| h4.text().collect::<String>().contains(label))
        .and_then(|h4| h4.select(&anchor).next())
        .map(|a| a.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}
