//! Crawl units and the records they produce

use chrono::{Duration, NaiveDate};
use std::fmt;

/// Resume identity of a crawl unit
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitKey {
    pub date: NaiveDate,
    pub region: String,
}

impl fmt::Display for UnitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.date.format("%Y-%m-%d"), self.region)
    }
}

/// One search: a single judgment date within a single region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlUnit {
    pub date: NaiveDate,
    pub region: String,
    pub case_category: Option<String>,
}

impl CrawlUnit {
    pub fn new(date: NaiveDate, region: impl Into<String>, case_category: Option<String>) -> Self {
        Self {
            date,
            region: region.into(),
            case_category,
        }
    }

    pub fn key(&self) -> UnitKey {
        UnitKey {
            date: self.date,
            region: self.region.clone(),
        }
    }

    /// The date as typed into the portal's date fields
    pub fn date_string(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

impl fmt::Display for CrawlUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.case_category {
            Some(category) => write!(f, "{} {} ({})", self.date, self.region, category),
            None => write!(f, "{} {}", self.date, self.region),
        }
    }
}

/// Enumerates units over an inclusive date range, date-major
///
/// Regions keep their configured order within each date. An empty range
/// (start after end) yields nothing.
pub fn enumerate_units(
    start: NaiveDate,
    end: NaiveDate,
    regions: &[String],
    case_category: Option<&str>,
) -> Vec<CrawlUnit> {
    let mut units = Vec::new();
    let mut date = start;

    while date <= end {
        for region in regions {
            units.push(CrawlUnit::new(
                date,
                region.clone(),
                case_category.map(str::to_string),
            ));
        }
        date += Duration::days(1);
    }

    units
}

/// A candidate document link from a result page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRecord {
    /// Normalized absolute URL
    pub url: String,
    pub title: String,
}

/// A fetched and cleaned document, ready to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRecord {
    pub url: String,
    pub title: String,
    pub case_number: Option<String>,
    pub case_category: Option<String>,
    pub cleaned_text: String,
    pub fetched_at: String,
}

/// Counters accumulated while a unit runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnitTally {
    pub pages_visited: u32,
    pub links_found: u32,
    pub documents_saved: u32,
    pub documents_failed: u32,
    pub documents_skipped: u32,
}
