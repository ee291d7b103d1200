//! On-disk artifacts: link-list files and per-date document folders
//!
//! These files are the resume markers. A unit is complete when both its
//! link-list file and its date's document folder exist.

use crate::state::{CrawlUnit, DocumentRecord, LinkRecord};
use crate::storage::{StorageError, StorageResult};
use chrono::{Local, NaiveDate};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Characters not allowed in document filenames
const RESERVED_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

pub const UNKNOWN_CASE_NUMBER: &str = "未知案件";
pub const UNKNOWN_CASE_CATEGORY: &str = "未知案由";

/// Portal name written in link-list headers
const PORTAL_NAME: &str = "裁判文书网";

/// Outcome of writing a document file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Written(PathBuf),
    /// A file with that name already exists and was left untouched
    AlreadyExists(PathBuf),
}

/// Replaces characters reserved by common filesystems with `_`
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| if RESERVED_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

/// Title-based filename, when the title is usable and fits within `max_len`
pub fn title_filename(title: &str, max_len: usize) -> Option<String> {
    let title = title.trim();
    let name = format!("{}.txt", sanitize_filename(title));
    (!title.is_empty() && name.chars().count() <= max_len).then_some(name)
}

/// Filename for a document
///
/// Uses the sanitized title when it fits within `max_len` characters,
/// otherwise `{case_number}_{case_category}.txt` truncated to `max_len`.
pub fn document_filename(document: &DocumentRecord, max_len: usize) -> String {
    if let Some(name) = title_filename(&document.title, max_len) {
        return name;
    }

    let stem = sanitize_filename(&format!(
        "{}_{}",
        document.case_number.as_deref().unwrap_or(UNKNOWN_CASE_NUMBER),
        document.case_category.as_deref().unwrap_or(UNKNOWN_CASE_CATEGORY)
    ));

    let budget = max_len.saturating_sub(".txt".len());
    let stem: String = stem.chars().take(budget).collect();
    format!("{}.txt", stem)
}

/// Link-list file content for a unit
pub fn render_link_list(unit: &CrawlUnit, links: &[LinkRecord], collected_at: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "# {} - {} - {} - {}\n",
        PORTAL_NAME,
        unit.region,
        unit.case_category.as_deref().unwrap_or("全部案由"),
        unit.date_string()
    ));
    out.push_str(&format!("# Collected at: {}\n", collected_at));
    out.push_str(&format!("# Links: {}\n\n", links.len()));

    for (i, link) in links.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, link.title));
        out.push_str(&format!("   URL: {}\n\n", link.url));
    }

    out
}

/// Document file content: header block, blank line, cleaned body
pub fn render_document(document: &DocumentRecord) -> String {
    format!(
        "# Title: {}\n# Case number: {}\n# Case category: {}\n# Fetched at: {}\n# Source URL: {}\n\n{}\n",
        document.title,
        document.case_number.as_deref().unwrap_or(UNKNOWN_CASE_NUMBER),
        document.case_category.as_deref().unwrap_or(UNKNOWN_CASE_CATEGORY),
        document.fetched_at,
        document.url,
        document.cleaned_text
    )
}

/// `URL:` lines of a link-list file
pub fn parse_link_list(content: &str) -> Vec<String> {
    content
        .lines()
        .filter_map(|line| line.trim().strip_prefix("URL:"))
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .collect()
}

/// Filesystem layout for link lists and documents
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    url_dir: PathBuf,
    doc_dir: PathBuf,
    filename_max_len: usize,
}

impl ArtifactStore {
    pub fn new(url_dir: impl Into<PathBuf>, doc_dir: impl Into<PathBuf>, filename_max_len: usize) -> Self {
        Self {
            url_dir: url_dir.into(),
            doc_dir: doc_dir.into(),
            filename_max_len,
        }
    }

    /// Creates the root directories
    pub fn init(&self) -> StorageResult<()> {
        fs::create_dir_all(&self.url_dir)?;
        fs::create_dir_all(&self.doc_dir)?;
        Ok(())
    }

    pub fn link_list_path(&self, unit: &CrawlUnit) -> PathBuf {
        self.url_dir
            .join(format!("{}_{}.txt", unit.date_string(), sanitize_filename(&unit.region)))
    }

    pub fn date_folder(&self, date: NaiveDate) -> PathBuf {
        self.doc_dir.join(date.format("%Y-%m-%d").to_string())
    }

    /// Whether both resume markers of `unit` exist
    pub fn is_unit_complete(&self, unit: &CrawlUnit) -> bool {
        self.link_list_path(unit).is_file() && self.date_folder(unit.date).is_dir()
    }

    /// Writes the unit's link list, replacing any partial file
    pub fn write_link_list(&self, unit: &CrawlUnit, links: &[LinkRecord]) -> StorageResult<PathBuf> {
        let path = self.link_list_path(unit);
        let collected_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let tmp = path.with_extension("txt.part");

        fs::write(&tmp, render_link_list(unit, links, &collected_at))?;
        fs::rename(&tmp, &path)?;
        Ok(path)
    }

    pub fn read_link_list(&self, unit: &CrawlUnit) -> StorageResult<Vec<String>> {
        let content = fs::read_to_string(self.link_list_path(unit))?;
        Ok(parse_link_list(&content))
    }

    pub fn ensure_date_folder(&self, date: NaiveDate) -> StorageResult<PathBuf> {
        let folder = self.date_folder(date);
        fs::create_dir_all(&folder)?;
        Ok(folder)
    }

    /// Writes a document into its date folder without overwriting
    pub fn save_document(&self, date: NaiveDate, document: &DocumentRecord) -> StorageResult<SaveOutcome> {
        let folder = self.ensure_date_folder(date)?;
        let path = folder.join(document_filename(document, self.filename_max_len));

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Ok(SaveOutcome::AlreadyExists(path));
            }
            Err(e) => return Err(StorageError::Io(e)),
        };

        file.write_all(render_document(document).as_bytes())?;
        Ok(SaveOutcome::Written(path))
    }

    /// Whether a document saved under this title is already on disk
    ///
    /// Always `false` for titles that would fall back to the case-number
    /// name, since that name is only known after fetching.
    pub fn title_exists(&self, date: NaiveDate, title: &str) -> bool {
        title_filename(title, self.filename_max_len)
            .map(|name| self.date_folder(date).join(name).exists())
            .unwrap_or(false)
    }

    /// URLs listed by every complete unit among `units`
    pub fn completed_urls(&self, units: &[CrawlUnit]) -> Vec<String> {
        units
            .iter()
            .filter(|unit| self.is_unit_complete(unit))
            .filter_map(|unit| self.read_link_list(unit).ok())
            .flatten()
            .collect()
    }

    pub fn url_dir(&self) -> &Path {
        &self.url_dir
    }

    pub fn doc_dir(&self) -> &Path {
        &self.doc_dir
    }
}
