//! Process-wide index of seen document URLs

use std::collections::HashSet;

/// Set of normalized document URLs already collected
///
/// Entries are never removed. A URL inserted while collecting one unit is
/// ignored by every later unit of the same run.
#[derive(Debug, Default)]
pub struct DedupIndex {
    seen: HashSet<String>,
}

impl DedupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a URL, returning true if it was not already present
    pub fn insert(&mut self, url: &str) -> bool {
        if self.seen.contains(url) {
            return false;
        }
        self.seen.insert(url.to_string())
    }

    pub fn contains(&self, url: &str) -> bool {
        self.seen.contains(url)
    }

    /// Adds URLs from already-complete units
    pub fn seed<I, S>(&mut self, urls: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let before = self.seen.len();
        self.seen.extend(urls.into_iter().map(Into::into));
        self.seen.len() - before
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
