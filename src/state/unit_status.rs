/// Outcome recorded for a unit in the run ledger
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitStatus {
    /// Searched, paginated and downloaded in this run
    Completed,

    /// Artifacts were already on disk; nothing was fetched
    AlreadyDone,

    /// Passed over by the stochastic skip; a later run will pick it up
    Skipped,

    /// No browser session could be established, or the portal kept blocking
    Abandoned,

    /// The search form could not be driven
    SearchFailed,

    /// The search ran but produced no new links
    Empty,

    /// Shutdown arrived while the unit was in flight
    Interrupted,
}

impl UnitStatus {
    /// Returns true if this unit left its resume markers on disk
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Completed | Self::AlreadyDone)
    }

    /// Returns true if a later run will retry this unit
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Skipped | Self::Abandoned | Self::SearchFailed | Self::Empty | Self::Interrupted
        )
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::AlreadyDone => "already_done",
            Self::Skipped => "skipped",
            Self::Abandoned => "abandoned",
            Self::SearchFailed => "search_failed",
            Self::Empty => "empty",
            Self::Interrupted => "interrupted",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "completed" => Some(Self::Completed),
            "already_done" => Some(Self::AlreadyDone),
            "skipped" => Some(Self::Skipped),
            "abandoned" => Some(Self::Abandoned),
            "search_failed" => Some(Self::SearchFailed),
            "empty" => Some(Self::Empty),
            "interrupted" => Some(Self::Interrupted),
            _ => None,
        }
    }

    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Completed,
            Self::AlreadyDone,
            Self::Skipped,
            Self::Abandoned,
            Self::SearchFailed,
            Self::Empty,
            Self::Interrupted,
        ]
    }
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
