//! Per-unit crawl state machine
//!
//! A unit moves `SearchSetup -> Paginating(1) -> ... -> Done(reason)`. The
//! transitions are pure so the pagination rules can be checked without a
//! browser.

/// Why a unit stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoneReason {
    /// Resume markers were already on disk
    AlreadyComplete,
    SearchFailed,
    /// The result list stayed behind a block page after a cooldown
    Blocked,
    PageLimit,
    LastPage,
    Interrupted,
}

/// Where a unit is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitPhase {
    SearchSetup,
    Paginating { page: u32 },
    Done(DoneReason),
}

/// What happened when leaving a result page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextPage {
    /// Next was not requested because the page limit was reached
    NotRequested,
    /// The next page loaded
    Advanced,
    /// The next-page control is disabled or absent
    Unavailable,
    /// Shutdown was observed before moving on
    Interrupted,
}

impl UnitPhase {
    /// Phase after the search form has been driven
    pub fn after_setup(search_ok: bool) -> Self {
        if search_ok {
            Self::Paginating { page: 1 }
        } else {
            Self::Done(DoneReason::SearchFailed)
        }
    }

    /// Whether page `page` may request a following page
    pub fn wants_next(page: u32, max_pages: u32) -> bool {
        page < max_pages
    }

    /// Phase after page `page` has been harvested
    pub fn after_page(page: u32, max_pages: u32, next: NextPage) -> Self {
        match next {
            NextPage::Interrupted => Self::Done(DoneReason::Interrupted),
            _ if !Self::wants_next(page, max_pages) => Self::Done(DoneReason::PageLimit),
            NextPage::Advanced => Self::Paginating { page: page + 1 },
            NextPage::Unavailable | NextPage::NotRequested => Self::Done(DoneReason::LastPage),
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_after_setup() {
        assert_eq!(UnitPhase::after_setup(true), UnitPhase::Paginating { page: 1 });
        assert_eq!(
            UnitPhase::after_setup(false),
            UnitPhase::Done(DoneReason::SearchFailed)
        );
    }

    #[test]
    fn test_advance_within_limit() {
        assert_eq!(
            UnitPhase::after_page(1, 40, NextPage::Advanced),
            UnitPhase::Paginating { page: 2 }
        );
    }

    #[test]
    fn test_last_page() {
        assert_eq!(
            UnitPhase::after_page(3, 40, NextPage::Unavailable),
            UnitPhase::Done(DoneReason::LastPage)
        );
    }

    #[test]
    fn test_page_limit_wins_over_next() {
        assert!(!UnitPhase::wants_next(40, 40));
        assert_eq!(
            UnitPhase::after_page(40, 40, NextPage::NotRequested),
            UnitPhase::Done(DoneReason::PageLimit)
        );
        assert_eq!(
            UnitPhase::after_page(40, 40, NextPage::Advanced),
            UnitPhase::Done(DoneReason::PageLimit)
        );
    }

    #[test]
    fn test_interrupted_wins() {
        assert_eq!(
            UnitPhase::after_page(40, 40, NextPage::Interrupted),
            UnitPhase::Done(DoneReason::Interrupted)
        );
    }

    #[test]
    fn test_always_terminates_within_limit() {
        // Every page "advances": the walk must still stop at max_pages
        let max_pages = 5;
        let mut phase = UnitPhase::after_setup(true);
        let mut visited = 0;

        while let UnitPhase::Paginating { page } = phase {
            visited += 1;
            phase = UnitPhase::after_page(page, max_pages, NextPage::Advanced);
        }

        assert_eq!(visited, max_pages);
        assert_eq!(phase, UnitPhase::Done(DoneReason::PageLimit));
    }
}
