//! Backoff mode of the crawler
//!
//! The mode is transient: a restarted process starts `Active` and re-derives
//! the curfew from the wall clock. A cooldown in progress is forgotten.

use chrono::{Duration, NaiveDateTime, NaiveTime, Timelike};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffMode {
    Active,
    NightPaused,
    Cooldown,
}

/// Current mode and, when paused, the local time it lifts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffState {
    pub mode: BackoffMode,
    pub resume_at: Option<NaiveDateTime>,
}

impl Default for BackoffState {
    fn default() -> Self {
        Self::active()
    }
}

impl BackoffState {
    pub fn active() -> Self {
        Self {
            mode: BackoffMode::Active,
            resume_at: None,
        }
    }

    /// Enters a cooldown lasting `duration` from `now`
    pub fn enter_cooldown(now: NaiveDateTime, duration: std::time::Duration) -> Self {
        let duration = Duration::from_std(duration).unwrap_or_else(|_| Duration::hours(2));
        Self {
            mode: BackoffMode::Cooldown,
            resume_at: Some(now + duration),
        }
    }

    /// Recomputes the mode at `now`
    ///
    /// An unexpired cooldown is kept; otherwise the curfew window
    /// `[curfew_start, curfew_end)` decides between night pause and active.
    pub fn derive(&self, now: NaiveDateTime, curfew_start: u32, curfew_end: u32) -> Self {
        if self.mode == BackoffMode::Cooldown {
            if let Some(resume_at) = self.resume_at {
                if now < resume_at {
                    return *self;
                }
            }
        }

        match curfew_remaining(now, curfew_start, curfew_end) {
            Some(remaining) => Self {
                mode: BackoffMode::NightPaused,
                resume_at: Some(now + remaining),
            },
            None => Self::active(),
        }
    }

    /// Time left before the crawler may act, if paused
    pub fn remaining(&self, now: NaiveDateTime) -> Option<std::time::Duration> {
        match (self.mode, self.resume_at) {
            (BackoffMode::Active, _) | (_, None) => None,
            (_, Some(resume_at)) if resume_at <= now => None,
            (_, Some(resume_at)) => (resume_at - now).to_std().ok(),
        }
    }
}

/// Time until `curfew_end:00` today when `now` falls in the curfew window
///
/// ```
/// use chrono::NaiveDate;
/// use wenshu_trawl::state::curfew_remaining;
///
/// let two_am = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(2, 0, 0).unwrap();
/// assert_eq!(curfew_remaining(two_am, 0, 7), Some(chrono::Duration::hours(5)));
/// ```
pub fn curfew_remaining(now: NaiveDateTime, curfew_start: u32, curfew_end: u32) -> Option<Duration> {
    let hour = now.hour();
    if hour < curfew_start || hour >= curfew_end {
        return None;
    }

    let end = if curfew_end >= 24 {
        now.date().succ_opt()?.and_time(NaiveTime::MIN)
    } else {
        now.date().and_hms_opt(curfew_end, 0, 0)?
    };

    Some(end - now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_curfew_hour_23_no_pause() {
        assert_eq!(curfew_remaining(at(23, 0, 0), 0, 7), None);
    }

    #[test]
    fn test_curfew_two_am_five_hours() {
        assert_eq!(curfew_remaining(at(2, 0, 0), 0, 7), Some(Duration::hours(5)));
    }

    #[test]
    fn test_curfew_partial_hour() {
        assert_eq!(
            curfew_remaining(at(6, 30, 15), 0, 7),
            Some(Duration::minutes(29) + Duration::seconds(45))
        );
    }

    #[test]
    fn test_curfew_boundary_is_exclusive() {
        assert_eq!(curfew_remaining(at(7, 0, 0), 0, 7), None);
        assert!(curfew_remaining(at(0, 0, 0), 0, 7).is_some());
    }

    #[test]
    fn test_empty_curfew_window() {
        assert_eq!(curfew_remaining(at(3, 0, 0), 0, 0), None);
    }

    #[test]
    fn test_derive_night_pause() {
        let state = BackoffState::active().derive(at(3, 0, 0), 0, 7);
        assert_eq!(state.mode, BackoffMode::NightPaused);
        assert_eq!(state.resume_at, Some(at(7, 0, 0)));
        assert_eq!(
            state.remaining(at(3, 0, 0)),
            Some(std::time::Duration::from_secs(4 * 3600))
        );
    }

    #[test]
    fn test_cooldown_survives_until_expiry() {
        let cooldown = BackoffState::enter_cooldown(at(12, 0, 0), std::time::Duration::from_secs(1800));

        let during = cooldown.derive(at(12, 10, 0), 0, 7);
        assert_eq!(during.mode, BackoffMode::Cooldown);
        assert_eq!(
            during.remaining(at(12, 10, 0)),
            Some(std::time::Duration::from_secs(1200))
        );

        let after = cooldown.derive(at(12, 31, 0), 0, 7);
        assert_eq!(after, BackoffState::active());
    }

    #[test]
    fn test_active_has_no_remaining() {
        assert_eq!(BackoffState::active().remaining(at(12, 0, 0)), None);
    }
}
