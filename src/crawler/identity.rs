//! Simulated client identity rotation
//!
//! The rotator hands out one [`FingerprintProfile`] and keeps it for a
//! randomly drawn number of days before drawing a new one. Rotation is only
//! considered at unit boundaries, so a profile never changes mid-session.

use crate::config::IdentityConfig;
use crate::driver::{FingerprintProfile, Viewport};
use chrono::NaiveDateTime;
use rand::seq::SliceRandom;
use rand::Rng;

const FALLBACK_VIEWPORT: Viewport = Viewport::new(1920, 1080);

pub struct IdentityRotator {
    user_agents: Vec<String>,
    viewports: Vec<Viewport>,
    language_sets: Vec<Vec<String>>,
    days_min: u32,
    days_max: u32,
    current: Option<FingerprintProfile>,
    rotated_at: Option<NaiveDateTime>,
    interval_days: u32,
}

impl IdentityRotator {
    pub fn new(config: &IdentityConfig) -> Self {
        Self {
            user_agents: config.user_agents.clone(),
            viewports: config.viewports.clone(),
            language_sets: config.language_sets.clone(),
            days_min: config.rotation_days_min,
            days_max: config.rotation_days_max.max(config.rotation_days_min),
            current: None,
            rotated_at: None,
            interval_days: 0,
        }
    }

    pub fn current_profile(&self) -> Option<&FingerprintProfile> {
        self.current.as_ref()
    }

    /// Days the current profile is kept for
    pub fn interval_days(&self) -> u32 {
        self.interval_days
    }

    /// Returns the profile to use from `now`, rotating first if it is due
    pub fn maybe_rotate(&mut self, now: NaiveDateTime) -> FingerprintProfile {
        self.maybe_rotate_with(now, &mut rand::thread_rng())
    }

    /// [`maybe_rotate`](Self::maybe_rotate) with a caller-supplied RNG
    pub fn maybe_rotate_with<R: Rng + ?Sized>(
        &mut self,
        now: NaiveDateTime,
        rng: &mut R,
    ) -> FingerprintProfile {
        if let (Some(profile), false) = (&self.current, self.is_due(now)) {
            return profile.clone();
        }

        let profile = self.draw_profile(rng);
        self.interval_days = rng.gen_range(self.days_min..=self.days_max);
        self.rotated_at = Some(now);
        self.current = Some(profile.clone());

        tracing::info!(
            user_agent = %profile.user_agent,
            width = profile.viewport.width,
            height = profile.viewport.height,
            languages = %profile.languages.join(","),
            keep_days = self.interval_days,
            "Rotated client identity"
        );

        profile
    }

    fn is_due(&self, now: NaiveDateTime) -> bool {
        match self.rotated_at {
            Some(rotated_at) => (now - rotated_at).num_days() >= i64::from(self.interval_days),
            None => true,
        }
    }

    fn draw_profile<R: Rng + ?Sized>(&self, rng: &mut R) -> FingerprintProfile {
        FingerprintProfile {
            user_agent: self.user_agents.choose(rng).cloned().unwrap_or_default(),
            viewport: self
                .viewports
                .choose(rng)
                .copied()
                .unwrap_or(FALLBACK_VIEWPORT),
            languages: self.language_sets.choose(rng).cloned().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn noon(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, day)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_first_call_draws_profile() {
        let config = IdentityConfig::default();
        let mut rotator = IdentityRotator::new(&config);
        assert!(rotator.current_profile().is_none());

        let mut rng = StdRng::seed_from_u64(7);
        let profile = rotator.maybe_rotate_with(noon(1), &mut rng);

        assert!(config.user_agents.contains(&profile.user_agent));
        assert!(config.viewports.contains(&profile.viewport));
        assert!(config.language_sets.contains(&profile.languages));
        assert_eq!(rotator.current_profile(), Some(&profile));
        assert!((1..=3).contains(&rotator.interval_days()));
    }

    #[test]
    fn test_profile_kept_within_interval() {
        let mut rotator = IdentityRotator::new(&IdentityConfig::default());
        let mut rng = StdRng::seed_from_u64(42);

        let first = rotator.maybe_rotate_with(noon(1), &mut rng);
        let later = noon(1) + Duration::hours(20);
        assert_eq!(rotator.maybe_rotate_with(later, &mut rng), first);
    }

    #[test]
    fn test_rotation_after_interval() {
        let config = IdentityConfig {
            rotation_days_min: 1,
            rotation_days_max: 1,
            user_agents: vec!["A".to_string(), "B".to_string()],
            ..IdentityConfig::default()
        };
        let mut rotator = IdentityRotator::new(&config);
        let mut rng = StdRng::seed_from_u64(3);

        rotator.maybe_rotate_with(noon(1), &mut rng);
        let stamp = rotator.rotated_at;

        rotator.maybe_rotate_with(noon(2), &mut rng);
        assert_ne!(rotator.rotated_at, stamp);
        assert_eq!(rotator.rotated_at, Some(noon(2)));
    }

    #[test]
    fn test_empty_pools_fall_back() {
        let config = IdentityConfig {
            user_agents: Vec::new(),
            viewports: Vec::new(),
            language_sets: Vec::new(),
            ..IdentityConfig::default()
        };
        let mut rotator = IdentityRotator::new(&config);
        let profile = rotator.maybe_rotate(noon(1));
        assert_eq!(profile.viewport, FALLBACK_VIEWPORT);
        assert!(profile.user_agent.is_empty());
    }
}
