//! Pacing, curfew and block detection
//!
//! Every wait the crawler performs is decided here. A [`PacingPolicy`] picks
//! how long each kind of action waits and whether to skip work at random; a
//! [`Clock`] supplies local wall-clock time for the nightly curfew. The
//! [`Pacer`] combines both with the shutdown signal so that business logic
//! never sleeps on its own.

use crate::config::{DelayRange, PacingConfig};
use crate::crawler::Shutdown;
use crate::state::{curfew_remaining, BackoffMode, BackoffState};
use chrono::{Local, NaiveDateTime};
use rand::Rng;
use std::time::Duration;

/// What the crawler is about to do, for picking a delay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Small interactions: clicks, typing, scrolling
    Passive,
    /// Reading a result page
    Page,
    /// Opening a document
    Document,
    /// Moving on to the next unit
    Unit,
}

/// Granularity of a stochastic skip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipScope {
    Document,
    Unit,
}

/// Decides delays, cooldown lengths and random skips
pub trait PacingPolicy: Send + Sync {
    fn delay_for(&self, kind: ActionKind) -> Duration;

    /// Length of the pause after a block signal
    fn cooldown(&self) -> Duration;

    fn should_skip(&self, scope: SkipScope) -> bool;
}

/// Uniform random draws within the configured bounds
#[derive(Debug, Clone)]
pub struct RandomPacing {
    config: PacingConfig,
}

impl RandomPacing {
    pub fn new(config: PacingConfig) -> Self {
        Self { config }
    }

    fn draw(range: DelayRange) -> Duration {
        let min = range.min_secs.saturating_mul(1000);
        let max = range.max_secs.saturating_mul(1000).max(min);
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}

impl PacingPolicy for RandomPacing {
    fn delay_for(&self, kind: ActionKind) -> Duration {
        let range = match kind {
            ActionKind::Passive => self.config.passive,
            ActionKind::Page => self.config.page,
            ActionKind::Document => self.config.document,
            ActionKind::Unit => self.config.unit,
        };
        Self::draw(range)
    }

    fn cooldown(&self) -> Duration {
        Self::draw(self.config.cooldown)
    }

    fn should_skip(&self, scope: SkipScope) -> bool {
        let rate = match scope {
            SkipScope::Document => self.config.document_skip_rate,
            SkipScope::Unit => self.config.unit_skip_rate,
        };
        rand::thread_rng().gen_bool(rate.clamp(0.0, 1.0))
    }
}

/// Never waits and never skips
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl PacingPolicy for NoDelay {
    fn delay_for(&self, _kind: ActionKind) -> Duration {
        Duration::ZERO
    }

    fn cooldown(&self) -> Duration {
        Duration::ZERO
    }

    fn should_skip(&self, _scope: SkipScope) -> bool {
        false
    }
}

/// Source of local wall-clock time
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock stuck at one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// A block phrase found in a loaded page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSignal {
    pub phrase: String,
}

/// Gatekeeper for every wait in a crawl
pub struct Pacer<P, C> {
    policy: P,
    clock: C,
    shutdown: Shutdown,
    curfew_start: u32,
    curfew_end: u32,
    block_phrases: Vec<String>,
}

impl<P: PacingPolicy, C: Clock> Pacer<P, C> {
    pub fn new(
        policy: P,
        clock: C,
        shutdown: Shutdown,
        pacing: &PacingConfig,
        block_phrases: Vec<String>,
    ) -> Self {
        Self {
            policy,
            clock,
            shutdown,
            curfew_start: pacing.curfew_start,
            curfew_end: pacing.curfew_end,
            block_phrases,
        }
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    /// Remaining curfew time, if the current hour falls inside it
    pub fn should_pause(&self) -> Option<Duration> {
        curfew_remaining(self.clock.now(), self.curfew_start, self.curfew_end)
            .and_then(|remaining| remaining.to_std().ok())
    }

    pub fn next_delay(&self, kind: ActionKind) -> Duration {
        self.policy.delay_for(kind)
    }

    pub fn should_skip(&self, scope: SkipScope) -> bool {
        self.policy.should_skip(scope)
    }

    /// Scans page content for a block phrase
    pub fn observe(&self, content: &str) -> Option<BlockSignal> {
        self.block_phrases
            .iter()
            .find(|phrase| !phrase.is_empty() && content.contains(phrase.as_str()))
            .map(|phrase| BlockSignal {
                phrase: phrase.clone(),
            })
    }

    /// A fresh cooldown starting now
    pub fn enter_cooldown(&self) -> BackoffState {
        let duration = self.policy.cooldown();
        tracing::warn!(minutes = duration.as_secs() / 60, "Entering cooldown");
        BackoffState::enter_cooldown(self.clock.now(), duration)
    }

    /// Waits out the baseline delay for `kind`
    ///
    /// Returns `false` if shutdown was requested.
    pub async fn pause(&self, kind: ActionKind) -> bool {
        let delay = self.next_delay(kind);
        if delay.is_zero() {
            return !self.shutdown.is_triggered();
        }

        tracing::debug!(?kind, secs = delay.as_secs_f32(), "Pausing");
        self.shutdown.sleep(delay).await
    }

    /// Blocks until neither a cooldown nor the curfew applies
    ///
    /// `backoff` is updated in place and is `Active` when this returns `true`.
    /// Returns `false` if shutdown was requested before or during the wait.
    pub async fn gate(&self, backoff: &mut BackoffState) -> bool {
        if self.shutdown.is_triggered() {
            return false;
        }

        let now = self.clock.now();
        *backoff = backoff.derive(now, self.curfew_start, self.curfew_end);

        if let Some(wait) = backoff.remaining(now) {
            self.log_wait(backoff, wait);
            if !self.shutdown.sleep(wait).await {
                return false;
            }

            // a cooldown can run into the curfew window
            if backoff.mode == BackoffMode::Cooldown {
                if let Some(curfew) = self.should_pause() {
                    *backoff = BackoffState::active().derive(
                        self.clock.now(),
                        self.curfew_start,
                        self.curfew_end,
                    );
                    self.log_wait(backoff, curfew);
                    if !self.shutdown.sleep(curfew).await {
                        return false;
                    }
                }
            }
        }

        *backoff = BackoffState::active();
        true
    }

    fn log_wait(&self, backoff: &BackoffState, wait: Duration) {
        match backoff.mode {
            BackoffMode::NightPaused => tracing::info!(
                minutes = wait.as_secs() / 60,
                resume_at = ?backoff.resume_at,
                "Curfew: pausing until morning"
            ),
            BackoffMode::Cooldown => tracing::warn!(
                minutes = wait.as_secs() / 60,
                resume_at = ?backoff.resume_at,
                "Cooling down after block signal"
            ),
            BackoffMode::Active => {}
        }
    }
}
