//! Cooperative shutdown signal
//!
//! A Ctrl-C handler triggers the signal; the orchestrator polls it between
//! units, pages and documents, and every wait in the crawler goes through
//! [`Shutdown::sleep`] so a pending delay ends as soon as the signal fires.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Inner {
    stop_requested: AtomicBool,
    notify: Notify,
}

/// Cloneable handle to the process-wide stop flag
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    inner: Arc<Inner>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the flag and wakes every pending sleeper
    pub fn trigger(&self) {
        self.inner.stop_requested.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_triggered(&self) -> bool {
        self.inner.stop_requested.load(Ordering::SeqCst)
    }

    /// Sleeps for `duration` unless shutdown is requested first
    ///
    /// # Returns
    ///
    /// * `true` - The full duration elapsed
    /// * `false` - Shutdown was requested before or during the wait
    pub async fn sleep(&self, duration: Duration) -> bool {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if self.is_triggered() {
            return false;
        }

        tokio::select! {
            _ = tokio::time::sleep(duration) => !self.is_triggered(),
            _ = notified => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sleep_completes_without_trigger() {
        let shutdown = Shutdown::new();
        assert!(shutdown.sleep(Duration::from_millis(5)).await);
        assert!(!shutdown.is_triggered());
    }

    #[tokio::test]
    async fn test_sleep_returns_immediately_when_triggered() {
        let shutdown = Shutdown::new();
        shutdown.trigger();

        let started = std::time::Instant::now();
        assert!(!shutdown.sleep(Duration::from_secs(3600)).await);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_trigger_wakes_pending_sleeper() {
        let shutdown = Shutdown::new();
        let sleeper = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { shutdown.sleep(Duration::from_secs(3600)).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.trigger();

        let completed = tokio::time::timeout(Duration::from_secs(5), sleeper)
            .await
            .expect("sleeper should wake")
            .expect("task should not panic");
        assert!(!completed);
    }
}
