//! Periodic cleanup of expired records.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

use crate::limiter::RateLimiter;

/// Handle to a background cleanup loop.
///
/// The loop stops when the handle is dropped, when [`stop`](Self::stop) is
/// called, or when the limiter it sweeps is gone.
#[derive(Debug)]
pub struct CleanupTask {
    handle: JoinHandle<()>,
}

impl CleanupTask {
    /// Stops the loop.
    pub fn stop(self) {
        drop(self);
    }

    /// Returns `true` once the loop has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for CleanupTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl RateLimiter {
    /// Sweeps expired records every `period` on the current runtime.
    ///
    /// The task only holds a weak reference, so it never keeps the limiter
    /// alive on its own.
    #[must_use = "the cleanup loop stops when the task is dropped"]
    pub fn spawn_cleanup(self: &Arc<Self>, period: Duration) -> CleanupTask {
        let limiter = Arc::downgrade(self);
        let period = period.max(Duration::from_millis(1));

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(limiter) = limiter.upgrade() else {
                    trace!("rate limiter dropped, stopping cleanup");
                    break;
                };
                let removed = limiter.cleanup().await;
                if removed > 0 {
                    debug!(removed, store = limiter.store().name(), "expired rate limit records removed");
                }
            }
        });

        CleanupTask { handle }
    }
}
