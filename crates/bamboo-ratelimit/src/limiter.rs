//! The rate limiter facade.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use tracing::debug;

use bamboo_core::{SharedClock, SystemClock};

use crate::adapter::SharedStore;
use crate::key::base_context;
use crate::memory::MemoryStore;
use crate::record::RateLimitRecord;

/// A maximum hit count per window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit {
    /// Hits allowed per window.
    pub max: u64,
    /// Window length.
    pub interval: Duration,
}

impl Limit {
    /// Creates a limit.
    #[must_use]
    pub const fn new(max: u64, interval: Duration) -> Self {
        Self { max, interval }
    }
}

impl Default for Limit {
    /// 60 hits per minute.
    fn default() -> Self {
        Self::new(60, Duration::from_secs(60))
    }
}

/// Snapshot of a context's limit state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitInfo {
    /// The queried context.
    pub context: String,
    /// Hits allowed per window.
    pub limit: u64,
    /// Hits left in the active window.
    pub remaining: u64,
    /// Whole seconds until the window resets, rounded up.
    pub reset_time_seconds: u64,
}

/// Counts hits per context over a pluggable store.
///
/// Limits are remembered per base context (the part before the first `/`)
/// the first time they are checked, which lets [`info`](Self::info) and
/// [`ratelimit`](Self::ratelimit) answer without repeating them.
pub struct RateLimiter {
    store: SharedStore,
    clock: SharedClock,
    limits: DashMap<String, Limit>,
    default_limit: Limit,
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("store", &self.store.name())
            .field("limits", &self.limits.len())
            .field("default_limit", &self.default_limit)
            .finish()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl RateLimiter {
    /// Creates a limiter over `store` reading time from `clock`.
    #[must_use]
    pub fn new(store: SharedStore, clock: SharedClock) -> Self {
        Self {
            store,
            clock,
            limits: DashMap::new(),
            default_limit: Limit::default(),
        }
    }

    /// Creates a limiter over a fresh [`MemoryStore`] and the system clock.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), SystemClock::shared())
    }

    /// Sets the limit used by [`ratelimit`](Self::ratelimit) for contexts
    /// that never had one registered.
    #[must_use]
    pub fn with_default_limit(mut self, limit: Limit) -> Self {
        self.default_limit = limit;
        self
    }

    /// The fallback limit.
    #[must_use]
    pub const fn default_limit(&self) -> Limit {
        self.default_limit
    }

    /// The backing store.
    #[must_use]
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// The clock used for window arithmetic.
    #[must_use]
    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    /// Registers (or replaces) the limit of `context`'s base.
    pub fn limiter(&self, context: &str, max: u64, interval: Duration) {
        self.limits
            .insert(base_context(context).to_string(), Limit::new(max, interval));
    }

    /// The limit registered for `context`'s base.
    #[must_use]
    pub fn limit_for(&self, context: &str) -> Option<Limit> {
        self.limits.get(base_context(context)).map(|l| *l)
    }

    /// Applies one hit to `context` and returns the updated record.
    pub async fn track(&self, context: &str, interval: Duration) -> RateLimitRecord {
        let now = self.clock.now_ms();
        self.store.track(context, duration_ms(interval), now).await
    }

    /// Counts one hit and returns `true` if `context` is now over `max`.
    ///
    /// The first call for a base context also registers the limit.
    pub async fn check(&self, context: &str, max: u64, interval: Duration) -> bool {
        let base = base_context(context);
        if !self.limits.contains_key(base) {
            self.limits
                .entry(base.to_string())
                .or_insert_with(|| Limit::new(max, interval));
        }

        let record = self.track(context, interval).await;
        let exceeded = record.current > max;
        if exceeded {
            debug!(
                context = %context,
                current = record.current,
                limit = max,
                "rate limit exceeded"
            );
            metrics::counter!("bamboo_ratelimit_exceeded_total", "context" => base.to_string())
                .increment(1);
        }
        exceeded
    }

    /// Like [`check`](Self::check), using the registered limit of
    /// `context`'s base or the default limit.
    pub async fn ratelimit(&self, context: &str) -> bool {
        let limit = self.limit_for(context).unwrap_or(self.default_limit);
        self.check(context, limit.max, limit.interval).await
    }

    /// Hits left for `context` against `max`.
    pub async fn remaining(&self, context: &str, max: u64) -> u64 {
        let now = self.clock.now_ms();
        self.store
            .get(context)
            .await
            .map_or(max, |record| record.remaining(max, now))
    }

    /// Time until `context`'s window closes; zero when there is no window.
    pub async fn reset_time(&self, context: &str) -> Duration {
        let now = self.clock.now_ms();
        let ms = self
            .store
            .get(context)
            .await
            .map_or(0, |record| record.reset_in(now));
        Duration::from_millis(ms)
    }

    /// Forgets `context`'s counter.
    pub async fn reset(&self, context: &str) {
        self.store.delete(context).await;
    }

    /// Drops every expired record from the store.
    pub async fn cleanup(&self) -> usize {
        let now = self.clock.now_ms();
        self.store.cleanup(now).await
    }

    /// Limit state of `context`, or `None` if its base has no limit.
    pub async fn info(&self, context: &str) -> Option<RateLimitInfo> {
        let limit = self.limit_for(context)?;
        let remaining = self.remaining(context, limit.max).await;
        let reset_ms = u64::try_from(self.reset_time(context).await.as_millis()).unwrap_or(u64::MAX);
        Some(RateLimitInfo {
            context: context.to_string(),
            limit: limit.max,
            remaining,
            reset_time_seconds: reset_ms.div_ceil(1000),
        })
    }
}

pub(crate) fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
