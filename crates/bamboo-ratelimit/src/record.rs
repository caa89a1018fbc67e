//! Stored window state.

use serde::{Deserialize, Serialize};

/// Counter state of one rate limit context.
///
/// All times are milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitRecord {
    /// Hits counted in the active window.
    pub current: u64,
    /// Start of the active window.
    pub timestamp: u64,
    /// Window length.
    pub interval: u64,
}

impl RateLimitRecord {
    /// The record created by the first hit of a window.
    #[must_use]
    pub const fn first(now: u64, interval: u64) -> Self {
        Self {
            current: 1,
            timestamp: now,
            interval,
        }
    }

    /// Returns `true` once the window has run its full length.
    #[must_use]
    pub const fn is_expired(&self, now: u64) -> bool {
        now.saturating_sub(self.timestamp) >= self.interval
    }

    /// Applies one hit at `now` with the caller's window length.
    ///
    /// Inside the window the count goes up and the start stays put;
    /// otherwise a fresh window starts.
    #[must_use]
    pub const fn advance(self, now: u64, interval: u64) -> Self {
        if now.saturating_sub(self.timestamp) < interval {
            Self {
                current: self.current.saturating_add(1),
                ..self
            }
        } else {
            Self::first(now, interval)
        }
    }

    /// Hits left before `limit` is exceeded.
    #[must_use]
    pub const fn remaining(&self, limit: u64, now: u64) -> u64 {
        if self.is_expired(now) {
            limit
        } else {
            limit.saturating_sub(self.current)
        }
    }

    /// Milliseconds until the window closes.
    #[must_use]
    pub const fn reset_in(&self, now: u64) -> u64 {
        self.interval
            .saturating_sub(now.saturating_sub(self.timestamp))
    }
}
