//! # Bamboo Rate Limiting
//!
//! Fixed-window request counting keyed by an arbitrary *context* string such
//! as `"api:login"` or `"api:login/<hashed-ip>"`.
//!
//! ## Algorithm
//!
//! A window opens on the first hit for a context and records its start
//! time. Hits inside the window increment the counter without moving the
//! start. The first hit at or after `start + interval` opens a new window
//! with a count of one. A context is over its limit when `current > limit`.
//!
//! ## Storage
//!
//! Records live behind the [`StorageAdapter`] trait:
//!
//! - [`MemoryStore`]: process-local, atomic per key
//! - `RedisStore` (feature `redis`): shared across processes, best effort
//!
//! Adapters never fail. A backend error is logged and reported as "no
//! record", so an unreachable store degrades to no limiting rather than to
//! rejecting every request.
//!
//! ## Example
//!
//! ```
//! use bamboo_ratelimit::RateLimiter;
//! use std::time::Duration;
//!
//! # tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
//! let limiter = RateLimiter::in_memory();
//! let window = Duration::from_secs(1);
//!
//! for _ in 0..3 {
//!     assert!(!limiter.check("api:login", 3, window).await);
//! }
//! assert!(limiter.check("api:login", 3, window).await);
//!
//! let info = limiter.info("api:login").await.unwrap();
//! assert_eq!(info.limit, 3);
//! assert_eq!(info.remaining, 0);
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/bamboo-ratelimit/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod adapter;
mod cleanup;
mod error;
mod key;
mod limiter;
mod memory;
mod record;
#[cfg(feature = "redis")]
mod redis;

pub use adapter::{SharedStore, StorageAdapter};
pub use cleanup::CleanupTask;
pub use error::{RateLimitError, RateLimitResult};
pub use key::{base_context, hash_ip, ip_context};
pub use limiter::{Limit, RateLimitInfo, RateLimiter};
pub use memory::MemoryStore;
pub use record::RateLimitRecord;
#[cfg(feature = "redis")]
pub use redis::{RedisStore, DEFAULT_KEY_PREFIX};

/// Rate limit response header names.
pub mod headers {
    /// Maximum requests allowed in the window.
    pub const LIMIT: &str = "x-ratelimit-limit";
    /// Remaining requests in the current window.
    pub const REMAINING: &str = "x-ratelimit-remaining";
    /// Seconds until the window resets.
    pub const RESET_AFTER: &str = "x-ratelimit-reset-after";
    /// Seconds to wait before retrying.
    pub const RETRY_AFTER: &str = "retry-after";
}
