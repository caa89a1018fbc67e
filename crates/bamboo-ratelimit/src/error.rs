//! Rate limiter errors.
//!
//! Only construction can fail. Once a store is running, backend failures are
//! absorbed by the adapter.

use thiserror::Error;

/// Result type alias using [`RateLimitError`].
pub type RateLimitResult<T> = Result<T, RateLimitError>;

/// Errors raised while setting up rate limit storage.
#[derive(Error, Debug)]
pub enum RateLimitError {
    /// The storage backend could not be reached or configured.
    #[error("rate limit backend error: {0}")]
    Backend(String),
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for RateLimitError {
    fn from(err: redis::RedisError) -> Self {
        Self::Backend(err.to_string())
    }
}
