//! Engine construction errors.
//!
//! Everything here is raised while the engine is being assembled. Errors
//! raised while serving requests are [`BambooError`](bamboo_core::BambooError)s.

use thiserror::Error;

use bamboo_config::ConfigError;
use bamboo_ratelimit::RateLimitError;
use bamboo_realtime::RealtimeError;
use bamboo_router::RouteError;

/// Result type alias using [`EngineError`].
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors raised while building an engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A route could not be registered.
    #[error(transparent)]
    Route(#[from] RouteError),

    /// An event could not be registered.
    #[error(transparent)]
    Realtime(#[from] RealtimeError),

    /// The rate-limit backend could not be reached.
    #[error(transparent)]
    RateLimit(#[from] RateLimitError),

    /// The configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An action group was declared without a scope.
    #[error("action group scope must not be empty")]
    EmptyScope,

    /// The configured storage backend is not available in this build.
    #[error("storage backend unavailable: {0}")]
    Storage(String),
}
