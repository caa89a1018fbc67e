//! Error types for Bamboo.
//!
//! Two layers of error exist:
//!
//! - [`HandlerError`] is what application pipes and handlers return. It is
//!   never caught by the dispatch core; it travels back to the caller of the
//!   dispatch entrypoint.
//! - [`BambooError`] is what the dispatch entrypoints return. Runtimes use
//!   [`BambooError::status_code`] to turn it into a response.

use http::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Result type alias using [`BambooError`].
pub type BambooResult<T> = Result<T, BambooError>;

/// Result type returned by pipes and handlers.
///
/// On success the (possibly modified) context is handed back so the next
/// unit of the chain can continue with it.
pub type HandlerResult<C> = Result<C, HandlerError>;

/// Error raised by an application pipe or handler.
///
/// # Example
///
/// ```
/// use bamboo_core::HandlerError;
///
/// fn load(id: &str) -> Result<u64, HandlerError> {
///     id.parse::<u64>().map_err(HandlerError::custom)
/// }
///
/// assert!(load("42").is_ok());
/// assert!(load("nope").is_err());
/// ```
#[derive(Error, Debug)]
pub enum HandlerError {
    /// A plain error message.
    #[error("{0}")]
    Message(String),

    /// JSON serialization or deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Any other error.
    #[error(transparent)]
    Custom(Box<dyn std::error::Error + Send + Sync>),
}

impl HandlerError {
    /// Creates an error from a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    /// Wraps an arbitrary error.
    pub fn custom<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Custom(Box::new(error))
    }
}

/// Error returned from the dispatch entrypoints.
#[derive(Error, Debug)]
pub enum BambooError {
    /// A pipe or handler failed.
    #[error("handler failed: {0}")]
    Handler(#[from] HandlerError),

    /// Dispatch did not finish within the configured request timeout.
    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
}

impl BambooError {
    /// Returns the HTTP status a runtime should answer with for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Handler(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}
