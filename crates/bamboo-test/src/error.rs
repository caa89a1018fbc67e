//! Test error types.

use bamboo_core::BambooError;
use thiserror::Error;

/// Errors that can occur while driving an engine in a test.
#[derive(Debug, Error)]
pub enum TestError {
    /// The request could not be built.
    #[error("request build error: {0}")]
    RequestBuild(String),

    /// A header name or value was invalid.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// The response body could not be read.
    #[error("body read error: {0}")]
    BodyRead(String),

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The engine returned an error instead of a response.
    #[error("dispatch error: {0}")]
    Dispatch(#[from] BambooError),
}
