//! Pipe construction errors.

use thiserror::Error;

/// Result type alias using [`PipeError`].
pub type PipeResult<T> = Result<T, PipeError>;

/// Errors raised while building pipes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipeError {
    /// Pipes must be named; the name shows up in diagnostics.
    #[error("pipe name must not be empty")]
    EmptyName,

    /// A pipe's own settings were rejected.
    #[error("invalid pipe '{name}': {reason}")]
    Invalid {
        /// Name the pipe would have had.
        name: String,
        /// What was wrong.
        reason: &'static str,
    },
}
