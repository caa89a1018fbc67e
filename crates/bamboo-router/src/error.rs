//! Route registration errors.
//!
//! All of these are configuration errors: they surface while the route table
//! is being built and are expected to abort start-up.

use thiserror::Error;

/// Result type alias using [`RouteError`].
pub type RouteResult<T> = Result<T, RouteError>;

/// Errors raised while registering routes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// The path string was empty.
    #[error("route path must not be empty")]
    EmptyPath,

    /// The path string could not be parsed.
    #[error("invalid route path '{path}': {reason}")]
    InvalidPath {
        /// The offending path.
        path: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The method string is not a valid HTTP method token.
    #[error("invalid HTTP method '{0}'")]
    InvalidMethod(String),

    /// A value is already registered at this method and path.
    #[error("route {method} {path} is already registered")]
    Conflict {
        /// HTTP method.
        method: String,
        /// Route path.
        path: String,
    },

    /// The same parameter position was named differently by two routes.
    #[error("route {method} {path}: parameter ':{new}' conflicts with existing ':{existing}'")]
    ParamConflict {
        /// HTTP method.
        method: String,
        /// Route path.
        path: String,
        /// Name already registered at this position.
        existing: String,
        /// Name the new route tried to use.
        new: String,
    },
}

impl RouteError {
    /// Creates an invalid path error.
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
