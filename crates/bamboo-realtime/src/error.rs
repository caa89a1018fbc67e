//! Error types for realtime operations.

use bamboo_core::HandlerError;
use thiserror::Error;

/// Result type for realtime operations.
pub type RealtimeResult<T> = Result<T, RealtimeError>;

/// Errors raised by the session registry and message contexts.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// An event name was registered twice.
    #[error("event '{0}' is already registered")]
    DuplicateEvent(String),

    /// An event was registered with an empty name.
    #[error("event name must not be empty")]
    EmptyEventName,

    /// Publishing to a topic the connection is not subscribed to.
    #[error("cannot publish to '{topic}': connection is not subscribed")]
    NotSubscribed {
        /// The topic.
        topic: String,
    },

    /// The runtime could not deliver a frame.
    #[error("failed to send frame: {0}")]
    SendFailed(String),

    /// A frame could not be encoded.
    #[error("failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),
}

impl RealtimeError {
    /// Creates a send failure.
    pub fn send_failed(reason: impl Into<String>) -> Self {
        Self::SendFailed(reason.into())
    }
}

impl From<RealtimeError> for HandlerError {
    fn from(err: RealtimeError) -> Self {
        match err {
            RealtimeError::Encode(e) => Self::Json(e),
            other => Self::custom(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_subscribed_display() {
        let err = RealtimeError::NotSubscribed {
            topic: "room:1".into(),
        };
        assert_eq!(
            err.to_string(),
            "cannot publish to 'room:1': connection is not subscribed"
        );
    }

    #[test]
    fn test_into_handler_error() {
        let err: HandlerError = RealtimeError::DuplicateEvent("auth".into()).into();
        assert!(matches!(err, HandlerError::Custom(_)));
        assert_eq!(err.to_string(), "event 'auth' is already registered");
    }
}
