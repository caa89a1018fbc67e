//! Wire format of realtime messages.
//!
//! Both directions use the envelope `{"event": string, "data": any}`.
//! Inbound text that is not such an envelope is taken as a bare event name.

use serde::Serialize;
use serde_json::Value;

/// Event sent to a connection right after it is accepted.
pub const CONNECTED_EVENT: &str = "connected";

/// Prefix of the per-token topic every tokened connection joins.
pub const CLIENT_TOPIC_PREFIX: &str = "client:";

/// Topic addressing the connection that opened with `token`.
///
/// ```
/// assert_eq!(bamboo_realtime::client_topic("abc"), "client:abc");
/// ```
pub fn client_topic(token: &str) -> String {
    format!("{CLIENT_TOPIC_PREFIX}{token}")
}

/// An outbound frame.
#[derive(Debug, Serialize)]
pub struct Frame<'a, T: Serialize> {
    /// Event name.
    pub event: &'a str,
    /// Payload.
    pub data: T,
}

impl<'a, T: Serialize> Frame<'a, T> {
    /// Creates a frame.
    pub fn new(event: &'a str, data: T) -> Self {
        Self { event, data }
    }

    /// Encodes the frame as JSON text.
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// A decoded inbound message.
#[derive(Debug, Clone, PartialEq)]
pub struct Inbound {
    /// Event name used to pick the handler.
    pub event: String,
    /// Payload; `Null` when absent.
    pub data: Value,
}

impl Inbound {
    /// Decodes raw message text. Never fails.
    pub fn parse(raw: &str) -> Self {
        if let Ok(Value::Object(mut map)) = serde_json::from_str::<Value>(raw) {
            if let Some(Value::String(event)) = map.remove("event") {
                return Self {
                    event,
                    data: map.remove("data").unwrap_or(Value::Null),
                };
            }
        }
        Self {
            event: raw.to_string(),
            data: Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_envelope() {
        let msg = Inbound::parse(r#"{"event":"auth","data":{"token":"t"}}"#);
        assert_eq!(msg.event, "auth");
        assert_eq!(msg.data, json!({"token": "t"}));
    }

    #[test]
    fn test_parse_envelope_without_data() {
        let msg = Inbound::parse(r#"{"event":"ping"}"#);
        assert_eq!(msg.event, "ping");
        assert_eq!(msg.data, Value::Null);
    }

    #[test]
    fn test_parse_bare_name() {
        let msg = Inbound::parse("ping");
        assert_eq!(msg.event, "ping");
        assert_eq!(msg.data, Value::Null);
    }

    #[test]
    fn test_malformed_json_is_bare_name() {
        let raw = r#"{"event": "auth""#;
        assert_eq!(Inbound::parse(raw).event, raw);
    }

    #[test]
    fn test_object_without_string_event_is_bare_name() {
        let raw = r#"{"event": 5}"#;
        assert_eq!(Inbound::parse(raw).event, raw);
    }

    #[test]
    fn test_encode_frame() {
        let text = Frame::new("connected", json!({"timestamp": 1})).encode().unwrap();
        assert_eq!(text, r#"{"event":"connected","data":{"timestamp":1}}"#);
    }
}
