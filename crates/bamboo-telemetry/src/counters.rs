//! Counter names and descriptions.

use metrics::{describe_counter, Unit};

/// Metric names emitted by Bamboo crates.
pub mod names {
    /// HTTP requests dispatched, labelled by `method` and `status`.
    pub const HTTP_REQUESTS_TOTAL: &str = "bamboo_http_requests_total";
    /// WebSocket messages dispatched, labelled by `event`.
    pub const WS_MESSAGES_TOTAL: &str = "bamboo_ws_messages_total";
    /// WebSocket connections refused at open, labelled by `reason`.
    pub const WS_REJECTED_TOTAL: &str = "bamboo_ws_rejected_total";
    /// Rate-limit checks that exceeded their limit, labelled by `context`.
    pub const RATELIMIT_EXCEEDED_TOTAL: &str = "bamboo_ratelimit_exceeded_total";
}

/// Registers descriptions for every Bamboo counter with the installed
/// recorder. Harmless when no recorder is installed.
pub fn describe_metrics() {
    describe_counter!(
        names::HTTP_REQUESTS_TOTAL,
        Unit::Count,
        "HTTP requests dispatched"
    );
    describe_counter!(
        names::WS_MESSAGES_TOTAL,
        Unit::Count,
        "WebSocket messages dispatched"
    );
    describe_counter!(
        names::WS_REJECTED_TOTAL,
        Unit::Count,
        "WebSocket connections refused at open"
    );
    describe_counter!(
        names::RATELIMIT_EXCEEDED_TOTAL,
        Unit::Count,
        "Rate-limit checks over their limit"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_without_recorder() {
        describe_metrics();
    }

    #[test]
    fn test_names_are_prefixed() {
        for name in [
            names::HTTP_REQUESTS_TOTAL,
            names::WS_MESSAGES_TOTAL,
            names::WS_REJECTED_TOTAL,
            names::RATELIMIT_EXCEEDED_TOTAL,
        ] {
            assert!(name.starts_with("bamboo_"));
            assert!(name.ends_with("_total"));
        }
    }
}
