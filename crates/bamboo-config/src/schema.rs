//! Configuration sections.

use serde::{Deserialize, Serialize};

use bamboo_middleware::LockPolicy;
use bamboo_telemetry::{LogConfig, LogFormat};

/// HTTP dispatch settings.
///
/// ```
/// use bamboo_config::ServerSection;
///
/// let server = ServerSection::default();
/// assert_eq!(server.request_timeout_ms, 30_000);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    /// Per-request timeout in milliseconds; 0 disables it.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// What a locked context does to the rest of the chain.
    #[serde(default)]
    pub lock_policy: LockPolicy,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout(),
            lock_policy: LockPolicy::default(),
        }
    }
}

fn default_request_timeout() -> u64 {
    30_000
}

/// WebSocket session settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct RealtimeSection {
    /// Refuse connections that carry no token.
    pub require_token: bool,
    /// Query parameter holding the connection token.
    pub token_param: String,
    /// Path fragment that marks an upgrade request.
    pub upgrade_path: String,
    /// Send a `connected` frame when a session opens.
    pub connected_ack: bool,
    /// Inbound messages longer than this are dropped.
    pub max_message_bytes: usize,
}

impl Default for RealtimeSection {
    fn default() -> Self {
        Self {
            require_token: false,
            token_param: "token".to_string(),
            upgrade_path: "/ws".to_string(),
            connected_ack: true,
            max_message_bytes: 1024 * 1024,
        }
    }
}

/// Where rate-limit records live.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// In-process map.
    #[default]
    Memory,
    /// Shared Redis instance.
    Redis,
}

/// Rate limiting settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct RateLimitSection {
    /// Hits allowed per window when a context has no registered limit.
    pub default_limit: u64,
    /// Window length in milliseconds for the default limit.
    pub default_interval_ms: u64,
    /// How often expired records are swept; 0 disables the sweep.
    pub cleanup_interval_ms: u64,
    /// Storage backend.
    pub backend: StorageBackend,
    /// Connection URL for the Redis backend.
    pub redis_url: Option<String>,
    /// Prefix for every stored key.
    pub key_prefix: String,
}

impl Default for RateLimitSection {
    fn default() -> Self {
        Self {
            default_limit: 60,
            default_interval_ms: 60_000,
            cleanup_interval_ms: 60_000,
            backend: StorageBackend::Memory,
            redis_url: None,
            key_prefix: "rate_limit:".to_string(),
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSection {
    /// Filter directive.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
    /// Emit ANSI colours.
    pub ansi: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
            ansi: false,
        }
    }
}

impl LoggingSection {
    /// Converts the section into a [`LogConfig`] for `init_logging`.
    #[must_use]
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            level: self.level.clone(),
            format: self.format,
            ansi: self.ansi,
            ..LogConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_defaults() {
        let server = ServerSection::default();
        assert_eq!(server.request_timeout_ms, 30_000);
        assert_eq!(server.lock_policy, LockPolicy::Abort);
    }

    #[test]
    fn test_realtime_defaults() {
        let realtime = RealtimeSection::default();
        assert!(!realtime.require_token);
        assert_eq!(realtime.token_param, "token");
        assert_eq!(realtime.upgrade_path, "/ws");
        assert!(realtime.connected_ack);
        assert_eq!(realtime.max_message_bytes, 1_048_576);
    }

    #[test]
    fn test_rate_limit_defaults() {
        let rate_limit = RateLimitSection::default();
        assert_eq!(rate_limit.default_limit, 60);
        assert_eq!(rate_limit.default_interval_ms, 60_000);
        assert_eq!(rate_limit.backend, StorageBackend::Memory);
        assert_eq!(rate_limit.key_prefix, "rate_limit:");
    }

    #[test]
    fn test_partial_section_keeps_defaults() {
        let realtime: RealtimeSection = toml::from_str("require_token = true").unwrap();
        assert!(realtime.require_token);
        assert_eq!(realtime.upgrade_path, "/ws");
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: Result<RateLimitSection, _> = toml::from_str("burst = 5");
        assert!(result.is_err());
    }

    #[test]
    fn test_backend_and_policy_spelling() {
        let section: RateLimitSection = toml::from_str("backend = \"redis\"").unwrap();
        assert_eq!(section.backend, StorageBackend::Redis);

        let server: ServerSection = toml::from_str("lock_policy = \"advisory\"").unwrap();
        assert_eq!(server.lock_policy, LockPolicy::Advisory);
    }

    #[test]
    fn test_logging_to_log_config() {
        let section = LoggingSection {
            level: "debug".into(),
            format: LogFormat::Compact,
            ansi: true,
        };
        let config = section.to_log_config();
        assert_eq!(config.level, "debug");
        assert_eq!(config.format, LogFormat::Compact);
        assert!(config.ansi);
        assert!(config.enabled);
    }
}
