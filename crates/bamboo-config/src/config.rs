//! The root configuration type.

use serde::{Deserialize, Serialize};

use bamboo_telemetry::{create_env_filter, LogFormat};

use crate::error::{ConfigError, ConfigResult};
use crate::schema::{LoggingSection, RateLimitSection, RealtimeSection, ServerSection, StorageBackend};

/// Complete engine configuration.
///
/// Every section is optional in a file and unknown keys are rejected.
///
/// ```
/// use bamboo_config::BambooConfig;
///
/// let config = BambooConfig::default();
/// assert_eq!(config.realtime.upgrade_path, "/ws");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct BambooConfig {
    /// HTTP dispatch.
    #[serde(default)]
    pub server: ServerSection,

    /// WebSocket sessions.
    #[serde(default)]
    pub realtime: RealtimeSection,

    /// Rate limiting.
    #[serde(default)]
    pub rate_limit: RateLimitSection,

    /// Log output.
    #[serde(default)]
    pub logging: LoggingSection,
}

impl BambooConfig {
    /// Checks values that deserialize fine but cannot work.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.realtime.token_param.is_empty() {
            return Err(ConfigError::invalid_value(
                "realtime.token_param",
                "must not be empty",
            ));
        }

        if !self.realtime.upgrade_path.starts_with('/') {
            return Err(ConfigError::invalid_value(
                "realtime.upgrade_path",
                format!("must start with '/': {}", self.realtime.upgrade_path),
            ));
        }

        if self.realtime.max_message_bytes == 0 {
            return Err(ConfigError::invalid_value(
                "realtime.max_message_bytes",
                "must be greater than 0",
            ));
        }

        if self.rate_limit.default_limit == 0 {
            return Err(ConfigError::invalid_value(
                "rate_limit.default_limit",
                "must be greater than 0",
            ));
        }

        if self.rate_limit.default_interval_ms == 0 {
            return Err(ConfigError::invalid_value(
                "rate_limit.default_interval_ms",
                "must be greater than 0",
            ));
        }

        if self.rate_limit.backend == StorageBackend::Redis
            && self.rate_limit.redis_url.as_deref().map_or(true, str::is_empty)
        {
            return Err(ConfigError::invalid_value(
                "rate_limit.redis_url",
                "must be set when backend is 'redis'",
            ));
        }

        create_env_filter(&self.logging.level)
            .map_err(|e| ConfigError::invalid_value("logging.level", e.to_string()))?;

        Ok(())
    }

    /// Local development preset: pretty debug logs.
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;
        config.logging.ansi = true;
        config
    }

    /// Production preset: JSON info logs and mandatory tokens.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.logging.level = "info".to_string();
        config.logging.format = LogFormat::Json;
        config.logging.ansi = false;
        config.realtime.require_token = true;
        config
    }
}
