//! Layered configuration loading.

use std::env;
use std::fs;
use std::path::Path;

use serde_json::Value;

use bamboo_middleware::LockPolicy;
use bamboo_telemetry::LogFormat;

use crate::config::BambooConfig;
use crate::error::{ConfigError, ConfigResult};
use crate::schema::StorageBackend;

/// Builds a [`BambooConfig`] from layered sources.
///
/// Later layers override earlier ones key by key:
/// 1. Defaults (or a preset)
/// 2. Files and strings, in the order they are added
/// 3. Environment variables `PREFIX__SECTION__KEY`
///
/// A `.env` file can feed step 3 through [`with_dotenv`](Self::with_dotenv).
///
/// ```
/// use bamboo_config::ConfigLoader;
///
/// let config = ConfigLoader::new()
///     .with_string("[rate_limit]\ndefault_limit = 10", "toml")?
///     .with_string(r#"{"realtime": {"require_token": true}}"#, "json")?
///     .load()?;
///
/// assert_eq!(config.rate_limit.default_limit, 10);
/// assert!(config.realtime.require_token);
/// assert_eq!(config.realtime.upgrade_path, "/ws");
/// # Ok::<(), bamboo_config::ConfigError>(())
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    layers: Value,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a loader seeded with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            layers: seed(&BambooConfig::default()),
            env_prefix: None,
        }
    }

    /// Resets to default values, dropping earlier layers.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.layers = seed(&BambooConfig::default());
        self
    }

    /// Resets to the development preset.
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.layers = seed(&BambooConfig::development());
        self
    }

    /// Resets to the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.layers = seed(&BambooConfig::production());
        self
    }

    /// Layers a `.toml` or `.json` file, chosen by extension.
    ///
    /// Fails if the file is missing, unreadable, malformed or has unknown keys.
    pub fn with_file<P: AsRef<Path>>(self, path: P) -> ConfigResult<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .ok_or_else(|| ConfigError::UnsupportedFormat(path.display().to_string()))?;

        self.with_string(&content, &format)
    }

    /// Like [`with_file`](Self::with_file), but a missing file is skipped.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> ConfigResult<Self> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Layers configuration text in `format` (`"toml"` or `"json"`).
    pub fn with_string(mut self, content: &str, format: &str) -> ConfigResult<Self> {
        let layer: Value = match format.to_lowercase().as_str() {
            "toml" => {
                toml::from_str::<BambooConfig>(content)?;
                toml::from_str(content)?
            }
            "json" => {
                serde_json::from_str::<BambooConfig>(content)?;
                serde_json::from_str(content)?
            }
            other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
        };

        merge(&mut self.layers, layer);
        Ok(self)
    }

    /// Enables environment overrides under `prefix`.
    ///
    /// With prefix `BAMBOO`, `BAMBOO__REALTIME__REQUIRE_TOKEN=true` sets
    /// `realtime.require_token`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Loads variables from a `.env` file in the working directory, if any.
    #[must_use]
    pub fn with_dotenv(self) -> Self {
        let _ = dotenvy::dotenv();
        self
    }

    /// Applies environment overrides and validates.
    pub fn load(self) -> ConfigResult<BambooConfig> {
        let config = self.load_unvalidated()?;
        config.validate()?;
        Ok(config)
    }

    /// Applies environment overrides without validating.
    pub fn load_unvalidated(self) -> ConfigResult<BambooConfig> {
        let mut config: BambooConfig = serde_json::from_value(self.layers)?;
        if let Some(prefix) = &self.env_prefix {
            let vars: Vec<(String, String)> = env::vars()
                .filter(|(k, _)| k.starts_with(prefix.as_str()))
                .collect();
            for (key, value) in vars {
                apply_env_var(&mut config, &key, &value, prefix)?;
            }
        }
        Ok(config)
    }
}

fn seed(config: &BambooConfig) -> Value {
    serde_json::to_value(config).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
}

/// Recursively overlays `overlay` onto `base`. Objects merge key by key;
/// anything else replaces.
fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                merge(base.entry(key).or_insert(Value::Null), value);
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn apply_env_var(config: &mut BambooConfig, key: &str, value: &str, prefix: &str) -> ConfigResult<()> {
    let Some(rest) = key.strip_prefix(prefix).and_then(|k| k.strip_prefix("__")) else {
        return Ok(());
    };
    let parts: Vec<&str> = rest.split("__").collect();

    match parts.as_slice() {
        ["SERVER", "REQUEST_TIMEOUT_MS"] => {
            config.server.request_timeout_ms = parse_int(key, value)?;
        }
        ["SERVER", "LOCK_POLICY"] => {
            config.server.lock_policy = match value.to_lowercase().as_str() {
                "abort" => LockPolicy::Abort,
                "advisory" => LockPolicy::Advisory,
                _ => return Err(ConfigError::env_parse_error(key, "expected 'abort' or 'advisory'")),
            };
        }

        ["REALTIME", "REQUIRE_TOKEN"] => config.realtime.require_token = parse_flag(key, value)?,
        ["REALTIME", "TOKEN_PARAM"] => config.realtime.token_param = value.to_string(),
        ["REALTIME", "UPGRADE_PATH"] => config.realtime.upgrade_path = value.to_string(),
        ["REALTIME", "CONNECTED_ACK"] => config.realtime.connected_ack = parse_flag(key, value)?,
        ["REALTIME", "MAX_MESSAGE_BYTES"] => {
            config.realtime.max_message_bytes = parse_int(key, value)?;
        }

        ["RATE_LIMIT", "DEFAULT_LIMIT"] => config.rate_limit.default_limit = parse_int(key, value)?,
        ["RATE_LIMIT", "DEFAULT_INTERVAL_MS"] => {
            config.rate_limit.default_interval_ms = parse_int(key, value)?;
        }
        ["RATE_LIMIT", "CLEANUP_INTERVAL_MS"] => {
            config.rate_limit.cleanup_interval_ms = parse_int(key, value)?;
        }
        ["RATE_LIMIT", "BACKEND"] => {
            config.rate_limit.backend = match value.to_lowercase().as_str() {
                "memory" => StorageBackend::Memory,
                "redis" => StorageBackend::Redis,
                _ => return Err(ConfigError::env_parse_error(key, "expected 'memory' or 'redis'")),
            };
        }
        ["RATE_LIMIT", "REDIS_URL"] => {
            config.rate_limit.redis_url = if value.is_empty() {
                None
            } else {
                Some(value.to_string())
            };
        }
        ["RATE_LIMIT", "KEY_PREFIX"] => config.rate_limit.key_prefix = value.to_string(),

        ["LOGGING", "LEVEL"] => config.logging.level = value.to_string(),
        ["LOGGING", "FORMAT"] => {
            config.logging.format = match value.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" => LogFormat::Pretty,
                "compact" => LogFormat::Compact,
                _ => {
                    return Err(ConfigError::env_parse_error(
                        key,
                        "expected 'json', 'pretty' or 'compact'",
                    ))
                }
            };
        }
        ["LOGGING", "ANSI"] => config.logging.ansi = parse_flag(key, value)?,

        // Unrelated variables sharing the prefix are ignored.
        _ => {}
    }

    Ok(())
}

fn parse_int<T: std::str::FromStr>(key: &str, value: &str) -> ConfigResult<T> {
    value
        .parse()
        .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))
}

fn parse_flag(key: &str, value: &str) -> ConfigResult<bool> {
    parse_bool(value).ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))
}

/// Parse a boolean from a string.
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_loader_new() {
        let config = ConfigLoader::new().load().unwrap();
        assert_eq!(config, BambooConfig::default());
    }

    #[test]
    fn test_loader_presets() {
        let config = ConfigLoader::new().with_development().load().unwrap();
        assert_eq!(config.logging.level, "debug");

        let config = ConfigLoader::new().with_production().load().unwrap();
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(config.realtime.require_token);
    }

    #[test]
    fn test_layers_merge_key_by_key() {
        let config = ConfigLoader::new()
            .with_development()
            .with_string("[logging]\nformat = \"compact\"", "toml")
            .unwrap()
            .load()
            .unwrap();

        assert_eq!(config.logging.format, LogFormat::Compact);
        // Preset value survives a partial override of the same section.
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_unknown_key_rejected_early() {
        let result = ConfigLoader::new().with_string("[server]\nport = 80", "toml");
        assert!(matches!(result, Err(ConfigError::TomlError(_))));

        let result = ConfigLoader::new().with_string(r#"{"realtime": {"tokens": 1}}"#, "json");
        assert!(matches!(result, Err(ConfigError::JsonError(_))));
    }

    #[test]
    fn test_unsupported_format() {
        let result = ConfigLoader::new().with_string("a: 1", "yaml");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_with_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[rate_limit]\ndefault_limit = 5\ncleanup_interval_ms = 0").unwrap();

        let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();
        assert_eq!(config.rate_limit.default_limit, 5);
        assert_eq!(config.rate_limit.cleanup_interval_ms, 0);
    }

    #[test]
    fn test_with_file_not_found() {
        let result = ConfigLoader::new().with_file("/nonexistent/bamboo.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn test_with_optional_file_not_found() {
        let config = ConfigLoader::new()
            .with_optional_file("/nonexistent/bamboo.toml")
            .unwrap()
            .load()
            .unwrap();
        assert_eq!(config, BambooConfig::default());
    }

    #[test]
    fn test_load_validates() {
        let loader = ConfigLoader::new()
            .with_string("[realtime]\nupgrade_path = \"ws\"", "toml")
            .unwrap();
        assert!(loader.load().is_err());

        let loader = ConfigLoader::new()
            .with_string("[realtime]\nupgrade_path = \"ws\"", "toml")
            .unwrap();
        assert_eq!(loader.load_unvalidated().unwrap().realtime.upgrade_path, "ws");
    }

    #[test]
    fn test_apply_env_var() {
        let mut config = BambooConfig::default();
        apply_env_var(&mut config, "T__SERVER__REQUEST_TIMEOUT_MS", "0", "T").unwrap();
        apply_env_var(&mut config, "T__SERVER__LOCK_POLICY", "advisory", "T").unwrap();
        apply_env_var(&mut config, "T__REALTIME__REQUIRE_TOKEN", "yes", "T").unwrap();
        apply_env_var(&mut config, "T__RATE_LIMIT__BACKEND", "redis", "T").unwrap();
        apply_env_var(&mut config, "T__RATE_LIMIT__REDIS_URL", "redis://cache", "T").unwrap();
        apply_env_var(&mut config, "T__LOGGING__FORMAT", "pretty", "T").unwrap();

        assert_eq!(config.server.request_timeout_ms, 0);
        assert_eq!(config.server.lock_policy, LockPolicy::Advisory);
        assert!(config.realtime.require_token);
        assert_eq!(config.rate_limit.backend, StorageBackend::Redis);
        assert_eq!(config.rate_limit.redis_url.as_deref(), Some("redis://cache"));
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_apply_env_var_errors() {
        let mut config = BambooConfig::default();
        assert!(apply_env_var(&mut config, "T__RATE_LIMIT__DEFAULT_LIMIT", "lots", "T").is_err());
        assert!(apply_env_var(&mut config, "T__REALTIME__CONNECTED_ACK", "maybe", "T").is_err());
        assert!(apply_env_var(&mut config, "T__UNKNOWN__KEY", "x", "T").is_ok());
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("on"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_merge_replaces_scalars() {
        let mut base = serde_json::json!({"a": {"b": 1, "c": 2}});
        merge(&mut base, serde_json::json!({"a": {"c": 3}}));
        assert_eq!(base, serde_json::json!({"a": {"b": 1, "c": 3}}));
    }
}
