//! Layered configuration for Bamboo engines.
//!
//! [`BambooConfig`] holds four sections:
//!
//! - [`ServerSection`] - request timeout and lock policy
//! - [`RealtimeSection`] - token policy, upgrade path, message size cap
//! - [`RateLimitSection`] - default limit, cleanup period, storage backend
//! - [`LoggingSection`] - filter, format, colours
//!
//! [`ConfigLoader`] layers defaults, files, strings and environment
//! variables, then validates the result.
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! request_timeout_ms = 30000
//! lock_policy = "abort"
//!
//! [realtime]
//! require_token = true
//! token_param = "token"
//! upgrade_path = "/ws"
//!
//! [rate_limit]
//! default_limit = 60
//! default_interval_ms = 60000
//! backend = "redis"
//! redis_url = "redis://127.0.0.1:6379"
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```
//!
//! # Environment Variable Overrides
//!
//! `PREFIX__SECTION__KEY`, for example `BAMBOO__RATE_LIMIT__DEFAULT_LIMIT=100`.

#![doc(html_root_url = "https://docs.rs/bamboo-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::BambooConfig;
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use schema::{LoggingSection, RateLimitSection, RealtimeSection, ServerSection, StorageBackend};
