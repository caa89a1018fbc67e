//! Observability setup for Bamboo services.
//!
//! Bamboo crates log through `tracing` and count through the `metrics`
//! facade. This crate installs the log subscriber and describes the
//! counters; exporting metrics is left to the application, which installs
//! whatever `metrics` recorder it likes.
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `bamboo_http_requests_total` | Counter | `method`, `status` | Dispatched HTTP requests |
//! | `bamboo_ws_messages_total` | Counter | `event` | Dispatched WebSocket messages |
//! | `bamboo_ws_rejected_total` | Counter | `reason` | Refused WebSocket connections |
//! | `bamboo_ratelimit_exceeded_total` | Counter | `context` | Hits over the configured limit |
//!
//! # Example
//!
//! ```rust,no_run
//! use bamboo_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development()).expect("logging");
//! tracing::info!(method = "GET", path = "/health", "ready");
//! ```

#![doc(html_root_url = "https://docs.rs/bamboo-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
pub mod logging;
mod counters;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{create_env_filter, fields, init_logging, LogConfig, LogFormat};
pub use counters::{describe_metrics, names};
