//! # Bamboo Core
//!
//! Core types shared by every Bamboo crate.
//!
//! - [`BambooError`] - Dispatch-time error with HTTP status mapping
//! - [`HandlerError`] - Error returned by pipes and handlers
//! - [`Stash`] - Per-request/per-message key/value scratch space
//! - [`Services`] - Typed registry of application services
//! - [`Clock`] - Millisecond wall clock, swappable in tests

#![doc(html_root_url = "https://docs.rs/bamboo-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod clock;
mod error;
mod services;
mod stash;

use std::future::Future;
use std::pin::Pin;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use error::{BambooError, BambooResult, HandlerError, HandlerResult};
pub use services::Services;
pub use stash::Stash;

/// A boxed, pinned, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
