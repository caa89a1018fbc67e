//! # Bamboo Test
//!
//! In-memory testing for Bamboo engines: no sockets, no port binding.
//!
//! - [`TestClient`] sends HTTP requests through [`Engine::handle_http`](bamboo_server::Engine::handle_http)
//!   and opens WebSocket connections as [`MockConnection`]s.
//! - [`TestResponse`] buffers the response and offers chained assertions.
//! - [`TestSocket`] emits events and records the frames the engine sends back.
//! - [`ManualClock`] makes rate-limit windows and connection timestamps deterministic.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use bamboo_server::{Action, EngineBuilder, RateLimitPipe, RequestContext};
//! use bamboo_test::{ManualClock, TestClient};
//! use http::StatusCode;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let clock = Arc::new(ManualClock::new(0));
//! let ping = Action::get("/ping", |mut ctx: RequestContext| async move {
//!     ctx.text("pong", StatusCode::OK);
//!     Ok(ctx)
//! })?
//! .with_pipes([RateLimitPipe::builder("ping").limit(1).global().build()?]);
//!
//! let engine = EngineBuilder::new().clock(clock.clone()).action(ping).build()?;
//! let client = TestClient::new(engine);
//!
//! client.get("/ping").send().await.assert_status(StatusCode::OK);
//! client.get("/ping").send().await.assert_status(StatusCode::TOO_MANY_REQUESTS);
//!
//! clock.advance(Duration::from_secs(60));
//! client.get("/ping").send().await.assert_status(StatusCode::OK);
//! # Ok(())
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/bamboo-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod request;
mod response;
mod socket;

pub use client::{TestClient, TestClientRequest};
pub use error::TestError;
pub use request::TestRequestBuilder;
pub use response::TestResponse;
pub use socket::TestSocket;

pub use bamboo_core::ManualClock;
pub use bamboo_realtime::MockConnection;
