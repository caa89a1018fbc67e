//! # Bamboo Server
//!
//! HTTP dispatch and the [`Engine`] that ties the Bamboo crates together.
//!
//! The engine does not own sockets. A runtime accepts connections, hands
//! each HTTP request to [`Engine::handle_http`], and forwards WebSocket
//! lifecycle events to [`Engine::handle_ws_open`],
//! [`Engine::handle_ws_message`] and [`Engine::handle_ws_close`].
//!
//! ## Example
//!
//! ```
//! use std::time::Duration;
//! use bamboo_server::{Action, ActionGroup, EngineBuilder, RateLimitPipe, RequestContext};
//! use http::StatusCode;
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let show = Action::get("/users/:id", |mut ctx: RequestContext| async move {
//!     let id = ctx.param("id").unwrap_or_default();
//!     ctx.json(json!({ "id": id }), StatusCode::OK)?;
//!     Ok(ctx)
//! })?;
//!
//! let api = ActionGroup::new("/api")?
//!     .with_pipes([RateLimitPipe::builder("api")
//!         .limit(100)
//!         .window(Duration::from_secs(60))
//!         .build()?])
//!     .action(show);
//!
//! let engine = EngineBuilder::new().group(api).build()?;
//!
//! let request = http::Request::get("/api/users/7")
//!     .body(http_body_util::Full::default())?;
//! let response = engine.handle_http(request).await?;
//! assert_eq!(response.status(), StatusCode::OK);
//! # Ok(())
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/bamboo-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod action;
mod context;
mod engine;
mod error;
mod throttle;
mod types;

pub use action::{Action, ActionGroup};
pub use context::{RequestContext, NOT_IMPLEMENTED_BODY};
pub use engine::{Engine, EngineBuilder};
pub use error::{EngineError, EngineResult};
pub use throttle::{KeyStrategy, RateLimitPipe};
pub use types::{json_response, response, text_response, Request, Response};

pub use http::{Method, StatusCode};
