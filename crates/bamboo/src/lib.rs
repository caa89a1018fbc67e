//! # Bamboo
//!
//! **Request dispatch, realtime sessions and rate limiting in one engine**
//!
//! Bamboo routes HTTP requests through ordered pipes to action handlers,
//! manages authenticated WebSocket sessions with topic fan-out, and counts
//! requests in fixed windows over a pluggable store. A runtime owns the
//! sockets and feeds the [`Engine`](server::Engine); Bamboo does the rest.
//!
//! ## Quick Start
//!
//! ```
//! use bamboo::prelude::*;
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::new().with_development().load()?;
//!
//! let engine = EngineBuilder::from_config(config)
//!     .action(Action::get("/hello/:name", |mut ctx: RequestContext| async move {
//!         let name = ctx.param("name").unwrap_or_default();
//!         ctx.json(json!({ "greeting": format!("hello {name}") }), StatusCode::OK)?;
//!         Ok(ctx)
//!     })?)
//!     .event(EventAction::new(
//!         "ping",
//!         EventHandler::raw(|mut ctx: MessageContext| async move {
//!             ctx.json(json!({ "pong": true }))?;
//!             Ok(ctx)
//!         }),
//!     )?)
//!     .build()?;
//!
//! assert_eq!(engine.routes().len(), 1);
//! assert_eq!(engine.events(), vec!["ping"]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! HTTP request → global pipes → route ─┬─ none  → 404
//!                                      └─ match → action pipes → handler → response
//!
//! WS message → parse → event ─┬─ none  → dropped
//!                             └─ match → ws pipes → event pipes → handler → frames
//! ```
//!
//! | Crate | Concern |
//! |-------|---------|
//! | [`core`] | errors, services, clock, stash |
//! | [`router`] | per-method prefix tree |
//! | [`middleware`] | pipes and lock policy |
//! | [`ratelimit`] | fixed-window counters and stores |
//! | [`realtime`] | sessions, topics and events |
//! | [`server`] | HTTP dispatch and the engine |
//! | [`config`] | layered configuration |
//! | [`telemetry`] | logging setup and metric names |

#![doc(html_root_url = "https://docs.rs/bamboo/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub use bamboo_config as config;
pub use bamboo_core as core;
pub use bamboo_middleware as middleware;
pub use bamboo_ratelimit as ratelimit;
pub use bamboo_realtime as realtime;
pub use bamboo_router as router;
pub use bamboo_server as server;
pub use bamboo_telemetry as telemetry;

/// Everything an application usually needs.
///
/// ```
/// use bamboo::prelude::*;
/// ```
pub mod prelude {
    pub use bamboo_config::{BambooConfig, ConfigLoader};
    pub use bamboo_core::{BambooError, BambooResult, HandlerError, HandlerResult, Services};
    pub use bamboo_middleware::{LockPolicy, Pipe};
    pub use bamboo_ratelimit::{Limit, RateLimiter};
    pub use bamboo_realtime::{
        EventAction, EventHandler, MessageContext, PresenceEntry, Session, SharedConnection,
    };
    pub use bamboo_server::{
        Action, ActionGroup, Engine, EngineBuilder, EngineError, RateLimitPipe, RequestContext,
    };
    pub use bamboo_server::{Method, Request, Response, StatusCode};
    pub use bamboo_telemetry::{init_logging, LogConfig};
}
