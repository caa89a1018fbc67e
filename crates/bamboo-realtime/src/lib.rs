//! # Bamboo Realtime
//!
//! Persistent-connection sessions for Bamboo.
//!
//! The network runtime owns the sockets and reports three things through
//! [`Realtime`]: a connection opened, a text message arrived, a connection
//! closed. Everything in between lives here:
//!
//! - [`SessionRegistry`] keeps at most one session per client token
//! - [`TopicHub`] fans frames out to topic subscribers
//! - [`Presence`] records who is in each room and since when
//! - [`EventRegistry`] maps event names to [`EventAction`]s
//! - [`MessageContext`] is what pipes and handlers see for one message
//!
//! ## Wire format
//!
//! Frames are UTF-8 JSON envelopes `{"event": "...", "data": ...}` in both
//! directions. Inbound text that is not an envelope is used verbatim as the
//! event name, with no data.
//!
//! ## Lifecycle
//!
//! On open a tokened connection joins the topic `client:<token>` and receives
//! `{"event":"connected","data":{"timestamp":<ms>}}` before the open hook
//! runs. A second connection with a live token is terminated and the first
//! one is left alone.
//!
//! ```
//! use std::sync::Arc;
//! use bamboo_core::Services;
//! use bamboo_ratelimit::RateLimiter;
//! use bamboo_realtime::{
//!     EventAction, EventHandler, MessageContext, MockConnection, Realtime, RealtimeOptions,
//!     SharedConnection,
//! };
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let realtime = Realtime::new(
//!     RealtimeOptions::default(),
//!     Arc::new(RateLimiter::in_memory()),
//!     Arc::new(Services::new()),
//! );
//! realtime
//!     .register(
//!         EventAction::new(
//!             "ping",
//!             EventHandler::raw(|mut ctx: MessageContext| async move {
//!                 ctx.json("pong")?;
//!                 Ok(ctx)
//!             }),
//!         )
//!         .unwrap(),
//!     )
//!     .unwrap();
//!
//! let mock = Arc::new(MockConnection::with_token("abc"));
//! let conn: SharedConnection = mock.clone();
//! assert!(realtime.handle_open(conn.clone()).await.unwrap());
//! realtime.handle_message(&conn, "ping").await.unwrap();
//!
//! assert_eq!(mock.frames_for("ping")[0]["data"], "pong");
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/bamboo-realtime/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod connection;
mod context;
mod error;
mod event;
mod frame;
mod hub;
mod mock;
mod presence;
mod realtime;
mod registry;
pub mod rooms;
mod session;

pub use connection::{Connection, ConnectionId, SharedConnection};
pub use context::{MessageContext, DEFAULT_ERROR_CODE, DEFAULT_ERROR_MESSAGE, INVALID_PAYLOAD_CODE};
pub use error::{RealtimeError, RealtimeResult};
pub use event::{EventAction, EventHandler, EventRegistry};
pub use frame::{client_topic, Frame, Inbound, CLIENT_TOPIC_PREFIX, CONNECTED_EVENT};
pub use hub::TopicHub;
pub use mock::MockConnection;
pub use presence::{Presence, PresenceEntry, PRESENCE_JOIN_EVENT, PRESENCE_LEAVE_EVENT};
pub use realtime::{open_hook_fn, OpenHook, Realtime, RealtimeOptions};
pub use registry::{Rejection, SessionRegistry};
pub use session::Session;
