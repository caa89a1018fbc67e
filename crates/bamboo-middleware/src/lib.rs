//! # Bamboo Middleware
//!
//! Pipes are named, composable middleware units. A pipe owns a handler and
//! an ordered list of nested pipes that run, depth-first, before it:
//!
//! ```text
//! auth ─┬─ cors        runs: cors, session, auth, then the next pipe
//!       └─ session
//! ```
//!
//! Pipes are stateless. Everything they produce lives in the context that is
//! threaded through the chain: each pipe receives the context by value and
//! hands it back.
//!
//! A context that has committed a response is *locked*. Under
//! [`LockPolicy::Abort`] (the default) the executor stops the chain as soon as
//! the context is locked, so no later pipe or handler runs. Under
//! [`LockPolicy::Advisory`] every pipe and the handler still run and are
//! expected to check [`PipeContext::is_locked`] themselves.
//!
//! # Example
//!
//! ```
//! use bamboo_middleware::{compose, LockPolicy, Pipe, PipeContext};
//!
//! #[derive(Default)]
//! struct Ctx {
//!     log: Vec<&'static str>,
//!     locked: bool,
//! }
//!
//! impl PipeContext for Ctx {
//!     fn is_locked(&self) -> bool {
//!         self.locked
//!     }
//! }
//!
//! # tokio_test_block_on(async {
//! let cors = Pipe::new("cors", |mut ctx: Ctx| async move {
//!     ctx.log.push("cors");
//!     Ok(ctx)
//! })
//! .unwrap();
//! let auth = Pipe::new("auth", |mut ctx: Ctx| async move {
//!     ctx.log.push("auth");
//!     Ok(ctx)
//! })
//! .unwrap()
//! .with_pipes([cors]);
//!
//! let ctx = compose(Ctx::default(), &[auth], LockPolicy::Abort).await.unwrap();
//! assert_eq!(ctx.log, ["cors", "auth"]);
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/bamboo-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod chain;
mod error;
mod handler;
mod pipe;

pub use chain::{compose, run_handler, LockPolicy, PipeContext};
pub use error::{PipeError, PipeResult};
pub use handler::{handler_fn, Handler};
pub use pipe::Pipe;

pub use bamboo_core::{BoxFuture, HandlerError, HandlerResult};
