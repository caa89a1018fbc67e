//! Type-erased async handlers.

use std::future::Future;
use std::sync::Arc;

use bamboo_core::{BoxFuture, HandlerResult};

/// An async function from context to context.
///
/// Used both for pipe handlers and for action handlers.
pub type Handler<C> = Arc<dyn Fn(C) -> BoxFuture<'static, HandlerResult<C>> + Send + Sync>;

/// Erases an async closure into a [`Handler`].
///
/// ```
/// use bamboo_middleware::{handler_fn, Handler};
///
/// let handler: Handler<u32> = handler_fn(|n: u32| async move { Ok(n + 1) });
/// # let _ = handler;
/// ```
pub fn handler_fn<C, F, Fut>(f: F) -> Handler<C>
where
    C: Send + 'static,
    F: Fn(C) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult<C>> + Send + 'static,
{
    Arc::new(move |ctx| -> BoxFuture<'static, HandlerResult<C>> { Box::pin(f(ctx)) })
}
