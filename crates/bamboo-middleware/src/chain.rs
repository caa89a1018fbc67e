//! Chain execution.

use serde::{Deserialize, Serialize};
use tracing::trace;

use bamboo_core::{BoxFuture, HandlerResult};

use crate::handler::Handler;
use crate::pipe::Pipe;

/// A context that can be threaded through a pipe chain.
pub trait PipeContext: Send + 'static {
    /// Returns `true` once a response has been committed.
    fn is_locked(&self) -> bool;
}

/// What the executor does once a context is locked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockPolicy {
    /// Stop the chain: no further pipe or handler runs.
    #[default]
    Abort,
    /// Keep running; each unit checks the lock itself.
    Advisory,
}

impl LockPolicy {
    /// Returns `true` if the chain must stop for this context.
    pub fn halts<C: PipeContext>(self, ctx: &C) -> bool {
        self == Self::Abort && ctx.is_locked()
    }
}

/// Runs `pipes` in order against `ctx`.
///
/// Each pipe's nested pipes run first, depth-first and pre-order, then the
/// pipe's own handler. The first error aborts the chain and is returned.
pub async fn compose<C: PipeContext>(
    ctx: C,
    pipes: &[Pipe<C>],
    policy: LockPolicy,
) -> HandlerResult<C> {
    let mut ctx = ctx;
    for pipe in pipes {
        if policy.halts(&ctx) {
            break;
        }
        ctx = run_pipe(pipe, ctx, policy).await?;
    }
    Ok(ctx)
}

/// Runs a terminal handler unless the policy halts the chain.
pub async fn run_handler<C: PipeContext>(
    ctx: C,
    handler: &Handler<C>,
    policy: LockPolicy,
) -> HandlerResult<C> {
    if policy.halts(&ctx) {
        return Ok(ctx);
    }
    handler(ctx).await
}

fn run_pipe<'a, C: PipeContext>(
    pipe: &'a Pipe<C>,
    ctx: C,
    policy: LockPolicy,
) -> BoxFuture<'a, HandlerResult<C>> {
    Box::pin(async move {
        let mut ctx = ctx;
        for nested in pipe.pipes() {
            if policy.halts(&ctx) {
                return Ok(ctx);
            }
            ctx = run_pipe(nested, ctx, policy).await?;
        }
        if policy.halts(&ctx) {
            return Ok(ctx);
        }
        trace!(pipe = %pipe.name(), "running pipe");
        (pipe.handler())(ctx).await
    })
}
