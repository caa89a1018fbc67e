//! Event handlers and the event-name registry.

use std::any::type_name;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::debug;

use bamboo_core::{BoxFuture, HandlerResult};
use bamboo_middleware::{handler_fn, Handler, Pipe};

use crate::context::{MessageContext, INVALID_PAYLOAD_CODE};
use crate::error::{RealtimeError, RealtimeResult};

/// How an event's payload reaches its handler.
#[derive(Clone)]
pub enum EventHandler {
    /// The handler reads the untyped payload from the context.
    Raw(Handler<MessageContext>),
    /// The payload is decoded into a declared type before the handler runs.
    Typed {
        /// Name of the payload type, for diagnostics.
        schema: &'static str,
        /// Decoding wrapper around the user handler.
        handler: Handler<MessageContext>,
    },
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw(_) => f.write_str("Raw"),
            Self::Typed { schema, .. } => f.debug_struct("Typed").field("schema", schema).finish(),
        }
    }
}

impl EventHandler {
    /// Wraps a handler that reads the payload itself.
    pub fn raw<F, Fut>(f: F) -> Self
    where
        F: Fn(MessageContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<MessageContext>> + Send + 'static,
    {
        Self::Raw(handler_fn(f))
    }

    /// Wraps a handler that receives the payload decoded as `T`.
    ///
    /// If decoding fails, the connection receives an error frame with code
    /// [`INVALID_PAYLOAD_CODE`] and `f` is not called.
    pub fn typed<T, F, Fut>(f: F) -> Self
    where
        T: DeserializeOwned + Send + 'static,
        F: Fn(MessageContext, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<MessageContext>> + Send + 'static,
    {
        let f = Arc::new(f);
        let handler: Handler<MessageContext> =
            Arc::new(move |ctx| -> BoxFuture<'static, HandlerResult<MessageContext>> {
                let f = Arc::clone(&f);
                Box::pin(async move {
                    match ctx.payload::<T>() {
                        Ok(payload) => f(ctx, payload).await,
                        Err(e) => reject_payload::<T>(ctx, &e),
                    }
                })
            });
        Self::Typed {
            schema: type_name::<T>(),
            handler,
        }
    }

    /// Payload type name for typed handlers.
    pub fn schema(&self) -> Option<&'static str> {
        match self {
            Self::Raw(_) => None,
            Self::Typed { schema, .. } => Some(schema),
        }
    }

    /// The erased handler the dispatcher runs.
    pub fn handler(&self) -> &Handler<MessageContext> {
        match self {
            Self::Raw(handler) | Self::Typed { handler, .. } => handler,
        }
    }
}

fn reject_payload<T>(
    mut ctx: MessageContext,
    error: &serde_json::Error,
) -> HandlerResult<MessageContext> {
    debug!(
        event = %ctx.event(),
        schema = type_name::<T>(),
        error = %error,
        "invalid event payload"
    );
    ctx.err(format!("Invalid payload: {error}"), INVALID_PAYLOAD_CODE)?;
    Ok(ctx)
}

/// A named event with its handler and own pipes.
#[derive(Debug, Clone)]
pub struct EventAction {
    name: String,
    handler: EventHandler,
    pipes: Vec<Pipe<MessageContext>>,
}

impl EventAction {
    /// Creates an action. Fails on an empty name.
    pub fn new(name: impl Into<String>, handler: EventHandler) -> RealtimeResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(RealtimeError::EmptyEventName);
        }
        Ok(Self {
            name,
            handler,
            pipes: Vec::new(),
        })
    }

    /// Appends pipes that run before the handler.
    pub fn with_pipes(mut self, pipes: impl IntoIterator<Item = Pipe<MessageContext>>) -> Self {
        self.pipes.extend(pipes);
        self
    }

    /// Event name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The handler.
    pub fn handler(&self) -> &EventHandler {
        &self.handler
    }

    /// Own pipes, in order.
    pub fn pipes(&self) -> &[Pipe<MessageContext>] {
        &self.pipes
    }
}

/// Flat map from event name to action.
#[derive(Debug, Default)]
pub struct EventRegistry {
    actions: HashMap<String, Arc<EventAction>>,
}

impl EventRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `action`. A name can only be registered once.
    pub fn register(&mut self, action: EventAction) -> RealtimeResult<()> {
        if self.actions.contains_key(action.name()) {
            return Err(RealtimeError::DuplicateEvent(action.name().to_string()));
        }
        self.actions
            .insert(action.name().to_string(), Arc::new(action));
        Ok(())
    }

    /// Looks an event up by exact name.
    pub fn resolve(&self, event: &str) -> Option<Arc<EventAction>> {
        self.actions.get(event).cloned()
    }

    /// Returns `true` if `event` is registered.
    pub fn contains(&self, event: &str) -> bool {
        self.actions.contains_key(event)
    }

    /// Registered event names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.actions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered events.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
