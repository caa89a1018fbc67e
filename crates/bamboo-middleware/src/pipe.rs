//! The pipe type.

use std::fmt;
use std::future::Future;

use bamboo_core::HandlerResult;

use crate::error::{PipeError, PipeResult};
use crate::handler::{handler_fn, Handler};

/// A named middleware unit with optional nested pipes.
///
/// Nested pipes always run before this pipe's own handler. Building a pipe
/// with an empty name fails.
pub struct Pipe<C> {
    name: String,
    handler: Handler<C>,
    pipes: Vec<Pipe<C>>,
}

impl<C: Send + 'static> Pipe<C> {
    /// Creates a pipe from an async closure.
    pub fn new<F, Fut>(name: impl Into<String>, handler: F) -> PipeResult<Self>
    where
        F: Fn(C) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<C>> + Send + 'static,
    {
        Self::from_handler(name, handler_fn(handler))
    }

    /// Creates a pipe from an already erased handler.
    pub fn from_handler(name: impl Into<String>, handler: Handler<C>) -> PipeResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(PipeError::EmptyName);
        }
        Ok(Self {
            name,
            handler,
            pipes: Vec::new(),
        })
    }
}

impl<C> Pipe<C> {
    /// Appends nested pipes that run before this pipe's handler.
    pub fn with_pipes(mut self, pipes: impl IntoIterator<Item = Pipe<C>>) -> Self {
        self.pipes.extend(pipes);
        self
    }

    /// The pipe's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Nested pipes, in execution order.
    pub fn pipes(&self) -> &[Pipe<C>] {
        &self.pipes
    }

    /// The pipe's own handler.
    pub fn handler(&self) -> &Handler<C> {
        &self.handler
    }
}

impl<C> Clone for Pipe<C> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            handler: self.handler.clone(),
            pipes: self.pipes.clone(),
        }
    }
}

impl<C> fmt::Debug for Pipe<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipe")
            .field("name", &self.name)
            .field("pipes", &self.pipes)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(name: &str) -> PipeResult<Pipe<u8>> {
        Pipe::new(name, |n: u8| async move { Ok(n) })
    }

    #[test]
    fn test_empty_name_rejected() {
        assert_eq!(noop("").unwrap_err(), PipeError::EmptyName);
        assert_eq!(noop("   ").unwrap_err(), PipeError::EmptyName);
    }

    #[test]
    fn test_nested_pipes_keep_order() {
        let pipe = noop("outer")
            .unwrap()
            .with_pipes([noop("a").unwrap(), noop("b").unwrap()])
            .with_pipes([noop("c").unwrap()]);
        let names: Vec<_> = pipe.pipes().iter().map(Pipe::name).collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[test]
    fn test_debug_shows_name() {
        let pipe = noop("cors").unwrap();
        assert!(format!("{pipe:?}").contains("cors"));
    }
}
