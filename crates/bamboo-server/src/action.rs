//! HTTP actions and action groups.

use std::fmt;
use std::future::Future;

use http::Method;

use bamboo_core::HandlerResult;
use bamboo_middleware::{handler_fn, Handler, Pipe};
use bamboo_router::{parse_method, parse_path, RouteError, Segment, ROOT_SEGMENT};

use crate::context::RequestContext;
use crate::error::{EngineError, EngineResult};

/// A route: method, path, handler and the pipes that run before it.
///
/// ```
/// use bamboo_server::{Action, RequestContext};
/// use http::StatusCode;
///
/// let health = Action::get("/health", |mut ctx: RequestContext| async move {
///     ctx.text("ok", StatusCode::OK);
///     Ok(ctx)
/// })?;
/// assert_eq!(health.path(), "/health");
///
/// let show = Action::parse("GET /users/:id", |ctx: RequestContext| async move { Ok(ctx) })?;
/// assert_eq!(show.method(), &http::Method::GET);
/// # Ok::<(), bamboo_server::EngineError>(())
/// ```
#[derive(Clone)]
pub struct Action {
    method: Method,
    path: String,
    segments: Vec<Segment>,
    handler: Handler<RequestContext>,
    pipes: Vec<Pipe<RequestContext>>,
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("pipes", &self.pipes)
            .finish_non_exhaustive()
    }
}

macro_rules! method_shorthand {
    ($($name:ident => $method:literal),* $(,)?) => {
        $(
            #[doc = concat!("Creates a `", $method, "` action.")]
            pub fn $name<F, Fut>(path: &str, f: F) -> EngineResult<Self>
            where
                F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
                Fut: Future<Output = HandlerResult<RequestContext>> + Send + 'static,
            {
                Self::new($method, path, f)
            }
        )*
    };
}

impl Action {
    /// Creates an action. The method is case-insensitive.
    pub fn new<F, Fut>(method: &str, path: &str, f: F) -> EngineResult<Self>
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<RequestContext>> + Send + 'static,
    {
        Self::from_handler(method, path, handler_fn(f))
    }

    /// Creates an action from an already erased handler.
    pub fn from_handler(method: &str, path: &str, handler: Handler<RequestContext>) -> EngineResult<Self> {
        Ok(Self {
            method: parse_method(method)?,
            path: path.to_string(),
            segments: parse_path(path)?,
            handler,
            pipes: Vec::new(),
        })
    }

    /// Creates an action from a definition such as `"POST /users"`.
    pub fn parse<F, Fut>(definition: &str, f: F) -> EngineResult<Self>
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<RequestContext>> + Send + 'static,
    {
        let mut words = definition.split_whitespace();
        let (Some(method), Some(path), None) = (words.next(), words.next(), words.next()) else {
            return Err(RouteError::invalid_path(definition, "expected '<METHOD> <path>'").into());
        };
        Self::new(method, path, f)
    }

    method_shorthand! {
        get => "GET",
        post => "POST",
        put => "PUT",
        patch => "PATCH",
        delete => "DELETE",
    }

    /// Appends pipes that run before the handler.
    pub fn with_pipes(mut self, pipes: impl IntoIterator<Item = Pipe<RequestContext>>) -> Self {
        self.pipes.extend(pipes);
        self
    }

    /// The HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The registration path.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub(crate) fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The handler.
    pub fn handler(&self) -> &Handler<RequestContext> {
        &self.handler
    }

    /// Pipes that run before the handler.
    pub fn pipes(&self) -> &[Pipe<RequestContext>] {
        &self.pipes
    }

    fn scoped(mut self, prefix: &[Segment], prefix_path: &str, pipes: &[Pipe<RequestContext>]) -> Self {
        if !prefix.is_empty() {
            let root = Segment::Literal(ROOT_SEGMENT.to_string());
            self.segments = prefix
                .iter()
                .chain(self.segments.iter().filter(|s| **s != root))
                .cloned()
                .collect();
            self.path = if self.path == "/" {
                prefix_path.to_string()
            } else {
                format!("{prefix_path}{}", self.path)
            };
        }
        if !pipes.is_empty() {
            self.pipes.splice(0..0, pipes.iter().cloned());
        }
        self
    }
}

/// A named set of actions sharing pipes and, optionally, a path prefix.
///
/// A scope starting with `/` is prepended to every member path. Any other
/// scope only names the group.
///
/// ```
/// use bamboo_server::{Action, ActionGroup, RequestContext};
///
/// let list = Action::get("/users", |ctx: RequestContext| async move { Ok(ctx) })?;
/// let group = ActionGroup::new("/api/v1")?.action(list);
///
/// let actions = group.into_actions();
/// assert_eq!(actions[0].path(), "/api/v1/users");
/// # Ok::<(), bamboo_server::EngineError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ActionGroup {
    scope: String,
    prefix: Vec<Segment>,
    actions: Vec<Action>,
    pipes: Vec<Pipe<RequestContext>>,
}

impl ActionGroup {
    /// Creates an empty group. An empty scope is an error.
    pub fn new(scope: impl Into<String>) -> EngineResult<Self> {
        let scope = scope.into();
        if scope.is_empty() {
            return Err(EngineError::EmptyScope);
        }

        let mut prefix = Vec::new();
        if scope.starts_with('/') {
            prefix = parse_path(&scope)?;
            if prefix.iter().any(Segment::is_terminal) {
                return Err(RouteError::invalid_path(&scope, "group scope cannot end in a wildcard").into());
            }
            if prefix == [Segment::Literal(ROOT_SEGMENT.to_string())] {
                prefix.clear();
            }
        }

        Ok(Self {
            scope,
            prefix,
            actions: Vec::new(),
            pipes: Vec::new(),
        })
    }

    /// Adds an action.
    pub fn action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    /// Adds several actions.
    pub fn actions(mut self, actions: impl IntoIterator<Item = Action>) -> Self {
        self.actions.extend(actions);
        self
    }

    /// Appends pipes that run before every member's own pipes.
    pub fn with_pipes(mut self, pipes: impl IntoIterator<Item = Pipe<RequestContext>>) -> Self {
        self.pipes.extend(pipes);
        self
    }

    /// The scope string.
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Member actions with the prefix and group pipes applied.
    pub fn into_actions(self) -> Vec<Action> {
        let prefix_path = self.scope.trim_end_matches('/').to_string();
        self.actions
            .into_iter()
            .map(|action| action.scoped(&self.prefix, &prefix_path, &self.pipes))
            .collect()
    }
}
