//! Method-keyed route table.

use std::collections::HashMap;

use http::Method;

use crate::error::{RouteError, RouteResult};
use crate::node::{InsertError, Node};
use crate::segment::{parse_path, split_request_path, Segment, ROOT_SEGMENT};
use crate::RouteMatch;

/// A route table holding one prefix tree per HTTP method.
///
/// # Example
///
/// ```rust
/// use bamboo_router::{Router, RouteError};
/// use http::Method;
///
/// let mut router = Router::new();
/// router.insert("GET", "/users", 1).unwrap();
/// router.insert("POST", "/users", 2).unwrap();
///
/// assert_eq!(router.at(&Method::POST, "/users").map(|m| *m.value), Some(2));
///
/// // The same method and path cannot be registered twice.
/// assert!(matches!(
///     router.insert("GET", "/users", 3),
///     Err(RouteError::Conflict { .. })
/// ));
/// ```
#[derive(Debug, Clone)]
pub struct Router<T> {
    trees: HashMap<Method, Node<T>>,
    route_count: usize,
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Router<T> {
    /// Creates an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self {
            trees: HashMap::new(),
            route_count: 0,
        }
    }

    /// Registers `value` under `method` and `path`.
    ///
    /// The method is upper-cased before validation, so `"get"` and `"GET"`
    /// address the same tree.
    pub fn insert(&mut self, method: &str, path: &str, value: T) -> RouteResult<()> {
        let method = parse_method(method)?;
        let segments = parse_path(path)?;
        self.insert_segments(method, &segments, path, value)
    }

    /// Registers `value` at already-parsed segments.
    ///
    /// `display_path` is only used in error messages.
    pub fn insert_segments(
        &mut self,
        method: Method,
        segments: &[Segment],
        display_path: &str,
        value: T,
    ) -> RouteResult<()> {
        let tree = self.trees.entry(method.clone()).or_default();
        tree.insert(segments, value).map_err(|e| match e {
            InsertError::Occupied => RouteError::Conflict {
                method: method.to_string(),
                path: display_path.to_string(),
            },
            InsertError::ParamName { existing, new } => RouteError::ParamConflict {
                method: method.to_string(),
                path: display_path.to_string(),
                existing,
                new,
            },
        })?;
        self.route_count += 1;
        Ok(())
    }

    /// Resolves already-split request segments.
    #[must_use]
    pub fn resolve(&self, method: &Method, segments: &[&str]) -> Option<RouteMatch<'_, T>> {
        self.trees
            .get(method)
            .and_then(|tree| tree.resolve(segments))
            .map(|(value, params)| RouteMatch::new(value, params))
    }

    /// Resolves a raw request path such as `/users/42`.
    #[must_use]
    pub fn at(&self, method: &Method, path: &str) -> Option<RouteMatch<'_, T>> {
        self.resolve(method, &split_request_path(path))
    }

    /// Number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.route_count
    }

    /// Returns `true` if no routes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.route_count == 0
    }

    /// Lists every registered `(method, path)` pair, sorted.
    #[must_use]
    pub fn routes(&self) -> Vec<(Method, String)> {
        let root_path = format!("/{ROOT_SEGMENT}");
        let mut routes = Vec::with_capacity(self.route_count);
        for (method, tree) in &self.trees {
            tree.for_each("", &mut |path, _| {
                let path = if path == root_path { "/".to_string() } else { path };
                routes.push((method.clone(), path));
            });
        }
        routes.sort_by(|a, b| (a.1.as_str(), a.0.as_str()).cmp(&(b.1.as_str(), b.0.as_str())));
        routes
    }
}

/// Parses and upper-cases an HTTP method string such as `"get"`.
pub fn parse_method(method: &str) -> RouteResult<Method> {
    if method.is_empty() {
        return Err(RouteError::InvalidMethod(method.to_string()));
    }
    Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .map_err(|_| RouteError::InvalidMethod(method.to_string()))
}
