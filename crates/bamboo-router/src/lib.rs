//! Per-method prefix tree router for Bamboo.
//!
//! Every HTTP method owns its own tree. Each node represents one path
//! segment and may carry a registered value (an action) as well as children.
//!
//! # Segment syntax
//!
//! | Segment | Kind | Matches |
//! |---------|------|---------|
//! | `users` | literal | exactly `users` |
//! | `:id` or `{id}` | parameter | any one segment, captured as `id` |
//! | `*` | wildcard | the rest of the path, captured as `*` |
//! | `**.png` | catch-all | any path whose final segment ends in `.png` |
//!
//! The path `/` is stored as the single literal segment [`ROOT_SEGMENT`].
//!
//! # Resolution
//!
//! Segments are walked left to right. At each node, in order:
//!
//! 1. a literal child equal to the segment is taken and the walk continues;
//! 2. a catch-all child whose suffix matches the extension of the *final*
//!    request segment ends the walk;
//! 3. a wildcard child ends the walk;
//! 4. a parameter child captures the segment. The walk ends there unless the
//!    parameter node has children and segments remain.
//!
//! There is no backtracking: once a branch is taken, a dead end is a miss.
//!
//! # Example
//!
//! ```rust
//! use bamboo_router::Router;
//! use http::Method;
//!
//! let mut router = Router::new();
//! router.insert("GET", "/health", "health").unwrap();
//! router.insert("GET", "/users/:id", "show_user").unwrap();
//! router.insert("GET", "/files/**.png", "png_file").unwrap();
//!
//! let hit = router.at(&Method::GET, "/users/42").unwrap();
//! assert_eq!(*hit.value, "show_user");
//! assert_eq!(hit.params.get("id"), Some("42"));
//!
//! assert!(router.at(&Method::GET, "/files/a.png").is_some());
//! assert!(router.at(&Method::GET, "/files/a.jpg").is_none());
//! ```
//!
//! # Conflicts
//!
//! Registering a second value at the same method and path is an error, as
//! is naming the same parameter position differently in two routes. A node
//! may hold a value and children at once, so `/users` and `/users/:id`
//! coexist.

mod error;
mod node;
mod params;
mod router;
mod segment;

pub use error::{RouteError, RouteResult};
pub use node::Node;
pub use params::Params;
pub use router::{parse_method, Router};
pub use segment::{parse_path, split_request_path, Segment, ROOT_SEGMENT, WILDCARD_PARAM};

/// A resolved route with its registered value and captured parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'a, T> {
    /// The value registered for the matched route.
    pub value: &'a T,
    /// Captured path parameters.
    pub params: Params,
}

impl<'a, T> RouteMatch<'a, T> {
    /// Creates a new route match.
    #[must_use]
    pub fn new(value: &'a T, params: Params) -> Self {
        Self { value, params }
    }
}
