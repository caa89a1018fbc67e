//! The per-request context.

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::request::Parts;
use http::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use bamboo_core::{HandlerResult, Services, Stash};
use bamboo_middleware::PipeContext;
use bamboo_ratelimit::{ip_context, RateLimitInfo, RateLimiter};
use bamboo_router::Params;

use crate::types::{json_response, response, text_response, Response};

/// Body of [`RequestContext::not_implemented`].
pub const NOT_IMPLEMENTED_BODY: &str = "Not Implemented";

/// Context threaded through the pipes and handler of one HTTP request.
///
/// The first response helper to run wins: it stores the response and locks
/// the context, and every later helper call is a no-op.
///
/// The client address is read from a [`SocketAddr`] request extension
/// (inserted by the runtime), then from `x-forwarded-for` and `x-real-ip`.
pub struct RequestContext {
    parts: Parts,
    body: Bytes,
    params: Params,
    body_params: Map<String, Value>,
    query: Vec<(String, String)>,
    response: Option<Response>,
    headers: HeaderMap,
    stash: Stash,
    locked: bool,
    limiter: Arc<RateLimiter>,
    services: Arc<Services>,
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("method", &self.parts.method)
            .field("path", &self.parts.uri.path())
            .field("params", &self.params)
            .field("locked", &self.locked)
            .finish_non_exhaustive()
    }
}

impl PipeContext for RequestContext {
    fn is_locked(&self) -> bool {
        self.locked
    }
}

impl RequestContext {
    /// Creates a context for a request split into `parts` and `body`.
    ///
    /// JSON object bodies of POST, PUT and PATCH requests become body
    /// parameters; other bodies are only reachable through [`body`](Self::body).
    pub fn new(
        parts: Parts,
        body: Bytes,
        params: Params,
        limiter: Arc<RateLimiter>,
        services: Arc<Services>,
    ) -> Self {
        let body_params = if carries_params(&parts.method) && !body.is_empty() {
            match serde_json::from_slice::<Value>(&body) {
                Ok(Value::Object(map)) => map,
                _ => Map::new(),
            }
        } else {
            Map::new()
        };
        let query = parts
            .uri
            .query()
            .and_then(|q| serde_urlencoded::from_str::<Vec<(String, String)>>(q).ok())
            .unwrap_or_default();

        Self {
            parts,
            body,
            params,
            body_params,
            query,
            response: None,
            headers: HeaderMap::new(),
            stash: Stash::new(),
            locked: false,
            limiter,
            services,
        }
    }

    /// The request method.
    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    /// The request path, without the query string.
    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    /// Returns `true` for HEAD requests; their body is discarded.
    pub fn is_head(&self) -> bool {
        self.parts.method == Method::HEAD
    }

    /// A request header as text.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// All request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// The first query value for `key`.
    pub fn query(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Looks `key` up in the path parameters, then the JSON body, then the
    /// query string.
    ///
    /// Non-string body values are returned in their JSON form.
    pub fn param(&self, key: &str) -> Option<String> {
        if let Some(value) = self.params.get(key) {
            return Some(value.to_string());
        }
        if let Some(value) = self.body_params.get(key) {
            return Some(match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            });
        }
        self.query(key).map(str::to_string)
    }

    /// Path parameters captured by the route.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// The raw request body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Decodes the body as JSON.
    pub fn body_json<T: DeserializeOwned>(&self) -> HandlerResult<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// The client address.
    pub fn remote_addr(&self) -> Option<IpAddr> {
        if let Some(addr) = self.parts.extensions.get::<SocketAddr>() {
            return Some(addr.ip());
        }
        if let Some(ip) = self
            .header("x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .and_then(|v| v.trim().parse().ok())
        {
            return Some(ip);
        }
        self.header("x-real-ip").and_then(|v| v.trim().parse().ok())
    }

    /// Responds with `data` serialized as JSON.
    pub fn json(&mut self, data: impl Serialize, status: StatusCode) -> HandlerResult<()> {
        if self.locked {
            return Ok(());
        }
        let body = serde_json::to_vec(&data)?;
        self.respond(json_response(status, body));
        Ok(())
    }

    /// Responds with a plain-text body.
    pub fn text(&mut self, body: impl Into<String>, status: StatusCode) {
        if self.locked {
            return;
        }
        self.respond(text_response(status, body.into()));
    }

    /// Responds with `status` and an empty body.
    pub fn status(&mut self, status: StatusCode) {
        if self.locked {
            return;
        }
        self.respond(response(status, Bytes::new()));
    }

    /// Responds with 501 Not Implemented.
    pub fn not_implemented(&mut self) {
        self.text(NOT_IMPLEMENTED_BODY, StatusCode::NOT_IMPLEMENTED);
    }

    /// Stores a prebuilt response and locks.
    pub fn respond(&mut self, response: Response) {
        if self.locked {
            return;
        }
        self.response = Some(response);
        self.locked = true;
    }

    /// The stored response, if any.
    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    /// Adds a header to whatever response is eventually sent.
    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    /// Stops the rest of the chain under the abort policy.
    pub fn lock(&mut self) {
        self.locked = true;
    }

    /// Returns `true` once a response was produced or [`lock`](Self::lock) ran.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Per-request scratch space.
    pub fn stash(&self) -> &Stash {
        &self.stash
    }

    /// Mutable per-request scratch space.
    pub fn stash_mut(&mut self) -> &mut Stash {
        &mut self.stash
    }

    /// Counts one hit on `context`; `true` means over `limit`.
    pub async fn ratelimit(&self, context: &str, limit: u64, interval: Duration) -> bool {
        self.limiter.check(context, limit, interval).await
    }

    /// Like [`ratelimit`](Self::ratelimit), counted per client address.
    ///
    /// Falls back to the shared counter when the address is unknown.
    pub async fn ratelimit_ip(&self, context: &str, limit: u64, interval: Duration) -> bool {
        match self.remote_addr() {
            Some(ip) => self.limiter.check(&ip_context(context, &ip), limit, interval).await,
            None => self.limiter.check(context, limit, interval).await,
        }
    }

    /// Limit state of `context`.
    pub async fn rate_limit_info(&self, context: &str) -> Option<RateLimitInfo> {
        self.limiter.info(context).await
    }

    /// The engine's rate limiter.
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Looks up an application service.
    pub fn service<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.services.get::<T>()
    }

    /// Turns the context into the response to send.
    ///
    /// Without a stored response this is a 500. Extra headers are merged in
    /// and HEAD responses lose their body.
    pub(crate) fn into_response(self) -> Response {
        let head = self.is_head();
        let mut out = self
            .response
            .unwrap_or_else(|| response(StatusCode::INTERNAL_SERVER_ERROR, Bytes::new()));
        for (name, value) in &self.headers {
            out.headers_mut().insert(name.clone(), value.clone());
        }
        if head {
            let (parts, _) = out.into_parts();
            out = Response::from_parts(parts, http_body_util::Full::new(Bytes::new()));
        }
        out
    }
}

fn carries_params(method: &Method) -> bool {
    *method == Method::POST || *method == Method::PUT || *method == Method::PATCH
}
