//! Rate limiting as a pipe.
//!
//! [`RateLimitPipe`] counts each request against a context of the engine's
//! [`RateLimiter`](bamboo_ratelimit::RateLimiter). Requests over the limit
//! get a `429` with a JSON error body; all responses carry the
//! `x-ratelimit-*` headers.
//!
//! ```
//! use std::time::Duration;
//! use bamboo_server::RateLimitPipe;
//!
//! let pipe = RateLimitPipe::builder("api")
//!     .limit(100)
//!     .window(Duration::from_secs(60))
//!     .per_ip()
//!     .build()?;
//! assert_eq!(pipe.name(), "rate-limit:api");
//! # Ok::<(), bamboo_middleware::PipeError>(())
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use http::header::{HeaderName, HeaderValue};
use http::StatusCode;
use serde_json::json;

use bamboo_core::HandlerResult;
use bamboo_middleware::{Pipe, PipeError, PipeResult};
use bamboo_ratelimit::{headers, ip_context};

use crate::context::RequestContext;
use crate::types::json_response;

type SkipPredicate = Arc<dyn Fn(&RequestContext) -> bool + Send + Sync>;
type CustomKey = Arc<dyn Fn(&RequestContext) -> Option<String> + Send + Sync>;

/// How requests are grouped into counters.
#[derive(Clone, Default)]
pub enum KeyStrategy {
    /// One counter per client address.
    #[default]
    Ip,
    /// One counter per value of a request header.
    Header(String),
    /// One counter for everyone.
    Global,
    /// A custom key; `None` skips limiting.
    Custom(CustomKey),
}

impl fmt::Debug for KeyStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ip => write!(f, "KeyStrategy::Ip"),
            Self::Header(h) => f.debug_tuple("KeyStrategy::Header").field(h).finish(),
            Self::Global => write!(f, "KeyStrategy::Global"),
            Self::Custom(_) => write!(f, "KeyStrategy::Custom(<fn>)"),
        }
    }
}

/// Builder for a rate-limit pipe.
#[derive(Clone)]
pub struct RateLimitPipe {
    context: String,
    limit: u64,
    window: Duration,
    key: KeyStrategy,
    skip: Option<SkipPredicate>,
    error_message: String,
}

impl fmt::Debug for RateLimitPipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimitPipe")
            .field("context", &self.context)
            .field("limit", &self.limit)
            .field("window", &self.window)
            .field("key", &self.key)
            .field("skip", &self.skip.is_some())
            .finish_non_exhaustive()
    }
}

impl RateLimitPipe {
    /// Starts a builder counting under `context`: 60 requests per minute per IP.
    pub fn builder(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            limit: 60,
            window: Duration::from_secs(60),
            key: KeyStrategy::Ip,
            skip: None,
            error_message: "Too many requests. Please try again later.".to_string(),
        }
    }

    /// Requests allowed per window.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    /// Window length.
    pub fn window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Count per client address.
    pub fn per_ip(mut self) -> Self {
        self.key = KeyStrategy::Ip;
        self
    }

    /// Count per value of `header`; requests without it are not limited.
    pub fn per_header(mut self, header: impl Into<String>) -> Self {
        self.key = KeyStrategy::Header(header.into());
        self
    }

    /// Count all requests together.
    pub fn global(mut self) -> Self {
        self.key = KeyStrategy::Global;
        self
    }

    /// Derive the key with `f`; `None` skips limiting.
    pub fn key_extractor<F>(mut self, f: F) -> Self
    where
        F: Fn(&RequestContext) -> Option<String> + Send + Sync + 'static,
    {
        self.key = KeyStrategy::Custom(Arc::new(f));
        self
    }

    /// Skip limiting when `f` returns `true`.
    pub fn skip<F>(mut self, f: F) -> Self
    where
        F: Fn(&RequestContext) -> bool + Send + Sync + 'static,
    {
        self.skip = Some(Arc::new(f));
        self
    }

    /// Message in the 429 body.
    pub fn error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = message.into();
        self
    }

    /// Builds the pipe, named `rate-limit:<context>`.
    ///
    /// The context must be non-empty and free of `/`, which separates it
    /// from the per-client key. The window must be longer than zero.
    pub fn build(self) -> PipeResult<Pipe<RequestContext>> {
        let name = format!("rate-limit:{}", self.context);
        let reason = if self.context.trim().is_empty() {
            Some("context must not be empty")
        } else if self.context.contains('/') {
            Some("context must not contain '/'")
        } else if self.window.is_zero() {
            Some("window must be longer than zero")
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(PipeError::Invalid { name, reason });
        }
        let config = Arc::new(self);
        Pipe::new(name, move |ctx| {
            let config = Arc::clone(&config);
            async move { config.apply(ctx).await }
        })
    }

    fn key_for(&self, ctx: &RequestContext) -> Option<String> {
        match &self.key {
            KeyStrategy::Ip => Some(match ctx.remote_addr() {
                Some(ip) => ip_context(&self.context, &ip),
                None => self.context.clone(),
            }),
            KeyStrategy::Header(name) => ctx
                .header(name)
                .map(|value| format!("{}/{value}", self.context)),
            KeyStrategy::Global => Some(self.context.clone()),
            KeyStrategy::Custom(f) => f(ctx).map(|key| format!("{}/{key}", self.context)),
        }
    }

    async fn apply(&self, mut ctx: RequestContext) -> HandlerResult<RequestContext> {
        if self.skip.as_ref().is_some_and(|skip| skip(&ctx)) {
            return Ok(ctx);
        }
        let Some(key) = self.key_for(&ctx) else {
            return Ok(ctx);
        };

        let limiter = Arc::clone(ctx.limiter());
        let exceeded = limiter.check(&key, self.limit, self.window).await;
        let remaining = limiter.remaining(&key, self.limit).await;
        let reset_after = limiter.reset_time(&key).await.as_millis().div_ceil(1000);
        let reset_after = u64::try_from(reset_after).unwrap_or(u64::MAX);

        set(&mut ctx, headers::LIMIT, self.limit);
        set(&mut ctx, headers::REMAINING, remaining);
        set(&mut ctx, headers::RESET_AFTER, reset_after);

        if exceeded {
            set(&mut ctx, headers::RETRY_AFTER, reset_after.max(1));
            let body = json!({
                "error": {
                    "code": "RATE_LIMITED",
                    "message": self.error_message,
                }
            });
            ctx.respond(json_response(StatusCode::TOO_MANY_REQUESTS, body.to_string()));
        }
        Ok(ctx)
    }
}

fn set(ctx: &mut RequestContext, name: &'static str, value: u64) {
    ctx.set_header(HeaderName::from_static(name), HeaderValue::from(value));
}
