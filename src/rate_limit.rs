//! Rate limiting primitives.
//!
//! This module provides the building blocks for per-client throttling:
//! - [`RateLimiter`]: The core trait for rate limiting logic.
//! - [`RateLimitLayer`]: Tower middleware that enforces the limit.
//! - [`Decision`]: The result of a rate limit check (Allowed/Denied).
//!
//! # Architecture
//!
//! - **Middleware**: `RateLimitLayer` wraps the router. It doesn't know *how* limiting works,
//!   only that it should ask a `RateLimiter` about the calling client.
//! - **Logic**: [`FixedWindow`](strategies::FixedWindow) composes counter operations into a
//!   reset-on-expiry fixed window.
//! - **Storage**: [`CounterStore`](store::CounterStore) holds the counters, enabling
//!   in-memory or distributed backends (Redis, behind the `redis` feature).
//!
//! # Fixed-window caveat
//!
//! A window starts at the first increment after the previous key expired. A burst straddling
//! the expiry can therefore admit up to twice the limit in a short span. This is accepted.

use axum::extract::ConnectInfo;
use axum::http::Request;
use std::net::SocketAddr;
use std::time::Duration;

pub mod middleware;
#[cfg(feature = "redis")]
pub mod redis_store;
pub mod store;
pub mod strategies;
pub use middleware::{RateLimitLayer, RateLimitService};
#[cfg(feature = "redis")]
pub use redis_store::RedisCounterStore;
pub use store::{CounterStore, InMemoryCounterStore, StoreError};
pub use strategies::FixedWindow;

/// Identifier used for requests that carry no connect info.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// The decision returned by a rate limiter.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// The request is allowed to proceed.
    Allowed {
        /// Counter value after this hit.
        count: i64,
        /// Hits left in the current window.
        /// Useful for `X-RateLimit-Remaining` headers.
        remaining: u32,
    },
    /// The request is denied.
    Denied {
        /// Counter value after this hit.
        count: i64,
        /// Client-facing reason, e.g. "too many requests".
        reason: String,
    },
}

impl Decision {
    /// Helper to check if allowed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed { .. })
    }
}

/// Core interface for rate limiting logic.
#[async_trait::async_trait]
pub trait RateLimiter: Send + Sync {
    /// Record one hit for `client` and decide whether it may proceed.
    ///
    /// A store failure is returned as an error; callers must fail closed on it.
    async fn acquire(&self, client: &str) -> Result<Decision, StoreError>;
}

#[async_trait::async_trait]
impl<T> RateLimiter for std::sync::Arc<T>
where
    T: RateLimiter + ?Sized,
{
    async fn acquire(&self, client: &str) -> Result<Decision, StoreError> {
        (**self).acquire(client).await
    }
}

/// Parameters of one fixed-window limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Namespace prepended to the client identifier to form the counter key.
    pub prefix: String,
    /// Hits allowed per window; hit number `limit + 1` is denied.
    pub limit: u32,
    /// Window length, applied as the key TTL on the first hit.
    pub window: Duration,
    /// Message returned to denied clients.
    pub message: String,
}

impl RateLimitConfig {
    /// Create a config; `message` defaults to "too many requests".
    pub fn new(prefix: impl Into<String>, limit: u32, window: Duration) -> Self {
        Self {
            prefix: prefix.into(),
            limit,
            window,
            message: "too many requests".into(),
        }
    }

    /// Replace the denial message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Gateway-wide limit applied by the middleware chain: 3 requests per minute.
    pub fn middleware() -> Self {
        Self::new("rate:claims:", 3, Duration::from_secs(60))
    }

    /// Limit applied by the search endpoint itself: 5 requests per minute.
    pub fn search_endpoint() -> Self {
        Self::new("rl:search:", 5, Duration::from_secs(60))
            .with_message("Too many requests. Max is 5 requests per minute")
    }
}

/// Derive the rate-limit client identifier: the remote IP without its port.
pub fn client_id<B>(req: &Request<B>) -> String {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}
