//! The gateway's middleware chain.
//!
//! Order is fixed, outermost first: logging → rate limit → auth → handler. Each layer calls
//! the next one at most once and only on its success path; a short-circuit still passes
//! back through logging.

use crate::rate_limit::{RateLimitLayer, RateLimitService, RateLimiter};
use std::sync::Arc;
use tower_layer::Layer;

pub mod auth;
pub mod logging;

pub use auth::{AuthError, AuthLayer, AuthService, Authenticator, Identity, PassthroughAuth};
pub use logging::{LoggingFuture, LoggingLayer, LoggingService};

/// The full chain as a single layer.
#[derive(Debug)]
pub struct MiddlewareChain<L> {
    limiter: Arc<L>,
    auth: AuthLayer,
}

impl<L> Clone for MiddlewareChain<L> {
    fn clone(&self) -> Self {
        Self { limiter: self.limiter.clone(), auth: self.auth.clone() }
    }
}

impl<L> MiddlewareChain<L>
where
    L: RateLimiter + 'static,
{
    /// Chain with the given gateway-wide limiter and passthrough auth.
    pub fn new(limiter: L) -> Self {
        Self { limiter: Arc::new(limiter), auth: AuthLayer::passthrough() }
    }

    /// Swap in a real authentication provider.
    pub fn with_auth(mut self, auth: AuthLayer) -> Self {
        self.auth = auth;
        self
    }
}

impl<S, L> Layer<S> for MiddlewareChain<L>
where
    L: RateLimiter + 'static,
{
    type Service = LoggingService<RateLimitService<AuthService<S>, L>>;

    fn layer(&self, inner: S) -> Self::Service {
        let authed = self.auth.layer(inner);
        let limited = RateLimitLayer::from_arc(self.limiter.clone()).layer(authed);
        LoggingLayer.layer(limited)
    }
}
