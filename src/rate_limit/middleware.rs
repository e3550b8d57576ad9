use crate::error::GatewayError;
use crate::rate_limit::{client_id, Decision, RateLimiter};
use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use futures::future::BoxFuture;
use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower_layer::Layer;
use tower_service::Service;

/// A layer that throttles clients using a [`RateLimiter`].
///
/// Denied requests get 429; a failing limiter gets 503. In both cases the inner service is
/// never called.
#[derive(Debug)]
pub struct RateLimitLayer<L> {
    limiter: Arc<L>,
}

impl<L> Clone for RateLimitLayer<L> {
    fn clone(&self) -> Self {
        Self { limiter: self.limiter.clone() }
    }
}

impl<L> RateLimitLayer<L> {
    /// Create a new rate limit layer.
    pub fn new(limiter: L) -> Self {
        Self { limiter: Arc::new(limiter) }
    }

    /// Create a layer over an already shared limiter.
    pub fn from_arc(limiter: Arc<L>) -> Self {
        Self { limiter }
    }
}

impl<S, L> Layer<S> for RateLimitLayer<L>
where
    L: RateLimiter + 'static,
{
    type Service = RateLimitService<S, L>;

    fn layer(&self, service: S) -> Self::Service {
        RateLimitService {
            inner: service,
            limiter: self.limiter.clone(),
        }
    }
}

/// Middleware service that enforces rate limits.
#[derive(Debug)]
pub struct RateLimitService<S, L> {
    inner: S,
    limiter: Arc<L>,
}

impl<S: Clone, L> Clone for RateLimitService<S, L> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone(), limiter: self.limiter.clone() }
    }
}

impl<S, L> Service<Request> for RateLimitService<S, L>
where
    S: Service<Request, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
    L: RateLimiter + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let limiter = self.limiter.clone();
        // Keep the service that was driven to readiness; leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let client = client_id(&req);

        Box::pin(async move {
            match limiter.acquire(&client).await {
                Ok(Decision::Allowed { .. }) => inner.call(req).await,
                Ok(Decision::Denied { reason, .. }) => {
                    tracing::info!(client = %client, "request throttled");
                    Ok(GatewayError::RateLimited { reason }.into_response())
                }
                Err(e) => {
                    // Limiter failed (e.g., Redis down). Fail closed.
                    tracing::warn!(client = %client, error = %e, "rate limiter unavailable");
                    Ok(GatewayError::CounterStoreUnavailable(e).into_response())
                }
            }
        })
    }
}
