use crate::error::GatewayError;
use axum::extract::Request;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower_service::Service;

/// Authentication failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
}

/// Who the caller is, attached to the request as an extension once authenticated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub principal: String,
    pub provider: &'static str,
    pub attributes: HashMap<String, String>,
}

/// Pluggable credential validation.
pub trait Authenticator: Send + Sync {
    /// Unique name of this provider.
    fn name(&self) -> &'static str;

    /// Validate whatever credential the request carries; returns the identity on success.
    fn authenticate(&self, parts: &Parts) -> Result<Identity, AuthError>;
}

/// Passthrough provider (dev/testing).
///
/// # ⚠️ SECURITY WARNING
///
/// This provider grants access to **everyone** as "anonymous".
/// It effectively disables authentication.
#[derive(Clone, Copy, Debug, Default)]
pub struct PassthroughAuth;

impl Authenticator for PassthroughAuth {
    fn name(&self) -> &'static str {
        "passthrough"
    }

    fn authenticate(&self, _parts: &Parts) -> Result<Identity, AuthError> {
        Ok(Identity {
            principal: "anonymous".into(),
            provider: self.name(),
            attributes: HashMap::new(),
        })
    }
}

/// Authentication layer; on success the [`Identity`] is inserted into the request extensions.
#[derive(Clone)]
pub struct AuthLayer {
    provider: Arc<dyn Authenticator>,
}

impl AuthLayer {
    /// Create a new authentication layer with the given provider.
    pub fn new(provider: impl Authenticator + 'static) -> Self {
        Self { provider: Arc::new(provider) }
    }

    /// Layer that lets every request through as anonymous.
    pub fn passthrough() -> Self {
        Self::new(PassthroughAuth)
    }
}

impl std::fmt::Debug for AuthLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthLayer").field("provider", &self.provider.name()).finish()
    }
}

/// Service that authenticates before forwarding the request.
#[derive(Clone)]
pub struct AuthService<S> {
    inner: S,
    provider: Arc<dyn Authenticator>,
}

impl<S> tower_layer::Layer<S> for AuthLayer {
    type Service = AuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthService { inner, provider: self.provider.clone() }
    }
}

impl<S> Service<Request> for AuthService<S>
where
    S: Service<Request, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let provider = self.provider.clone();
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        Box::pin(async move {
            let (mut parts, body) = req.into_parts();
            match provider.authenticate(&parts) {
                Ok(identity) => {
                    parts.extensions.insert(identity);
                    inner.call(Request::from_parts(parts, body)).await
                }
                Err(e) => {
                    tracing::info!(provider = provider.name(), error = %e, "authentication failed");
                    Ok(GatewayError::Unauthenticated(e).into_response())
                }
            }
        })
    }
}
