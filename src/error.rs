//! Per-request error taxonomy and its mapping onto HTTP responses.
use crate::metadata::MetadataError;
use crate::middleware::auth::AuthError;
use crate::rate_limit::StoreError;
use crate::search::SearchError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Unified error type for the request pipeline.
///
/// `Display` is the short plain-text reason sent to the client; the wrapped source carries the
/// backend detail, which is logged but never returned.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The `q` parameter is absent or empty.
    #[error("missing query parameter: q")]
    MissingQuery,
    /// A parameter is present but unusable.
    #[error("{0}")]
    InvalidParameter(String),
    /// A limiter denied the request.
    #[error("{reason}")]
    RateLimited { reason: String },
    /// The counter store failed; the request is rejected rather than let through.
    #[error("rate limiter unavailable")]
    CounterStoreUnavailable(#[source] StoreError),
    /// The vector-search backend failed or ran out of time.
    #[error("vector search failed")]
    Backend(#[source] SearchError),
    /// The metadata store failed.
    #[error("metadata lookup failed")]
    Metadata(#[source] MetadataError),
    /// Credentials were missing or rejected.
    #[error("unauthenticated")]
    Unauthenticated(#[source] AuthError),
}

impl GatewayError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingQuery | Self::InvalidParameter(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::CounterStoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Backend(_) => StatusCode::BAD_GATEWAY,
            Self::Metadata(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
        }
    }

    /// Check if this error came from a limiter denial.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}
