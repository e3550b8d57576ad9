//! Vector-search collaborator contract and the validated query it consumes.
//!
//! The ranking itself happens elsewhere; this crate only calls it. With the `grpc` feature,
//! [`GrpcVectorSearch`](grpc::GrpcVectorSearch) talks to a `VectorSearchService` over tonic.

use crate::deadline::{Deadline, DeadlineExceeded};
use crate::error::GatewayError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[cfg(feature = "grpc")]
pub mod grpc;
#[cfg(feature = "grpc")]
pub use grpc::GrpcVectorSearch;

/// One ranked result from the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub uid: String,
    pub score: f32,
}

impl SearchHit {
    pub fn new(uid: impl Into<String>, score: f32) -> Self {
        Self { uid: uid.into(), score }
    }
}

/// A validated search request: non-empty text and a result count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    text: String,
    k: u32,
}

impl SearchQuery {
    /// Validate raw `q` and `k` parameters.
    ///
    /// `q` must be present and non-empty. `k` falls back to `default_k` and must lie in
    /// `1..=max_k`.
    pub fn parse(
        q: Option<&str>,
        k: Option<&str>,
        default_k: u32,
        max_k: u32,
    ) -> Result<Self, GatewayError> {
        let text = match q {
            Some(q) if !q.is_empty() => q.to_string(),
            _ => return Err(GatewayError::MissingQuery),
        };
        let k = match k {
            None => default_k,
            Some(raw) => match raw.parse::<u32>() {
                Ok(k) if (1..=max_k).contains(&k) => k,
                _ => {
                    return Err(GatewayError::InvalidParameter(format!(
                        "invalid query parameter: k must be between 1 and {max_k}"
                    )))
                }
            },
        };
        Ok(Self { text, k })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn k(&self) -> u32 {
        self.k
    }
}

/// Failures of the vector-search call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SearchError {
    #[error("vector search transport error: {0}")]
    Transport(String),
    #[error("vector search returned {code}: {message}")]
    Status { code: String, message: String },
    #[error("vector search {0}")]
    DeadlineExceeded(#[from] DeadlineExceeded),
}

/// The external similarity-search service.
#[async_trait]
pub trait VectorSearch: Send + Sync {
    /// Top-`k` hits for the query, best first. Implementations should stop work once
    /// `deadline` passes; the caller enforces it as well.
    async fn search(
        &self,
        query: &SearchQuery,
        deadline: Deadline,
    ) -> Result<Vec<SearchHit>, SearchError>;
}

#[async_trait]
impl<T> VectorSearch for Arc<T>
where
    T: VectorSearch + ?Sized,
{
    async fn search(
        &self,
        query: &SearchQuery,
        deadline: Deadline,
    ) -> Result<Vec<SearchHit>, SearchError> {
        (**self).search(query, deadline).await
    }
}
