//! The terminal search handler's pipeline, independent of HTTP extraction.
//!
//! Per request: endpoint rate limit → query validation → bounded backend call → metadata
//! enrichment. Every gate exits early with a [`GatewayError`]; nothing is retried.

use crate::deadline::{Deadline, RequestDeadline, DEFAULT_BACKEND_TIMEOUT};
use crate::error::GatewayError;
use crate::metadata::{ClaimMetadata, MetadataStore};
use crate::rate_limit::{Decision, RateLimiter};
use crate::search::{SearchError, SearchQuery, VectorSearch};
use std::sync::Arc;
use std::time::Duration;

/// Result count used when the request does not name one.
pub const DEFAULT_K: u32 = 5;
/// Largest accepted `k`.
pub const DEFAULT_MAX_K: u32 = 50;

/// Smallest accepted backend ceiling.
pub const MIN_BACKEND_TIMEOUT: Duration = Duration::from_millis(1);

/// Raw search parameters as they arrive on the query string.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub k: Option<String>,
}

/// Runs one search request end to end.
#[derive(Clone)]
pub struct SearchOrchestrator {
    search: Arc<dyn VectorSearch>,
    metadata: Arc<dyn MetadataStore>,
    limiter: Arc<dyn RateLimiter>,
    default_k: u32,
    max_k: u32,
    backend_timeout: Duration,
}

impl std::fmt::Debug for SearchOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchOrchestrator")
            .field("default_k", &self.default_k)
            .field("max_k", &self.max_k)
            .field("backend_timeout", &self.backend_timeout)
            .finish_non_exhaustive()
    }
}

impl SearchOrchestrator {
    /// `limiter` is the endpoint's own limit, applied on top of the middleware limit.
    pub fn new(
        search: impl VectorSearch + 'static,
        metadata: impl MetadataStore + 'static,
        limiter: impl RateLimiter + 'static,
    ) -> Self {
        Self {
            search: Arc::new(search),
            metadata: Arc::new(metadata),
            limiter: Arc::new(limiter),
            default_k: DEFAULT_K,
            max_k: DEFAULT_MAX_K,
            backend_timeout: DEFAULT_BACKEND_TIMEOUT,
        }
    }

    pub fn with_default_k(mut self, k: u32) -> Self {
        self.default_k = k;
        self
    }

    pub fn with_max_k(mut self, max_k: u32) -> Self {
        self.max_k = max_k;
        self
    }

    /// Ceiling for the backend call. A zero ceiling is raised to one millisecond;
    /// `GatewayConfig` rejects zero before it gets here.
    pub fn with_backend_timeout(mut self, timeout: Duration) -> Self {
        self.backend_timeout = timeout.max(MIN_BACKEND_TIMEOUT);
        self
    }

    pub fn backend_timeout(&self) -> Duration {
        self.backend_timeout
    }

    /// Execute the pipeline for `client`.
    ///
    /// The endpoint limit is checked before validation, so a throttled client gets 429 even
    /// for a malformed request.
    pub async fn run(
        &self,
        client: &str,
        params: &SearchParams,
        inbound: Option<RequestDeadline>,
    ) -> Result<Vec<ClaimMetadata>, GatewayError> {
        self.admit(client).await?;
        self.execute(params, inbound).await
    }

    /// Count one hit against the endpoint limit for `client`.
    pub async fn admit(&self, client: &str) -> Result<(), GatewayError> {
        match self.limiter.acquire(client).await {
            Ok(Decision::Allowed { .. }) => Ok(()),
            Ok(Decision::Denied { reason, .. }) => Err(GatewayError::RateLimited { reason }),
            Err(e) => {
                tracing::warn!(client = %client, error = %e, "search rate limiter unavailable");
                Err(GatewayError::CounterStoreUnavailable(e))
            }
        }
    }

    /// Everything after the endpoint limit: validation, backend call, enrichment.
    pub async fn execute(
        &self,
        params: &SearchParams,
        inbound: Option<RequestDeadline>,
    ) -> Result<Vec<ClaimMetadata>, GatewayError> {
        let query =
            SearchQuery::parse(params.q.as_deref(), params.k.as_deref(), self.default_k, self.max_k)?;

        let deadline = Deadline::bounded(self.backend_timeout, inbound);
        let outcome = match deadline.run(self.search.search(&query, deadline)).await {
            Ok(outcome) => outcome,
            Err(elapsed) => Err(SearchError::from(elapsed)),
        };
        let hits = outcome.map_err(|e| {
            tracing::warn!(error = %e, "vector search failed");
            GatewayError::Backend(e)
        })?;

        tracing::debug!(hits = hits.len(), k = query.k(), "vector search returned");
        for hit in &hits {
            tracing::debug!(uid = %hit.uid, score = hit.score, "hit");
        }

        let uids: Vec<String> = hits.into_iter().map(|hit| hit.uid).collect();
        self.metadata.get(&uids).await.map_err(|e| {
            tracing::error!(uids = ?uids, error = %e, "metadata lookup failed");
            GatewayError::Metadata(e)
        })
    }
}
