//! Convenient re-exports for common claimgate types.
pub use crate::{
    deadline::{Deadline, RequestDeadline},
    metadata::{ClaimMetadata, FileMetadataStore, MetadataBackend, MetadataStore},
    middleware::{AuthLayer, Authenticator, Identity, LoggingLayer, MiddlewareChain},
    orchestrator::{SearchOrchestrator, SearchParams},
    rate_limit::{
        CounterStore, Decision, FixedWindow, InMemoryCounterStore, RateLimitConfig,
        RateLimitLayer, RateLimiter,
    },
    router::router,
    search::{SearchHit, SearchQuery, VectorSearch},
    GatewayError,
};
