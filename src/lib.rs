#![forbid(unsafe_code)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # claimgate
//!
//! Request-facing gateway for claim search: accepts a query over HTTP, asks a vector-search
//! backend for similar claims, enriches the hits with metadata, and throttles every client
//! along the way.
//!
//! ## Features
//!
//! - **Middleware chain** of tower layers: logging → rate limit → auth
//! - **Fixed-window rate limiting** over a pluggable counter store (in-memory, Redis)
//! - **Fail-closed** throttling: an unreachable counter store rejects requests with 503
//! - **Ordered metadata enrichment** from a file-backed index or Postgres
//! - **Bounded backend calls** combining the caller's deadline with a fixed ceiling
//!
//! Optional cargo features: `redis`, `postgres`, `grpc`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use claimgate::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn demo(search: impl VectorSearch + 'static) -> Result<(), Box<dyn std::error::Error>> {
//! let counters = Arc::new(InMemoryCounterStore::new());
//! let metadata = FileMetadataStore::open("metadata.jsonl")?;
//!
//! let orchestrator = SearchOrchestrator::new(
//!     search,
//!     MetadataBackend::from(metadata),
//!     FixedWindow::new(counters.clone(), RateLimitConfig::search_endpoint()),
//! );
//! let chain = MiddlewareChain::new(FixedWindow::new(counters, RateLimitConfig::middleware()));
//! let app = router(orchestrator, chain);
//! # let _ = app;
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod config;
pub mod deadline;
pub mod error;
pub mod metadata;
pub mod middleware;
pub mod orchestrator;
pub mod prelude;
pub mod rate_limit;
pub mod router;
pub mod search;

// Re-exports
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{ConfigError, GatewayConfig, MetadataSource};
pub use deadline::{Deadline, DeadlineExceeded, RequestDeadline};
pub use error::GatewayError;
pub use metadata::{ClaimMetadata, MetadataBackend, MetadataError, MetadataStore};
pub use middleware::MiddlewareChain;
pub use orchestrator::{SearchOrchestrator, SearchParams};
pub use rate_limit::{CounterStore, Decision, FixedWindow, RateLimitConfig, RateLimiter, StoreError};
pub use router::{router, AppState};
pub use search::{SearchError, SearchHit, SearchQuery, VectorSearch};
