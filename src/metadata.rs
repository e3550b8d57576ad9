//! Claim metadata: the record type, the store contract and its backends.
//!
//! Every backend satisfies the same ordering contract: `get(uids)` returns the records for
//! the uids that exist, in the order the caller listed them. Unknown uids are dropped
//! silently and an empty request yields an empty result.
//!
//! Backends form a closed set ([`MetadataBackend`]) chosen once at startup from config.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

pub mod file;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use file::FileMetadataStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresMetadataStore;

/// Descriptive record for one fact-checked claim, keyed by `uid`.
///
/// Missing string fields deserialize as empty; `factcheck_date` is the only nullable field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
#[serde(default)]
pub struct ClaimMetadata {
    pub uid: String,
    pub statement: String,
    pub verdict: String,
    pub statement_originator: String,
    pub statement_date: String,
    pub statement_source: String,
    pub factchecker: String,
    pub factcheck_date: Option<String>,
    pub factcheck_analysis_link: String,
}

/// Errors raised while building or querying a metadata store.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("failed to read metadata source: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed metadata record on line {line}: {source}")]
    Malformed {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("metadata record on line {line} has no uid")]
    MissingUid { line: usize },
    #[error("metadata query failed: {0}")]
    Query(String),
}

/// Read-only lookup of claim metadata by uid.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Records for `uids`, in request order, skipping uids with no record.
    async fn get(&self, uids: &[String]) -> Result<Vec<ClaimMetadata>, MetadataError>;
}

#[async_trait]
impl<T> MetadataStore for Arc<T>
where
    T: MetadataStore + ?Sized,
{
    async fn get(&self, uids: &[String]) -> Result<Vec<ClaimMetadata>, MetadataError> {
        (**self).get(uids).await
    }
}

/// Rebuild `rows` in the order of `uids`.
///
/// Row order from a query engine is arbitrary; this join against the request is what makes a
/// queried backend honor the ordering contract. A uid listed twice yields its record twice.
pub fn order_by_request<I>(uids: &[String], rows: I) -> Vec<ClaimMetadata>
where
    I: IntoIterator<Item = ClaimMetadata>,
{
    let by_uid: HashMap<String, ClaimMetadata> =
        rows.into_iter().map(|row| (row.uid.clone(), row)).collect();
    uids.iter().filter_map(|uid| by_uid.get(uid).cloned()).collect()
}

/// The configured metadata backend.
#[derive(Debug, Clone)]
pub enum MetadataBackend {
    /// Immutable index loaded from a line-delimited JSON file.
    File(Arc<FileMetadataStore>),
    /// Live `claim_metadata` table.
    #[cfg(feature = "postgres")]
    Postgres(PostgresMetadataStore),
}

impl MetadataBackend {
    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            #[cfg(feature = "postgres")]
            Self::Postgres(_) => "postgres",
        }
    }
}

impl From<FileMetadataStore> for MetadataBackend {
    fn from(store: FileMetadataStore) -> Self {
        Self::File(Arc::new(store))
    }
}

#[cfg(feature = "postgres")]
impl From<PostgresMetadataStore> for MetadataBackend {
    fn from(store: PostgresMetadataStore) -> Self {
        Self::Postgres(store)
    }
}

#[async_trait]
impl MetadataStore for MetadataBackend {
    async fn get(&self, uids: &[String]) -> Result<Vec<ClaimMetadata>, MetadataError> {
        match self {
            Self::File(store) => store.get(uids).await,
            #[cfg(feature = "postgres")]
            Self::Postgres(store) => store.get(uids).await,
        }
    }
}
