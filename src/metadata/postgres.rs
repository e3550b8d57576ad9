//! `claim_metadata` table lookups over a `sqlx` Postgres pool.

use super::{order_by_request, ClaimMetadata, MetadataError, MetadataStore};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

// Date columns are rendered as ISO text; NULL text columns become empty strings.
const SELECT_BY_UIDS: &str = r#"
    SELECT
        uid,
        COALESCE(statement, '') AS statement,
        COALESCE(verdict, '') AS verdict,
        COALESCE(statement_originator, '') AS statement_originator,
        COALESCE(statement_date::text, '') AS statement_date,
        COALESCE(statement_source, '') AS statement_source,
        COALESCE(factchecker, '') AS factchecker,
        factcheck_date::text AS factcheck_date,
        COALESCE(factcheck_analysis_link, '') AS factcheck_analysis_link
    FROM claim_metadata
    WHERE uid = ANY($1)
"#;

/// Metadata store that queries Postgres live on every call.
///
/// One batched `uid = ANY($1)` query per call; rows are then re-ordered to match the request.
#[derive(Debug, Clone)]
pub struct PostgresMetadataStore {
    pool: PgPool,
}

impl PostgresMetadataStore {
    /// Wrap an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a pool sized for the gateway: up to `max_connections`, 5 kept warm, connections
    /// recycled after 30 minutes.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, MetadataError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(5.min(max_connections))
            .max_lifetime(Duration::from_secs(30 * 60))
            .connect(url)
            .await
            .map_err(|e| MetadataError::Query(e.to_string()))?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl MetadataStore for PostgresMetadataStore {
    async fn get(&self, uids: &[String]) -> Result<Vec<ClaimMetadata>, MetadataError> {
        if uids.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<ClaimMetadata> = sqlx::query_as::<_, ClaimMetadata>(SELECT_BY_UIDS)
            .bind(uids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| MetadataError::Query(e.to_string()))?;

        Ok(order_by_request(uids, rows))
    }
}
