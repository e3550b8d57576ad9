//! Redis-backed [`CounterStore`]. Bring your own connection manager.

use super::store::{CounterStore, StoreError};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;

/// Counter store backed by Redis `INCR` / `PEXPIRE` / `SET PX` / `GET`.
///
/// `INCR` is atomic on the server, so no client-side coordination is needed.
#[derive(Clone)]
pub struct RedisCounterStore {
    conn: ConnectionManager,
}

impl std::fmt::Debug for RedisCounterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCounterStore").field("conn", &"<redis::aio::ConnectionManager>").finish()
    }
}

impl RedisCounterStore {
    /// Wrap an existing connection manager.
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    /// Open a managed connection to `url`.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url).map_err(unavailable)?;
        let conn = ConnectionManager::new(client).await.map_err(unavailable)?;
        Ok(Self { conn })
    }
}

fn unavailable(e: redis::RedisError) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

fn ttl_millis(ttl: Duration) -> u64 {
    // Redis rejects a zero expiry on SET.
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        let mut conn = self.conn.clone();
        conn.incr(key, 1i64).await.map_err(|e| {
            if e.kind() == redis::ErrorKind::TypeError || e.to_string().contains("not an integer") {
                StoreError::NotAnInteger { key: key.to_string() }
            } else {
                unavailable(e)
            }
        })
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let millis = i64::try_from(ttl_millis(ttl)).unwrap_or(i64::MAX);
        conn.pexpire(key, millis).await.map_err(unavailable)
    }

    async fn set_var(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        conn.pset_ex(key, value, ttl_millis(ttl)).await.map_err(unavailable)
    }

    async fn get_var(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        conn.get(key).await.map_err(unavailable)
    }
}
