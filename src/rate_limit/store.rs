use async_trait::async_trait;
use std::time::Duration;

/// Errors surfaced by a [`CounterStore`].
///
/// Every failure is explicit; a store never reports a missing backend as `count = 0`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The backing service could not be reached or rejected the command.
    #[error("counter store unavailable: {0}")]
    Unavailable(String),
    /// `incr` was issued against a key holding a non-numeric value.
    #[error("value at key `{key}` is not an integer")]
    NotAnInteger { key: String },
}

/// Abstract key-value service backing the rate limiters.
///
/// Counters and auxiliary variables share one keyspace, as in Redis.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically increment `key`, creating it at 1 if absent. Returns the new count.
    ///
    /// Must not lose updates under concurrent callers on the same key.
    async fn incr(&self, key: &str) -> Result<i64, StoreError>;

    /// Set or refresh the time-to-live of `key` without touching its value.
    ///
    /// Returns `Ok(false)` when the key does not exist; it is never created here.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError>;

    /// Store an auxiliary value that disappears after `ttl`.
    async fn set_var(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Read an auxiliary value; `Ok(None)` when absent or expired.
    async fn get_var(&self, key: &str) -> Result<Option<String>, StoreError>;
}

#[async_trait]
impl<T> CounterStore for std::sync::Arc<T>
where
    T: CounterStore + ?Sized,
{
    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        (**self).incr(key).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        (**self).expire(key, ttl).await
    }

    async fn set_var(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        (**self).set_var(key, value, ttl).await
    }

    async fn get_var(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get_var(key).await
    }
}

use crate::clock::{Clock, MonotonicClock};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
enum Value {
    Int(i64),
    Text(String),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<u64>,
}

impl Entry {
    fn is_live(&self, now: u64) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// In-process counter store.
///
/// A single mutex serialises every operation, which is what makes `incr` atomic. Expired
/// keys are dropped lazily on the next access.
#[derive(Clone, Debug)]
pub struct InMemoryCounterStore {
    // Map key -> value with optional absolute expiry (clock millis)
    data: Arc<Mutex<HashMap<String, Entry>>>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryCounterStore {
    fn default() -> Self {
        Self::with_clock(MonotonicClock::default())
    }
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store that reads time from `clock`.
    pub fn with_clock(clock: impl Clock + 'static) -> Self {
        Self { data: Arc::new(Mutex::new(HashMap::new())), clock: Arc::new(clock) }
    }

    fn deadline(&self, ttl: Duration) -> u64 {
        let ttl = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        self.clock.now_millis().saturating_add(ttl)
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        let now = self.clock.now_millis();
        let guard = self.data.lock().unwrap();
        guard.values().filter(|e| e.is_live(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        let now = self.clock.now_millis();
        let mut guard = self.data.lock().unwrap();

        if guard.get(key).is_some_and(|e| !e.is_live(now)) {
            guard.remove(key);
        }

        let entry = guard
            .entry(key.to_string())
            .or_insert(Entry { value: Value::Int(0), expires_at: None });

        let current = match &entry.value {
            Value::Int(n) => *n,
            Value::Text(s) => {
                s.parse::<i64>().map_err(|_| StoreError::NotAnInteger { key: key.to_string() })?
            }
        };
        let next = current
            .checked_add(1)
            .ok_or_else(|| StoreError::NotAnInteger { key: key.to_string() })?;
        entry.value = Value::Int(next);
        Ok(next)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        let now = self.clock.now_millis();
        let expires_at = self.deadline(ttl);
        let mut guard = self.data.lock().unwrap();
        match guard.get_mut(key) {
            Some(entry) if entry.is_live(now) => {
                entry.expires_at = Some(expires_at);
                Ok(true)
            }
            Some(_) => {
                guard.remove(key);
                Ok(false)
            }
            None => Ok(false),
        }
    }

    async fn set_var(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let expires_at = self.deadline(ttl);
        let mut guard = self.data.lock().unwrap();
        guard.insert(
            key.to_string(),
            Entry { value: Value::Text(value.to_string()), expires_at: Some(expires_at) },
        );
        Ok(())
    }

    async fn get_var(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = self.clock.now_millis();
        let mut guard = self.data.lock().unwrap();
        match guard.get(key) {
            Some(entry) if entry.is_live(now) => Ok(Some(match &entry.value {
                Value::Int(n) => n.to_string(),
                Value::Text(s) => s.clone(),
            })),
            Some(_) => {
                guard.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }
}
