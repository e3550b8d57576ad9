use async_trait::async_trait;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::Request;
use axum::response::Response;
use claimgate::prelude::*;
use claimgate::rate_limit::{InMemoryCounterStore, StoreError};
use claimgate::{MetadataError, SearchError};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Vector search fake returning canned hits.
#[derive(Clone, Default)]
pub struct StaticSearch {
    hits: Vec<SearchHit>,
    delay: Option<Duration>,
    fail: bool,
    calls: Arc<AtomicUsize>,
    budgets: Arc<Mutex<Vec<Duration>>>,
    queries: Arc<Mutex<Vec<SearchQuery>>>,
}

impl StaticSearch {
    pub fn returning(uids: &[&str]) -> Self {
        let hits = uids
            .iter()
            .enumerate()
            .map(|(i, uid)| SearchHit::new(*uid, 1.0 - i as f32 * 0.1))
            .collect();
        Self { hits, ..Default::default() }
    }

    pub fn failing() -> Self {
        Self { fail: true, ..Default::default() }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn budgets(&self) -> Vec<Duration> {
        self.budgets.lock().unwrap().clone()
    }

    pub fn queries(&self) -> Vec<SearchQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl VectorSearch for StaticSearch {
    async fn search(
        &self,
        query: &SearchQuery,
        deadline: Deadline,
    ) -> Result<Vec<SearchHit>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.budgets.lock().unwrap().push(deadline.budget());
        self.queries.lock().unwrap().push(query.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(SearchError::Transport("connection refused".into()));
        }
        Ok(self.hits.clone())
    }
}

/// Counter store whose backend is always down.
#[derive(Clone, Default)]
pub struct FailingCounterStore;

#[async_trait]
impl CounterStore for FailingCounterStore {
    async fn incr(&self, _key: &str) -> Result<i64, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
    async fn expire(&self, _key: &str, _ttl: Duration) -> Result<bool, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
    async fn set_var(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
    async fn get_var(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
}

/// Counter store that increments fine but cannot set TTLs.
#[derive(Clone, Default)]
pub struct ExpireFailingStore {
    pub inner: InMemoryCounterStore,
}

#[async_trait]
impl CounterStore for ExpireFailingStore {
    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        self.inner.incr(key).await
    }
    async fn expire(&self, _key: &str, _ttl: Duration) -> Result<bool, StoreError> {
        Err(StoreError::Unavailable("EXPIRE timed out".into()))
    }
    async fn set_var(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        self.inner.set_var(key, value, ttl).await
    }
    async fn get_var(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get_var(key).await
    }
}

/// Metadata store that always fails.
pub struct FailingMetadata;

#[async_trait]
impl MetadataStore for FailingMetadata {
    async fn get(&self, _uids: &[String]) -> Result<Vec<ClaimMetadata>, MetadataError> {
        Err(MetadataError::Query("relation \"claim_metadata\" does not exist".into()))
    }
}

pub fn claim(uid: &str, statement: &str) -> ClaimMetadata {
    ClaimMetadata {
        uid: uid.into(),
        statement: statement.into(),
        verdict: "false".into(),
        factchecker: "politifact".into(),
        ..Default::default()
    }
}

/// GET request from `ip` as axum would see it behind `into_make_service_with_connect_info`.
pub fn get_from(uri: &str, ip: [u8; 4]) -> Request<Body> {
    let mut req = Request::get(uri).body(Body::empty()).unwrap();
    req.extensions_mut().insert(ConnectInfo(SocketAddr::from((ip, 40_000))));
    req
}

pub async fn body_string(res: Response) -> String {
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
