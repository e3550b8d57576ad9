#![allow(missing_docs)]

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use claimgate::metadata::FileMetadataStore;
use claimgate::prelude::*;
use common::test_helpers::{
    body_string, claim, get_from, FailingCounterStore, FailingMetadata, StaticSearch,
};
use std::time::Duration;
use tower::ServiceExt;

fn catalogue() -> FileMetadataStore {
    FileMetadataStore::from_records(vec![
        claim("a1", "The moon is made of cheese"),
        claim("a2", "Vaccines contain microchips"),
        claim("a3", "The earth is flat"),
    ])
}

fn app_with<C>(
    search: StaticSearch,
    metadata: impl MetadataStore + 'static,
    counters: C,
    middleware: RateLimitConfig,
) -> Router
where
    C: CounterStore + Clone + 'static,
{
    let orchestrator = SearchOrchestrator::new(
        search,
        metadata,
        FixedWindow::new(counters.clone(), RateLimitConfig::search_endpoint()),
    );
    router(orchestrator, MiddlewareChain::new(FixedWindow::new(counters, middleware)))
}

fn app(search: StaticSearch, metadata: impl MetadataStore + 'static) -> Router {
    app_with(search, metadata, InMemoryCounterStore::new(), RateLimitConfig::middleware())
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, String) {
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    (status, body_string(res).await)
}

fn returned_uids(body: &str) -> Vec<String> {
    let json: serde_json::Value = serde_json::from_str(body).unwrap();
    json.as_array()
        .unwrap()
        .iter()
        .map(|record| record["uid"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn search_returns_enriched_hits_in_backend_order() {
    let search = StaticSearch::returning(&["a2", "missing", "a1"]);
    let app = app(search.clone(), catalogue());

    let (status, body) = send(&app, get_from("/search?q=moon%20cheese", [10, 0, 0, 1])).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(returned_uids(&body), vec!["a2", "a1"]);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json[1]["statement"], "The moon is made of cheese");
    assert!(json[1]["factcheck_date"].is_null());

    let queries = search.queries();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].text(), "moon cheese");
    assert_eq!(queries[0].k(), 5);
}

#[tokio::test]
async fn empty_hits_yield_empty_array() {
    let app = app(StaticSearch::returning(&[]), catalogue());

    let (status, body) = send(&app, get_from("/search?q=nothing", [10, 0, 0, 1])).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "[]");
}

#[tokio::test]
async fn missing_or_empty_query_is_bad_request() {
    let search = StaticSearch::returning(&["a1"]);
    let app = app(search.clone(), catalogue());

    let (status, body) = send(&app, get_from("/search", [10, 0, 0, 1])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "missing query parameter: q");

    let (status, _) = send(&app, get_from("/search?q=", [10, 0, 0, 2])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(search.calls(), 0);
}

#[tokio::test]
async fn k_is_validated_and_forwarded() {
    let search = StaticSearch::returning(&["a1"]);
    let app = app(search.clone(), catalogue());

    let (status, _) = send(&app, get_from("/search?q=x&k=0", [10, 0, 0, 1])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, get_from("/search?q=x&k=51", [10, 0, 0, 2])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, get_from("/search?q=x&k=ten", [10, 0, 0, 3])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, get_from("/search?q=x&k=7", [10, 0, 0, 4])).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(search.queries().iter().map(|q| q.k()).collect::<Vec<_>>(), vec![7]);
}

#[tokio::test]
async fn middleware_throttles_fourth_request() {
    let search = StaticSearch::returning(&["a1"]);
    let app = app(search.clone(), catalogue());

    let mut statuses = Vec::new();
    for _ in 0..4 {
        statuses.push(send(&app, get_from("/search?q=x", [10, 0, 0, 1])).await.0);
    }

    assert_eq!(
        statuses,
        vec![StatusCode::OK, StatusCode::OK, StatusCode::OK, StatusCode::TOO_MANY_REQUESTS]
    );
    assert_eq!(search.calls(), 3);
}

#[tokio::test]
async fn endpoint_limit_applies_with_its_own_message() {
    let search = StaticSearch::returning(&["a1"]);
    let lenient = RateLimitConfig::new("rate:claims:", 100, Duration::from_secs(60));
    let app = app_with(search.clone(), catalogue(), InMemoryCounterStore::new(), lenient);

    for _ in 0..5 {
        let (status, _) = send(&app, get_from("/search?q=x", [10, 0, 0, 1])).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, body) = send(&app, get_from("/search?q=x", [10, 0, 0, 1])).await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body, "Too many requests. Max is 5 requests per minute");
    assert_eq!(search.calls(), 5);
}

#[tokio::test]
async fn endpoint_limit_is_checked_before_validation() {
    let lenient = RateLimitConfig::new("rate:claims:", 100, Duration::from_secs(60));
    let app = app_with(
        StaticSearch::returning(&[]),
        catalogue(),
        InMemoryCounterStore::new(),
        lenient,
    );

    for _ in 0..5 {
        send(&app, get_from("/search?q=x", [10, 0, 0, 1])).await;
    }
    let (status, _) = send(&app, get_from("/search", [10, 0, 0, 1])).await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn undecodable_query_string_is_counted_then_rejected() {
    let search = StaticSearch::returning(&["a1"]);
    let counters = std::sync::Arc::new(InMemoryCounterStore::new());
    let lenient = RateLimitConfig::new("rate:claims:", 100, Duration::from_secs(60));
    let app = app_with(search.clone(), catalogue(), counters.clone(), lenient);

    // Fresh client: the hit is counted, then the duplicate `q` is rejected with a fixed reason.
    let (status, body) = send(&app, get_from("/search?q=a&q=b", [10, 0, 0, 2])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "invalid query string");
    assert_eq!(counters.get_var("rl:search:10.0.0.2").await.unwrap().as_deref(), Some("1"));

    // Throttled client: the limit wins over the malformed query.
    for _ in 0..5 {
        send(&app, get_from("/search?q=x", [10, 0, 0, 1])).await;
    }
    let (status, body) = send(&app, get_from("/search?q=a&q=b", [10, 0, 0, 1])).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body, "Too many requests. Max is 5 requests per minute");
    assert_eq!(search.calls(), 5);
}

#[tokio::test]
async fn backend_failure_is_bad_gateway() {
    let app = app(StaticSearch::failing(), catalogue());

    let (status, body) = send(&app, get_from("/search?q=x", [10, 0, 0, 1])).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body, "vector search failed");
}

#[tokio::test(start_paused = true)]
async fn slow_backend_times_out_as_bad_gateway() {
    let search = StaticSearch::returning(&["a1"]).with_delay(Duration::from_secs(10));
    let app = app(search.clone(), catalogue());

    let started = tokio::time::Instant::now();
    let (status, _) = send(&app, get_from("/search?q=x", [10, 0, 0, 1])).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let waited = started.elapsed();
    assert!(waited >= Duration::from_secs(5) && waited < Duration::from_secs(10));
    assert_eq!(search.budgets(), vec![Duration::from_secs(5)]);
}

#[tokio::test(start_paused = true)]
async fn inbound_deadline_shortens_backend_budget() {
    let search = StaticSearch::returning(&["a1"]).with_delay(Duration::from_secs(2));
    let app = app(search.clone(), catalogue());

    let mut req = get_from("/search?q=x", [10, 0, 0, 1]);
    req.extensions_mut()
        .insert(RequestDeadline(tokio::time::Instant::now() + Duration::from_secs(1)));
    let (status, _) = send(&app, req).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let budgets = search.budgets();
    assert_eq!(budgets.len(), 1);
    assert!(budgets[0] <= Duration::from_secs(1));
}

#[tokio::test]
async fn metadata_failure_is_internal_error() {
    let app = app(StaticSearch::returning(&["a1"]), FailingMetadata);

    let (status, body) = send(&app, get_from("/search?q=x", [10, 0, 0, 1])).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "metadata lookup failed");
}

#[tokio::test]
async fn counter_store_outage_rejects_everything_but_health() {
    let search = StaticSearch::returning(&["a1"]);
    let app =
        app_with(search.clone(), catalogue(), FailingCounterStore, RateLimitConfig::middleware());

    let (status, body) = send(&app, get_from("/search?q=x", [10, 0, 0, 1])).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, "rate limiter unavailable");
    assert_eq!(search.calls(), 0);

    let (status, body) = send(&app, get_from("/health", [10, 0, 0, 1])).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn health_is_never_throttled() {
    let app = app(StaticSearch::returning(&[]), catalogue());

    for _ in 0..10 {
        let (status, body) = send(&app, get_from("/health", [10, 0, 0, 1])).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }
    let (status, _) = send(&app, get_from("/search?q=x", [10, 0, 0, 1])).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn placeholder_routes_are_not_implemented() {
    let app = app(StaticSearch::returning(&[]), catalogue());

    let (status, body) = send(&app, get_from("/login", [10, 0, 0, 1])).await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    assert_eq!(body, "Login: not implemented");

    let mut req = Request::post("/claims").body(Body::empty()).unwrap();
    req.extensions_mut()
        .insert(axum::extract::ConnectInfo(std::net::SocketAddr::from(([10, 0, 0, 2], 1))));
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    assert_eq!(body, "CreateCommunityClaim: not implemented");
}

#[tokio::test]
async fn placeholder_routes_share_the_middleware_budget() {
    let app = app(StaticSearch::returning(&[]), catalogue());

    for _ in 0..3 {
        let (status, _) = send(&app, get_from("/login", [10, 0, 0, 1])).await;
        assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    }
    let (status, _) = send(&app, get_from("/search?q=x", [10, 0, 0, 1])).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn orchestrator_runs_without_http() {
    let orchestrator = SearchOrchestrator::new(
        StaticSearch::returning(&["a3", "a1"]),
        catalogue(),
        FixedWindow::new(InMemoryCounterStore::new(), RateLimitConfig::search_endpoint()),
    );
    let params = SearchParams { q: Some("flat".into()), k: None };

    let records = orchestrator.run("10.0.0.1", &params, None).await.unwrap();
    let got: Vec<_> = records.iter().map(|r| r.uid.as_str()).collect();
    assert_eq!(got, vec!["a3", "a1"]);

    for _ in 0..4 {
        orchestrator.run("10.0.0.1", &params, None).await.unwrap();
    }
    let err = orchestrator.run("10.0.0.1", &params, None).await.unwrap_err();
    assert!(err.is_rate_limited());
    assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn zero_backend_timeout_is_raised_to_minimum() {
    let orchestrator = SearchOrchestrator::new(
        StaticSearch::returning(&[]),
        catalogue(),
        FixedWindow::new(InMemoryCounterStore::new(), RateLimitConfig::search_endpoint()),
    )
    .with_backend_timeout(Duration::ZERO);

    assert_eq!(orchestrator.backend_timeout(), claimgate::orchestrator::MIN_BACKEND_TIMEOUT);
    assert_eq!(
        orchestrator.clone().with_backend_timeout(Duration::from_millis(250)).backend_timeout(),
        Duration::from_millis(250)
    );
}
