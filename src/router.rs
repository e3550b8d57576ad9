//! HTTP surface: route table and thin axum handlers over [`SearchOrchestrator`].

use crate::deadline::RequestDeadline;
use crate::error::GatewayError;
use crate::metadata::ClaimMetadata;
use crate::middleware::MiddlewareChain;
use crate::orchestrator::{SearchOrchestrator, SearchParams};
use crate::rate_limit::{client_id, RateLimiter};
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, Request, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;

/// Shared handler state.
#[derive(Clone, Debug)]
pub struct AppState {
    orchestrator: Arc<SearchOrchestrator>,
}

impl AppState {
    pub fn new(orchestrator: SearchOrchestrator) -> Self {
        Self { orchestrator: Arc::new(orchestrator) }
    }
}

/// Build the gateway router.
///
/// `/search`, `/login` and `/claims` run behind `chain`; `/health` bypasses it so health
/// checks are never throttled.
pub fn router<L>(orchestrator: SearchOrchestrator, chain: MiddlewareChain<L>) -> Router
where
    L: RateLimiter + 'static,
{
    let api = Router::new()
        .route("/search", get(search))
        .route("/login", get(login))
        .route("/claims", post(create_claim))
        .layer(chain)
        .with_state(AppState::new(orchestrator));

    Router::new().route("/health", get(health)).merge(api)
}

/// `GET /search?q=<text>[&k=<n>]`
///
/// The query string is decoded only after the endpoint limit admits the client.
pub async fn search(
    State(state): State<AppState>,
    query: Result<Query<SearchParams>, QueryRejection>,
    req: Request,
) -> Result<Json<Vec<ClaimMetadata>>, GatewayError> {
    let client = client_id(&req);
    let inbound = req.extensions().get::<RequestDeadline>().copied();
    state.orchestrator.admit(&client).await?;
    let Query(params) = query.map_err(|rejection| {
        tracing::debug!(client = %client, error = %rejection, "undecodable query string");
        GatewayError::InvalidParameter("invalid query string".into())
    })?;
    let records = state.orchestrator.execute(&params, inbound).await?;
    Ok(Json(records))
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn login() -> (StatusCode, &'static str) {
    (StatusCode::NOT_IMPLEMENTED, "Login: not implemented")
}

pub async fn create_claim() -> (StatusCode, &'static str) {
    (StatusCode::NOT_IMPLEMENTED, "CreateCommunityClaim: not implemented")
}
