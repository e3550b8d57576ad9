use anyhow::Context;
use claimgate::config::{GatewayConfig, MetadataSource};
use claimgate::metadata::{FileMetadataStore, MetadataBackend, PostgresMetadataStore};
use claimgate::rate_limit::{FixedWindow, RedisCounterStore};
use claimgate::search::GrpcVectorSearch;
use claimgate::{router, MiddlewareChain, SearchOrchestrator};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = GatewayConfig::from_env().context("invalid configuration")?;
    tracing::info!(bind = %cfg.bind, "starting claimgate");

    // 1. Metadata backend:
    let metadata: MetadataBackend = match &cfg.metadata {
        MetadataSource::File(path) => FileMetadataStore::open(path)
            .with_context(|| format!("failed to load metadata index from {}", path.display()))?
            .into(),
        MetadataSource::Postgres { url, max_connections } => {
            PostgresMetadataStore::connect(url, *max_connections)
                .await
                .context("failed to connect to postgres")?
                .into()
        }
    };
    tracing::info!(backend = metadata.kind(), "metadata store ready");

    // 2. Counter store (shared by both limiters):
    let counters = Arc::new(
        RedisCounterStore::connect(&cfg.redis_url)
            .await
            .context("failed to connect to redis")?,
    );

    // 3. Vector search client (connects on first call):
    let search = GrpcVectorSearch::connect_lazy(&cfg.vector_search_addr)
        .context("invalid vector search address")?;

    // 4. Pipeline and router:
    let orchestrator = SearchOrchestrator::new(
        search,
        metadata,
        FixedWindow::new(counters.clone(), cfg.search_limit.clone()),
    )
    .with_default_k(cfg.default_k)
    .with_max_k(cfg.max_k)
    .with_backend_timeout(cfg.backend_timeout);
    let chain = MiddlewareChain::new(FixedWindow::new(counters, cfg.middleware_limit.clone()));
    let app = router(orchestrator, chain);

    // 5. Serve:
    let listener = tokio::net::TcpListener::bind(cfg.bind).await?;
    tracing::info!("HTTP server listening on {}", cfg.bind);
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c; running until killed");
        std::future::pending::<()>().await;
    }
}
