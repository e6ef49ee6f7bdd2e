use std::sync::Arc;

use anyhow::Context;
use axum::{Router, middleware, routing::get};
use hadal_api::{
    config::ApiConfig,
    jobs, metrics,
    middleware::{apply_security_headers, create_cors_layer, request_id_middleware},
    router,
    state::ApiState,
};
use hadal_db::{MemoryStore, PgStore, SharedStore};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = ApiConfig::from_env().context("invalid configuration")?;

    hadal_api::tracing::init_tracing(&config.environment);
    let metrics_handle = metrics::init_metrics()?;

    let store: SharedStore = match &config.database_url {
        Some(url) => {
            let pool = hadal_db::connect_and_migrate(url, config.db_max_connections).await?;
            tracing::info!("Connected to PostgreSQL, migrations applied");
            Arc::new(PgStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store");
            Arc::new(MemoryStore::default())
        }
    };

    let state = ApiState::new(&config, store.clone())?;

    let job_handles = jobs::start_background_jobs(store, config.audio_cache_ttl_days);
    tracing::info!(ttl_days = config.audio_cache_ttl_days, "Audio cache expiry job started");

    let cors = create_cors_layer(config.parsed_allowed_origins());

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let metrics_app = Router::new()
        .route("/metrics", get(metrics::metrics_handler))
        .with_state(metrics_handle);

    let app = router::router()
        .with_state(state)
        .merge(metrics_app)
        .layer(cors)
        .layer(trace_layer)
        .layer(middleware::from_fn(metrics::track_metrics))
        .layer(middleware::from_fn(request_id_middleware));

    let app = apply_security_headers(app, config.environment);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;

    tracing::info!(environment = ?config.environment, %address, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    for handle in job_handles {
        handle.abort();
    }
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
