//! Server startup: builds the pipeline from configuration, wires the router
//! and serves until ctrl-c.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::{
    config::Config,
    context_engine::{AskPipeline, PipelineConfig},
    document_store::{DocumentStore, QueryEmbedder, SqliteDocumentStore},
    model_runtime::RuntimeManager,
    shared_state::AppState,
};

/// Open the fragment store; a missing or broken store only disables retrieval
pub fn open_document_store(cfg: &Config) -> Option<Arc<dyn DocumentStore>> {
    let embedder = cfg
        .embedding_url
        .as_ref()
        .map(|url| QueryEmbedder::new(url.clone(), cfg.embedding_model.clone()));
    if embedder.is_none() {
        info!("EMBEDDING_URL not set, document search will be lexical");
    }

    match SqliteDocumentStore::open(&cfg.document_store_path, &cfg.embedding_model, embedder) {
        Ok(store) => {
            info!("✅ Document store opened at {}", cfg.document_store_path.display());
            Some(Arc::new(store))
        }
        Err(e) => {
            warn!("⚠️ Document store unavailable ({}), answering without retrieval", e);
            None
        }
    }
}

/// Everything the handlers need, built once
pub fn build_state(cfg: Config) -> AppState {
    let document_store = open_document_store(&cfg);
    let model = RuntimeManager::select_backend(&cfg);
    let pipeline = AskPipeline::new(PipelineConfig::from_app_config(&cfg), model, document_store);
    AppState::new(cfg, pipeline)
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers(Any);
    let timeout = Duration::from_secs(state.config.request_timeout_seconds.max(1));

    Router::new()
        .route("/", get(crate::api::root))
        .route("/health", get(crate::api::health))
        .route("/ask", post(crate::api::ask))
        .route("/ask/stream", post(crate::api::ask_stream))
        .route("/documents", get(crate::api::documents))
        .route("/stats", get(crate::api::stats))
        .route("/clear-cache", post(crate::api::clear_cache))
        .route("/metrics", get(crate::metrics::get_metrics))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(timeout))
        .with_state(state)
}

pub async fn run_server(cfg: Config) -> anyhow::Result<()> {
    crate::metrics::init_metrics();
    cfg.print_config();

    let addr = cfg.api_addr().await?;
    let state = build_state(cfg);

    info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
