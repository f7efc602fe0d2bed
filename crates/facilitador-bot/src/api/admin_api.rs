//! Service information, diagnostics and cache administration

use axum::{extract::State, Json};
use serde_json::{json, Value};
use tracing::{error, info};

use crate::metrics;
use crate::shared_state::AppState;
use crate::utils::TextUtils;

const SERVICE_NAME: &str = "Bot de Facilitadores Judiciales";
const SAMPLE_SIZE: usize = 5;
const PREVIEW_CHARS: usize = 200;

/// GET /
pub async fn root() -> Json<Value> {
    Json(json!({
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
    }))
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let pipeline = &state.pipeline;
    let backend = pipeline.backend();

    let (ready, documents) = match pipeline.document_store() {
        Some(store) => match store.count().await {
            Ok(count) => (true, count),
            Err(e) => {
                error!("Document store health check failed: {}", e);
                (false, 0)
            }
        },
        None => (false, 0),
    };

    metrics::inc_request("/health", "200");
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": state.uptime_seconds(),
        "backend": {
            "kind": backend.kind(),
            "name": backend.name(),
        },
        "document_store": {
            "ready": ready,
            "documents": documents,
        },
        "cache_stats": pipeline.cache_stats(),
        "features": [
            "Cache inteligente",
            "Respuestas precomputadas",
            "Procesamiento asíncrono",
            "Limpieza de respuestas",
            "Respuestas por streaming",
        ],
    }))
}

/// GET /documents
///
/// Never fails: store errors are reported in the body.
pub async fn documents(State(state): State<AppState>) -> Json<Value> {
    let Some(store) = state.pipeline.document_store() else {
        return Json(json!({
            "total_documents": 0,
            "sample_documents": [],
            "vector_db_status": "inactive",
        }));
    };

    let result = async {
        let total = store.count().await?;
        let sample = if total > 0 { store.sample(SAMPLE_SIZE).await? } else { Vec::new() };
        anyhow::Ok((total, sample))
    }
    .await;

    match result {
        Ok((total, sample)) => {
            let sample_documents: Vec<Value> = sample
                .iter()
                .map(|fragment| {
                    json!({
                        "id": fragment.id.to_string(),
                        "filename": fragment.filename,
                        "source": fragment.source,
                        "content": TextUtils::truncate_with_ellipsis(&fragment.content, PREVIEW_CHARS),
                    })
                })
                .collect();

            Json(json!({
                "total_documents": total,
                "sample_documents": sample_documents,
                "vector_db_status": "active",
            }))
        }
        Err(e) => {
            error!("Error reading documents: {}", e);
            Json(json!({
                "total_documents": 0,
                "sample_documents": [],
                "vector_db_status": "error",
                "error": e.to_string(),
            }))
        }
    }
}

/// GET /stats
pub async fn stats(State(state): State<AppState>) -> Json<Value> {
    let pipeline = &state.pipeline;
    Json(json!({
        "cache_stats": pipeline.cache_stats(),
        "precomputed_responses": pipeline.precomputed_count(),
        "backend": pipeline.backend().kind(),
        "total_requests": state.counters.total_requests(),
        "rejected_requests": state.counters.rejected_requests(),
        "system_status": "optimal",
    }))
}

/// POST /clear-cache
pub async fn clear_cache(State(state): State<AppState>) -> Json<Value> {
    state.pipeline.clear_cache();
    info!("Cache cleared via API");
    metrics::inc_request("/clear-cache", "200");
    Json(json!({ "message": "Cache limpiado exitosamente" }))
}
