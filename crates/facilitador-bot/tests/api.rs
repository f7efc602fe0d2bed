use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use facilitador_bot::context_engine::{AskPipeline, PipelineConfig};
use facilitador_bot::document_store::{DocumentStore, SqliteDocumentStore};
use facilitador_bot::model_runtime::{BackendKind, LanguageModel};
use facilitador_bot::{build_router, AppState, Config};

struct FixedModel {
    answer: &'static str,
    calls: AtomicUsize,
}

impl FixedModel {
    fn new(answer: &'static str) -> Arc<Self> {
        Arc::new(Self { answer, calls: AtomicUsize::new(0) })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageModel for FixedModel {
    fn kind(&self) -> BackendKind {
        BackendKind::Simulated
    }

    fn name(&self) -> String {
        "fixed".to_string()
    }

    async fn generate(&self, _prompt: &str) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.answer.to_string())
    }
}

fn test_config() -> Config {
    Config {
        stream_word_delay_ms: 0,
        ..Config::default()
    }
}

fn router_with(model: Arc<FixedModel>, store: Option<Arc<dyn DocumentStore>>) -> Router {
    let pipeline = AskPipeline::new(PipelineConfig::default(), model, store);
    build_router(AppState::new(test_config(), pipeline))
}

async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn blank_question_is_rejected_before_the_model() {
    let model = FixedModel::new("nunca");
    let app = router_with(model.clone(), None);

    for uri in ["/ask", "/ask/stream"] {
        let (status, body) = post_json(&app, uri, json!({ "question": "   " })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["detail"], "La pregunta no puede estar vacía");
    }
    assert_eq!(model.calls(), 0);

    let (_, stats) = get_json(&app, "/stats").await;
    assert_eq!(stats["total_requests"], 2);
    assert_eq!(stats["rejected_requests"], 2);
}

#[tokio::test]
async fn canned_answer_is_cached_on_second_ask() {
    let model = FixedModel::new("generado");
    let app = router_with(model.clone(), None);
    let question = json!({ "question": "¿Qué es un facilitador judicial?" });

    let (status, first) = post_json(&app, "/ask", question.clone()).await;
    assert_eq!(status, StatusCode::OK);
    let first: Value = serde_json::from_slice(&first).unwrap();
    assert_eq!(first["cached"], false);
    assert!(first["sources"].as_array().unwrap().is_empty());
    assert_ne!(first["answer"], "generado");

    let (_, second) = post_json(&app, "/ask", question).await;
    let second: Value = serde_json::from_slice(&second).unwrap();
    assert_eq!(second["cached"], true);
    assert_eq!(second["answer"], first["answer"]);
    assert!(second["processing_time"].as_f64().unwrap() >= 0.0);

    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn generated_answer_goes_through_the_model_once() {
    let model = FixedModel::new("Podés acudir a la oficina más cercana.");
    let app = router_with(model.clone(), None);
    let question = json!({
        "question": "Me despidieron sin pagarme",
        "history": [{ "role": "user", "content": "hola" }]
    });

    let (_, first) = post_json(&app, "/ask", question.clone()).await;
    let first: Value = serde_json::from_slice(&first).unwrap();
    assert_eq!(first["answer"], "Podés acudir a la oficina más cercana.");
    assert_eq!(first["cached"], false);

    let (_, second) = post_json(&app, "/ask", question).await;
    let second: Value = serde_json::from_slice(&second).unwrap();
    assert_eq!(second["cached"], true);
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn stream_sends_words_then_sources() {
    let model = FixedModel::new("Andá al juzgado mañana");
    let app = router_with(model, None);

    let request = Request::builder()
        .method("POST")
        .uri("/ask/stream")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "question": "¿Dónde presento la demanda?" }).to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "application/x-ndjson");

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let lines: Vec<Value> = std::str::from_utf8(&bytes)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(lines.len(), 5);
    let words: Vec<&str> = lines[..4].iter().map(|l| l["word"].as_str().unwrap()).collect();
    assert_eq!(words, ["Andá", "al", "juzgado", "mañana"]);
    assert_eq!(lines[2]["is_final"], false);
    assert_eq!(lines[3]["is_final"], true);

    let last = &lines[4];
    assert_eq!(last["is_sources"], true);
    assert!(last["sources"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn clear_cache_resets_stats() {
    let model = FixedModel::new("respuesta");
    let app = router_with(model.clone(), None);

    post_json(&app, "/ask", json!({ "question": "una consulta" })).await;
    let (_, stats) = get_json(&app, "/stats").await;
    assert_eq!(stats["cache_stats"]["size"], 1);

    let (status, body) = post_json(&app, "/clear-cache", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["message"], "Cache limpiado exitosamente");

    let (_, stats) = get_json(&app, "/stats").await;
    assert_eq!(stats["cache_stats"]["size"], 0);

    post_json(&app, "/ask", json!({ "question": "una consulta" })).await;
    assert_eq!(model.calls(), 2);
}

#[tokio::test]
async fn root_health_and_stats_describe_the_service() {
    let app = router_with(FixedModel::new("x"), None);

    let (status, root) = get_json(&app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(root["status"], "running");

    let (_, health) = get_json(&app, "/health").await;
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["backend"]["kind"], "simulated");
    assert_eq!(health["backend"]["name"], "fixed");
    assert_eq!(health["document_store"]["ready"], false);

    let (_, stats) = get_json(&app, "/stats").await;
    assert_eq!(stats["precomputed_responses"], 4);
    assert_eq!(stats["system_status"], "optimal");
}

#[tokio::test]
async fn metrics_endpoint_is_text() {
    facilitador_bot::metrics::init_metrics();
    let app = router_with(FixedModel::new("x"), None);
    post_json(&app, "/ask", json!({ "question": "métricas" })).await;

    let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("requests_total"));
}

#[tokio::test]
async fn documents_reports_store_state() {
    let (_, inactive) = get_json(&router_with(FixedModel::new("x"), None), "/documents").await;
    assert_eq!(inactive["vector_db_status"], "inactive");
    assert_eq!(inactive["total_documents"], 0);

    let dir = TempDir::new().unwrap();
    let store = SqliteDocumentStore::create(&dir.path().join("docs.db"), "test-model", None).unwrap();
    let long = "La conciliación es un proceso voluntario. ".repeat(10);
    store.insert_fragment("conciliacion.txt", "./data/conciliacion.txt", &long, None).unwrap();
    store.insert_fragment("pension.txt", "./data/pension.txt", "Juzgado de Familia", None).unwrap();

    let app = router_with(FixedModel::new("x"), Some(Arc::new(store)));
    let (status, active) = get_json(&app, "/documents").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(active["vector_db_status"], "active");
    assert_eq!(active["total_documents"], 2);

    let sample = active["sample_documents"].as_array().unwrap();
    assert_eq!(sample.len(), 2);
    let preview = sample
        .iter()
        .find(|d| d["filename"] == "conciliacion.txt")
        .unwrap()["content"]
        .as_str()
        .unwrap();
    assert!(preview.ends_with("..."));
    assert_eq!(preview.chars().count(), 203);

    let (_, health) = get_json(&app, "/health").await;
    assert_eq!(health["document_store"]["ready"], true);
    assert_eq!(health["document_store"]["documents"], 2);
}

#[tokio::test]
async fn retrieved_fragments_become_sources() {
    let dir = TempDir::new().unwrap();
    let store = SqliteDocumentStore::create(&dir.path().join("docs.db"), "test-model", None).unwrap();
    store
        .insert_fragment("laboral.txt", "./data/laboral.txt", "El salario adeudado se reclama ante el Juzgado de Trabajo.", None)
        .unwrap();

    let model = FixedModel::new("Reclamá ante el Juzgado de Trabajo.");
    let app = router_with(model.clone(), Some(Arc::new(store)));

    let (_, body) = post_json(&app, "/ask", json!({ "question": "Me deben el salario adeudado" })).await;
    let body: Value = serde_json::from_slice(&body).unwrap();
    let sources = body["sources"].as_array().unwrap();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0]["filename"], "laboral.txt");
    assert_eq!(sources[0]["source"], "./data/laboral.txt");
    assert_eq!(model.calls(), 1);
}
