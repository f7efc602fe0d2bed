use axum::http::StatusCode;
use axum::response::IntoResponse;
use lazy_static::lazy_static;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounterVec, Registry, TextEncoder};
use std::sync::OnceLock;
use tracing::warn;

lazy_static! {
    static ref REGISTRY: Registry = Registry::new();
}
static REQ_COUNTER: OnceLock<Option<IntCounterVec>> = OnceLock::new();
static OUTCOME_COUNTER: OnceLock<Option<IntCounterVec>> = OnceLock::new();
static GENERATION_TIME: OnceLock<Option<Histogram>> = OnceLock::new();

/// Register all collectors. Safe to call more than once.
pub fn init_metrics() {
    let req_counter = REQ_COUNTER.get_or_init(|| {
        IntCounterVec::new(
            prometheus::opts!("requests_total", "Total requests per route"),
            &["route", "status"],
        )
        .ok()
    });

    let outcome_counter = OUTCOME_COUNTER.get_or_init(|| {
        IntCounterVec::new(
            prometheus::opts!("pipeline_outcomes_total", "Ask pipeline results by outcome"),
            &["outcome"],
        )
        .ok()
    });

    let generation_time = GENERATION_TIME.get_or_init(|| {
        Histogram::with_opts(
            HistogramOpts::new("generation_seconds", "Language model generation latency")
                .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
        )
        .ok()
    });

    if let Some(c) = req_counter {
        REGISTRY.register(Box::new(c.clone())).ok();
    }
    if let Some(c) = outcome_counter {
        REGISTRY.register(Box::new(c.clone())).ok();
    }
    if let Some(h) = generation_time {
        REGISTRY.register(Box::new(h.clone())).ok();
    }
}

pub fn inc_request(route: &str, status: &str) {
    if let Some(Some(counter)) = REQ_COUNTER.get() {
        counter.with_label_values(&[route, status]).inc();
    }
}

pub fn inc_outcome(outcome: &str) {
    if let Some(Some(counter)) = OUTCOME_COUNTER.get() {
        counter.with_label_values(&[outcome]).inc();
    }
}

pub fn observe_generation(seconds: f64) {
    if let Some(Some(histogram)) = GENERATION_TIME.get() {
        histogram.observe(seconds);
    }
}

pub async fn get_metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!("Failed to encode metrics: {}", e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; version=0.0.4")],
            Vec::new(),
        );
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        buffer,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn test_metrics_are_exported() {
        init_metrics();
        init_metrics();
        inc_request("/ask", "200");
        inc_outcome("generated");
        observe_generation(0.3);

        let response = get_metrics().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("requests_total"));
        assert!(text.contains("pipeline_outcomes_total"));
        assert!(text.contains("generation_seconds"));
    }
}
