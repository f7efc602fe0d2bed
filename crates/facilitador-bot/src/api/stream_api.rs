//! Word-by-word delivery of a finished answer.
//!
//! The pipeline runs to completion first; the answer is then replayed as
//! newline-delimited JSON, one word per line, followed by a line carrying
//! the sources. The sources line is always sent so clients have an end
//! marker.

use axum::{
    body::Body,
    extract::State,
    http::header::{CACHE_CONTROL, CONTENT_TYPE},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::convert::Infallible;
use std::time::Duration;
use tracing::{debug, info_span, Instrument};
use uuid::Uuid;

use super::{bad_request, EMPTY_QUESTION_DETAIL};
use crate::metrics;
use crate::shared_state::AppState;
use crate::types::{AskRequest, SourceReference};

#[derive(Debug, Serialize)]
struct WordChunk<'a> {
    word: &'a str,
    is_final: bool,
    processing_time: f64,
    cached: bool,
}

#[derive(Debug, Serialize)]
struct SourcesChunk<'a> {
    sources: &'a [SourceReference],
    is_sources: bool,
}

fn ndjson_line<T: Serialize>(chunk: &T) -> String {
    let mut line = serde_json::to_string(chunk).unwrap_or_else(|_| "{}".to_string());
    line.push('\n');
    line
}

/// POST /ask/stream
pub async fn ask_stream(State(state): State<AppState>, Json(req): Json<AskRequest>) -> Response {
    state.counters.inc_total_requests();

    if req.question.trim().is_empty() {
        state.counters.inc_rejected_requests();
        metrics::inc_request("/ask/stream", "400");
        return bad_request(EMPTY_QUESTION_DETAIL);
    }

    let request_id = Uuid::new_v4();
    let pipeline = state.pipeline.clone();
    let delay = Duration::from_millis(state.config.stream_word_delay_ms);

    let output_stream = async_stream::stream! {
        let payload = pipeline
            .ask(&req.question, &req.history)
            .instrument(info_span!("ask_stream", %request_id))
            .await;

        let words: Vec<&str> = payload.answer.split_whitespace().collect();
        let last = words.len().saturating_sub(1);
        for (i, word) in words.iter().enumerate() {
            let chunk = WordChunk {
                word,
                is_final: i == last,
                processing_time: payload.processing_time_seconds,
                cached: payload.cached,
            };
            yield Ok::<String, Infallible>(ndjson_line(&chunk));
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        debug!("Streamed {} words, sending {} sources", words.len(), payload.sources.len());
        yield Ok(ndjson_line(&SourcesChunk { sources: &payload.sources, is_sources: true }));
    };

    metrics::inc_request("/ask/stream", "200");
    (
        [
            (CONTENT_TYPE, "application/x-ndjson"),
            (CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(output_stream),
    )
        .into_response()
}
