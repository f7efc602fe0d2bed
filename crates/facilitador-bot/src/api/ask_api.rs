use axum::{extract::State, response::IntoResponse, response::Response, Json};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use super::{bad_request, EMPTY_QUESTION_DETAIL};
use crate::metrics;
use crate::shared_state::AppState;
use crate::types::AskRequest;

/// POST /ask
pub async fn ask(State(state): State<AppState>, Json(req): Json<AskRequest>) -> Response {
    let request_num = state.counters.inc_total_requests();

    if req.question.trim().is_empty() {
        state.counters.inc_rejected_requests();
        metrics::inc_request("/ask", "400");
        return bad_request(EMPTY_QUESTION_DETAIL);
    }

    let request_id = Uuid::new_v4();
    info!(
        "Ask request #{} ({}): {} chars, {} history turns",
        request_num,
        request_id,
        req.question.chars().count(),
        req.history.len()
    );

    let payload = state
        .pipeline
        .ask(&req.question, &req.history)
        .instrument(info_span!("ask", %request_id))
        .await;

    metrics::inc_request("/ask", "200");
    Json(payload).into_response()
}
