//! API module - HTTP handlers consumed by the chat front-ends

pub mod ask_api;
pub mod stream_api;
pub mod admin_api;

pub use ask_api::ask;
pub use stream_api::ask_stream;
pub use admin_api::{clear_cache, documents, health, root, stats};

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};

/// Message returned for a blank question
pub const EMPTY_QUESTION_DETAIL: &str = "La pregunta no puede estar vacía";

pub(crate) fn bad_request(detail: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "detail": detail })),
    )
        .into_response()
}
