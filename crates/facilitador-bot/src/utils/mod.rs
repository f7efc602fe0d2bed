//! Utilities module - text helpers and answer post-processing

pub mod answer_sanitizer;
pub mod text_utils;

pub use answer_sanitizer::{AnswerSanitizer, CONTACT_PLACEHOLDER};
pub use text_utils::TextUtils;
