//! Request and response records shared between the pipeline and the API.

use serde::{Deserialize, Serialize};

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One prior exchange supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Display-only metadata about a fragment that was used to build the prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceReference {
    pub filename: String,
    pub content: String,
    pub source: String,
}

/// What the pipeline hands back for a question.
///
/// `processing_time` is always the wall-clock duration of the request that
/// produced this value, including cache hits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerPayload {
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<SourceReference>,
    #[serde(rename = "processing_time", default)]
    pub processing_time_seconds: f64,
    #[serde(default)]
    pub cached: bool,
}

impl AnswerPayload {
    pub fn new(answer: impl Into<String>, sources: Vec<SourceReference>, processing_time_seconds: f64) -> Self {
        Self {
            answer: answer.into(),
            sources,
            processing_time_seconds,
            cached: false,
        }
    }
}

/// Body of `POST /ask` and `POST /ask/stream`.
#[derive(Debug, Clone, Deserialize)]
pub struct AskRequest {
    pub question: String,
    #[serde(default)]
    pub history: Vec<ConversationTurn>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_serializes_processing_time_key() {
        let payload = AnswerPayload::new("hola", Vec::new(), 1.5);
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["processing_time"], 1.5);
        assert_eq!(json["cached"], false);
        assert!(json["sources"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_ask_request_history_defaults_to_empty() {
        let req: AskRequest = serde_json::from_str(r#"{"question": "¿Qué es conciliar?"}"#).unwrap();
        assert!(req.history.is_empty());
    }

    #[test]
    fn test_roles_use_lowercase_names() {
        let req: AskRequest = serde_json::from_str(
            r#"{"question": "x", "history": [{"role": "user", "content": "a"}, {"role": "assistant", "content": "b"}]}"#,
        )
        .unwrap();
        assert_eq!(req.history[0], ConversationTurn::user("a"));
        assert_eq!(req.history[1], ConversationTurn::assistant("b"));
    }
}
