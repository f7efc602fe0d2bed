//! Hosted chat-completion backend (Groq, or any OpenAI-compatible endpoint)

use super::runtime_trait::{BackendKind, LanguageModel};
use crate::context_engine::context_builder::PERSONA;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

/// Returned instead of an error when the hosted API cannot answer
pub const HOSTED_FAILURE_ANSWER: &str =
    "Lo siento, hubo un error al procesar tu pregunta. Por favor intenta de nuevo.";

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct HostedRuntime {
    api_url: String,
    api_key: String,
    model: String,
    http_client: reqwest::Client,
}

impl HostedRuntime {
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> anyhow::Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(anyhow::anyhow!("Hosted backend requires an API key (GROQ_API_KEY)"));
        }

        Ok(Self {
            api_url: api_url.into(),
            api_key,
            model: model.into(),
            http_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
        })
    }

    async fn request_completion(&self, prompt: &str) -> anyhow::Result<String> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: PERSONA },
                ChatMessage { role: "user", content: prompt },
            ],
            temperature: 0.7,
            max_tokens: 500,
            top_p: 0.9,
            stream: false,
        };

        let resp = self.http_client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Hosted inference request failed: {}", e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Hosted inference failed ({}): {}", status, body));
        }

        let parsed: ChatCompletionResponse = resp.json().await
            .map_err(|e| anyhow::anyhow!("Failed to parse completion response: {}", e))?;

        let content = parsed.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow::anyhow!("Completion response had no content"))?;

        Ok(content.trim().to_string())
    }
}

#[async_trait]
impl LanguageModel for HostedRuntime {
    fn kind(&self) -> BackendKind {
        BackendKind::Hosted
    }

    fn name(&self) -> String {
        format!("Groq {}", self.model)
    }

    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        match self.request_completion(prompt).await {
            Ok(text) => {
                debug!("Hosted completion: {} chars", text.len());
                Ok(text)
            }
            Err(e) => {
                error!("Hosted API error: {}", e);
                Ok(HOSTED_FAILURE_ANSWER.to_string())
            }
        }
    }
}
