use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Which family of backend is answering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Chat-completion API in the cloud
    Hosted,
    /// GGUF model served by a local llama.cpp process
    Local,
    /// Keyword-driven canned generator, no model at all
    Simulated,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Hosted => "hosted",
            BackendKind::Local => "local",
            BackendKind::Simulated => "simulated",
        }
    }
}

/// The one capability the ask pipeline needs from a model.
///
/// Implementations must not block the executor: network calls are awaited,
/// CPU-bound work goes to another process or the blocking pool.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Human readable description, e.g. `"Groq llama-3.1-8b-instant"`
    fn name(&self) -> String;

    async fn generate(&self, prompt: &str) -> anyhow::Result<String>;
}
