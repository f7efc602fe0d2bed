//! GGUF Runtime Adapter
//!
//! Serves a local GGUF model through llama.cpp's `llama-server`. The process
//! is started on the first generation request, not at construction, and
//! every later request reuses it. If a server is already answering on the
//! configured address it is used as-is.

use super::runtime_trait::{BackendKind, LanguageModel};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Stop at the prompt template's own section markers. Matching is
/// case-sensitive, so both spellings the model tends to echo are listed.
pub const STOP_SEQUENCES: &[&str] = &[
    "\n\nPregunta:",
    "\n\nContexto legal:",
    "\n\nCONTEXTO:",
    "\n\nPREGUNTA:",
    "###",
    "</s>",
];

#[derive(Debug, Clone)]
pub struct LocalRuntimeConfig {
    pub model_path: PathBuf,
    pub binary: PathBuf,
    pub host: String,
    pub port: u16,
    pub context_size: u32,
    pub threads: usize,
    pub gpu_layers: u32,
    /// Health polls (2s apart) before giving up on a freshly spawned server
    pub startup_attempts: u32,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
    n_predict: u32,
    temperature: f32,
    top_p: f32,
    top_k: u32,
    repeat_penalty: f32,
    stop: &'a [&'a str],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    content: String,
}

/// Owns the spawned llama-server; killed when the runtime is dropped.
struct LlamaServer {
    process: Mutex<Option<Child>>,
}

impl Drop for LlamaServer {
    fn drop(&mut self) {
        let process = self.process.get_mut().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(mut child) = process.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

pub struct GGUFRuntime {
    config: LocalRuntimeConfig,
    server: OnceCell<LlamaServer>,
    http_client: reqwest::Client,
    base_url: String,
}

impl GGUFRuntime {
    pub fn new(config: LocalRuntimeConfig) -> Self {
        let base_url = format!("http://{}:{}", config.host, config.port);
        Self {
            config,
            server: OnceCell::new(),
            http_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(600))
                .build()
                .unwrap_or_default(),
            base_url,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_started(&self) -> bool {
        self.server.initialized()
    }

    async fn is_ready(&self) -> bool {
        let health_url = format!("{}/health", self.base_url);
        match self.http_client
            .get(&health_url)
            .timeout(Duration::from_secs(2))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    /// Start llama-server once; concurrent callers wait on the same start.
    async fn ensure_started(&self) -> anyhow::Result<&LlamaServer> {
        self.server.get_or_try_init(|| self.start_server()).await
    }

    async fn start_server(&self) -> anyhow::Result<LlamaServer> {
        if self.is_ready().await {
            info!("Reusing llama-server already listening at {}", self.base_url);
            return Ok(LlamaServer { process: Mutex::new(None) });
        }

        let config = &self.config;
        if !config.model_path.exists() {
            return Err(anyhow::anyhow!("Model file not found: {}", config.model_path.display()));
        }

        info!("Starting llama-server for GGUF model: {}", config.model_path.display());
        info!("  Binary: {}", config.binary.display());
        info!("  Port: {}", config.port);
        info!("  Context Size: {}", config.context_size);
        info!("  GPU Layers: {}", config.gpu_layers);

        let mut cmd = Command::new(&config.binary);
        cmd.arg("--model").arg(&config.model_path)
            .arg("--host").arg(&config.host)
            .arg("--port").arg(config.port.to_string())
            .arg("--ctx-size").arg(config.context_size.to_string())
            .arg("--threads").arg(config.threads.to_string())
            .arg("--n-gpu-layers").arg(config.gpu_layers.to_string())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let child = cmd.spawn()
            .map_err(|e| anyhow::anyhow!("Failed to spawn llama-server: {}", e))?;
        let server = LlamaServer { process: Mutex::new(Some(child)) };

        info!("llama-server process started, waiting for health check...");
        for attempt in 1..=config.startup_attempts {
            sleep(Duration::from_secs(2)).await;

            if self.is_ready().await {
                info!("✅ GGUF runtime ready after {} seconds", attempt * 2);
                return Ok(server);
            }

            if attempt % 5 == 0 {
                info!("Still waiting for llama-server... ({}s)", attempt * 2);
            }
        }

        // Dropping `server` kills the half-started process
        Err(anyhow::anyhow!(
            "llama-server failed to start within {} seconds",
            config.startup_attempts * 2
        ))
    }
}

#[async_trait]
impl LanguageModel for GGUFRuntime {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    fn name(&self) -> String {
        let file = self.config.model_path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.config.model_path.display().to_string());
        format!("llama.cpp {}", file)
    }

    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        self.ensure_started().await?;

        let request = CompletionRequest {
            prompt,
            n_predict: 400,
            temperature: 0.7,
            top_p: 0.9,
            top_k: 40,
            repeat_penalty: 1.1,
            stop: STOP_SEQUENCES,
            stream: false,
        };

        let resp = self.http_client
            .post(format!("{}/completion", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Inference request failed: {}", e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            warn!("llama-server returned {}", status);
            return Err(anyhow::anyhow!("Inference failed ({}): {}", status, body));
        }

        let parsed: CompletionResponse = resp.json().await
            .map_err(|e| anyhow::anyhow!("Failed to parse response: {}", e))?;

        debug!("Local completion: {} chars", parsed.content.len());
        Ok(parsed.content.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn config_for(host: String, port: u16) -> LocalRuntimeConfig {
        LocalRuntimeConfig {
            model_path: PathBuf::from("/nonexistent/model.gguf"),
            binary: PathBuf::from("/nonexistent/llama-server"),
            host,
            port,
            context_size: 2048,
            threads: 2,
            gpu_layers: 0,
            startup_attempts: 1,
        }
    }

    #[tokio::test]
    async fn test_reuses_running_server() {
        let mut server = mockito::Server::new_async().await;
        let health = server
            .mock("GET", "/health")
            .with_status(200)
            .with_body(r#"{"status": "ok"}"#)
            .expect(1)
            .create_async()
            .await;
        let completion = server
            .mock("POST", "/completion")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "n_predict": 400,
                "top_k": 40,
                "stop": ["\n\nPregunta:", "\n\nContexto legal:", "\n\nCONTEXTO:", "\n\nPREGUNTA:", "###", "</s>"]
            })))
            .with_status(200)
            .with_body(r#"{"content": "  Andá al Juzgado de Familia.\n"}"#)
            .expect(2)
            .create_async()
            .await;

        let addr: std::net::SocketAddr = server.host_with_port().parse().unwrap();
        let runtime = GGUFRuntime::new(config_for(addr.ip().to_string(), addr.port()));
        assert!(!runtime.is_started());

        let first = runtime.generate("Pregunta: pensión").await.unwrap();
        let second = runtime.generate("Pregunta: pensión").await.unwrap();
        assert_eq!(first, "Andá al Juzgado de Familia.");
        assert_eq!(first, second);
        assert!(runtime.is_started());

        // Health is probed only for the first (lazy) start
        health.assert_async().await;
        completion.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_model_is_an_error() {
        // Nothing listens on the discard port
        let runtime = GGUFRuntime::new(config_for("127.0.0.1".into(), 9));
        assert!(runtime.generate("hola").await.is_err());
        assert!(!runtime.is_started());
    }

    #[test]
    fn test_stops_match_prompt_markers() {
        use crate::context_engine::ContextBuilder;
        use crate::document_store::Fragment;

        let fragment = Fragment {
            id: 1,
            filename: "pension.txt".into(),
            source: "./data/pension.txt".into(),
            content: "Juzgado de Familia".into(),
        };
        let prompt = ContextBuilder::default().build("hola", &[fragment], &[]).prompt;

        for marker in ["\n\nContexto legal:", "\n\nPregunta:"] {
            assert!(prompt.contains(marker), "prompt lacks {:?}", marker);
            assert!(STOP_SEQUENCES.contains(&marker));
        }
    }

    #[test]
    fn test_name_uses_model_file() {
        let runtime = GGUFRuntime::new(config_for("127.0.0.1".into(), 9));
        assert_eq!(runtime.name(), "llama.cpp model.gguf");
        assert_eq!(runtime.kind(), BackendKind::Local);
    }
}
