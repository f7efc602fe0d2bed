//! Runtime Manager
//!
//! Picks the language-model backend once at startup. Priority is hosted API,
//! then a local GGUF model, then the simulated responder, so the service can
//! always start.

use super::gguf_runtime::{GGUFRuntime, LocalRuntimeConfig};
use super::hosted_runtime::HostedRuntime;
use super::runtime_trait::LanguageModel;
use super::simulated_runtime::SimulatedRuntime;
use crate::config::Config;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

pub struct RuntimeManager;

impl RuntimeManager {
    pub fn select_backend(config: &Config) -> Arc<dyn LanguageModel> {
        if config.hosted_api_enabled() {
            match HostedRuntime::new(&config.groq_api_url, &config.groq_api_key, &config.groq_model) {
                Ok(runtime) => {
                    info!("🚀 Using hosted API backend: {}", runtime.name());
                    return Arc::new(runtime);
                }
                Err(e) => warn!("Hosted backend unavailable ({}), trying local model", e),
            }
        } else if config.use_groq_api {
            info!("GROQ_API_KEY not set, skipping hosted backend");
        }

        match Self::local_runtime_config(config) {
            Ok(local) => {
                let runtime = GGUFRuntime::new(local);
                info!("🧠 Using local GGUF backend: {} (loaded on first request)", runtime.name());
                Arc::new(runtime)
            }
            Err(reason) => {
                warn!("⚠️ Falling back to simulated responder: {}", reason);
                Arc::new(SimulatedRuntime::default())
            }
        }
    }

    /// Settings for the local backend, or why it cannot be used
    pub fn local_runtime_config(config: &Config) -> anyhow::Result<LocalRuntimeConfig> {
        let model_path = PathBuf::from(&config.model_path);
        if !model_path.exists() {
            return Err(anyhow::anyhow!("model file not found at {}", model_path.display()));
        }

        let binary = Self::resolve_llama_binary(config.llama_bin.as_deref())?;

        Ok(LocalRuntimeConfig {
            model_path,
            binary,
            host: config.llama_host.clone(),
            port: config.llama_port,
            context_size: config.ctx_size,
            threads: config.threads,
            gpu_layers: config.gpu_layers,
            startup_attempts: 30,
        })
    }

    /// `LLAMA_BIN` when set, otherwise `llama-server` on `PATH`
    pub fn resolve_llama_binary(configured: Option<&str>) -> anyhow::Result<PathBuf> {
        match configured {
            Some(path) => {
                let path = Path::new(path);
                if path.exists() {
                    Ok(path.to_path_buf())
                } else {
                    Err(anyhow::anyhow!("LLAMA_BIN points to missing file {}", path.display()))
                }
            }
            None => which::which("llama-server")
                .map_err(|_| anyhow::anyhow!("llama-server not found on PATH and LLAMA_BIN not set")),
        }
    }
}
