use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const DEFAULT_GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_host: String,
    pub api_port: u16,
    pub document_store_path: PathBuf,
    pub embedding_model: String,
    pub embedding_url: Option<String>,
    pub model_path: String,
    pub llama_bin: Option<String>,
    pub llama_host: String,
    pub llama_port: u16,
    pub ctx_size: u32,
    pub gpu_layers: u32,
    pub threads: usize,
    pub groq_api_key: String,
    pub groq_model: String,
    pub groq_api_url: String,
    pub use_groq_api: bool,
    pub cache_max_size: usize,
    pub cache_ttl_seconds: u64,
    pub disable_precomputed: bool,
    pub allow_contacts: bool,
    pub request_timeout_seconds: u64,
    pub stream_word_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_host: "0.0.0.0".into(),
            api_port: 8000,
            document_store_path: PathBuf::from("./data/documents.db"),
            embedding_model: "sentence-transformers/all-MiniLM-L6-v2".into(),
            embedding_url: None,
            model_path: "./models/Phi-3-mini-4k-instruct-q4.gguf".into(),
            llama_bin: None,
            llama_host: "127.0.0.1".into(),
            llama_port: 8081,
            ctx_size: 2048,
            gpu_layers: 0,
            threads: Self::auto_detect_threads(),
            groq_api_key: String::new(),
            groq_model: "llama-3.1-8b-instant".into(),
            groq_api_url: DEFAULT_GROQ_API_URL.into(),
            use_groq_api: true,
            cache_max_size: 1000,
            cache_ttl_seconds: 3600,
            disable_precomputed: false,
            allow_contacts: false,
            request_timeout_seconds: 120,
            stream_word_delay_ms: 50,
        }
    }
}

impl Config {
    /// Load `config/config.env` and `.env` (both optional), then read the
    /// process environment.
    pub fn from_env() -> Result<Self> {
        Self::load_env_file(Path::new("config/config.env"));
        match dotenvy::dotenv() {
            Ok(path) => info!("Loaded environment variables from {}", path.display()),
            Err(e) => warn!("Failed to load .env file: {}. Using system environment variables.", e),
        }

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load an env file without overriding variables that are already set
    pub fn load_env_file(path: &Path) {
        match dotenvy::from_path(path) {
            Ok(()) => info!("Loaded environment variables from {}", path.display()),
            Err(e) => warn!("Could not load {}: {}", path.display(), e),
        }
    }

    /// Build a configuration from any key lookup; `from_env` passes the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let document_store_path = get("DOCUMENT_STORE_PATH")
            .or_else(|| get("CHROMA_PERSIST_DIRECTORY"))
            .map(PathBuf::from)
            .unwrap_or(defaults.document_store_path);

        let threads = match get("NUM_THREADS") {
            None => defaults.threads,
            Some(v) if v.eq_ignore_ascii_case("auto") => defaults.threads,
            Some(v) => v
                .parse::<usize>()
                .with_context(|| format!("NUM_THREADS must be a positive integer or 'auto', got '{}'", v))?
                .max(1),
        };

        Ok(Self {
            api_host: get("API_HOST").unwrap_or(defaults.api_host),
            api_port: parse_or(&get, "API_PORT", defaults.api_port)?,
            document_store_path,
            embedding_model: get("EMBEDDING_MODEL").unwrap_or(defaults.embedding_model),
            embedding_url: get("EMBEDDING_URL"),
            model_path: get("MODEL_PATH").unwrap_or(defaults.model_path),
            llama_bin: get("LLAMA_BIN"),
            llama_host: get("LLAMA_HOST").unwrap_or(defaults.llama_host),
            llama_port: parse_or(&get, "LLAMA_PORT", defaults.llama_port)?,
            ctx_size: parse_or(&get, "N_CTX", defaults.ctx_size)?,
            gpu_layers: parse_or(&get, "N_GPU_LAYERS", defaults.gpu_layers)?,
            threads,
            groq_api_key: get("GROQ_API_KEY").unwrap_or_default(),
            groq_model: get("GROQ_MODEL").unwrap_or(defaults.groq_model),
            groq_api_url: get("GROQ_API_URL").unwrap_or(defaults.groq_api_url),
            use_groq_api: flag_or(&get, "USE_GROQ_API", defaults.use_groq_api)?,
            cache_max_size: parse_or(&get, "CACHE_MAX_SIZE", defaults.cache_max_size)?,
            cache_ttl_seconds: parse_or(&get, "CACHE_TTL_SECONDS", defaults.cache_ttl_seconds)?,
            disable_precomputed: flag_or(&get, "DISABLE_PRECOMPUTED", defaults.disable_precomputed)?,
            allow_contacts: flag_or(&get, "ALLOW_CONTACTS", defaults.allow_contacts)?,
            request_timeout_seconds: parse_or(&get, "REQUEST_TIMEOUT_SECONDS", defaults.request_timeout_seconds)?,
            stream_word_delay_ms: parse_or(&get, "STREAM_WORD_DELAY_MS", defaults.stream_word_delay_ms)?,
        })
    }

    fn auto_detect_threads() -> usize {
        let cpus = num_cpus::get();
        match cpus {
            0..=2 => 1,
            3..=4 => cpus - 1,
            5..=8 => (cpus * 3) / 4,
            _ => cpus / 2,
        }
    }

    pub fn hosted_api_enabled(&self) -> bool {
        self.use_groq_api && !self.groq_api_key.is_empty()
    }

    pub fn llama_url(&self) -> String {
        format!("http://{}:{}", self.llama_host, self.llama_port)
    }

    pub fn print_config(&self) {
        info!("Current Configuration:");
        info!("- API: {}:{}", self.api_host, self.api_port);
        info!("- Document Store: {}", self.document_store_path.display());
        info!("- Embedding Model: {}", self.embedding_model);
        info!("- Embedding URL: {}", self.embedding_url.as_deref().unwrap_or("(lexical retrieval)"));
        info!("- Model Path: {}", self.model_path);
        info!("- Llama Binary: {}", self.llama_bin.as_deref().unwrap_or("(search PATH)"));
        info!("- Llama Backend: {}", self.llama_url());
        info!("- Context Size: {}", self.ctx_size);
        info!("- GPU Layers: {}", self.gpu_layers);
        info!("- Threads: {}", self.threads);
        info!("- Hosted API: {} ({})", self.use_groq_api, self.groq_model);
        info!("- Hosted API Key: {}", mask_secret(&self.groq_api_key));
        info!("- Cache: {} entries, {}s TTL", self.cache_max_size, self.cache_ttl_seconds);
        info!("- Precomputed Responses: {}", if self.disable_precomputed { "disabled" } else { "enabled" });
        info!("- Contact Redaction: {}", if self.allow_contacts { "disabled" } else { "enabled" });
        info!("- Request Timeout: {}s", self.request_timeout_seconds);
    }

    /// Resolve the listen address; `API_HOST` may be a hostname
    pub async fn api_addr(&self) -> Result<SocketAddr> {
        let host = self.api_host.as_str();
        tokio::net::lookup_host((host, self.api_port))
            .await
            .with_context(|| format!("Invalid listen address {}:{}", host, self.api_port))?
            .next()
            .ok_or_else(|| anyhow::anyhow!("No address found for {}:{}", host, self.api_port))
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(v) => v.parse::<T>().with_context(|| format!("Invalid value for {}: '{}'", key, v)),
        None => Ok(default),
    }
}

fn flag_or<G>(get: &G, key: &str, default: bool) -> Result<bool>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key).map(|v| v.to_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(anyhow::anyhow!("Invalid boolean for {}: '{}'", key, v)),
        },
    }
}

fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        return "(not set)".into();
    }
    let visible: String = secret.chars().take(4).collect();
    format!("{}****", visible)
}
