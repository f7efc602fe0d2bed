//! The ask pipeline: cache → canned answer → retrieval → prompt →
//! generation → sanitizing → cache write.

use crate::cache_management::{AnswerCache, AnswerCacheConfig, CacheStats};
use crate::context_engine::context_builder::{ContextBuilder, ContextBuilderConfig};
use crate::context_engine::precomputed::PrecomputedResponses;
use crate::document_store::{DocumentStore, Fragment};
use crate::metrics;
use crate::model_runtime::LanguageModel;
use crate::types::{AnswerPayload, ConversationTurn};
use crate::utils::AnswerSanitizer;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// What the caller sees when retrieval-augmented generation fails
pub const FAILURE_ANSWER: &str =
    "Disculpa, hubo un error técnico. Por favor intenta de nuevo en un momento.";

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub cache: AnswerCacheConfig,
    pub use_precomputed: bool,
    pub redact_contacts: bool,
    /// Fragments requested from the store; only the first few reach the prompt
    pub retrieval_k: usize,
    pub context: ContextBuilderConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cache: AnswerCacheConfig::default(),
            use_precomputed: true,
            redact_contacts: true,
            retrieval_k: 4,
            context: ContextBuilderConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_app_config(config: &crate::config::Config) -> Self {
        Self {
            cache: AnswerCacheConfig::new(config.cache_max_size, config.cache_ttl_seconds),
            use_precomputed: !config.disable_precomputed,
            redact_contacts: !config.allow_contacts,
            ..Self::default()
        }
    }
}

/// Which path answered a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AskOutcome {
    CacheHit,
    Precomputed,
    Generated,
    Failed,
}

impl AskOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AskOutcome::CacheHit => "cache_hit",
            AskOutcome::Precomputed => "precomputed",
            AskOutcome::Generated => "generated",
            AskOutcome::Failed => "failed",
        }
    }
}

/// One per process; shared by every request handler.
pub struct AskPipeline {
    cache: AnswerCache,
    precomputed: PrecomputedResponses,
    use_precomputed: bool,
    retrieval_k: usize,
    context_builder: ContextBuilder,
    sanitizer: AnswerSanitizer,
    model: Arc<dyn LanguageModel>,
    document_store: Option<Arc<dyn DocumentStore>>,
}

impl AskPipeline {
    pub fn new(
        config: PipelineConfig,
        model: Arc<dyn LanguageModel>,
        document_store: Option<Arc<dyn DocumentStore>>,
    ) -> Self {
        info!(
            "Ask pipeline ready: backend={}, document_store={}, precomputed={}",
            model.name(),
            if document_store.is_some() { "available" } else { "absent" },
            config.use_precomputed
        );
        Self {
            cache: AnswerCache::new(config.cache),
            precomputed: PrecomputedResponses::default(),
            use_precomputed: config.use_precomputed,
            retrieval_k: config.retrieval_k,
            context_builder: ContextBuilder::new(config.context),
            sanitizer: AnswerSanitizer::new(config.redact_contacts),
            model,
            document_store,
        }
    }

    pub async fn ask(&self, question: &str, history: &[ConversationTurn]) -> AnswerPayload {
        self.ask_with_outcome(question, history).await.0
    }

    pub async fn ask_with_outcome(
        &self,
        question: &str,
        history: &[ConversationTurn],
    ) -> (AnswerPayload, AskOutcome) {
        let start = Instant::now();

        let (payload, outcome) = if let Some(mut hit) = self.cache.get(question) {
            hit.processing_time_seconds = start.elapsed().as_secs_f64();
            hit.cached = true;
            (hit, AskOutcome::CacheHit)
        } else if let Some(answer) = self.precomputed_answer(question) {
            let payload = AnswerPayload::new(answer, Vec::new(), start.elapsed().as_secs_f64());
            self.cache.set(question, payload.clone());
            (payload, AskOutcome::Precomputed)
        } else {
            match self.generate_answer(question, history, start).await {
                Ok(payload) => {
                    self.cache.set(question, payload.clone());
                    (payload, AskOutcome::Generated)
                }
                Err(e) => {
                    error!("❌ Error processing question: {:#}", e);
                    let payload = AnswerPayload::new(FAILURE_ANSWER, Vec::new(), start.elapsed().as_secs_f64());
                    (payload, AskOutcome::Failed)
                }
            }
        };

        metrics::inc_outcome(outcome.as_str());
        info!(
            "Answered via {} in {:.3}s",
            outcome.as_str(),
            payload.processing_time_seconds
        );
        (payload, outcome)
    }

    fn precomputed_answer(&self, question: &str) -> Option<&'static str> {
        if !self.use_precomputed {
            return None;
        }
        self.precomputed.find_match(question)
    }

    async fn generate_answer(
        &self,
        question: &str,
        history: &[ConversationTurn],
        start: Instant,
    ) -> anyhow::Result<AnswerPayload> {
        let fragments = self.retrieve(question).await;
        let built = self.context_builder.build(question, &fragments, history);

        // A panicking backend surfaces as a JoinError instead of unwinding
        // through the request handler
        let model = self.model.clone();
        let prompt = built.prompt;
        let generation_start = Instant::now();
        let raw = tokio::spawn(async move { model.generate(&prompt).await })
            .await
            .map_err(|e| anyhow::anyhow!("Generation task failed: {}", e))??;
        metrics::observe_generation(generation_start.elapsed().as_secs_f64());

        let answer = self.sanitizer.clean(&raw);
        if answer.is_empty() {
            return Err(anyhow::anyhow!("Model produced an empty answer"));
        }

        debug!("Generated {} chars from {} sources", answer.len(), built.sources.len());
        Ok(AnswerPayload::new(answer, built.sources, start.elapsed().as_secs_f64()))
    }

    /// Retrieval failures degrade to "no context"
    async fn retrieve(&self, question: &str) -> Vec<Fragment> {
        let Some(store) = &self.document_store else {
            return Vec::new();
        };
        match store.similarity_search(question, self.retrieval_k).await {
            Ok(fragments) => fragments,
            Err(e) => {
                warn!("Document search failed, continuing without context: {}", e);
                Vec::new()
            }
        }
    }

    pub fn cache(&self) -> &AnswerCache {
        &self.cache
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
        info!("Answer cache cleared");
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn precomputed_count(&self) -> usize {
        self.precomputed.len()
    }

    pub fn backend(&self) -> &Arc<dyn LanguageModel> {
        &self.model
    }

    pub fn document_store(&self) -> Option<&Arc<dyn DocumentStore>> {
        self.document_store.as_ref()
    }
}
