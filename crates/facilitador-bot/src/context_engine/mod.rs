//! Context engine: canned answers, prompt assembly and the ask pipeline

pub mod precomputed;
pub mod context_builder;
pub mod orchestrator;

pub use precomputed::{PrecomputedResponses, PrecomputedTopic};
pub use context_builder::{BuiltContext, ContextBuilder, ContextBuilderConfig};
pub use orchestrator::{AskOutcome, AskPipeline, PipelineConfig, FAILURE_ANSWER};
