pub mod api;
pub mod cache_management;
pub mod config;
pub mod context_engine;
pub mod document_store;
pub mod metrics;
pub mod model_runtime;
pub mod server;
pub mod shared_state;
pub mod telemetry;
pub mod types;
pub mod utils;

pub use config::Config;
pub use context_engine::{AskPipeline, PipelineConfig};
pub use server::{build_router, build_state, run_server};
pub use shared_state::AppState;
pub use types::{AnswerPayload, AskRequest, ConversationTurn, Role, SourceReference};
