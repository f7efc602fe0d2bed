//! Language-model backends behind one `generate` capability:
//! - hosted chat-completion API (Groq)
//! - local GGUF model served by llama.cpp
//! - simulated keyword responder, always available

pub mod runtime_trait;
pub mod gguf_runtime;
pub mod hosted_runtime;
pub mod simulated_runtime;
pub mod runtime_manager;

pub use runtime_trait::{BackendKind, LanguageModel};
pub use gguf_runtime::{GGUFRuntime, LocalRuntimeConfig};
pub use hosted_runtime::{HostedRuntime, HOSTED_FAILURE_ANSWER};
pub use simulated_runtime::SimulatedRuntime;
pub use runtime_manager::RuntimeManager;
