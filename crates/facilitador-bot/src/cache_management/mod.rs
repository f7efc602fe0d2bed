// src/cache_management/mod.rs

//! Answer cache shared by every request handler

pub mod answer_cache;
pub mod cache_config;

pub use answer_cache::{AnswerCache, CacheStats};
pub use cache_config::AnswerCacheConfig;
