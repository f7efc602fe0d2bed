//! Answer cache configuration

use std::time::Duration;

/// Bounds for the answer cache
#[derive(Debug, Clone)]
pub struct AnswerCacheConfig {
    /// Maximum number of cached questions
    pub max_size: usize,
    /// How long an answer stays valid after it was stored
    pub ttl: Duration,
}

impl Default for AnswerCacheConfig {
    fn default() -> Self {
        Self {
            max_size: 1000,
            ttl: Duration::from_secs(3600),
        }
    }
}

impl AnswerCacheConfig {
    pub fn new(max_size: usize, ttl_seconds: u64) -> Self {
        Self {
            max_size: max_size.max(1),
            ttl: Duration::from_secs(ttl_seconds),
        }
    }
}
