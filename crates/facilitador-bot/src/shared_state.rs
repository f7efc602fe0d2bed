//! State shared by every API handler

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::context_engine::AskPipeline;

/// Lock-free request counters for logs and `/stats`
#[derive(Default)]
pub struct AtomicCounters {
    pub total_requests: AtomicUsize,
    pub rejected_requests: AtomicUsize,
}

impl AtomicCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_total_requests(&self) -> usize {
        self.total_requests.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn inc_rejected_requests(&self) -> usize {
        self.rejected_requests.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn total_requests(&self) -> usize {
        self.total_requests.load(Ordering::Relaxed)
    }

    pub fn rejected_requests(&self) -> usize {
        self.rejected_requests.load(Ordering::Relaxed)
    }
}

/// Application state for the axum router. Cloning is cheap: everything
/// behind it is reference counted and built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<AskPipeline>,
    pub config: Arc<Config>,
    pub counters: Arc<AtomicCounters>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: Config, pipeline: AskPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            config: Arc::new(config),
            counters: Arc::new(AtomicCounters::new()),
            started_at: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
