//! Read-side access to the pre-populated fragment store.
//!
//! Ingestion (chunking and embedding of source documents) happens outside
//! this service; the pipeline only asks for the fragments closest to a
//! question.

pub mod embedder;
pub mod schema;
pub mod sqlite_store;

pub use embedder::QueryEmbedder;
pub use schema::Fragment;
pub use sqlite_store::SqliteDocumentStore;

use async_trait::async_trait;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Up to `k` fragments most similar to `query`, best first
    async fn similarity_search(&self, query: &str, k: usize) -> anyhow::Result<Vec<Fragment>>;

    /// Total number of indexed fragments
    async fn count(&self) -> anyhow::Result<usize>;

    /// A few fragments for diagnostics, in storage order
    async fn sample(&self, limit: usize) -> anyhow::Result<Vec<Fragment>>;
}
