//! SQLite-backed fragment store with an HNSW index over stored embeddings

use super::embedder::QueryEmbedder;
use super::schema::{Fragment, SCHEMA_SQL};
use super::DocumentStore;
use crate::utils::TextUtils;

use async_trait::async_trait;
use hora::core::ann_index::ANNIndex;
use hora::core::metrics::Metric;
use hora::index::hnsw_idx::HNSWIndex;
use hora::index::hnsw_params::HNSWParams;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OpenFlags, Row};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

const MIN_LEXICAL_WORD_LEN: usize = 3;
/// Below this many vectors a linear scan is exact and cheap enough
const LINEAR_SCAN_LIMIT: usize = 256;

struct VectorIndex {
    hnsw: Option<HNSWIndex<f32, i64>>,
    vectors: HashMap<i64, Vec<f32>>,
    dimension: usize,
}

struct StoreInner {
    pool: Pool<SqliteConnectionManager>,
    embedding_model: String,
    index: RwLock<Option<VectorIndex>>,
}

#[derive(Clone)]
pub struct SqliteDocumentStore {
    inner: Arc<StoreInner>,
    embedder: Option<QueryEmbedder>,
}

impl SqliteDocumentStore {
    /// Open an existing store. A missing file is an error: the store is
    /// produced by the ingestion tooling, never by this service.
    pub fn open(
        db_path: &Path,
        embedding_model: &str,
        embedder: Option<QueryEmbedder>,
    ) -> anyhow::Result<Self> {
        if !db_path.exists() {
            return Err(anyhow::anyhow!(
                "Document store not found at {}",
                db_path.display()
            ));
        }
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
        Self::connect(db_path, flags, false, embedding_model, embedder)
    }

    /// Create (or open) a store, creating parent directories as needed
    pub fn create(
        db_path: &Path,
        embedding_model: &str,
        embedder: Option<QueryEmbedder>,
    ) -> anyhow::Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
        Self::connect(db_path, flags, true, embedding_model, embedder)
    }

    fn connect(
        db_path: &Path,
        flags: OpenFlags,
        create_schema: bool,
        embedding_model: &str,
        embedder: Option<QueryEmbedder>,
    ) -> anyhow::Result<Self> {
        info!("Opening document store at: {}", db_path.display());
        let manager = SqliteConnectionManager::file(db_path).with_flags(flags);
        let pool = Pool::builder()
            .max_size(8)
            .build(manager)
            .map_err(|e| anyhow::anyhow!("Failed to create connection pool: {}", e))?;

        {
            let conn = pool.get()?;
            conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
            if create_schema {
                conn.execute_batch(SCHEMA_SQL)?;
            } else {
                let tables: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'fragments'",
                    [],
                    |row| row.get(0),
                )?;
                if tables == 0 {
                    return Err(anyhow::anyhow!(
                        "Document store at {} has no fragments table",
                        db_path.display()
                    ));
                }
            }
        }

        let store = Self {
            inner: Arc::new(StoreInner {
                pool,
                embedding_model: embedding_model.to_string(),
                index: RwLock::new(None),
            }),
            embedder,
        };
        store.rebuild_index()?;
        Ok(store)
    }

    /// Add a fragment. Used by ingestion tooling; the serving path never writes.
    pub fn insert_fragment(
        &self,
        filename: &str,
        source: &str,
        content: &str,
        embedding: Option<&[f32]>,
    ) -> anyhow::Result<i64> {
        let conn = self.inner.get_conn()?;
        let (bytes, model) = match embedding {
            Some(vector) => (
                Some(bincode::serialize(vector)?),
                Some(self.inner.embedding_model.as_str()),
            ),
            None => (None, None),
        };
        conn.execute(
            "INSERT INTO fragments (filename, source, content, embedding, embedding_model) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![filename, source, content, bytes, model],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Reload stored embeddings for the configured model into memory and
    /// rebuild the ANN index.
    pub fn rebuild_index(&self) -> anyhow::Result<()> {
        let conn = self.inner.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, embedding FROM fragments WHERE embedding IS NOT NULL AND embedding_model = ?1",
        )?;
        let mut rows = stmt.query([&self.inner.embedding_model])?;

        let mut vectors = HashMap::new();
        let mut dimension = 0;
        while let Some(row) = rows.next()? {
            let id: i64 = row.get(0)?;
            let bytes: Vec<u8> = row.get(1)?;
            let vector: Vec<f32> = bincode::deserialize(&bytes)
                .map_err(|e| anyhow::anyhow!("Deserialization error for fragment {}: {}", id, e))?;
            if dimension == 0 {
                dimension = vector.len();
            }
            if vector.len() != dimension || dimension == 0 {
                warn!("Skipping fragment {} with embedding dim {} (expected {})", id, vector.len(), dimension);
                continue;
            }
            vectors.insert(id, vector);
        }

        if vectors.is_empty() {
            debug!("No stored embeddings for model {}, vector search disabled", self.inner.embedding_model);
            *self.inner.write_index() = None;
            return Ok(());
        }

        let params = HNSWParams {
            n_neighbor: 16,
            ef_build: 100,
            ef_search: 50,
            ..Default::default()
        };
        let mut hnsw = HNSWIndex::<f32, i64>::new(dimension, &params);
        for (id, vector) in &vectors {
            let _ = hnsw.add(vector, *id);
        }
        let hnsw = match hnsw.build(Metric::CosineSimilarity) {
            Ok(()) => Some(hnsw),
            Err(e) => {
                warn!("Failed to build ANN index ({}), using linear search", e);
                None
            }
        };

        info!("Vector index ready with {} embeddings (dim={})", vectors.len(), dimension);
        *self.inner.write_index() = Some(VectorIndex {
            hnsw,
            vectors,
            dimension,
        });
        Ok(())
    }

    pub fn has_vector_index(&self) -> bool {
        self.inner.read_index().is_some()
    }
}

impl StoreInner {
    fn get_conn(&self) -> anyhow::Result<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(|e| anyhow::anyhow!("Failed to get connection from pool: {}", e))
    }

    fn read_index(&self) -> std::sync::RwLockReadGuard<'_, Option<VectorIndex>> {
        self.index.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_index(&self) -> std::sync::RwLockWriteGuard<'_, Option<VectorIndex>> {
        self.index.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Fragment ids ranked by cosine similarity to `query`
    fn vector_search(&self, query: &[f32], k: usize) -> Vec<i64> {
        let guard = self.read_index();
        let index = match guard.as_ref() {
            Some(index) if index.dimension == query.len() => index,
            Some(index) => {
                warn!("Query embedding dim {} does not match index dim {}", query.len(), index.dimension);
                return Vec::new();
            }
            None => return Vec::new(),
        };

        let candidates: Vec<i64> = match &index.hnsw {
            Some(hnsw) if index.vectors.len() > LINEAR_SCAN_LIMIT => hnsw.search(query, k),
            _ => index.vectors.keys().copied().collect(),
        };

        let mut scored: Vec<(i64, f32)> = candidates
            .into_iter()
            .filter_map(|id| index.vectors.get(&id).map(|v| (id, cosine_similarity(query, v))))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored.into_iter().map(|(id, _)| id).collect()
    }

    fn fragments_by_ids(&self, ids: &[i64]) -> anyhow::Result<Vec<Fragment>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT id, filename, source, content FROM fragments WHERE id = ?1")?;
        let mut fragments = Vec::with_capacity(ids.len());
        for id in ids {
            let mut rows = stmt.query([id])?;
            if let Some(row) = rows.next()? {
                fragments.push(row_to_fragment(row)?);
            }
        }
        Ok(fragments)
    }

    /// Rank fragments by how many significant query words they contain
    fn lexical_search(&self, query: &str, k: usize) -> anyhow::Result<Vec<Fragment>> {
        let words = TextUtils::significant_words(query, MIN_LEXICAL_WORD_LEN);
        if words.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT id, filename, source, content FROM fragments ORDER BY id")?;
        let mut rows = stmt.query([])?;

        let mut scored: Vec<(usize, Fragment)> = Vec::new();
        while let Some(row) = rows.next()? {
            let fragment = row_to_fragment(row)?;
            let haystack = format!("{} {}", fragment.filename, fragment.content).to_lowercase();
            let score = words.iter().filter(|w| haystack.contains(w.as_str())).count();
            if score > 0 {
                scored.push((score, fragment));
            }
        }

        // Stable sort keeps storage order among equal scores
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(scored.into_iter().take(k).map(|(_, f)| f).collect())
    }

    fn count(&self) -> anyhow::Result<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM fragments", [], |row| row.get(0))?;
        Ok(count.max(0) as usize)
    }

    fn sample(&self, limit: usize) -> anyhow::Result<Vec<Fragment>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT id, filename, source, content FROM fragments ORDER BY id LIMIT ?1")?;
        let mut rows = stmt.query([limit as i64])?;
        let mut fragments = Vec::new();
        while let Some(row) = rows.next()? {
            fragments.push(row_to_fragment(row)?);
        }
        Ok(fragments)
    }
}

fn row_to_fragment(row: &Row) -> rusqlite::Result<Fragment> {
    Ok(Fragment {
        id: row.get(0)?,
        filename: row.get(1)?,
        source: row.get(2)?,
        content: row.get(3)?,
    })
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() { return 0.0; }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 { 0.0 } else { dot / (norm_a * norm_b) }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn similarity_search(&self, query: &str, k: usize) -> anyhow::Result<Vec<Fragment>> {
        if let (Some(embedder), true) = (&self.embedder, self.has_vector_index()) {
            match embedder.embed(query).await {
                Ok(vector) => {
                    let inner = self.inner.clone();
                    let fragments = tokio::task::spawn_blocking(move || {
                        let ids = inner.vector_search(&vector, k);
                        inner.fragments_by_ids(&ids)
                    })
                    .await??;
                    if !fragments.is_empty() {
                        return Ok(fragments);
                    }
                    debug!("Vector search returned nothing, trying lexical retrieval");
                }
                Err(e) => warn!("Query embedding failed, using lexical retrieval: {}", e),
            }
        }

        let inner = self.inner.clone();
        let query = query.to_string();
        tokio::task::spawn_blocking(move || inner.lexical_search(&query, k)).await?
    }

    async fn count(&self) -> anyhow::Result<usize> {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || inner.count()).await?
    }

    async fn sample(&self, limit: usize) -> anyhow::Result<Vec<Fragment>> {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || inner.sample(limit)).await?
    }
}
