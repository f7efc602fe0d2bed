//! Fragment table layout

use serde::{Deserialize, Serialize};

pub const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS fragments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    filename TEXT NOT NULL,
    source TEXT NOT NULL,
    content TEXT NOT NULL,
    embedding BLOB,
    embedding_model TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);
CREATE INDEX IF NOT EXISTS idx_fragments_model ON fragments(embedding_model);
";

/// One chunk of an ingested document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub id: i64,
    pub filename: String,
    pub source: String,
    pub content: String,
}
