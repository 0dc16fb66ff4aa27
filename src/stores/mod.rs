//! Persistent vector storage for embedded chunks.
//!
//! The query path treats the store as read-only; ingestion is the single
//! writer. Concurrent ingestion and querying against the same store file is
//! unsupported (no locking is layered on top of SQLite's own).

pub mod sqlite;

use serde::{Deserialize, Serialize};

pub use sqlite::SqliteVectorStore;

use crate::ingestion::document::DocMetadata;

/// A persisted chunk row, keyed by its deterministic id.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredChunk {
    pub id: String,
    pub source: Option<String>,
    pub title: Option<String>,
    pub practice_name: Option<String>,
    /// Zero-based index of this chunk within its source document.
    pub chunk_index: usize,
    pub content: String,
}

impl StoredChunk {
    pub fn metadata(&self) -> DocMetadata {
        DocMetadata {
            source: self.source.clone(),
            title: self.title.clone(),
            practice_name: self.practice_name.clone(),
        }
    }
}

/// Metadata-only projection of a stored chunk, used by topic scans.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub id: String,
    pub source: Option<String>,
    pub practice_name: Option<String>,
}
