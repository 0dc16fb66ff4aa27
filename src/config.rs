//! Environment-backed configuration with compiled-in defaults.

use std::env;
use std::path::PathBuf;

/// Default location of the persistent vector store.
pub const DEFAULT_DB_PATH: &str = "./data/apm_chunks.sqlite3";
/// Embedding model used at both ingestion and query time.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
/// Chat model used for answer generation.
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o";
/// Number of chunks retrieved per question.
pub const DEFAULT_RETRIEVER_K: usize = 3;
/// Recursive splitter chunk size, in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 500;
/// Recursive splitter overlap between consecutive chunks, in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

/// Runtime configuration for the query path and provider construction.
///
/// Values come from the environment (`APM_DB_PATH`, `APM_EMBEDDING_MODEL`,
/// `APM_LLM_MODEL`, `APM_RETRIEVER_K`), falling back to the defaults above.
/// The embedding model must match the one used at ingestion time so the
/// vector spaces stay comparable.
#[derive(Clone, Debug)]
pub struct RagConfig {
    pub db_path: PathBuf,
    pub embedding_model: String,
    pub llm_model: String,
    pub retriever_k: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            retriever_k: DEFAULT_RETRIEVER_K,
        }
    }
}

impl RagConfig {
    /// Builds a configuration from the environment, loading `.env` first.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = Self::default();
        Self {
            db_path: env::var("APM_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            embedding_model: env::var("APM_EMBEDDING_MODEL")
                .unwrap_or(defaults.embedding_model),
            llm_model: env::var("APM_LLM_MODEL").unwrap_or(defaults.llm_model),
            retriever_k: env::var("APM_RETRIEVER_K")
                .ok()
                .and_then(|value| value.parse::<usize>().ok())
                .unwrap_or(defaults.retriever_k),
        }
    }

    /// Overrides the store path, keeping everything else.
    #[must_use]
    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = path.into();
        self
    }

    /// Overrides the retrieval depth, keeping everything else.
    #[must_use]
    pub fn with_retriever_k(mut self, k: usize) -> Self {
        self.retriever_k = k;
        self
    }
}
