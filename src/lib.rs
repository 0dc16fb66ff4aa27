//! Retrieval-augmented question answering over the Agile Practice Map.
//!
//! ```text
//! .txt files ──┬─► ingestion::loaders ──► normalize ──► chunk ──► identity
//! URL list ────┘                                                    │
//!                                                                   ▼
//!                    providers::EmbeddingProvider ──► stores::SqliteVectorStore
//!
//! Question ──► query::RagSession ──► retrieve ──► format ──► generate
//!                                                               │
//!                                                               ▼
//!                                                        grounded answer
//! ```
//!
//! Ingestion is an offline batch job with exclusive write access to the
//! store; the query path opens the same store read-only. Both sides must
//! use the same embedding model so the vector spaces stay comparable.

pub mod config;
pub mod ingestion;
pub mod providers;
pub mod query;
pub mod stores;
pub mod types;

pub use config::RagConfig;
pub use ingestion::{IngestOptions, IngestOutcome, IngestReport, SplitMethod, ingest};
pub use providers::{CompletionProvider, EmbeddingProvider};
pub use query::{FALLBACK_ANSWER, QueryResponse, RagSession, UNAVAILABLE_ANSWER};
pub use stores::{SqliteVectorStore, StoredChunk};
pub use types::RagError;
