//! Ingestion pipeline: load, clean, chunk, embed, persist.
//!
//! The pipeline is idempotent with respect to unchanged sources: chunk ids
//! are deterministic, and the store upserts by id, so re-running ingestion
//! over the same corpus leaves the store unchanged.

pub mod chunk;
pub mod document;
pub mod identity;
pub mod loaders;
pub mod normalize;

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub use chunk::{SplitMethod, split_documents};
pub use document::{DocMetadata, Document};
pub use identity::assign_chunk_id;
pub use loaders::{WebPageLoader, load_text_documents, load_url_list};
pub use normalize::{normalize, normalize_document};

use crate::config::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, DEFAULT_DB_PATH};
use crate::providers::EmbeddingProvider;
use crate::stores::{SqliteVectorStore, StoredChunk};
use crate::types::RagError;

/// Parameters for one ingestion run.
#[derive(Clone, Debug)]
pub struct IngestOptions {
    /// Directory of `.txt` source files; skipped when `None`.
    pub input_dir: Option<PathBuf>,
    /// File listing web page URLs, one per line; skipped when `None`.
    pub url_file: Option<PathBuf>,
    /// Store file to create or update.
    pub db_path: PathBuf,
    pub split_method: SplitMethod,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            input_dir: None,
            url_file: None,
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            split_method: SplitMethod::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// How an ingestion run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IngestOutcome {
    /// Chunks were embedded and written to the store.
    Completed,
    /// No sources produced any raw documents.
    NoDocuments,
    /// Every loaded document was rejected during cleaning.
    NoCleanDocuments,
    /// Cleaning succeeded but splitting produced no chunks.
    NoChunks,
}

/// Stage counts for one ingestion run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IngestReport {
    pub raw_documents: usize,
    pub cleaned_documents: usize,
    pub chunks: usize,
    /// Total chunks in the store after the run; `None` when nothing was
    /// written.
    pub store_size: Option<usize>,
    pub outcome: IngestOutcome,
}

impl IngestReport {
    fn empty(outcome: IngestOutcome) -> Self {
        Self {
            raw_documents: 0,
            cleaned_documents: 0,
            chunks: 0,
            store_size: None,
            outcome,
        }
    }
}

/// Runs the full pipeline: load every configured source, normalize, chunk,
/// embed, and upsert into the store at `options.db_path`.
///
/// Individual source failures (an unreadable file, an unreachable URL) are
/// logged and skipped; only stage-level failures (chunking parameters,
/// embedding, storage) abort the run.
pub async fn ingest(
    embedder: &dyn EmbeddingProvider,
    options: &IngestOptions,
) -> Result<IngestReport, RagError> {
    if options.input_dir.is_none() && options.url_file.is_none() {
        return Err(RagError::Config(
            "at least one of input_dir / url_file must be given".into(),
        ));
    }

    let mut documents = Vec::new();

    if let Some(dir) = &options.input_dir {
        let mut loaded = load_text_documents(dir).await?;
        info!(count = loaded.len(), dir = %dir.display(), "loaded text documents");
        documents.append(&mut loaded);
    }

    if let Some(url_file) = &options.url_file {
        let urls = load_url_list(url_file).await?;
        let loader = WebPageLoader::with_defaults()?;
        for url in urls {
            match loader.load(&url).await {
                Ok(document) => {
                    info!(%url, "loaded web page");
                    documents.push(document);
                }
                Err(err) => {
                    warn!(%url, error = %err, "failed to load web page, skipping");
                }
            }
        }
    }

    let raw_documents = documents.len();
    if raw_documents == 0 {
        warn!("no documents loaded from any source");
        return Ok(IngestReport::empty(IngestOutcome::NoDocuments));
    }

    let cleaned: Vec<Document> = documents
        .iter()
        .filter_map(normalize_document)
        .collect();
    let cleaned_documents = cleaned.len();
    if cleaned_documents == 0 {
        warn!(raw_documents, "all documents rejected during cleaning");
        return Ok(IngestReport {
            raw_documents,
            ..IngestReport::empty(IngestOutcome::NoCleanDocuments)
        });
    }

    let chunks = split_documents(
        &cleaned,
        options.split_method,
        options.chunk_size,
        options.chunk_overlap,
    )?;
    if chunks.is_empty() {
        warn!(cleaned_documents, "splitting produced no chunks");
        return Ok(IngestReport {
            raw_documents,
            cleaned_documents,
            ..IngestReport::empty(IngestOutcome::NoChunks)
        });
    }
    info!(
        chunks = chunks.len(),
        method = %options.split_method,
        "documents chunked"
    );

    // Ordinals count within each source document so edits to one source
    // never shift another source's ids.
    let mut ordinals: HashMap<String, usize> = HashMap::new();
    let stored: Vec<StoredChunk> = chunks
        .into_iter()
        .map(|chunk| {
            let source = chunk.metadata.source.clone();
            let key = source.clone().unwrap_or_default();
            let ordinal = ordinals.entry(key).or_insert(0);
            let id = assign_chunk_id(source.as_deref(), *ordinal, &chunk.content);
            let record = StoredChunk {
                id,
                source,
                title: chunk.metadata.title.clone(),
                practice_name: chunk.metadata.practice_name.clone(),
                chunk_index: *ordinal,
                content: chunk.content,
            };
            *ordinal += 1;
            record
        })
        .collect();

    let texts: Vec<String> = stored.iter().map(|chunk| chunk.content.clone()).collect();
    let vectors = embedder.embed(texts).await?;

    let store = SqliteVectorStore::open_or_create(&options.db_path, embedder.dims()).await?;
    let chunk_count = stored.len();
    store
        .upsert_chunks(stored.into_iter().zip(vectors).collect())
        .await?;
    let store_size = store.count().await?;
    info!(
        chunks = chunk_count,
        store_size,
        db = %options.db_path.display(),
        "ingestion complete"
    );

    Ok(IngestReport {
        raw_documents,
        cleaned_documents,
        chunks: chunk_count,
        store_size: Some(store_size),
        outcome: IngestOutcome::Completed,
    })
}
