//! Query orchestration: retrieve, format, generate.
//!
//! [`RagSession`] owns the lazy, once-per-process initialization of the
//! store connection and wires the retrieval and generation stages into one
//! callable. Initialization follows a small state machine:
//!
//! ```text
//! Uninitialized ── first use ──> Initializing ──> Ready
//!                                     │
//!                                     └──> Failed (retried on next attempt)
//! ```
//!
//! Concurrent first callers serialize on the state lock, so initialization
//! runs at most once per transition to `Ready`.

pub mod answer;
pub mod topics;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

pub use answer::{APM_URL, FALLBACK_ANSWER, format_context, render_prompt};
pub use topics::TopicSource;

use crate::config::RagConfig;
use crate::providers::{CompletionProvider, EmbeddingProvider};
use crate::stores::{SqliteVectorStore, StoredChunk};
use crate::types::RagError;

/// Fixed answer returned by [`RagSession::answer_question`] when the
/// session cannot reach the `Ready` state.
pub const UNAVAILABLE_ANSWER: &str =
    "The Agile Practice Map assistant is not available right now. Please try again later.";

/// One retrieval hit: the stored chunk plus its similarity to the query.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub chunk: StoredChunk,
    pub similarity: f32,
}

/// Intermediate stages captured when a query runs with `debug = true`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DebugTrace {
    pub retrieved: Vec<RetrievedChunk>,
    pub context: String,
    pub prompt: String,
}

/// Result of one query.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    pub debug: Option<DebugTrace>,
}

enum SessionState {
    Uninitialized,
    Initializing,
    Ready(Arc<SessionInner>),
    Failed(String),
}

struct SessionInner {
    store: SqliteVectorStore,
    retriever_k: usize,
}

/// Long-lived query session over one vector store.
///
/// Providers are supplied by the caller so the same session type serves
/// production (OpenAI-backed) and tests (deterministic doubles). The store
/// connection is established lazily on first use and reused afterwards; the
/// query path never writes to the store.
pub struct RagSession {
    config: RagConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    completer: Arc<dyn CompletionProvider>,
    state: Mutex<SessionState>,
}

impl RagSession {
    pub fn new(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        completer: Arc<dyn CompletionProvider>,
    ) -> Self {
        Self {
            config,
            embedder,
            completer,
            state: Mutex::new(SessionState::Uninitialized),
        }
    }

    /// Builds a session over the default OpenAI providers, reading
    /// credentials from the environment.
    pub fn from_env(config: RagConfig) -> Result<Self, RagError> {
        let embedder = crate::providers::openai_embedding(&config)?;
        let completer = crate::providers::openai_completion(&config)?;
        Ok(Self::new(config, embedder, completer))
    }

    /// Explicitly drives the session to `Ready`, connecting to the store.
    ///
    /// Idempotent once `Ready`; after a failure, the next call retries.
    pub async fn initialize(&self) -> Result<(), RagError> {
        self.ensure_ready().await.map(|_| ())
    }

    pub async fn is_ready(&self) -> bool {
        matches!(&*self.state.lock().await, SessionState::Ready(_))
    }

    async fn ensure_ready(&self) -> Result<Arc<SessionInner>, RagError> {
        let mut state = self.state.lock().await;
        if let SessionState::Ready(inner) = &*state {
            return Ok(inner.clone());
        }
        if let SessionState::Failed(reason) = &*state {
            info!(reason, "retrying session initialization after failure");
        }
        *state = SessionState::Initializing;
        match SqliteVectorStore::connect(&self.config.db_path, self.embedder.dims()).await {
            Ok(store) => {
                let inner = Arc::new(SessionInner {
                    store,
                    retriever_k: self.config.retriever_k,
                });
                info!(db = %self.config.db_path.display(), "query session ready");
                *state = SessionState::Ready(inner.clone());
                Ok(inner)
            }
            Err(err) => {
                let reason = err.to_string();
                warn!(error = %reason, "session initialization failed");
                *state = SessionState::Failed(reason.clone());
                Err(RagError::NotInitialized(reason))
            }
        }
    }

    /// Embeds `question` and returns the `top_k` most similar chunks,
    /// descending by similarity.
    pub async fn retrieve(
        &self,
        question: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>, RagError> {
        let inner = self.ensure_ready().await?;
        self.retrieve_with(&inner, question, top_k).await
    }

    async fn retrieve_with(
        &self,
        inner: &SessionInner,
        question: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>, RagError> {
        let mut vectors = self.embedder.embed(vec![question.to_string()]).await?;
        let query_vector = vectors
            .pop()
            .ok_or_else(|| RagError::Provider("no embedding returned for question".into()))?;
        let hits = inner.store.search_similar(&query_vector, top_k).await?;
        Ok(hits
            .into_iter()
            .map(|(chunk, similarity)| RetrievedChunk { chunk, similarity })
            .collect())
    }

    /// Runs retrieve → format → generate for one question.
    ///
    /// With `debug = true` the response also carries the retrieved chunks,
    /// the formatted context, and the rendered prompt; capturing the trace
    /// does not change how the answer is produced.
    pub async fn query(&self, question: &str, debug: bool) -> Result<QueryResponse, RagError> {
        let inner = self.ensure_ready().await?;
        let retrieved = self
            .retrieve_with(&inner, question, inner.retriever_k)
            .await?;
        let chunks: Vec<StoredChunk> = retrieved.iter().map(|hit| hit.chunk.clone()).collect();
        let context = format_context(&chunks);
        let answer = answer::generate(self.completer.as_ref(), &context, question).await?;

        let debug_trace = debug.then(|| DebugTrace {
            prompt: render_prompt(&context, question),
            retrieved,
            context,
        });
        Ok(QueryResponse {
            answer,
            debug: debug_trace,
        })
    }

    /// String-only query surface: every failure resolves to a diagnostic
    /// answer string, never a raised error.
    pub async fn answer_question(&self, question: &str) -> String {
        match self.query(question, false).await {
            Ok(response) => response.answer,
            Err(RagError::NotInitialized(_)) => UNAVAILABLE_ANSWER.to_string(),
            Err(RagError::Generation(err)) => {
                format!("Error generating answer: {err}")
            }
            Err(err) => format!("Error answering question: {err}"),
        }
    }

    /// Distinct topic names in the store, sorted. Initialization or store
    /// failures yield an empty list.
    pub async fn list_topics(&self) -> Vec<String> {
        match self.ensure_ready().await {
            Ok(inner) => topics::list_topics(&inner.store).await,
            Err(err) => {
                warn!(error = %err, "cannot list topics");
                Vec::new()
            }
        }
    }

    /// Source lookup for one topic name; failures yield `url: None`.
    pub async fn lookup_topic_source(&self, name: &str) -> TopicSource {
        match self.ensure_ready().await {
            Ok(inner) => topics::lookup_topic_source(&inner.store, name).await,
            Err(err) => {
                warn!(error = %err, name, "cannot look up topic source");
                TopicSource {
                    name: name.to_string(),
                    url: None,
                }
            }
        }
    }
}
