//! Crate-wide error taxonomy.

use thiserror::Error;

/// Errors surfaced by the ingestion and query pipelines.
///
/// Components return tagged results; the caller-facing string-answer policy
/// (deterministic error strings instead of raised failures) lives solely in
/// [`RagSession::answer_question`](crate::query::RagSession::answer_question).
#[derive(Debug, Error)]
pub enum RagError {
    /// Missing credential, missing store path, or no input source given.
    #[error("configuration error: {0}")]
    Config(String),

    /// Embedding or language-model provider failure (construction or call).
    #[error("provider error: {0}")]
    Provider(String),

    /// Vector store connect, read, or write failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Chunking failed for the selected strategy; fatal to an ingestion run.
    #[error("chunking error: {0}")]
    Chunking(String),

    /// A source document could not be loaded or parsed.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// The language model call failed while generating an answer.
    #[error("generation error: {0}")]
    Generation(String),

    /// The query orchestrator is not in the `Ready` state.
    #[error("session not initialized: {0}")]
    NotInitialized(String),

    #[error("i/o error: {0}")]
    Io(String),

    #[error("http error: {0}")]
    Http(String),
}

impl From<std::io::Error> for RagError {
    fn from(err: std::io::Error) -> Self {
        RagError::Io(err.to_string())
    }
}

impl From<reqwest::Error> for RagError {
    fn from(err: reqwest::Error) -> Self {
        RagError::Http(err.to_string())
    }
}
