//! Embedding and completion provider seams.
//!
//! The pipeline and query session talk to [`EmbeddingProvider`] and
//! [`CompletionProvider`] rather than to a concrete vendor, so tests and
//! offline runs can substitute deterministic implementations. The `Rig*`
//! adapters bridge to any `rig` model; [`openai_embedding`] and
//! [`openai_completion`] wire up the default OpenAI-backed stack.

use std::sync::Arc;

use async_trait::async_trait;
use rig::client::{CompletionClient, EmbeddingsClient, ProviderClient};
use rig::completion::{CompletionModel, Message};
use rig::embeddings::embedding::EmbeddingModel;
use rig::message::AssistantContent;
use rig::providers::openai;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::RagConfig;
use crate::types::RagError;

/// Produces one embedding vector per input text.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Dimensionality of every vector this provider returns.
    fn dims(&self) -> usize;

    /// Embeds `texts`, preserving order. The result has exactly one vector
    /// of [`dims`](Self::dims) entries per input.
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, RagError>;
}

/// Generates a completion for a fully rendered prompt.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, RagError>;
}

/// [`EmbeddingProvider`] backed by any rig embedding model.
///
/// Batches requests at the model's `MAX_DOCUMENTS` limit and converts the
/// provider's `f64` vectors to the `f32` the vector store expects.
#[derive(Clone)]
pub struct RigEmbedding<E> {
    model: E,
}

impl<E: EmbeddingModel> RigEmbedding<E> {
    pub fn new(model: E) -> Self {
        Self { model }
    }
}

#[async_trait]
impl<E: EmbeddingModel + Sync> EmbeddingProvider for RigEmbedding<E> {
    fn dims(&self) -> usize {
        self.model.ndims()
    }

    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, RagError> {
        let batch_size = E::MAX_DOCUMENTS.max(1);
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(batch_size) {
            debug!(batch = batch.len(), "embedding batch");
            let embeddings = self
                .model
                .embed_texts(batch.to_vec())
                .await
                .map_err(|err| RagError::Provider(err.to_string()))?;
            for embedding in embeddings {
                vectors.push(embedding.vec.iter().map(|v| *v as f32).collect());
            }
        }
        if vectors.len() != texts.len() {
            return Err(RagError::Provider(format!(
                "embedding provider returned {} vectors for {} texts",
                vectors.len(),
                texts.len()
            )));
        }
        Ok(vectors)
    }
}

/// [`CompletionProvider`] backed by any rig completion model.
///
/// Requests run at temperature 0 so answers are as reproducible as the
/// provider allows.
#[derive(Clone)]
pub struct RigCompletion<M> {
    model: M,
}

impl<M: CompletionModel> RigCompletion<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }
}

#[async_trait]
impl<M: CompletionModel + Sync> CompletionProvider for RigCompletion<M> {
    async fn complete(&self, prompt: &str) -> Result<String, RagError> {
        let request = self
            .model
            .completion_request(Message::user(prompt.to_string()))
            .temperature(0.0)
            .build();
        let response = self
            .model
            .completion(request)
            .await
            .map_err(|err| RagError::Generation(err.to_string()))?;

        let text = response
            .choice
            .into_iter()
            .filter_map(|content| match content {
                AssistantContent::Text(text) => Some(text.text),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("");
        if text.is_empty() {
            return Err(RagError::Generation(
                "completion response contained no text".into(),
            ));
        }
        Ok(text)
    }
}

/// Checks that the OpenAI credentials are present before rig reads them.
fn require_openai_key() -> Result<(), RagError> {
    std::env::var("OPENAI_API_KEY")
        .map(|_| ())
        .map_err(|_| RagError::Config("OPENAI_API_KEY is not set".into()))
}

/// Builds the default OpenAI embedding provider from the environment.
pub fn openai_embedding(config: &RagConfig) -> Result<Arc<dyn EmbeddingProvider>, RagError> {
    require_openai_key()?;
    let client = openai::Client::from_env();
    Ok(Arc::new(RigEmbedding::new(
        client.embedding_model(&config.embedding_model),
    )))
}

/// Builds the default OpenAI completion provider from the environment.
pub fn openai_completion(config: &RagConfig) -> Result<Arc<dyn CompletionProvider>, RagError> {
    require_openai_key()?;
    let client = openai::Client::from_env();
    Ok(Arc::new(RigCompletion::new(
        client.completion_model(&config.llm_model),
    )))
}

/// Deterministic offline embedding provider.
///
/// Vectors are derived from a digest of the text, so equal texts always
/// embed identically and distinct texts almost always differ. Useful for
/// tests and for exercising the pipeline without credentials.
#[derive(Clone, Debug)]
pub struct MockEmbeddingProvider {
    dims: usize,
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEmbeddingProvider {
    pub fn new() -> Self {
        Self { dims: 8 }
    }

    pub fn with_dims(dims: usize) -> Self {
        Self { dims }
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, RagError> {
        Ok(texts
            .iter()
            .map(|text| {
                let digest = Sha256::digest(text.as_bytes());
                (0..self.dims)
                    .map(|i| {
                        let byte = digest[i % digest.len()];
                        f32::from(byte) / 255.0
                    })
                    .collect()
            })
            .collect())
    }
}

/// Completion provider that always returns a fixed reply. Test double for
/// the generation stage.
#[derive(Clone, Debug)]
pub struct StaticCompletion {
    reply: String,
}

impl StaticCompletion {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
        }
    }
}

#[async_trait]
impl CompletionProvider for StaticCompletion {
    async fn complete(&self, _prompt: &str) -> Result<String, RagError> {
        Ok(self.reply.clone())
    }
}
