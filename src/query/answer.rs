//! Context formatting and grounded answer generation.
//!
//! The prompt contract is fixed: the model may use only the supplied
//! context, may reinterpret the question's intent, and must emit
//! [`FALLBACK_ANSWER`] verbatim when the context does not contain the
//! answer. The fallback is an instruction the model is asked to honor, not
//! something this component can enforce.

use tracing::debug;

use crate::providers::CompletionProvider;
use crate::stores::StoredChunk;
use crate::types::RagError;

/// Canonical reference for questions the corpus cannot answer.
pub const APM_URL: &str = "https://www.agile-studio.jp/agile-practice-map";

/// Exact sentence the model is instructed to return when the answer is not
/// derivable from the supplied context.
pub const FALLBACK_ANSWER: &str = "I cannot answer that from the Agile Practice Map content \
I have. Please see https://www.agile-studio.jp/agile-practice-map for more information.";

/// Joins retrieved chunk contents in retrieval-rank order, separated by a
/// blank line. Pure; never reorders.
pub fn format_context(chunks: &[StoredChunk]) -> String {
    chunks
        .iter()
        .map(|chunk| chunk.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Renders the fixed prompt template over a formatted context block and the
/// user's question.
pub fn render_prompt(context: &str, question: &str) -> String {
    format!(
        "You are an assistant answering questions about the Agile Practice Map, \
a catalog of agile development practices.\n\
Answer using ONLY the context below. You may reinterpret the question's intent \
to match what the context covers.\n\
If the answer cannot be derived from the context, reply with exactly this \
sentence and nothing else:\n\
{FALLBACK_ANSWER}\n\
\n\
Context:\n\
{context}\n\
\n\
Question: {question}\n\
Answer:"
    )
}

/// Generates an answer for `question` grounded in `context`.
///
/// Returns the model's raw text output unmodified.
pub async fn generate(
    provider: &dyn CompletionProvider,
    context: &str,
    question: &str,
) -> Result<String, RagError> {
    let prompt = render_prompt(context, question);
    debug!(prompt_chars = prompt.chars().count(), "invoking language model");
    provider.complete(&prompt).await
}
