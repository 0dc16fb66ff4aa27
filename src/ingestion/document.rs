//! Raw and derived document values flowing through the ingestion pipeline.

use serde::{Deserialize, Serialize};

/// Metadata carried by every document and copied onto every derived chunk.
///
/// `source` is a file path or URL; `practice_name` is the domain category
/// label the topic lister scans for.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocMetadata {
    pub source: Option<String>,
    pub title: Option<String>,
    pub practice_name: Option<String>,
}

/// A unit of source content.
///
/// Documents are immutable once created: cleaning and splitting produce new
/// `Document` values with cloned metadata rather than mutating in place.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    pub metadata: DocMetadata,
}

impl Document {
    pub fn new(content: impl Into<String>, metadata: DocMetadata) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }

    /// Produces a new document with the same metadata and different content.
    #[must_use]
    pub fn derive(&self, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: self.metadata.clone(),
        }
    }
}
