//! Topic discovery over stored chunk metadata.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::stores::SqliteVectorStore;

/// A topic and the source it was ingested from, if any.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicSource {
    pub name: String,
    pub url: Option<String>,
}

/// Distinct `practice_name` values across the store, sorted ascending.
///
/// Store-read failures degrade to an empty list rather than propagating.
pub async fn list_topics(store: &SqliteVectorStore) -> Vec<String> {
    let entries = match store.metadata_entries().await {
        Ok(entries) => entries,
        Err(err) => {
            warn!(error = %err, "topic scan failed, returning no topics");
            return Vec::new();
        }
    };
    let names: BTreeSet<String> = entries
        .into_iter()
        .filter_map(|entry| entry.practice_name)
        .collect();
    names.into_iter().collect()
}

/// Finds the source of the first stored entry whose `practice_name` equals
/// `name`. Entries are scanned in id order, so the result is stable.
///
/// Unknown names and store-read failures both yield `url: None`.
pub async fn lookup_topic_source(store: &SqliteVectorStore, name: &str) -> TopicSource {
    let url = match store.metadata_entries().await {
        Ok(entries) => entries
            .into_iter()
            .find(|entry| entry.practice_name.as_deref() == Some(name))
            .and_then(|entry| entry.source),
        Err(err) => {
            warn!(error = %err, name, "topic source lookup failed");
            None
        }
    };
    TopicSource {
        name: name.to_string(),
        url,
    }
}
