//! Query session tests: state machine, retrieval ordering, prompt contract,
//! topic listing. All providers are deterministic doubles.

use std::path::Path;
use std::sync::Arc;

use apm_rag::config::RagConfig;
use apm_rag::providers::{EmbeddingProvider, MockEmbeddingProvider, StaticCompletion};
use apm_rag::query::{FALLBACK_ANSWER, RagSession, UNAVAILABLE_ANSWER};
use apm_rag::stores::{SqliteVectorStore, StoredChunk};
use tempfile::tempdir;

fn chunk(id: &str, source: &str, practice: Option<&str>, content: &str) -> StoredChunk {
    StoredChunk {
        id: id.to_string(),
        source: Some(source.to_string()),
        title: None,
        practice_name: practice.map(str::to_string),
        chunk_index: 0,
        content: content.to_string(),
    }
}

/// Writes `chunks` into a fresh store at `db_path`, embedded with the same
/// mock provider the sessions use.
async fn populate(db_path: &Path, chunks: Vec<StoredChunk>) {
    let embedder = MockEmbeddingProvider::new();
    let store = SqliteVectorStore::open_or_create(db_path, embedder.dims())
        .await
        .unwrap();
    let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
    let vectors = embedder.embed(texts).await.unwrap();
    store
        .upsert_chunks(chunks.into_iter().zip(vectors).collect())
        .await
        .unwrap();
}

fn session(db_path: &Path, reply: &str) -> RagSession {
    RagSession::new(
        RagConfig::default().with_db_path(db_path),
        Arc::new(MockEmbeddingProvider::new()),
        Arc::new(StaticCompletion::new(reply)),
    )
}

#[tokio::test]
async fn query_before_initialization_returns_fixed_error_string() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("absent.sqlite3");
    let s = session(&missing, "unused");

    let answer = s.answer_question("what is scrum?").await;
    assert_eq!(answer, UNAVAILABLE_ANSWER);
    assert!(!s.is_ready().await);
}

#[tokio::test]
async fn failed_initialization_is_retried_on_next_attempt() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("late.sqlite3");
    let s = session(&db_path, FALLBACK_ANSWER);

    assert!(s.initialize().await.is_err());
    assert!(!s.is_ready().await);

    populate(
        &db_path,
        vec![chunk("c0", "a.txt", None, "some practice content")],
    )
    .await;

    s.initialize().await.unwrap();
    assert!(s.is_ready().await);
}

#[tokio::test]
async fn stubbed_model_honoring_contract_yields_fallback_sentence() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("store.sqlite3");
    populate(
        &db_path,
        vec![chunk("c0", "a.txt", None, "kanban limits work in progress")],
    )
    .await;

    let s = session(&db_path, FALLBACK_ANSWER);
    let answer = s.answer_question("what is the capital of France?").await;
    assert_eq!(answer, FALLBACK_ANSWER);
}

#[tokio::test]
async fn retrieve_caps_results_and_orders_by_similarity() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("store.sqlite3");
    populate(
        &db_path,
        vec![
            chunk("c0", "a.txt", None, "planning poker estimates stories"),
            chunk("c1", "b.txt", None, "daily scrum synchronizes the team"),
            chunk("c2", "c.txt", None, "kanban visualizes flow"),
        ],
    )
    .await;

    let s = session(&db_path, "unused");
    let hits = s.retrieve("how do teams estimate?", 2).await.unwrap();
    assert_eq!(hits.len(), 2);
    for pair in hits.windows(2) {
        assert!(pair[0].similarity >= pair[1].similarity);
    }
}

#[tokio::test]
async fn debug_trace_captures_stages_without_changing_the_answer() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("store.sqlite3");
    populate(
        &db_path,
        vec![
            chunk("c0", "a.txt", None, "pair programming shares knowledge"),
            chunk("c1", "b.txt", None, "mob programming involves the whole team"),
        ],
    )
    .await;

    let s = session(&db_path, "a grounded answer");

    let plain = s.query("what is pair programming?", false).await.unwrap();
    assert!(plain.debug.is_none());

    let debugged = s.query("what is pair programming?", true).await.unwrap();
    assert_eq!(debugged.answer, plain.answer);

    let trace = debugged.debug.unwrap();
    assert!(!trace.retrieved.is_empty());
    assert!(trace.retrieved.len() <= 3);
    for hit in &trace.retrieved {
        assert!(trace.context.contains(&hit.chunk.content));
    }
    assert!(trace.prompt.contains(&trace.context));
    assert!(trace.prompt.contains("what is pair programming?"));
}

#[tokio::test]
async fn topics_are_deduplicated_and_sorted() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("store.sqlite3");
    populate(
        &db_path,
        vec![
            chunk("c0", "https://example.com/foo", Some("foo"), "foo first"),
            chunk("c1", "https://example.com/bar", Some("bar"), "bar text"),
            chunk("c2", "https://example.com/foo2", Some("foo"), "foo second"),
        ],
    )
    .await;

    let s = session(&db_path, "unused");
    assert_eq!(s.list_topics().await, vec!["bar", "foo"]);

    let found = s.lookup_topic_source("foo").await;
    assert_eq!(found.name, "foo");
    assert_eq!(found.url.as_deref(), Some("https://example.com/foo"));

    let absent = s.lookup_topic_source("none").await;
    assert_eq!(absent.name, "none");
    assert_eq!(absent.url, None);
}

#[tokio::test]
async fn topics_on_unreachable_store_degrade_to_empty() {
    let dir = tempdir().unwrap();
    let s = session(&dir.path().join("absent.sqlite3"), "unused");
    assert!(s.list_topics().await.is_empty());
    assert_eq!(s.lookup_topic_source("foo").await.url, None);
}
