//! SQLite-backed vector store using the `sqlite-vec` extension.
//!
//! Layout: a `chunks` table keyed by the deterministic chunk id, plus a
//! `chunk_embeddings` vec0 virtual table joined on rowid. Writes are keyed
//! upserts, so re-ingesting unchanged content leaves the store unchanged.

use std::mem::transmute;
use std::os::raw::c_char;
use std::path::Path;
use std::sync::Once;

use tokio_rusqlite::{Connection, OptionalExtension, ffi};
use tracing::debug;

use super::{MetadataEntry, StoredChunk};
use crate::types::RagError;

/// Persistent vector store over a single SQLite database file.
#[derive(Clone, Debug)]
pub struct SqliteVectorStore {
    conn: Connection,
    dims: usize,
}

impl SqliteVectorStore {
    /// Opens the store for ingestion, creating the file and schema if
    /// needed. Parent directories are created as well.
    pub async fn open_or_create(path: impl AsRef<Path>, dims: usize) -> Result<Self, RagError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let store = Self::open_inner(path, dims).await?;
        store.create_schema().await?;
        Ok(store)
    }

    /// Connects for the query path. The store file must already exist;
    /// querying an unpopulated path is a configuration error, not a reason
    /// to silently create an empty database.
    pub async fn connect(path: impl AsRef<Path>, dims: usize) -> Result<Self, RagError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(RagError::Config(format!(
                "vector store not found at {}",
                path.display()
            )));
        }
        Self::open_inner(path, dims).await
    }

    async fn open_inner(path: &Path, dims: usize) -> Result<Self, RagError> {
        Self::register_sqlite_vec()?;
        let conn = Connection::open(path)
            .await
            .map_err(|err| RagError::Storage(err.to_string()))?;
        // Probe the extension before accepting the connection.
        conn.call(|conn| {
            match conn.query_row("select vec_version()", [], |row| row.get::<_, String>(0)) {
                Ok(version) => {
                    debug!(version, "sqlite-vec ready");
                    Ok(())
                }
                Err(err) => Err(tokio_rusqlite::Error::Rusqlite(err)),
            }
        })
        .await
        .map_err(|err| RagError::Storage(err.to_string()))?;
        Ok(Self { conn, dims })
    }

    async fn create_schema(&self) -> Result<(), RagError> {
        let dims = self.dims;
        self.conn
            .call(move |conn| {
                conn.execute(
                    "CREATE TABLE IF NOT EXISTS chunks (
                        id TEXT PRIMARY KEY,
                        source TEXT,
                        title TEXT,
                        practice_name TEXT,
                        chunk_index TEXT,
                        content TEXT
                    )",
                    [],
                )?;
                conn.execute(
                    "CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source)",
                    [],
                )?;
                conn.execute(
                    &format!(
                        "CREATE VIRTUAL TABLE IF NOT EXISTS chunk_embeddings \
                         USING vec0(embedding float[{dims}])"
                    ),
                    [],
                )?;
                Ok(())
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }

    /// Inserts or overwrites chunks keyed by id, embeddings included.
    pub async fn upsert_chunks(
        &self,
        chunks: Vec<(StoredChunk, Vec<f32>)>,
    ) -> Result<(), RagError> {
        if chunks.is_empty() {
            return Ok(());
        }
        let mut rows = Vec::with_capacity(chunks.len());
        for (chunk, embedding) in chunks {
            if embedding.len() != self.dims {
                return Err(RagError::Storage(format!(
                    "embedding for chunk '{}' has {} dimensions, store expects {}",
                    chunk.id,
                    embedding.len(),
                    self.dims
                )));
            }
            let embedding_json = serde_json::to_string(&embedding)
                .map_err(|err| RagError::Storage(err.to_string()))?;
            rows.push((chunk, embedding_json));
        }

        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                for (chunk, embedding_json) in &rows {
                    let index_text = chunk.chunk_index.to_string();
                    tx.execute(
                        "INSERT INTO chunks (id, source, title, practice_name, chunk_index, content)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                         ON CONFLICT(id) DO UPDATE SET
                            source = excluded.source,
                            title = excluded.title,
                            practice_name = excluded.practice_name,
                            chunk_index = excluded.chunk_index,
                            content = excluded.content",
                        [
                            chunk.id.as_str(),
                            opt_text(&chunk.source),
                            opt_text(&chunk.title),
                            opt_text(&chunk.practice_name),
                            index_text.as_str(),
                            chunk.content.as_str(),
                        ],
                    )?;
                    let rowid: i64 = tx.query_row(
                        "SELECT rowid FROM chunks WHERE id = ?1",
                        [chunk.id.as_str()],
                        |row| row.get(0),
                    )?;
                    tx.execute(
                        &format!("DELETE FROM chunk_embeddings WHERE rowid = {rowid}"),
                        [],
                    )?;
                    tx.execute(
                        &format!(
                            "INSERT INTO chunk_embeddings (rowid, embedding) VALUES ({rowid}, ?1)"
                        ),
                        [embedding_json.as_str()],
                    )?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }

    /// Returns up to `top_k` chunks ranked by cosine similarity to the
    /// query embedding, most similar first. Ties order by ascending id so
    /// results are reproducible.
    pub async fn search_similar(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<(StoredChunk, f32)>, RagError> {
        let embedding_json = serde_json::to_string(query_embedding)
            .map_err(|err| RagError::Storage(err.to_string()))?;

        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT c.id, c.source, c.title, c.practice_name, c.chunk_index, c.content, \
                     vec_distance_cosine(e.embedding, vec_f32(?1)) AS distance \
                     FROM chunks c \
                     JOIN chunk_embeddings e ON e.rowid = c.rowid \
                     ORDER BY distance ASC, c.id ASC \
                     LIMIT {top_k}"
                ))?;

                let rows = stmt.query_map([embedding_json.as_str()], |row| {
                    let chunk = StoredChunk {
                        id: row.get(0)?,
                        source: text_opt(row.get(1)?),
                        title: text_opt(row.get(2)?),
                        practice_name: text_opt(row.get(3)?),
                        chunk_index: row.get::<_, String>(4)?.parse().unwrap_or(0),
                        content: row.get(5)?,
                    };
                    let distance: f32 = row.get(6)?;
                    // Cosine distance in [0, 2]; similarity = 1 - distance.
                    Ok((chunk, 1.0 - distance))
                })?;

                let mut results = Vec::new();
                for row in rows {
                    results.push(row?);
                }
                Ok(results)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }

    /// Metadata projection of every stored chunk, for topic scans.
    pub async fn metadata_entries(&self) -> Result<Vec<MetadataEntry>, RagError> {
        self.conn
            .call(|conn| {
                let mut stmt =
                    conn.prepare("SELECT id, source, practice_name FROM chunks ORDER BY id ASC")?;
                let rows = stmt.query_map([], |row| {
                    Ok(MetadataEntry {
                        id: row.get(0)?,
                        source: text_opt(row.get(1)?),
                        practice_name: text_opt(row.get(2)?),
                    })
                })?;
                let mut entries = Vec::new();
                for row in rows {
                    entries.push(row?);
                }
                Ok(entries)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }

    /// Fetches one chunk by id.
    pub async fn get_chunk(&self, id: &str) -> Result<Option<StoredChunk>, RagError> {
        let id = id.to_string();
        self.conn
            .call(move |conn| {
                let result = conn
                    .query_row(
                        "SELECT id, source, title, practice_name, chunk_index, content \
                         FROM chunks WHERE id = ?1",
                        [id.as_str()],
                        |row| {
                            Ok(StoredChunk {
                                id: row.get(0)?,
                                source: text_opt(row.get(1)?),
                                title: text_opt(row.get(2)?),
                                practice_name: text_opt(row.get(3)?),
                                chunk_index: row.get::<_, String>(4)?.parse().unwrap_or(0),
                                content: row.get(5)?,
                            })
                        },
                    )
                    .optional()?;
                Ok(result)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }

    /// Total number of stored chunks.
    pub async fn count(&self) -> Result<usize, RagError> {
        self.conn
            .call(|conn| {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
                Ok(count as usize)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }

    /// Registers the sqlite-vec extension for every subsequent connection.
    /// Runs at most once per process; the result is replayed to later
    /// callers.
    fn register_sqlite_vec() -> Result<(), RagError> {
        use std::sync::Mutex;

        static INIT: Once = Once::new();
        static INIT_RESULT: Mutex<Option<Result<(), String>>> = Mutex::new(None);

        INIT.call_once(|| {
            let result = unsafe {
                type SqliteExtensionInit = unsafe extern "C" fn(
                    *mut ffi::sqlite3,
                    *mut *const c_char,
                    *const ffi::sqlite3_api_routines,
                ) -> i32;

                let init: unsafe extern "C" fn() = sqlite_vec::sqlite3_vec_init;
                let init_fn: SqliteExtensionInit =
                    transmute::<unsafe extern "C" fn(), SqliteExtensionInit>(init);
                let rc = ffi::sqlite3_auto_extension(Some(init_fn));
                if rc != 0 {
                    Err(format!(
                        "failed to register sqlite-vec extension (code {rc})"
                    ))
                } else {
                    Ok(())
                }
            };
            *INIT_RESULT.lock().expect("init result mutex poisoned") = Some(result);
        });

        INIT_RESULT
            .lock()
            .expect("init result mutex poisoned")
            .clone()
            .expect("init was called but result not set")
            .map_err(RagError::Storage)
    }
}

fn opt_text(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

fn text_opt(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}
