//! Durable nearest-neighbor store.
//!
//! The index owns a directory containing a single SQLite database (WAL
//! mode). Its internal layout is opaque to callers. [`rebuild`] replaces
//! the whole index in one transaction; [`VectorIndex`] is a read-only
//! handle that supports unlimited concurrent [`VectorIndex::query`] calls.
//! Rebuild is destructive: ingestion deletes-then-creates rather than
//! appending, so stale entries never coexist with a new build.
//!
//! Similarity scores are comparable across calls only while queries are
//! embedded with the same model/version used at build time; that is the
//! caller's obligation, not enforced here.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::config::IndexConfig;
use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::error::{CasebookError, Result};
use crate::models::{Chunk, IndexEntry, RetrievedChunk};

const INDEX_DB_FILE: &str = "casebook.sqlite";

fn db_path(config: &IndexConfig) -> PathBuf {
    config.dir.join(INDEX_DB_FILE)
}

/// Atomically replace the entire persisted index with the given entries.
///
/// Removes any prior index directory, recreates it, and writes all entries
/// in a single transaction. Fails with [`CasebookError::Storage`] if the
/// directory or database is unwritable; on failure no partially built
/// index is left behind as fact — callers treat the index as absent until
/// the next successful rebuild.
pub async fn rebuild(config: &IndexConfig, entries: &[IndexEntry]) -> Result<()> {
    let dir = &config.dir;
    if dir.exists() {
        std::fs::remove_dir_all(dir).map_err(|e| {
            CasebookError::Storage(format!(
                "failed to remove index directory {}: {}",
                dir.display(),
                e
            ))
        })?;
    }
    std::fs::create_dir_all(dir).map_err(|e| {
        CasebookError::Storage(format!(
            "failed to create index directory {}: {}",
            dir.display(),
            e
        ))
    })?;

    let written = write_database(&db_path(config), entries).await;
    if written.is_err() {
        // A half-written database must not be mistaken for a built index:
        // remove the directory so the next open reports IndexNotBuilt.
        let _ = std::fs::remove_dir_all(dir);
    }
    written
}

async fn write_database(path: &Path, entries: &[IndexEntry]) -> Result<()> {
    let pool = connect(path, false).await?;

    sqlx::query(
        r#"
        CREATE TABLE entries (
            position INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            source TEXT NOT NULL,
            page INTEGER NOT NULL,
            chunk_index INTEGER NOT NULL,
            text TEXT NOT NULL,
            hash TEXT NOT NULL,
            embedding BLOB NOT NULL
        )
        "#,
    )
    .execute(&pool)
    .await?;

    let mut tx = pool.begin().await?;
    for entry in entries {
        sqlx::query(
            "INSERT INTO entries (id, source, page, chunk_index, text, hash, embedding) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&entry.chunk.id)
        .bind(&entry.chunk.source)
        .bind(entry.chunk.page)
        .bind(entry.chunk.chunk_index)
        .bind(&entry.chunk.text)
        .bind(&entry.chunk.hash)
        .bind(vec_to_blob(&entry.embedding))
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    pool.close().await;
    Ok(())
}

/// Read-only handle over a built index.
#[derive(Debug)]
pub struct VectorIndex {
    pool: SqlitePool,
}

impl VectorIndex {
    /// Open the persisted index for querying.
    ///
    /// Fails with [`CasebookError::IndexNotBuilt`] if no index has ever
    /// been built at the configured location.
    pub async fn open(config: &IndexConfig) -> Result<Self> {
        let path = db_path(config);
        if !path.exists() {
            return Err(CasebookError::IndexNotBuilt);
        }
        let pool = connect(&path, true).await?;
        Ok(Self { pool })
    }

    /// Number of entries in the index.
    pub async fn len(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entries")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    /// Return the `k` entries most similar to `vector` by cosine
    /// similarity, best first. Ties are broken by insertion order (stable).
    /// If fewer than `k` entries exist, all of them are returned.
    pub async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<RetrievedChunk>> {
        if k == 0 {
            return Err(CasebookError::InvalidRequest(
                "retrieval k must be >= 1".to_string(),
            ));
        }

        let rows = sqlx::query(
            "SELECT position, id, source, page, chunk_index, text, hash, embedding \
             FROM entries ORDER BY position",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut scored: Vec<(i64, RetrievedChunk)> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let score = cosine_similarity(vector, &blob_to_vec(&blob));
                let chunk = Chunk {
                    id: row.get("id"),
                    source: row.get("source"),
                    page: row.get("page"),
                    chunk_index: row.get("chunk_index"),
                    text: row.get("text"),
                    hash: row.get("hash"),
                };
                (row.get::<i64, _>("position"), RetrievedChunk { chunk, score })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.1.score
                .partial_cmp(&a.1.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(k);

        Ok(scored.into_iter().map(|(_, r)| r).collect())
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

async fn connect(path: &Path, read_only: bool) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
        .map_err(|e| CasebookError::Storage(e.to_string()))?
        .create_if_missing(!read_only)
        .read_only(read_only)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Document;

    fn entry(id: &str, source: &str, page: i64, text: &str, embedding: Vec<f32>) -> IndexEntry {
        let doc = Document {
            source: source.to_string(),
            page,
            text: text.to_string(),
        };
        let mut chunks = crate::chunk::chunk_document(&doc, 1000, 100);
        let mut chunk = chunks.remove(0);
        chunk.id = id.to_string();
        IndexEntry { chunk, embedding }
    }

    fn test_config(tmp: &tempfile::TempDir) -> IndexConfig {
        IndexConfig {
            dir: tmp.path().join("index"),
        }
    }

    #[tokio::test]
    async fn test_open_unbuilt_index_fails() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = test_config(&tmp);
        let err = VectorIndex::open(&config).await.unwrap_err();
        assert!(matches!(err, CasebookError::IndexNotBuilt));
    }

    #[tokio::test]
    async fn test_rebuild_then_query_ranks_by_similarity() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = test_config(&tmp);

        rebuild(
            &config,
            &[
                entry("a", "alpha.txt", 1, "about seizure", vec![1.0, 0.0, 0.0]),
                entry("b", "beta.txt", 2, "about forensics", vec![0.0, 1.0, 0.0]),
                entry("c", "gamma.txt", 3, "about chain of custody", vec![0.7, 0.7, 0.0]),
            ],
        )
        .await
        .unwrap();

        let index = VectorIndex::open(&config).await.unwrap();
        let results = index.query(&[1.0, 0.0, 0.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.id, "a");
        assert!((results[0].score - 1.0).abs() < 1e-6);
        assert_eq!(results[1].chunk.id, "c");
        assert!(results[0].score > results[1].score);
        index.close().await;
    }

    #[tokio::test]
    async fn test_query_k_exceeding_entries_returns_all() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = test_config(&tmp);

        rebuild(
            &config,
            &[
                entry("a", "alpha.txt", 1, "one", vec![1.0, 0.0]),
                entry("b", "beta.txt", 1, "two", vec![0.0, 1.0]),
            ],
        )
        .await
        .unwrap();

        let index = VectorIndex::open(&config).await.unwrap();
        let results = index.query(&[1.0, 0.0], 50).await.unwrap();
        assert_eq!(results.len(), 2);
        index.close().await;
    }

    #[tokio::test]
    async fn test_query_ties_broken_by_insertion_order() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = test_config(&tmp);

        // Identical vectors: identical scores, so order must follow insertion.
        rebuild(
            &config,
            &[
                entry("first", "a.txt", 1, "same", vec![1.0, 0.0]),
                entry("second", "b.txt", 1, "same", vec![1.0, 0.0]),
                entry("third", "c.txt", 1, "same", vec![1.0, 0.0]),
            ],
        )
        .await
        .unwrap();

        let index = VectorIndex::open(&config).await.unwrap();
        let results = index.query(&[1.0, 0.0], 3).await.unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.chunk.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
        index.close().await;
    }

    #[tokio::test]
    async fn test_query_k_zero_rejected() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = test_config(&tmp);
        rebuild(&config, &[entry("a", "a.txt", 1, "one", vec![1.0])])
            .await
            .unwrap();

        let index = VectorIndex::open(&config).await.unwrap();
        let err = index.query(&[1.0], 0).await.unwrap_err();
        assert!(matches!(err, CasebookError::InvalidRequest(_)));
        index.close().await;
    }

    #[tokio::test]
    async fn test_rebuild_replaces_prior_entries() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = test_config(&tmp);

        rebuild(
            &config,
            &[
                entry("old1", "a.txt", 1, "old", vec![1.0, 0.0]),
                entry("old2", "b.txt", 1, "old", vec![0.0, 1.0]),
            ],
        )
        .await
        .unwrap();

        rebuild(&config, &[entry("new", "c.txt", 1, "new", vec![1.0, 0.0])])
            .await
            .unwrap();

        let index = VectorIndex::open(&config).await.unwrap();
        assert_eq!(index.len().await.unwrap(), 1);
        let results = index.query(&[1.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.id, "new");
        index.close().await;
    }

    #[tokio::test]
    async fn test_rebuild_unwritable_directory_is_storage_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        // A file where the index directory's parent should be a directory.
        let blocker = tmp.path().join("blocked");
        std::fs::write(&blocker, "not a directory").unwrap();
        let config = IndexConfig {
            dir: blocker.join("index"),
        };

        let err = rebuild(&config, &[]).await.unwrap_err();
        assert!(matches!(err, CasebookError::Storage(_)));
    }

    #[tokio::test]
    async fn test_failed_rebuild_leaves_no_openable_index() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = test_config(&tmp);

        rebuild(&config, &[entry("prior", "a.txt", 1, "old", vec![1.0])])
            .await
            .unwrap();

        // Duplicate ids violate the UNIQUE constraint partway through the
        // insert loop, failing the rebuild after the table exists.
        let err = rebuild(
            &config,
            &[
                entry("dup", "a.txt", 1, "one", vec![1.0]),
                entry("dup", "b.txt", 1, "two", vec![1.0]),
            ],
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CasebookError::Storage(_)));

        // Neither the empty new database nor the prior index survives.
        let err = VectorIndex::open(&config).await.unwrap_err();
        assert!(matches!(err, CasebookError::IndexNotBuilt));
    }

    #[tokio::test]
    async fn test_entry_text_and_metadata_roundtrip() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = test_config(&tmp);

        rebuild(
            &config,
            &[entry(
                "a",
                "manual.pdf",
                14,
                "Seize the router before powering it down.",
                vec![0.5, 0.5],
            )],
        )
        .await
        .unwrap();

        let index = VectorIndex::open(&config).await.unwrap();
        let results = index.query(&[0.5, 0.5], 1).await.unwrap();
        let chunk = &results[0].chunk;
        assert_eq!(chunk.source, "manual.pdf");
        assert_eq!(chunk.page, 14);
        assert_eq!(chunk.text, "Seize the router before powering it down.");
        index.close().await;
    }
}
