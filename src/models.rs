//! Core data models for the ingestion and answering pipelines.
//!
//! These types represent the documents, chunks, and retrieval results that
//! flow from the corpus directory into the vector index and back out of it
//! at query time.

/// One page (or page-like unit) of a source manual, as produced by the loader.
///
/// Immutable once loaded; exists only for the duration of an ingestion run.
#[derive(Debug, Clone)]
pub struct Document {
    /// Source identifier: path of the file relative to the corpus root.
    pub source: String,
    /// 1-based page/unit number within the source file.
    pub page: i64,
    /// Plain text of the page.
    pub text: String,
}

/// A bounded text segment cut from one [`Document`].
///
/// Carries a back-reference to its source file and page so answers can cite
/// where a claim came from. The `id` is an opaque key, not content-derived.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    pub source: String,
    pub page: i64,
    /// Position of this chunk within its document, contiguous from 0.
    pub chunk_index: i64,
    pub text: String,
    /// SHA-256 of the chunk text.
    pub hash: String,
}

/// A chunk paired with its embedding, ready to be persisted in the index.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

/// A chunk returned from a nearest-neighbor query, with its cosine
/// similarity to the query vector.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub chunk: Chunk,
    pub score: f32,
}
