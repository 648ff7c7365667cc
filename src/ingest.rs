//! Ingestion pipeline orchestration.
//!
//! Coordinates the full offline build: delete prior index → load → chunk →
//! embed → rebuild. The pipeline is linear with no partial commit: any
//! stage failure aborts the run before `rebuild` is invoked, and the prior
//! index directory is always removed up front so stale entries never
//! coexist with a new build. An empty corpus aborts with
//! [`CasebookError::EmptyCorpus`] and performs no index mutation beyond
//! that initial delete.

use crate::chunk::chunk_document;
use crate::config::Config;
use crate::embedding::create_embedder;
use crate::error::{CasebookError, Result};
use crate::index;
use crate::loader;
use crate::models::IndexEntry;

pub async fn run_ingest(config: &Config) -> Result<()> {
    let index_dir = &config.index.dir;
    if index_dir.exists() {
        println!(
            "existing index found at {}; deleting before re-ingest",
            index_dir.display()
        );
        std::fs::remove_dir_all(index_dir).map_err(|e| {
            CasebookError::Storage(format!(
                "failed to remove index directory {}: {}",
                index_dir.display(),
                e
            ))
        })?;
    }

    let documents = loader::load_documents(config)?;
    if documents.is_empty() {
        return Err(CasebookError::EmptyCorpus(
            config.corpus.dir.display().to_string(),
        ));
    }
    println!("loaded {} pages from corpus", documents.len());

    let mut chunks = Vec::new();
    for doc in &documents {
        chunks.extend(chunk_document(
            doc,
            config.chunking.max_chars,
            config.chunking.overlap_chars,
        ));
    }
    println!("split into {} chunks", chunks.len());

    let embedder = create_embedder(&config.embedding)?;
    println!(
        "embedding with {} ({} dims)",
        embedder.model_name(),
        embedder.dims()
    );

    let mut entries = Vec::with_capacity(chunks.len());
    for batch in chunks.chunks(config.embedding.batch_size) {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let vectors = embedder.embed(&texts).await?;
        if vectors.len() != batch.len() {
            return Err(CasebookError::Generation(format!(
                "embedding backend returned {} vectors for {} inputs",
                vectors.len(),
                batch.len()
            )));
        }
        for (chunk, embedding) in batch.iter().cloned().zip(vectors) {
            entries.push(IndexEntry { chunk, embedding });
        }
        println!("  embedded {}/{} chunks", entries.len(), chunks.len());
    }

    index::rebuild(&config.index, &entries).await?;
    println!("index rebuilt: {} entries", entries.len());
    println!("ok");

    Ok(())
}
