//! Query service: the online retrieve → compose → generate pipeline.
//!
//! A [`QueryService`] owns the long-lived pieces of the answering pipeline
//! (open index handle, embedding backend, generation backend) as explicitly
//! constructed singletons with an init-once lifecycle. Each
//! [`QueryService::answer`] call is an independent, stateless pipeline
//! execution; the service is safe to share across concurrent requests.

use std::sync::Arc;

use crate::config::Config;
use crate::embedding::{create_embedder, Embedder};
use crate::error::{CasebookError, Result};
use crate::generation::{create_generator, Generator};
use crate::index::VectorIndex;
use crate::prompt;
use crate::retrieve;

pub struct QueryService {
    index: Arc<VectorIndex>,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
}

impl QueryService {
    /// Assemble a service from already-constructed parts. Used directly by
    /// tests; production callers go through [`QueryService::open`].
    pub fn new(
        index: Arc<VectorIndex>,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        Self {
            index,
            embedder,
            generator,
        }
    }

    /// Open the persisted index and construct the configured backends.
    ///
    /// Fails with [`CasebookError::IndexNotBuilt`] if ingestion has never
    /// run at the configured index location.
    pub async fn open(config: &Config) -> Result<Self> {
        let index = Arc::new(VectorIndex::open(&config.index).await?);
        let embedder = create_embedder(&config.embedding)?;
        let generator = create_generator(&config.generation)?;
        Ok(Self::new(index, embedder, generator))
    }

    /// Number of chunks in the open index.
    pub async fn index_len(&self) -> Result<u64> {
        self.index.len().await
    }

    /// Answer a question from the indexed manuals.
    ///
    /// An empty question is rejected before any pipeline work happens.
    /// Failures inside retrieval, composition, or generation surface to the
    /// caller without partial output.
    pub async fn answer(&self, question: &str) -> Result<String> {
        let question = question.trim();
        if question.is_empty() {
            return Err(CasebookError::InvalidRequest(
                "query must not be empty".to_string(),
            ));
        }

        let retrieved = retrieve::retrieve(&self.index, self.embedder.as_ref(), question).await?;
        let prompt = prompt::compose(&retrieved, question);
        self.generator.generate(&prompt).await
    }
}
