//! Retriever: question in, top-k chunks out.

use crate::embedding::{self, Embedder};
use crate::error::Result;
use crate::index::VectorIndex;
use crate::models::RetrievedChunk;

/// How many chunks ground an answer. A design default, not user-tunable.
pub const TOP_K: usize = 5;

/// Embed the question and fetch its nearest chunks from the index.
///
/// An unreachable embedding backend propagates as
/// [`GenerationUnavailable`](crate::error::CasebookError::GenerationUnavailable)
/// rather than being retried here.
pub async fn retrieve(
    index: &VectorIndex,
    embedder: &dyn Embedder,
    question: &str,
) -> Result<Vec<RetrievedChunk>> {
    let vector = embedding::embed_query(embedder, question).await?;
    index.query(&vector, TOP_K).await
}
