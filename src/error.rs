//! Error taxonomy for casebook.
//!
//! Ingestion failures abort the whole run and leave prior state untouched;
//! serving failures are caught per request and returned as a structured
//! error response. The CLI boundary wraps these in `anyhow` for display.

use thiserror::Error;

/// Errors that can occur in the ingestion and answering pipelines.
#[derive(Debug, Error)]
pub enum CasebookError {
    /// Invalid or missing configuration, including a missing corpus directory.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No source documents were found; ingestion aborts without building an index.
    #[error("no documents found in corpus directory {0}")]
    EmptyCorpus(String),

    /// The index storage medium is unreadable or unwritable.
    #[error("index storage error: {0}")]
    Storage(String),

    /// A query was issued against an index that has never been built.
    #[error("index has not been built; run `cbk ingest` first")]
    IndexNotBuilt,

    /// The embedding or language-model backend is unreachable.
    #[error("{backend} backend unavailable: {message}")]
    GenerationUnavailable {
        /// The backend that could not be reached (e.g. `"ollama"`).
        backend: String,
        message: String,
    },

    /// The request was empty or malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The answer pipeline failed after the request was accepted.
    #[error("generation failed: {0}")]
    Generation(String),
}

impl From<sqlx::Error> for CasebookError {
    fn from(e: sqlx::Error) -> Self {
        CasebookError::Storage(e.to_string())
    }
}

/// A convenience result type for pipeline operations.
pub type Result<T> = std::result::Result<T, CasebookError>;
