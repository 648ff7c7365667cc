//! Embedding gateway: external capability that maps text to fixed-length
//! vectors.
//!
//! The [`Embedder`] trait keeps the pipeline independent of any particular
//! backend. Two implementations are provided:
//! - **[`OllamaEmbedder`]** — calls a local Ollama instance's `/api/embed`.
//! - **[`OpenAiEmbedder`]** — calls the OpenAI embeddings API.
//!
//! Both retry transient failures with exponential backoff:
//! - HTTP 429 and 5xx → retry
//! - other 4xx → fail immediately
//! - network errors → retry
//! - backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)
//!
//! An unreachable backend surfaces as
//! [`CasebookError::GenerationUnavailable`] and propagates to the caller;
//! there is no silent retry beyond the configured attempt count.
//!
//! Also provides vector utilities shared with the index:
//! [`l2_normalize`], [`cosine_similarity`], [`vec_to_blob`], [`blob_to_vec`].

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::EmbeddingConfig;
use crate::error::{CasebookError, Result};

const OLLAMA_DEFAULT_URL: &str = "http://localhost:11434";

/// External embedding capability.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model identifier (e.g. `"bge-m3"`). Similarity scores are only
    /// comparable while queries use the same model as the build.
    fn model_name(&self) -> &str;
    /// Vector dimensionality.
    fn dims(&self) -> usize;
    /// Embed a batch of texts, one unit-normalized vector per input, in
    /// input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Embed a single query text.
pub async fn embed_query(embedder: &dyn Embedder, text: &str) -> Result<Vec<f32>> {
    let texts = [text.to_string()];
    let vectors = embedder.embed(&texts).await?;
    vectors
        .into_iter()
        .next()
        .ok_or_else(|| CasebookError::Generation("empty embedding response".to_string()))
}

/// Create the configured embedding backend.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config.provider.as_str() {
        "ollama" => Ok(Arc::new(OllamaEmbedder::new(config))),
        "openai" => Ok(Arc::new(OpenAiEmbedder::new(config)?)),
        other => Err(CasebookError::Configuration(format!(
            "unknown embedding provider: {}",
            other
        ))),
    }
}

// ============ Ollama ============

/// Embedding backend using a local Ollama instance.
///
/// Requires Ollama to be running with the configured model pulled
/// (e.g. `ollama pull bge-m3`).
pub struct OllamaEmbedder {
    config: EmbeddingConfig,
    url: String,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Self {
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| OLLAMA_DEFAULT_URL.to_string());
        Self {
            config: config.clone(),
            url,
        }
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.config.model
    }

    fn dims(&self) -> usize {
        self.config.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.config.model,
            "input": texts,
        });

        let json = post_with_retry(
            "ollama",
            &format!("{}/api/embed", self.url),
            None,
            &body,
            self.config.timeout_secs,
            self.config.max_retries,
        )
        .await?;

        let raw = parse_vector_array(json.get("embeddings"), "embeddings")?;
        finish_batch(raw, &self.config)
    }
}

// ============ OpenAI ============

/// Embedding backend using the OpenAI embeddings API.
///
/// Requires the `OPENAI_API_KEY` environment variable.
pub struct OpenAiEmbedder {
    config: EmbeddingConfig,
    api_key: String,
}

impl OpenAiEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            CasebookError::Configuration("OPENAI_API_KEY environment variable not set".to_string())
        })?;
        Ok(Self {
            config: config.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn model_name(&self) -> &str {
        &self.config.model
    }

    fn dims(&self) -> usize {
        self.config.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = self
            .config
            .url
            .clone()
            .unwrap_or_else(|| "https://api.openai.com".to_string());
        let body = serde_json::json!({
            "model": self.config.model,
            "input": texts,
        });

        let json = post_with_retry(
            "openai",
            &format!("{}/v1/embeddings", url),
            Some(&self.api_key),
            &body,
            self.config.timeout_secs,
            self.config.max_retries,
        )
        .await?;

        let data = json
            .get("data")
            .and_then(|d| d.as_array())
            .ok_or_else(|| {
                CasebookError::Generation("invalid OpenAI response: missing data array".to_string())
            })?;

        let mut raw = Vec::with_capacity(data.len());
        for item in data {
            raw.push(parse_vector(item.get("embedding"), "embedding")?);
        }
        finish_batch(raw, &self.config)
    }
}

// ============ Shared HTTP plumbing ============

/// POST a JSON body with the retry/backoff policy described in the module
/// docs. Returns the parsed response body.
pub(crate) async fn post_with_retry(
    backend: &str,
    url: &str,
    bearer: Option<&str>,
    body: &serde_json::Value,
    timeout_secs: u64,
    max_retries: u32,
) -> Result<serde_json::Value> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| CasebookError::Generation(e.to_string()))?;

    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            // Exponential backoff: 1s, 2s, 4s, 8s, ...
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        let mut request = client.post(url).json(body);
        if let Some(key) = bearer {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    return response
                        .json()
                        .await
                        .map_err(|e| CasebookError::Generation(e.to_string()));
                }

                let body_text = response.text().await.unwrap_or_default();

                // Rate limited or server error: retry
                if status.as_u16() == 429 || status.is_server_error() {
                    last_err = Some(format!("{} error {}: {}", backend, status, body_text));
                    continue;
                }

                // Other client errors are not retryable
                return Err(CasebookError::Generation(format!(
                    "{} error {}: {}",
                    backend, status, body_text
                )));
            }
            Err(e) => {
                last_err = Some(format!("connection to {} failed: {}", url, e));
                continue;
            }
        }
    }

    Err(CasebookError::GenerationUnavailable {
        backend: backend.to_string(),
        message: last_err.unwrap_or_else(|| "request failed after retries".to_string()),
    })
}

fn parse_vector(value: Option<&serde_json::Value>, field: &str) -> Result<Vec<f32>> {
    let arr = value.and_then(|v| v.as_array()).ok_or_else(|| {
        CasebookError::Generation(format!("invalid embedding response: missing {}", field))
    })?;
    Ok(arr
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect())
}

fn parse_vector_array(value: Option<&serde_json::Value>, field: &str) -> Result<Vec<Vec<f32>>> {
    let arr = value.and_then(|v| v.as_array()).ok_or_else(|| {
        CasebookError::Generation(format!("invalid embedding response: missing {}", field))
    })?;
    arr.iter().map(|v| parse_vector(Some(v), field)).collect()
}

/// Validate dimensions and apply normalization to a freshly embedded batch.
fn finish_batch(mut vectors: Vec<Vec<f32>>, config: &EmbeddingConfig) -> Result<Vec<Vec<f32>>> {
    for v in &mut vectors {
        if v.len() != config.dims {
            return Err(CasebookError::Configuration(format!(
                "embedding backend returned {} dims, config expects {}",
                v.len(),
                config.dims
            )));
        }
        if config.normalize {
            l2_normalize(v);
        }
    }
    Ok(vectors)
}

// ============ Vector utilities ============

/// Scale a vector in place to unit L2 norm. A zero vector is left unchanged.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Cosine similarity in `[-1.0, 1.0]`. Returns `0.0` for empty vectors or
/// vectors of different lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

/// Encode a float vector as little-endian f32 bytes for BLOB storage.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB written by [`vec_to_blob`] back into a float vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
