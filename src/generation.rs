//! Answer generator: external language-model capability.
//!
//! The [`Generator`] trait mirrors [`crate::embedding::Embedder`]: the
//! pipeline consumes it as an opaque `Generate(prompt) -> text` capability
//! so local and remote backends can be swapped without touching pipeline
//! logic.
//!
//! - **[`OllamaGenerator`]** — `POST /api/generate` on a local Ollama
//!   instance, non-streaming.
//! - **[`OpenAiGenerator`]** — OpenAI chat completions.
//!
//! Both share the embedding gateway's retry/backoff policy. An unreachable
//! backend surfaces as [`GenerationUnavailable`],
//! other failures as [`Generation`].
//!
//! [`GenerationUnavailable`]: crate::error::CasebookError::GenerationUnavailable
//! [`Generation`]: crate::error::CasebookError::Generation

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::GenerationConfig;
use crate::embedding::post_with_retry;
use crate::error::{CasebookError, Result};

const OLLAMA_DEFAULT_URL: &str = "http://localhost:11434";

/// External text-generation capability.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Model identifier (e.g. `"phi3:mini"`).
    fn model_name(&self) -> &str;
    /// Produce free text from a fully composed prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Create the configured generation backend.
pub fn create_generator(config: &GenerationConfig) -> Result<Arc<dyn Generator>> {
    match config.provider.as_str() {
        "ollama" => Ok(Arc::new(OllamaGenerator::new(config))),
        "openai" => Ok(Arc::new(OpenAiGenerator::new(config)?)),
        other => Err(CasebookError::Configuration(format!(
            "unknown generation provider: {}",
            other
        ))),
    }
}

// ============ Ollama ============

/// Generation backend using a local Ollama instance.
pub struct OllamaGenerator {
    config: GenerationConfig,
    url: String,
}

impl OllamaGenerator {
    pub fn new(config: &GenerationConfig) -> Self {
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
impl Generator for OllamaGenerator {
    fn model_name(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.config.model,
            "prompt": prompt,
            "stream": false,
            "options": { "temperature": self.config.temperature },
        });

        let json = post_with_retry(
            "ollama",
            &format!("{}/api/generate", self.url),
            None,
            &body,
            self.config.timeout_secs,
            self.config.max_retries,
        )
        .await?;

        json.get("response")
            .and_then(|r| r.as_str())
            .map(|s| s.trim().to_string())
            .ok_or_else(|| {
                CasebookError::Generation(
                    "invalid Ollama response: missing response field".to_string(),
                )
            })
    }
}

// ============ OpenAI ============

/// Generation backend using the OpenAI chat completions API.
///
/// Requires the `OPENAI_API_KEY` environment variable.
pub struct OpenAiGenerator {
    config: GenerationConfig,
    api_key: String,
}

impl OpenAiGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
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
impl Generator for OpenAiGenerator {
    fn model_name(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = self
            .config
            .url
            .clone()
            .unwrap_or_else(|| "https://api.openai.com".to_string());
        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": self.config.temperature,
        });

        let json = post_with_retry(
            "openai",
            &format!("{}/v1/chat/completions", url),
            Some(&self.api_key),
            &body,
            self.config.timeout_secs,
            self.config.max_retries,
        )
        .await?;

        json.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|s| s.as_str())
            .map(|s| s.trim().to_string())
            .ok_or_else(|| {
                CasebookError::Generation(
                    "invalid OpenAI response: missing message content".to_string(),
                )
            })
    }
}
