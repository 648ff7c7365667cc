use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{CasebookError, Result};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub corpus: CorpusConfig,
    pub index: IndexConfig,
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Where the source manuals live and which files count as corpus members.
#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    pub dir: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
}

fn default_include_globs() -> Vec<String> {
    vec![
        "**/*.pdf".to_string(),
        "**/*.md".to_string(),
        "**/*.txt".to_string(),
    ]
}

/// Directory owned by the vector index. Deleted and recreated on every
/// ingestion run; opaque to everything outside the index module.
#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    pub dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    #[serde(default = "default_overlap_chars")]
    pub overlap_chars: usize,
}

fn default_max_chars() -> usize {
    1000
}
fn default_overlap_chars() -> usize {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_embedding_dims")]
    pub dims: usize,
    /// Backend base URL; defaults to the local Ollama instance.
    #[serde(default)]
    pub url: Option<String>,
    /// L2-normalize vectors returned by the backend.
    #[serde(default = "default_normalize")]
    pub normalize: bool,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            dims: default_embedding_dims(),
            url: None,
            normalize: true,
            batch_size: 64,
            max_retries: 5,
            timeout_secs: 30,
        }
    }
}

fn default_embedding_provider() -> String {
    "ollama".to_string()
}
fn default_embedding_model() -> String {
    "bge-m3".to_string()
}
fn default_embedding_dims() -> usize {
    1024
}
fn default_normalize() -> bool {
    true
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_provider")]
    pub provider: String,
    #[serde(default = "default_generation_model")]
    pub model: String,
    #[serde(default)]
    pub url: Option<String>,
    /// Low temperature keeps answers deterministic and factual.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_generation_retries")]
    pub max_retries: u32,
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_generation_provider(),
            model: default_generation_model(),
            url: None,
            temperature: default_temperature(),
            max_retries: 2,
            timeout_secs: 120,
        }
    }
}

fn default_generation_provider() -> String {
    "ollama".to_string()
}
fn default_generation_model() -> String {
    "phi3:mini".to_string()
}
fn default_temperature() -> f64 {
    0.1
}
fn default_generation_retries() -> u32 {
    2
}
fn default_generation_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:5000".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        CasebookError::Configuration(format!(
            "failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| CasebookError::Configuration(format!("failed to parse config file: {}", e)))?;

    if config.chunking.max_chars == 0 {
        return Err(CasebookError::Configuration(
            "chunking.max_chars must be > 0".to_string(),
        ));
    }
    if config.chunking.overlap_chars >= config.chunking.max_chars {
        return Err(CasebookError::Configuration(
            "chunking.overlap_chars must be < chunking.max_chars".to_string(),
        ));
    }
    if config.embedding.dims == 0 {
        return Err(CasebookError::Configuration(
            "embedding.dims must be > 0".to_string(),
        ));
    }

    match config.embedding.provider.as_str() {
        "ollama" | "openai" => {}
        other => {
            return Err(CasebookError::Configuration(format!(
                "unknown embedding provider: '{}'. Must be ollama or openai.",
                other
            )))
        }
    }
    match config.generation.provider.as_str() {
        "ollama" | "openai" => {}
        other => {
            return Err(CasebookError::Configuration(format!(
                "unknown generation provider: '{}'. Must be ollama or openai.",
                other
            )))
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("casebook.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        (tmp, path)
    }

    #[test]
    fn test_minimal_config_defaults() {
        let (_tmp, path) = write_config(
            r#"
[corpus]
dir = "./documents"

[index]
dir = "./index"

[chunking]
"#,
        );
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.chunking.max_chars, 1000);
        assert_eq!(cfg.chunking.overlap_chars, 100);
        assert_eq!(cfg.embedding.provider, "ollama");
        assert!(cfg.embedding.normalize);
        assert_eq!(cfg.generation.temperature, 0.1);
    }

    #[test]
    fn test_rejects_overlap_ge_max() {
        let (_tmp, path) = write_config(
            r#"
[corpus]
dir = "./documents"

[index]
dir = "./index"

[chunking]
max_chars = 100
overlap_chars = 100
"#,
        );
        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, CasebookError::Configuration(_)));
    }

    #[test]
    fn test_rejects_unknown_provider() {
        let (_tmp, path) = write_config(
            r#"
[corpus]
dir = "./documents"

[index]
dir = "./index"

[chunking]

[embedding]
provider = "mystery"
"#,
        );
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("mystery"));
    }

    #[test]
    fn test_missing_file_is_configuration_error() {
        let err = load_config(Path::new("/nonexistent/casebook.toml")).unwrap_err();
        assert!(matches!(err, CasebookError::Configuration(_)));
    }
}
