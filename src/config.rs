//! # Configuration Module
//!
//! Explicit immutable configuration passed into constructors, never read
//! from ambient global state. Loadable from a YAML file; every field has a
//! default so a partial file (or none at all) works.
//!
//! API keys are intentionally absent: providers read them from the
//! environment variable named by `api_key_env` so that keys never land in
//! config files on disk.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::errors::{RagLiteError, RagLiteResult};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    pub chunking: ChunkingConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    pub store: StoreConfig,
    pub max_retrieval: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub max_chars: usize,
    pub overlap: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub api_key_env: String,
    pub model: String,
    pub dimension: usize,
    pub batch_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key_env: String,
    pub model: String,
    pub temperature: f32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub index_path: PathBuf,
    pub meta_path: PathBuf,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunking: ChunkingConfig::default(),
            embedding: EmbeddingConfig::default(),
            llm: LlmConfig::default(),
            store: StoreConfig::default(),
            max_retrieval: 5,
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: 1000,
            overlap: 200,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimension: 1536,
            batch_size: 32,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.0,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            index_path: PathBuf::from("data/store/vectors.json"),
            meta_path: PathBuf::from("data/store/meta.json"),
        }
    }
}

impl RagConfig {
    /// Load configuration from a YAML file. Missing keys fall back to
    /// defaults.
    pub fn from_path(path: &Path) -> RagLiteResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            RagLiteError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        serde_yaml::from_str(&raw).map_err(|e| {
            RagLiteError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }
}
