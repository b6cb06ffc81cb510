//! Engine configuration, presets, and persistence.
//!
//! A [`RagConfig`] names one strategy per pipeline stage plus the stage
//! parameters. Configs load from YAML files, import/export as JSON strings
//! (lossless roundtrip), and persist into the store's metadata collection
//! under a schema version; a persisted config with a stale version is
//! discarded in favor of defaults rather than migrated.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use retrieve::RetrievalParams;
use segment::ChunkingConfig;

/// Bump on any incompatible change to the config shape.
pub const CONFIG_VERSION: u32 = 1;

/// Metadata key the active config persists under.
pub(crate) const CONFIG_META_KEY: &str = "rag_config";

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(u32),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Chunking stage selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkingSelection {
    #[serde(default = "default_chunking_strategy")]
    pub strategy: String,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_overlap_percent")]
    pub overlap_percent: u8,
}

impl ChunkingSelection {
    pub fn window(&self) -> ChunkingConfig {
        ChunkingConfig {
            chunk_size: self.chunk_size,
            overlap_percent: self.overlap_percent,
        }
    }
}

impl Default for ChunkingSelection {
    fn default() -> Self {
        Self {
            strategy: default_chunking_strategy(),
            chunk_size: default_chunk_size(),
            overlap_percent: default_overlap_percent(),
        }
    }
}

/// Retrieval stage selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalSelection {
    #[serde(default = "default_retrieval_strategy")]
    pub strategy: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_alpha")]
    pub alpha: f32,
}

impl RetrievalSelection {
    pub fn params(&self) -> RetrievalParams {
        RetrievalParams {
            top_k: self.top_k,
            alpha: self.alpha,
        }
    }
}

impl Default for RetrievalSelection {
    fn default() -> Self {
        Self {
            strategy: default_retrieval_strategy(),
            top_k: 10,
            alpha: 0.5,
        }
    }
}

/// The live engine configuration: five named stage selections plus bounds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub chunking: ChunkingSelection,
    #[serde(default = "default_embedding")]
    pub embedding: String,
    #[serde(default)]
    pub retrieval: RetrievalSelection,
    #[serde(default = "default_generation")]
    pub generation: String,
    /// Post-processor ids, applied in order.
    #[serde(default)]
    pub post_process: Vec<String>,
    /// Deadline for embedder/model initialization. Pure retrieval has no
    /// deadline.
    #[serde(default = "default_model_init_timeout")]
    pub model_init_timeout_secs: u64,
}

impl Default for RagConfig {
    fn default() -> Self {
        Preset::Balanced.config()
    }
}

impl RagConfig {
    /// Load a YAML configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse a YAML configuration string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: RagConfig = serde_yaml::from_str(yaml)?;
        config.validate_bounds()?;
        Ok(config)
    }

    /// Export as a JSON string. `import` of the result reproduces the
    /// config exactly.
    pub fn export(&self) -> String {
        serde_json::to_string_pretty(self).expect("config serialization is infallible")
    }

    /// Import a previously exported config.
    pub fn import(json: &str) -> Result<Self, ConfigError> {
        let config: RagConfig = serde_json::from_str(json)?;
        config.validate_bounds()?;
        Ok(config)
    }

    /// Range checks that need no registry knowledge.
    pub fn validate_bounds(&self) -> Result<(), ConfigError> {
        if self.version != CONFIG_VERSION {
            return Err(ConfigError::UnsupportedVersion(self.version));
        }
        if !(100..=1000).contains(&self.chunking.chunk_size) {
            return Err(ConfigError::Validation(format!(
                "chunk_size must be in [100, 1000], got {}",
                self.chunking.chunk_size
            )));
        }
        if self.chunking.overlap_percent > 30 {
            return Err(ConfigError::Validation(format!(
                "overlap_percent must be in [0, 30], got {}",
                self.chunking.overlap_percent
            )));
        }
        self.retrieval
            .params()
            .validate()
            .map_err(|e| ConfigError::Validation(e.to_string()))?;
        if self.model_init_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "model_init_timeout_secs must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// Every strategy id this config references, per stage kind, for
    /// registry validation at engine construction.
    pub(crate) fn referenced_ids(&self) -> ReferencedIds<'_> {
        ReferencedIds {
            chunking: &self.chunking.strategy,
            embedding: &self.embedding,
            retrieval: &self.retrieval.strategy,
            generation: &self.generation,
            post_process: self.post_process.iter().map(String::as_str).collect(),
        }
    }
}

pub(crate) struct ReferencedIds<'a> {
    pub chunking: &'a str,
    pub embedding: &'a str,
    pub retrieval: &'a str,
    pub generation: &'a str,
    pub post_process: BTreeSet<&'a str>,
}

/// Named configuration bundles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Lexical-only retrieval, large chunks, no polish. Cheapest.
    Fast,
    /// Hybrid retrieval with even weighting and polish. The default.
    Balanced,
    /// Hybrid leaning semantic, small chunks, larger result budget.
    Accurate,
}

impl Preset {
    pub fn config(&self) -> RagConfig {
        let (chunk_size, overlap_percent, strategy, top_k, alpha, polish) = match self {
            Preset::Fast => (500, 10, "lexical", 5, 0.5, false),
            Preset::Balanced => (400, 12, "hybrid", 10, 0.5, true),
            Preset::Accurate => (300, 15, "hybrid", 15, 0.7, true),
        };
        RagConfig {
            version: CONFIG_VERSION,
            chunking: ChunkingSelection {
                strategy: default_chunking_strategy(),
                chunk_size,
                overlap_percent,
            },
            embedding: default_embedding(),
            retrieval: RetrievalSelection {
                strategy: strategy.to_string(),
                top_k,
                alpha,
            },
            generation: default_generation(),
            post_process: if polish {
                vec!["polish".to_string()]
            } else {
                Vec::new()
            },
            model_init_timeout_secs: default_model_init_timeout(),
        }
    }
}

impl std::str::FromStr for Preset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fast" => Ok(Preset::Fast),
            "balanced" => Ok(Preset::Balanced),
            "accurate" => Ok(Preset::Accurate),
            other => Err(ConfigError::Validation(format!("unknown preset: {other}"))),
        }
    }
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

fn default_chunking_strategy() -> String {
    "sliding-window".to_string()
}

fn default_chunk_size() -> usize {
    400
}

fn default_overlap_percent() -> u8 {
    12
}

fn default_embedding() -> String {
    "stub-embedder".to_string()
}

fn default_retrieval_strategy() -> String {
    "hybrid".to_string()
}

fn default_top_k() -> usize {
    10
}

fn default_alpha() -> f32 {
    0.5
}

fn default_generation() -> String {
    "simple-extractive".to_string()
}

fn default_model_init_timeout() -> u64 {
    120
}
