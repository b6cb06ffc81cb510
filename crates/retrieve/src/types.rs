//! Request/response value types for retrieval.

use serde::{Deserialize, Serialize};

use crate::RetrieveError;

/// Which retriever a query runs through.
///
/// `lexical` is the canonical name for the BM25-only strategy; `bm25` is
/// accepted on input as a legacy alias and never emitted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalMode {
    #[serde(alias = "bm25")]
    Lexical,
    Semantic,
    #[default]
    Hybrid,
}

impl RetrievalMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetrievalMode::Lexical => "lexical",
            RetrievalMode::Semantic => "semantic",
            RetrievalMode::Hybrid => "hybrid",
        }
    }
}

impl std::str::FromStr for RetrievalMode {
    type Err = RetrieveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lexical" | "bm25" => Ok(RetrievalMode::Lexical),
            "semantic" => Ok(RetrievalMode::Semantic),
            "hybrid" => Ok(RetrievalMode::Hybrid),
            other => Err(RetrieveError::UnknownStrategy(other.to_string())),
        }
    }
}

impl std::fmt::Display for RetrievalMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-request retrieval knobs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RetrievalParams {
    /// Result budget after fusion; `[1, 30]`.
    #[serde(default = "RetrievalParams::default_top_k")]
    pub top_k: usize,
    /// Semantic weight for hybrid fusion; `[0.0, 1.0]`.
    #[serde(default = "RetrievalParams::default_alpha")]
    pub alpha: f32,
}

impl RetrievalParams {
    pub(crate) fn default_top_k() -> usize {
        10
    }

    pub(crate) fn default_alpha() -> f32 {
        0.5
    }

    pub fn validate(&self) -> Result<(), RetrieveError> {
        if !(1..=30).contains(&self.top_k) {
            return Err(RetrieveError::InvalidParams(format!(
                "top_k must be in [1, 30], got {}",
                self.top_k
            )));
        }
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(RetrieveError::InvalidParams(format!(
                "alpha must be in [0.0, 1.0], got {}",
                self.alpha
            )));
        }
        Ok(())
    }
}

impl Default for RetrievalParams {
    fn default() -> Self {
        Self {
            top_k: Self::default_top_k(),
            alpha: Self::default_alpha(),
        }
    }
}

/// One ranked hit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredChunk {
    pub chunk_id: String,
    pub score: f32,
}

/// What a retriever hands back to the orchestrator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievalOutput {
    /// Ranked hits, best first, already truncated to `top_k`.
    pub hits: Vec<ScoredChunk>,
    /// Chunk ids skipped for vector-dimension mismatch; a non-empty list
    /// means the corpus needs re-embedding.
    pub skipped_chunks: Vec<String>,
    /// Strategy-specific diagnostics (candidate counts, weights).
    pub metadata: serde_json::Value,
}
