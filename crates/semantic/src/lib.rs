//! Embedding capability and dense-vector search.
//!
//! The real embedding model runtime is an external collaborator; this crate
//! defines the [`Embedder`] capability it must satisfy and ships a
//! deterministic [`StubEmbedder`] that makes the whole engine testable (and
//! usable) without any model assets. Vector search is brute-force cosine
//! similarity over whatever vector set the caller streams in.
//!
//! An embedder is initialized at most once and treated as immutable
//! afterwards; swapping embedders invalidates every stored vector, which the
//! engine layer enforces.

mod similarity;
mod stub;

pub use similarity::{cosine_similarity, l2_normalize_in_place, rank_by_cosine, RankedVectors};
pub use stub::{StubEmbedder, StubEmbedderConfig};

use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by the embedding layer.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SemanticError {
    /// `embed` was called before `initialize` completed.
    #[error("embedder '{0}' is not initialized")]
    NotReady(String),
    /// The model produced a vector of the wrong width.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    Dimension { expected: usize, got: usize },
    /// Model load or inference failure.
    #[error("embedding failure: {0}")]
    Inference(String),
}

/// Capability contract for an embedding model.
///
/// Implementations must be deterministic after initialization: the same
/// input text always yields the same vector. `dimensions` is fixed for the
/// lifetime of the embedder and every produced vector has exactly that
/// width. When `normalized` reports true, produced vectors are unit-length
/// within `1e-6`.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Stable identifier, persisted next to the vectors it produced.
    fn id(&self) -> &str;

    /// Width of every vector this embedder emits.
    fn dimensions(&self) -> usize;

    /// Whether produced vectors are L2-normalized.
    fn normalized(&self) -> bool;

    /// True once `initialize` has completed.
    fn is_ready(&self) -> bool;

    /// Load model assets. Idempotent; later calls are no-ops.
    async fn initialize(&self) -> Result<(), SemanticError>;

    /// Embed one text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, SemanticError>;

    /// Embed a batch of texts, preserving order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SemanticError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }
}
