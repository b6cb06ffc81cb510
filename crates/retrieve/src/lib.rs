//! Retrieval strategies over the dual index.
//!
//! Three built-in [`Retriever`]s cover the engine's query modes: `lexical`
//! (BM25 only, no embeddings required), `semantic` (cosine over stored
//! vectors), and `hybrid` (both rankers min–max normalized and convex
//! combined). Strategies are synchronous and pure: the orchestrator loads
//! chunks, the lexical snapshot, stored vectors, and the query embedding up
//! front and hands them in through [`RetrieverContext`], so nothing in this
//! crate suspends or touches storage.
//!
//! The [`Registry`] is the generic id-keyed strategy table used for
//! retrievers here and for the other capability sets (chunking, embedding,
//! generation, post-processing) at the engine layer.

mod fusion;
mod registry;
mod retriever;
mod types;

pub use fusion::{fuse, min_max_normalize, FusedHit};
pub use registry::Registry;
pub use retriever::{
    HybridRetriever, LexicalRetriever, Retriever, RetrieverContext, SemanticRetriever,
};
pub use types::{RetrievalMode, RetrievalOutput, RetrievalParams, ScoredChunk};

use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by the retrieval layer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RetrieveError {
    /// No strategy is registered under the requested id.
    #[error("unknown retrieval strategy: {0}")]
    UnknownStrategy(String),
    /// Per-request parameters are out of range.
    #[error("invalid retrieval params: {0}")]
    InvalidParams(String),
    /// The strategy needs the lexical snapshot but none was provided.
    #[error("lexical index not available")]
    MissingLexicalIndex,
    /// The strategy needs embeddings but no query vector / vector set was
    /// provided.
    #[error("embeddings not available")]
    MissingEmbeddings,
}

/// Registry preloaded with the three built-in retrievers.
pub fn builtin_retrievers() -> Registry<dyn Retriever> {
    let mut registry: Registry<dyn Retriever> = Registry::new();
    registry.register(LexicalRetriever::ID, Arc::new(LexicalRetriever) as Arc<dyn Retriever>);
    registry.register(SemanticRetriever::ID, Arc::new(SemanticRetriever) as Arc<dyn Retriever>);
    registry.register(HybridRetriever::ID, Arc::new(HybridRetriever) as Arc<dyn Retriever>);
    registry
}
