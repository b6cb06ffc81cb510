//! Engine-level error taxonomy.
//!
//! Layer errors converge here via `#[from]`; the four domain variants
//! (`Input`, `Resource`, `Consistency`, `UnknownStrategy`) carry failures the
//! orchestrator classifies itself. `Cancelled` propagates a user abort and is
//! not treated as an error by the event log.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors surfaced by [`crate::Engine`] operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Bad caller input (unsupported file kind, empty content, out-of-range
    /// parameters). Persisted state is untouched.
    #[error("input error: {0}")]
    Input(String),

    /// Transient resource failure (model load, store write) that survived
    /// the retry.
    #[error("resource error: {0}")]
    Resource(String),

    /// Persisted structures disagree (snapshot references a missing chunk).
    /// The engine self-heals by rebuilding and retrying once before this
    /// escapes.
    #[error("consistency error: {0}")]
    Consistency(String),

    /// A config or request referenced a strategy id nothing registered.
    /// Programmer error; never swallowed.
    #[error("unknown strategy id: {0}")]
    UnknownStrategy(String),

    /// The operation observed its cancellation signal.
    #[error("operation cancelled")]
    Cancelled,

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Segment(#[from] segment::SegmentError),

    #[error(transparent)]
    Ingest(#[from] ingest::IngestError),

    #[error(transparent)]
    Lexical(#[from] lexical::LexicalError),

    #[error(transparent)]
    Semantic(#[from] semantic::SemanticError),

    #[error(transparent)]
    Store(#[from] store::StoreError),

    #[error(transparent)]
    Retrieve(#[from] retrieve::RetrieveError),
}

impl EngineError {
    /// Whether a single backed-off retry is worthwhile.
    pub(crate) fn is_transient(&self) -> bool {
        matches!(
            self,
            EngineError::Resource(_)
                | EngineError::Store(store::StoreError::Backend(_))
                | EngineError::Semantic(semantic::SemanticError::Inference(_))
        )
    }
}
