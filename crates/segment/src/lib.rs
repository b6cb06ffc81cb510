//! Text segmentation for the satchel retrieval engine.
//!
//! This crate owns the two pure text transforms every other layer builds on:
//!
//! - [`tokenize`]: lowercase, split on non-alphanumerics, drop a fixed
//!   stop-word list. The same function runs at index time and at query time,
//!   which is what keeps lexical scoring coherent across rebuilds.
//! - [`chunk_pages`]: slide a sentence-aware window over extracted pages and
//!   emit [`Chunk`]s with stable identifiers and character offsets into the
//!   producing page.
//!
//! Both transforms are deterministic, allocation-light, and never touch the
//! filesystem or the network. Callers that need persistence or embeddings
//! compose this crate with `corpus-store` and `corpus-semantic`.

mod chunk;
mod token;

pub use chunk::{chunk_pages, Chunk, ChunkingConfig, Page, BOUNDARY_LOOKBACK};
pub use token::{is_stop_word, tokenize, STOP_WORDS};

use thiserror::Error;

/// Errors surfaced by the segmentation layer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SegmentError {
    /// Chunking configuration is out of the accepted range.
    #[error("invalid chunking config: {0}")]
    InvalidConfig(String),
}
