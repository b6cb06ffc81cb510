//! BM25 lexical index over chunk text.
//!
//! The index is a single serializable [`LexicalSnapshot`] built over the
//! whole corpus at once: global document frequencies, per-chunk term
//! frequencies, the ordered chunk-id list, and the average chunk length.
//! Scoring is the Okapi BM25 formula with fixed `k1 = 1.5`, `b = 0.75`,
//! evaluated brute-force over every chunk in the snapshot; ties resolve to
//! the earlier chunk in snapshot order.
//!
//! Chunk length is defined as the sum of term frequencies after stop-word
//! removal (not raw token count); `avg_doc_length` uses the same
//! definition, so corpus statistics and per-chunk scoring stay comparable.

mod score;
mod snapshot;

pub use score::{score_all, search, ScoredId, B, K1};
pub use snapshot::{build_snapshot, LexicalSnapshot};

use thiserror::Error;

/// Errors surfaced by the lexical index layer.
#[derive(Debug, Error)]
pub enum LexicalError {
    /// A persisted snapshot blob could not be decoded.
    #[error("corrupt lexical snapshot: {0}")]
    Corrupt(String),
}
