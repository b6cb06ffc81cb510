//! Document ingestion for the satchel retrieval engine.
//!
//! The crate owns the persisted [`Document`] model, validation of raw
//! [`IngestInput`]s, and the [`PageExtractor`] seam through which page text
//! enters the pipeline. Extraction of real PDF page text is an external
//! collaborator; the built-in [`PlainTextExtractor`] covers `txt` and `md`
//! and honors the extractor contract of returning an empty page sequence
//! for anything it cannot read.

mod document;
mod extract;
mod input;

pub use document::{mint_doc_id, DocKind, DocStatus, Document};
pub use extract::{check_page_contract, PageExtractor, PlainTextExtractor};
pub use input::IngestInput;

use thiserror::Error;

/// Errors produced while validating or extracting an ingest input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IngestError {
    /// The payload had zero bytes.
    #[error("empty payload for '{0}'")]
    EmptyPayload(String),
    /// A `txt`/`md` payload was not valid UTF-8.
    #[error("payload for '{0}' is not valid UTF-8")]
    InvalidUtf8(String),
    /// The file kind is not one the engine accepts.
    #[error("unsupported document kind: {0}")]
    UnsupportedKind(String),
    /// An extractor broke its contract (page numbering, ordering).
    #[error("extractor contract violation: {0}")]
    ExtractorContract(String),
}
