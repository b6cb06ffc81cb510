//! Page extraction seam.
//!
//! The engine consumes page text through [`PageExtractor`]; real PDF text
//! extraction lives behind this trait in an external crate or application.
//! The contract every implementation must honor:
//!
//! - pages come back in document order with `number` starting at 1 and
//!   strictly increasing;
//! - unsupported or corrupt input yields an **empty** page sequence, not an
//!   error; a document with no extractable text is still a document.

use segment::Page;

use crate::{DocKind, IngestError, IngestInput};

/// Turns raw document bytes into ordered page text.
pub trait PageExtractor: Send + Sync {
    /// Short identifier for diagnostics.
    fn id(&self) -> &str;

    /// Kinds this extractor can handle.
    fn supports(&self, kind: DocKind) -> bool;

    /// Extract ordered pages. Must return `Ok(vec![])` for input it cannot
    /// read rather than failing the ingest.
    fn extract(&self, input: &IngestInput) -> Result<Vec<Page>, IngestError>;
}

/// Built-in extractor for `txt` and `md`: the whole payload is one page.
///
/// PDF input is deliberately unsupported here and extracts to nothing; a
/// real PDF extractor is wired in by the embedding application.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextExtractor;

impl PageExtractor for PlainTextExtractor {
    fn id(&self) -> &str {
        "plain-text"
    }

    fn supports(&self, kind: DocKind) -> bool {
        matches!(kind, DocKind::Txt | DocKind::Md)
    }

    fn extract(&self, input: &IngestInput) -> Result<Vec<Page>, IngestError> {
        if !self.supports(input.kind) {
            tracing::warn!(kind = %input.kind, name = %input.name, "no text extraction for kind");
            return Ok(Vec::new());
        }
        let text = match std::str::from_utf8(&input.bytes) {
            Ok(text) => text,
            Err(_) => return Ok(Vec::new()),
        };
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![Page::new(1, text)])
    }
}

/// Validate the extractor contract on a page sequence.
///
/// The orchestrator runs this on every extraction so a misbehaving external
/// extractor fails fast instead of corrupting chunk offsets.
pub fn check_page_contract(pages: &[Page]) -> Result<(), IngestError> {
    let mut previous = 0u32;
    for page in pages {
        if page.number == 0 {
            return Err(IngestError::ExtractorContract(
                "page numbers start at 1".into(),
            ));
        }
        if page.number <= previous {
            return Err(IngestError::ExtractorContract(format!(
                "page numbers must be strictly increasing (saw {} after {})",
                page.number, previous
            )));
        }
        previous = page.number;
    }
    Ok(())
}
