//! Sentence-aware sliding-window chunking.
//!
//! Pages are chunked independently; a window of `chunk_size` characters
//! slides with a step of `chunk_size - overlap`. Each window end is pulled
//! back to the nearest sentence boundary (then paragraph break, then word
//! boundary) found in the last [`BOUNDARY_LOOKBACK`] characters of the
//! window, so chunks rarely cut through a sentence.
//!
//! Offsets are **character offsets** into the producing page's text, half
//! open `[start, end)`. Consecutive chunks on a page may overlap, but the
//! emitted ordinal (and therefore the chunk id) is strictly increasing
//! across the whole document.

use serde::{Deserialize, Serialize};

use crate::SegmentError;

/// How far back from the raw window end the boundary rules search.
pub const BOUNDARY_LOOKBACK: usize = 100;

/// A single extracted page of a document, as produced by a page extractor.
///
/// `number` starts at 1 and is strictly increasing in extractor output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Page {
    pub number: u32,
    pub text: String,
}

impl Page {
    pub fn new(number: u32, text: impl Into<String>) -> Self {
        Self {
            number,
            text: text.into(),
        }
    }
}

/// An addressable slice of a page with a stable identifier.
///
/// Invariants: `start_offset < end_offset <= page character count`, `text`
/// is non-empty after trimming, and ids of chunks from one ingest are
/// strictly ordered by ordinal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// `"{doc_id}-chunk-{ordinal}"`; the ordinal is global across pages.
    pub id: String,
    pub doc_id: String,
    pub page_number: u32,
    /// Window text with surrounding whitespace trimmed.
    pub text: String,
    /// Character offset into the page text, inclusive.
    pub start_offset: usize,
    /// Character offset into the page text, exclusive.
    pub end_offset: usize,
    /// Rough token estimate: `ceil(chars / 4)`.
    pub token_estimate: usize,
}

/// Window geometry for [`chunk_pages`].
///
/// The engine-level configuration layer constrains `chunk_size` to
/// `[100, 1000]` and `overlap_percent` to `[0, 30]`; the chunker itself only
/// requires a non-zero window so tests can drive it with tiny windows.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Window size in characters.
    pub chunk_size: usize,
    /// Overlap between consecutive windows, as a percentage of `chunk_size`.
    pub overlap_percent: u8,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 400,
            overlap_percent: 12,
        }
    }
}

impl ChunkingConfig {
    /// Overlap in characters, rounded down.
    pub fn overlap_chars(&self) -> usize {
        self.chunk_size * usize::from(self.overlap_percent) / 100
    }

    fn validate(&self) -> Result<(), SegmentError> {
        if self.chunk_size == 0 {
            return Err(SegmentError::InvalidConfig(
                "chunk_size must be non-zero".into(),
            ));
        }
        if self.overlap_percent > 99 {
            return Err(SegmentError::InvalidConfig(
                "overlap_percent must leave a forward step".into(),
            ));
        }
        Ok(())
    }
}

/// Chunk every page of a document with a global ordinal counter.
///
/// Empty pages (or pages that trim to nothing) contribute no chunks; an
/// empty `pages` slice yields an empty result rather than an error.
pub fn chunk_pages(
    doc_id: &str,
    pages: &[Page],
    config: &ChunkingConfig,
) -> Result<Vec<Chunk>, SegmentError> {
    config.validate()?;

    let mut chunks = Vec::new();
    let mut ordinal = 0usize;
    for page in pages {
        chunk_page(doc_id, page, config, &mut ordinal, &mut chunks);
    }

    tracing::debug!(
        doc_id,
        pages = pages.len(),
        chunks = chunks.len(),
        "chunked document"
    );
    Ok(chunks)
}

fn chunk_page(
    doc_id: &str,
    page: &Page,
    config: &ChunkingConfig,
    ordinal: &mut usize,
    out: &mut Vec<Chunk>,
) {
    let chars: Vec<char> = page.text.chars().collect();
    let len = chars.len();
    let overlap = config.overlap_chars();

    let mut pos = 0usize;
    while pos < len {
        let hard_end = pos + config.chunk_size;
        // The final, possibly short window always runs to the page end; only
        // full interior windows get boundary adjustment.
        let cut = if hard_end >= len {
            len
        } else {
            boundary_cut(&chars, pos, hard_end)
        };

        let text: String = chars[pos..cut].iter().collect();
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            let char_count = trimmed.chars().count();
            out.push(Chunk {
                id: format!("{doc_id}-chunk-{ordinal}"),
                doc_id: doc_id.to_string(),
                page_number: page.number,
                text: trimmed.to_string(),
                start_offset: pos,
                end_offset: cut,
                token_estimate: char_count.div_ceil(4),
            });
            *ordinal += 1;
        }

        if cut >= len {
            break;
        }
        let next = cut.saturating_sub(overlap);
        pos = if next > pos { next } else { cut };
    }
}

/// Pull the window end back to the best boundary in the lookback region.
///
/// Rules fire in order: sentence punctuation followed by whitespace, then a
/// paragraph break, then any whitespace, then the raw window end.
fn boundary_cut(chars: &[char], pos: usize, window_end: usize) -> usize {
    let search_start = window_end.saturating_sub(BOUNDARY_LOOKBACK).max(pos);

    // Rule 1: last sentence end (".", "!", "?" followed by whitespace).
    for i in (search_start..window_end.saturating_sub(1)).rev() {
        if is_sentence_punct(chars[i]) && chars[i + 1].is_whitespace() {
            return i + 1;
        }
    }

    // Rule 2: last paragraph break.
    for i in (search_start..window_end.saturating_sub(1)).rev() {
        if chars[i] == '\n' && chars[i + 1] == '\n' {
            return i + 2;
        }
    }

    // Rule 3: last whitespace.
    for i in (search_start..window_end).rev() {
        if chars[i].is_whitespace() {
            return i + 1;
        }
    }

    // Rule 4: raw window end.
    window_end
}

fn is_sentence_punct(ch: char) -> bool {
    matches!(ch, '.' | '!' | '?')
}
