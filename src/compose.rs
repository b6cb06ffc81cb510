//! Extractive answer composition.
//!
//! The default generation strategy when no external rewriter is configured:
//! pull the leading substantial sentences out of the top retrieved chunks
//! and stitch them into a short answer. Strictly extractive: every token of
//! the answer comes from the input chunks (plus joining punctuation).

use segment::Chunk;
use serde::{Deserialize, Serialize};

/// Model id reported in [`GeneratedAnswer::model_id`] for composed answers.
pub const EXTRACTIVE_MODEL_ID: &str = "simple-extractive";

/// How many chunks the composer reads.
const CHUNKS_USED: usize = 3;
/// Sentences shorter than this (trimmed) are treated as noise.
const MIN_SENTENCE_CHARS: usize = 20;
/// Sentences kept per chunk.
const SENTENCES_PER_CHUNK: usize = 2;

/// Knobs for answer generation strategies.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerationConfig {
    /// Rough answer budget; the composer trims to `max_tokens * 4` chars.
    pub max_tokens: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self { max_tokens: 256 }
    }
}

/// An answer plus the metadata the event log and callers report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeneratedAnswer {
    pub answer: String,
    pub model_id: String,
    pub chunks_used: usize,
    pub context_length: usize,
}

/// Compose an extractive answer from the top retrieved chunks.
///
/// The question is advisory only; extraction does not consult it. From each
/// of the first three chunks, sentences longer than 20 characters are kept
/// (at most two per chunk), joined with `". "`, trimmed to roughly
/// `max_tokens * 4` characters, and closed with a period.
pub fn compose_extractive(
    _question: &str,
    chunks: &[Chunk],
    config: &GenerationConfig,
) -> GeneratedAnswer {
    let used = &chunks[..chunks.len().min(CHUNKS_USED)];

    let mut sentences: Vec<&str> = Vec::new();
    for chunk in used {
        let mut kept = 0;
        for sentence in chunk.text.split(['.', '!', '?']) {
            let trimmed = sentence.trim();
            if trimmed.chars().count() > MIN_SENTENCE_CHARS {
                sentences.push(trimmed);
                kept += 1;
                if kept == SENTENCES_PER_CHUNK {
                    break;
                }
            }
        }
    }

    let mut answer = sentences.join(". ");
    let char_budget = config.max_tokens * 4;
    if answer.chars().count() > char_budget {
        answer = answer.chars().take(char_budget).collect::<String>();
        answer.truncate(answer.trim_end().len());
    }
    if !answer.is_empty() && !answer.ends_with('.') {
        answer.push('.');
    }

    GeneratedAnswer {
        answer,
        model_id: EXTRACTIVE_MODEL_ID.to_string(),
        chunks_used: used.len(),
        context_length: used.iter().map(|c| c.text.chars().count()).sum(),
    }
}
