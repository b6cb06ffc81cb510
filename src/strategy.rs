//! Capability interfaces for the pluggable pipeline stages.
//!
//! Chunking, generation, and post-processing are each a small fixed
//! interface realized by built-in strategies plus whatever the embedding
//! application registers at engine construction. Retrieval and embedding
//! capabilities live in their layer crates (`retrieve::Retriever`,
//! `semantic::Embedder`); this module covers the rest and provides the
//! built-ins the default configuration references.

use async_trait::async_trait;
use segment::{chunk_pages, Chunk, ChunkingConfig, Page};

use crate::compose::{compose_extractive, GeneratedAnswer, GenerationConfig};
use crate::error::EngineError;

/// Turns extracted pages into chunks.
pub trait ChunkingStrategy: Send + Sync {
    fn id(&self) -> &str;

    fn chunk(
        &self,
        doc_id: &str,
        pages: &[Page],
        config: &ChunkingConfig,
    ) -> Result<Vec<Chunk>, EngineError>;
}

/// Produces an answer from a question and retrieved chunks.
///
/// External model-backed rewriters implement this; the built-in
/// [`ExtractiveGenerator`] wraps the composer. Implementations must respect
/// the orchestrator's deadline and must not drop citations; citation
/// attachment is owned by the orchestrator.
#[async_trait]
pub trait Generator: Send + Sync {
    fn id(&self) -> &str;

    async fn generate(
        &self,
        question: &str,
        chunks: &[Chunk],
        config: &GenerationConfig,
    ) -> Result<GeneratedAnswer, EngineError>;
}

/// Rewrites an already-generated answer (best effort).
///
/// A failure here never fails the query; the orchestrator falls back to the
/// pre-processing answer.
#[async_trait]
pub trait PostProcessor: Send + Sync {
    fn id(&self) -> &str;

    async fn process(
        &self,
        answer: &str,
        question: &str,
        chunks: &[Chunk],
    ) -> Result<String, EngineError>;
}

/// Built-in chunking strategy: the sentence-aware sliding window.
#[derive(Debug, Default, Clone, Copy)]
pub struct SlidingWindowChunker;

impl SlidingWindowChunker {
    pub const ID: &'static str = "sliding-window";
}

impl ChunkingStrategy for SlidingWindowChunker {
    fn id(&self) -> &str {
        Self::ID
    }

    fn chunk(
        &self,
        doc_id: &str,
        pages: &[Page],
        config: &ChunkingConfig,
    ) -> Result<Vec<Chunk>, EngineError> {
        Ok(chunk_pages(doc_id, pages, config)?)
    }
}

/// Built-in generator: the extractive composer.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExtractiveGenerator;

impl ExtractiveGenerator {
    pub const ID: &'static str = "simple-extractive";
}

#[async_trait]
impl Generator for ExtractiveGenerator {
    fn id(&self) -> &str {
        Self::ID
    }

    async fn generate(
        &self,
        question: &str,
        chunks: &[Chunk],
        config: &GenerationConfig,
    ) -> Result<GeneratedAnswer, EngineError> {
        Ok(compose_extractive(question, chunks, config))
    }
}

/// Built-in `polish` post-processor.
///
/// Deterministic tidy-up only: collapse whitespace runs and make sure the
/// answer closes with terminal punctuation. An external model-backed
/// rewriter can replace it by registering under the same id.
#[derive(Debug, Default, Clone, Copy)]
pub struct TidyPolish;

impl TidyPolish {
    pub const ID: &'static str = "polish";
}

#[async_trait]
impl PostProcessor for TidyPolish {
    fn id(&self) -> &str {
        Self::ID
    }

    async fn process(
        &self,
        answer: &str,
        _question: &str,
        _chunks: &[Chunk],
    ) -> Result<String, EngineError> {
        let mut polished = answer.split_whitespace().collect::<Vec<_>>().join(" ");
        if !polished.is_empty() && !polished.ends_with(['.', '!', '?']) {
            polished.push('.');
        }
        Ok(polished)
    }
}
