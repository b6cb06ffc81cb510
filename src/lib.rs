//! satchel: local retrieval-augmented question answering.
//!
//! Everything happens on the user's device: documents are ingested into an
//! embedded [redb](https://docs.rs/redb) object store, indexed twice (a BM25
//! lexical snapshot and a dense vector cache), and queried through pluggable
//! retrieval strategies with an extractive, citation-carrying answer
//! composer on top. No document content ever leaves the process.
//!
//! The layer crates do the heavy lifting and this umbrella crate wires them
//! into an [`Engine`]:
//!
//! - `corpus-segment`: tokenization and sentence-aware chunking;
//! - `corpus-ingest`: the document model and page-extraction seam;
//! - `corpus-lexical`: the BM25 snapshot and scorer;
//! - `corpus-semantic`: the embedder capability and cosine ranking;
//! - `corpus-store`: the persisted collections;
//! - `corpus-retrieve`: strategies, normalization, fusion, registries.
//!
//! ## Quick start
//!
//! ```no_run
//! use satchel::{Engine, IngestOptions, QueryRequest};
//! use ingest::{DocKind, IngestInput};
//!
//! # async fn demo() -> Result<(), satchel::EngineError> {
//! let engine = Engine::builder().in_memory()?.build()?;
//!
//! let input = IngestInput::new("notes.txt", DocKind::Txt, b"Rust is nice.".to_vec());
//! engine.ingest(input, IngestOptions::default()).await?;
//!
//! let result = engine
//!     .query(QueryRequest::new("what is nice?"))
//!     .await?;
//! for citation in &result.citations {
//!     println!("{} p.{}: {}", citation.doc_name, citation.page_number, citation.text);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Observability
//!
//! The engine keeps a bounded, in-memory event log of every query's stages
//! ([`EventLog`]) and a ring buffer of recent query latencies
//! ([`LatencyTracker`]); both are owned by the engine value, so there is no
//! process-global state. `tracing` carries the diagnostic logging.

mod compose;
mod config;
mod engine;
mod error;
mod events;
mod latency;
mod notes;
mod sample;
mod strategy;

pub use compose::{compose_extractive, GeneratedAnswer, GenerationConfig, EXTRACTIVE_MODEL_ID};
pub use config::{
    ChunkingSelection, ConfigError, Preset, RagConfig, RetrievalSelection, CONFIG_VERSION,
};
pub use engine::{
    CancelFlag, ChatMode, Citation, CorpusStats, Engine, EngineBuilder, IngestOptions,
    LatencyBreakdown, QueryRequest, QueryResult,
};
pub use error::EngineError;
pub use events::{Event, EventLog, EventType, EVENT_LOG_CAPACITY};
pub use latency::{LatencySummary, LatencyTracker, LATENCY_WINDOW};
pub use notes::{Flashcard, Note, QuizQuestion, StudyKit};
pub use sample::{maybe_seed_samples, SAMPLE_SEEDED_FLAG};
pub use strategy::{
    ChunkingStrategy, ExtractiveGenerator, Generator, PostProcessor, SlidingWindowChunker,
    TidyPolish,
};

// Re-export the layer APIs the way applications consume them.
pub use ingest::{DocKind, DocStatus, Document, IngestInput, PageExtractor, PlainTextExtractor};
pub use lexical::LexicalSnapshot;
pub use retrieve::{Registry, RetrievalMode, RetrievalParams, Retriever};
pub use segment::{chunk_pages, tokenize, Chunk, ChunkingConfig, Page};
pub use semantic::{Embedder, StubEmbedder, StubEmbedderConfig};
pub use store::{ObjectStore, VectorRecord};
