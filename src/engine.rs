//! The pipeline orchestrator.
//!
//! [`Engine`] owns the store, the strategy registries, the event log, and
//! the latency tracker: one value, no process-global state. Ingest and
//! query are async because the embedder (and any external generator) may
//! suspend; everything pure (tokenize, score, normalize, fuse, compose)
//! runs synchronously inside a stage.
//!
//! Stage ordering inside one operation is strict: no stage observes a later
//! stage's state, and the event log records stages in causal order.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::json;

use ingest::{check_page_contract, Document, IngestInput, PageExtractor, PlainTextExtractor};
use lexical::LexicalSnapshot;
use retrieve::{
    builtin_retrievers, Registry, RetrievalMode, RetrievalParams, Retriever, RetrieverContext,
};
use segment::{Chunk, Page};
use semantic::{Embedder, StubEmbedder};
use store::{ObjectStore, VectorRecord};

use crate::compose::{GeneratedAnswer, GenerationConfig};
use crate::config::{RagConfig, CONFIG_META_KEY};
use crate::error::EngineError;
use crate::events::{EventLog, EventType};
use crate::latency::{LatencySummary, LatencyTracker};
use crate::strategy::{
    ChunkingStrategy, ExtractiveGenerator, Generator, PostProcessor, SlidingWindowChunker,
    TidyPolish,
};

/// Metadata flag set when stored vectors no longer match the embedder.
pub const NEEDS_REEMBED_FLAG: &str = "needs_reembed";
const EMBEDDER_META_KEY: &str = "embedder_id";
const RETRY_BACKOFF: Duration = Duration::from_millis(200);

/// Cooperative cancellation signal observed at every suspension point of an
/// ingest. Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Options for [`Engine::ingest`].
#[derive(Default, Clone)]
pub struct IngestOptions {
    pub cancel: Option<CancelFlag>,
    /// Observed with values in `[0.0, 1.0]`; a successful ingest always ends
    /// on `1.0`.
    pub on_progress: Option<Arc<dyn Fn(f32) + Send + Sync>>,
}

/// Whether a query only retrieves or also generates an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
    #[default]
    Search,
    Chat,
}

/// A retrieval request. Unset fields fall back to the engine config.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub text: String,
    /// Overrides the configured retrieval strategy.
    pub mode: Option<RetrievalMode>,
    pub top_k: Option<usize>,
    pub alpha: Option<f32>,
    pub chat_mode: ChatMode,
    /// `Some(true)` forces the polish post-processor on, `Some(false)`
    /// disables all post-processing for this query.
    pub polish: Option<bool>,
}

impl QueryRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            mode: None,
            top_k: None,
            alpha: None,
            chat_mode: ChatMode::Search,
            polish: None,
        }
    }

    pub fn with_mode(mut self, mode: RetrievalMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = Some(alpha);
        self
    }

    pub fn chat(mut self) -> Self {
        self.chat_mode = ChatMode::Chat;
        self
    }

    pub fn with_polish(mut self, polish: bool) -> Self {
        self.polish = Some(polish);
        self
    }
}

/// A retrieved passage joined to its document.
#[derive(Debug, Clone, Serialize, serde::Deserialize, PartialEq)]
pub struct Citation {
    pub chunk_id: String,
    pub doc_id: String,
    pub doc_name: String,
    pub page_number: u32,
    pub text: String,
    pub score: Option<f32>,
}

/// Per-stage latency of one query.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct LatencyBreakdown {
    pub retrieval_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub polish_ms: Option<u64>,
    pub total_ms: u64,
}

/// Everything a query returns. `chunks`, `citations`, and `scores` are
/// parallel, rank-ordered sequences.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub chunks: Vec<Chunk>,
    pub citations: Vec<Citation>,
    pub scores: Vec<f32>,
    pub latency: LatencyBreakdown,
    pub generated_answer: Option<GeneratedAnswer>,
}

/// Corpus and performance overview for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct CorpusStats {
    pub docs: usize,
    pub chunks: usize,
    pub vectors: usize,
    pub lexical_fresh: bool,
    pub latency: LatencySummary,
}

/// Builder for [`Engine`]. Built-in strategies register first; custom
/// registrations replace them when ids collide.
pub struct EngineBuilder {
    store: Option<ObjectStore>,
    config: RagConfig,
    extractor: Arc<dyn PageExtractor>,
    chunkers: Vec<(String, Arc<dyn ChunkingStrategy>)>,
    embedders: Vec<(String, Arc<dyn Embedder>)>,
    retrievers: Vec<(String, Arc<dyn Retriever>)>,
    generators: Vec<(String, Arc<dyn Generator>)>,
    post_processors: Vec<(String, Arc<dyn PostProcessor>)>,
}

impl EngineBuilder {
    fn new() -> Self {
        Self {
            store: None,
            config: RagConfig::default(),
            extractor: Arc::new(PlainTextExtractor),
            chunkers: Vec::new(),
            embedders: Vec::new(),
            retrievers: Vec::new(),
            generators: Vec::new(),
            post_processors: Vec::new(),
        }
    }

    /// Use a store backed by a database file.
    pub fn open(mut self, path: impl AsRef<std::path::Path>) -> Result<Self, EngineError> {
        self.store = Some(ObjectStore::open(path)?);
        Ok(self)
    }

    /// Use an in-memory store.
    pub fn in_memory(mut self) -> Result<Self, EngineError> {
        self.store = Some(ObjectStore::in_memory()?);
        Ok(self)
    }

    pub fn store(mut self, store: ObjectStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = config;
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn PageExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn register_chunker(mut self, id: &str, chunker: Arc<dyn ChunkingStrategy>) -> Self {
        self.chunkers.push((id.to_string(), chunker));
        self
    }

    pub fn register_embedder(mut self, id: &str, embedder: Arc<dyn Embedder>) -> Self {
        self.embedders.push((id.to_string(), embedder));
        self
    }

    pub fn register_retriever(mut self, id: &str, retriever: Arc<dyn Retriever>) -> Self {
        self.retrievers.push((id.to_string(), retriever));
        self
    }

    pub fn register_generator(mut self, id: &str, generator: Arc<dyn Generator>) -> Self {
        self.generators.push((id.to_string(), generator));
        self
    }

    pub fn register_post_processor(
        mut self,
        id: &str,
        processor: Arc<dyn PostProcessor>,
    ) -> Self {
        self.post_processors.push((id.to_string(), processor));
        self
    }

    /// Wire registries, validate the config against them, and resolve the
    /// active embedder. An embedder different from the one the stored
    /// vectors were produced with invalidates the vector collection.
    pub fn build(self) -> Result<Engine, EngineError> {
        let store = self
            .store
            .ok_or_else(|| EngineError::Input("engine requires a store".into()))?;
        self.config.validate_bounds()?;

        let mut chunkers: Registry<dyn ChunkingStrategy> = Registry::new();
        chunkers.register(SlidingWindowChunker::ID, Arc::new(SlidingWindowChunker));
        for (id, chunker) in self.chunkers {
            chunkers.register(id, chunker);
        }

        let mut embedders: Registry<dyn Embedder> = Registry::new();
        let stub = StubEmbedder::default();
        embedders.register(stub.id().to_string(), Arc::new(stub));
        for (id, embedder) in self.embedders {
            embedders.register(id, embedder);
        }

        let mut retrievers = builtin_retrievers();
        for (id, retriever) in self.retrievers {
            retrievers.register(id, retriever);
        }

        let mut generators: Registry<dyn Generator> = Registry::new();
        generators.register(ExtractiveGenerator::ID, Arc::new(ExtractiveGenerator));
        for (id, generator) in self.generators {
            generators.register(id, generator);
        }

        let mut post_processors: Registry<dyn PostProcessor> = Registry::new();
        post_processors.register(TidyPolish::ID, Arc::new(TidyPolish));
        for (id, processor) in self.post_processors {
            post_processors.register(id, processor);
        }

        validate_strategy_ids(
            &self.config,
            &chunkers,
            &embedders,
            &retrievers,
            &generators,
            &post_processors,
        )?;

        let active_embedder = embedders
            .get(&self.config.embedding)
            .expect("validated above");

        // Embedder identity check against whatever produced the stored
        // vectors; a swap invalidates them.
        match store.get_meta(EMBEDDER_META_KEY)? {
            Some(previous) if previous != active_embedder.id() => {
                tracing::warn!(
                    from = %previous,
                    to = active_embedder.id(),
                    "embedder changed; invalidating stored vectors"
                );
                store.clear_vectors()?;
                store.set_meta(NEEDS_REEMBED_FLAG, "true")?;
                store.set_meta(EMBEDDER_META_KEY, active_embedder.id())?;
            }
            Some(_) => {}
            None => store.set_meta(EMBEDDER_META_KEY, active_embedder.id())?,
        }

        Ok(Engine {
            store,
            config: Mutex::new(self.config),
            extractor: self.extractor,
            chunkers,
            embedders,
            retrievers,
            generators,
            post_processors,
            active_embedder: Mutex::new(active_embedder),
            events: EventLog::new(),
            latency: LatencyTracker::new(),
            snapshot_cache: Mutex::new(None),
            query_counter: AtomicU64::new(0),
        })
    }
}

fn validate_strategy_ids(
    config: &RagConfig,
    chunkers: &Registry<dyn ChunkingStrategy>,
    embedders: &Registry<dyn Embedder>,
    retrievers: &Registry<dyn Retriever>,
    generators: &Registry<dyn Generator>,
    post_processors: &Registry<dyn PostProcessor>,
) -> Result<(), EngineError> {
    let ids = config.referenced_ids();
    if !chunkers.contains(ids.chunking) {
        return Err(EngineError::UnknownStrategy(ids.chunking.to_string()));
    }
    if !embedders.contains(ids.embedding) {
        return Err(EngineError::UnknownStrategy(ids.embedding.to_string()));
    }
    if !retrievers.contains(ids.retrieval) {
        return Err(EngineError::UnknownStrategy(ids.retrieval.to_string()));
    }
    if !generators.contains(ids.generation) {
        return Err(EngineError::UnknownStrategy(ids.generation.to_string()));
    }
    for id in ids.post_process {
        if !post_processors.contains(id) {
            return Err(EngineError::UnknownStrategy(id.to_string()));
        }
    }
    Ok(())
}

/// The retrieval engine. See the crate docs for the pipeline overview.
pub struct Engine {
    store: ObjectStore,
    config: Mutex<RagConfig>,
    extractor: Arc<dyn PageExtractor>,
    chunkers: Registry<dyn ChunkingStrategy>,
    embedders: Registry<dyn Embedder>,
    retrievers: Registry<dyn Retriever>,
    generators: Registry<dyn Generator>,
    post_processors: Registry<dyn PostProcessor>,
    active_embedder: Mutex<Arc<dyn Embedder>>,
    events: EventLog,
    latency: LatencyTracker,
    snapshot_cache: Mutex<Option<Arc<LexicalSnapshot>>>,
    query_counter: AtomicU64,
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    pub fn store(&self) -> &ObjectStore {
        &self.store
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn latency(&self) -> &LatencyTracker {
        &self.latency
    }

    /// Snapshot of the live configuration.
    pub fn config(&self) -> RagConfig {
        self.lock_config().clone()
    }

    fn lock_config(&self) -> MutexGuard<'_, RagConfig> {
        self.config.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn embedder(&self) -> Arc<dyn Embedder> {
        self.active_embedder
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    /// Replace the live configuration. Changing the embedding strategy
    /// invalidates every stored vector.
    pub fn set_config(&self, config: RagConfig) -> Result<(), EngineError> {
        config.validate_bounds()?;
        validate_strategy_ids(
            &config,
            &self.chunkers,
            &self.embedders,
            &self.retrievers,
            &self.generators,
            &self.post_processors,
        )?;

        let next_embedder = self
            .embedders
            .get(&config.embedding)
            .expect("validated above");
        {
            let mut active = self
                .active_embedder
                .lock()
                .unwrap_or_else(|p| p.into_inner());
            if active.id() != next_embedder.id() {
                tracing::warn!(
                    from = active.id(),
                    to = next_embedder.id(),
                    "embedder changed; invalidating stored vectors"
                );
                self.store.clear_vectors()?;
                self.store.set_meta(NEEDS_REEMBED_FLAG, "true")?;
                self.store.set_meta(EMBEDDER_META_KEY, next_embedder.id())?;
                *active = next_embedder;
            }
        }
        *self.lock_config() = config;
        Ok(())
    }

    /// Apply a named preset.
    pub fn apply_preset(&self, preset: crate::config::Preset) -> Result<(), EngineError> {
        self.set_config(preset.config())
    }

    /// Persist the live configuration into the store's metadata.
    pub fn persist_config(&self) -> Result<(), EngineError> {
        let exported = self.config().export();
        self.store.set_meta(CONFIG_META_KEY, &exported)?;
        Ok(())
    }

    /// Load a previously persisted configuration. A missing, unreadable, or
    /// version-mismatched record is discarded and the current (default)
    /// configuration is kept.
    pub fn load_persisted_config(&self) -> Result<RagConfig, EngineError> {
        match self.store.get_meta(CONFIG_META_KEY)? {
            Some(stored) => match RagConfig::import(&stored) {
                Ok(config) => {
                    self.set_config(config.clone())?;
                    Ok(config)
                }
                Err(err) => {
                    tracing::warn!(error = %err, "discarding stale persisted config");
                    self.store.delete_meta(CONFIG_META_KEY)?;
                    Ok(self.config())
                }
            },
            None => Ok(self.config()),
        }
    }

    // ── ingest ─────────────────────────────────────────────────────────

    /// Ingest one document end-to-end: extract pages, persist the document
    /// (and blob for PDF), chunk, embed, and rebuild the lexical snapshot
    /// over the whole corpus.
    ///
    /// Cancellation leaves already-committed writes in place and returns
    /// [`EngineError::Cancelled`]; re-ingesting the same file later mints a
    /// fresh document id and starts over.
    pub async fn ingest(
        &self,
        input: IngestInput,
        options: IngestOptions,
    ) -> Result<Document, EngineError> {
        input.validate()?;
        check_cancel(&options)?;

        let pages = self.extractor.extract(&input)?;
        check_page_contract(&pages)?;
        report_progress(&options, 0.1);

        let mut doc = Document::new(input.name.clone(), input.kind, input.bytes.len() as u64);
        doc.status.parsed = true;
        self.store_write_with_retry(|| self.store.put_doc(&doc))
            .await?;
        if input.kind.keeps_blob() {
            self.store_write_with_retry(|| self.store.put_blob(&doc.id, &input.bytes))
                .await?;
        }
        report_progress(&options, 0.25);
        check_cancel(&options)?;

        match self.ingest_stages(&mut doc, &pages, &options).await {
            Ok(()) => {
                report_progress(&options, 1.0);
                tracing::info!(doc_id = %doc.id, name = %doc.name, "ingest complete");
                Ok(doc)
            }
            Err(EngineError::Cancelled) => Err(EngineError::Cancelled),
            Err(err) => {
                doc.status.error = Some(err.to_string());
                if let Err(status_err) = self.store.put_doc(&doc) {
                    tracing::warn!(error = %status_err, "failed to record error status");
                }
                Err(err)
            }
        }
    }

    async fn ingest_stages(
        &self,
        doc: &mut Document,
        pages: &[Page],
        options: &IngestOptions,
    ) -> Result<(), EngineError> {
        let config = self.config();

        let chunker = self
            .chunkers
            .get(&config.chunking.strategy)
            .ok_or_else(|| EngineError::UnknownStrategy(config.chunking.strategy.clone()))?;
        let chunks = chunker.chunk(&doc.id, pages, &config.chunking.window())?;
        self.store_write_with_retry(|| self.store.put_chunks(&chunks))
            .await?;
        report_progress(options, 0.45);
        check_cancel(options)?;

        if !chunks.is_empty() {
            let embedder = self.embedder();
            self.ensure_embedder_ready(&embedder, config.model_init_timeout_secs)
                .await?;

            // Restartable: chunks that already carry a vector are skipped.
            let mut pending: Vec<&Chunk> = Vec::new();
            for chunk in &chunks {
                if !self.store.has_vector(&chunk.id)? {
                    pending.push(chunk);
                }
            }
            if !pending.is_empty() {
                let texts: Vec<String> = pending.iter().map(|c| c.text.clone()).collect();
                let vectors = self.embed_batch_with_retry(&embedder, &texts).await?;
                let mut records = Vec::with_capacity(pending.len());
                for (chunk, embedding) in pending.iter().zip(vectors) {
                    if embedding.len() != embedder.dimensions() {
                        return Err(semantic::SemanticError::Dimension {
                            expected: embedder.dimensions(),
                            got: embedding.len(),
                        }
                        .into());
                    }
                    records.push(VectorRecord {
                        chunk_id: chunk.id.clone(),
                        embedding,
                    });
                }
                self.store_write_with_retry(|| self.store.put_vectors(&records))
                    .await?;
            }
        }
        doc.status.indexed_vector = true;
        self.store_write_with_retry(|| self.store.put_doc(doc))
            .await?;
        report_progress(options, 0.75);
        check_cancel(options)?;

        // Whole-corpus rebuild keeps the snapshot exactly equal to the
        // persisted chunk set; it also flips indexed_lexical on every doc.
        self.rebuild_lexical()?;
        if let Some(fresh) = self.store.get_doc(&doc.id)? {
            *doc = fresh;
        }
        Ok(())
    }

    // ── query ──────────────────────────────────────────────────────────

    /// Run a retrieval (and, in chat mode, generation) query.
    ///
    /// Consistency failures (a ranked chunk missing from the store) trigger
    /// one snapshot rebuild and retry before surfacing. Generation and
    /// post-processing are best-effort: their failures are logged and the
    /// retrieval result still comes back.
    pub async fn query(&self, request: QueryRequest) -> Result<QueryResult, EngineError> {
        if request.text.trim().is_empty() {
            return Err(EngineError::Input("query text must not be empty".into()));
        }
        let total_start = Instant::now();
        let query_id = self.query_counter.fetch_add(1, Ordering::Relaxed);
        self.events.append(
            EventType::QueryStart,
            json!({
                "query_id": query_id,
                "text": request.text,
                "mode": request.mode.map(|m| m.as_str()),
                "chat": request.chat_mode == ChatMode::Chat,
            }),
            None,
        );

        let mut outcome = self.query_once(&request, query_id).await;
        if matches!(outcome, Err(EngineError::Consistency(_))) {
            if let Err(err) = &outcome {
                tracing::warn!(error = %err, "consistency failure; rebuilding and retrying");
            }
            self.rebuild_lexical()?;
            outcome = self.query_once(&request, query_id).await;
        }

        match outcome {
            Ok(mut result) => {
                let total = total_start.elapsed();
                result.latency.total_ms = total.as_millis() as u64;
                self.latency.record(total);
                self.events.append(
                    EventType::QueryComplete,
                    json!({"query_id": query_id, "citations": result.citations.len()}),
                    Some(total),
                );
                Ok(result)
            }
            Err(err) => {
                if !matches!(err, EngineError::Cancelled) {
                    self.events.append(
                        EventType::Error,
                        json!({"query_id": query_id, "error": err.to_string()}),
                        None,
                    );
                }
                Err(err)
            }
        }
    }

    async fn query_once(
        &self,
        request: &QueryRequest,
        query_id: u64,
    ) -> Result<QueryResult, EngineError> {
        let config = self.config();

        let retriever_id = request
            .mode
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| config.retrieval.strategy.clone());
        let retriever = self
            .retrievers
            .get(&retriever_id)
            .ok_or_else(|| EngineError::UnknownStrategy(retriever_id.clone()))?;
        let params = RetrievalParams {
            top_k: request.top_k.unwrap_or(config.retrieval.top_k),
            alpha: request.alpha.unwrap_or(config.retrieval.alpha),
        };
        params.validate().map_err(EngineError::from)?;

        let chunks = self.store.all_chunks()?;
        if chunks.is_empty() {
            return Ok(QueryResult::default());
        }

        let snapshot = self.snapshot_or_rebuild()?;

        let retrieval_start = Instant::now();
        let (query_vector, stored_vectors) = if retriever.requires_embeddings() {
            let embedder = self.embedder();
            self.ensure_embedder_ready(&embedder, config.model_init_timeout_secs)
                .await?;
            let query_vector = self.embed_with_retry(&embedder, &request.text).await?;
            let stored: Vec<(String, Vec<f32>)> = self
                .store
                .all_vectors()?
                .into_iter()
                .map(|r| (r.chunk_id, r.embedding))
                .collect();
            (Some(query_vector), Some(stored))
        } else {
            (None, None)
        };

        let ctx = RetrieverContext {
            query: &request.text,
            chunks: &chunks,
            snapshot: Some(snapshot.as_ref()),
            query_vector: query_vector.as_deref(),
            vectors: stored_vectors.as_deref(),
        };
        let output = retriever.retrieve(&ctx, &params)?;
        let retrieval_elapsed = retrieval_start.elapsed();
        self.events.append(
            EventType::RetrievalComplete,
            json!({
                "query_id": query_id,
                "retriever": retriever_id,
                "hits": output.hits.len(),
                "detail": output.metadata,
            }),
            Some(retrieval_elapsed),
        );

        if !output.skipped_chunks.is_empty() {
            tracing::warn!(
                skipped = output.skipped_chunks.len(),
                "stored vectors skipped for dimension mismatch; marking corpus for re-embed"
            );
            self.store.set_meta(NEEDS_REEMBED_FLAG, "true")?;
        }

        // Join ranked hits to chunks and documents, preserving rank.
        let chunk_map: HashMap<&str, &Chunk> =
            chunks.iter().map(|c| (c.id.as_str(), c)).collect();
        let docs: HashMap<String, Document> = self
            .store
            .list_docs()?
            .into_iter()
            .map(|d| (d.id.clone(), d))
            .collect();

        let mut result_chunks = Vec::with_capacity(output.hits.len());
        let mut citations = Vec::with_capacity(output.hits.len());
        let mut scores = Vec::with_capacity(output.hits.len());
        for hit in &output.hits {
            let chunk = chunk_map.get(hit.chunk_id.as_str()).ok_or_else(|| {
                EngineError::Consistency(format!(
                    "ranking references missing chunk {}",
                    hit.chunk_id
                ))
            })?;
            let doc = docs.get(&chunk.doc_id).ok_or_else(|| {
                EngineError::Consistency(format!(
                    "chunk {} references missing doc {}",
                    chunk.id, chunk.doc_id
                ))
            })?;
            citations.push(Citation {
                chunk_id: chunk.id.clone(),
                doc_id: doc.id.clone(),
                doc_name: doc.name.clone(),
                page_number: chunk.page_number,
                text: chunk.text.clone(),
                score: Some(hit.score),
            });
            result_chunks.push((*chunk).clone());
            scores.push(hit.score);
        }
        self.events.append(
            EventType::ContextBuilt,
            json!({"query_id": query_id, "chunks": result_chunks.len()}),
            None,
        );

        // Generation (chat mode only, best effort).
        let mut generated: Option<GeneratedAnswer> = None;
        let mut generation_ms = None;
        if request.chat_mode == ChatMode::Chat && !citations.is_empty() {
            let generator = self
                .generators
                .get(&config.generation)
                .ok_or_else(|| EngineError::UnknownStrategy(config.generation.clone()))?;
            let top_chunks: Vec<Chunk> = result_chunks.iter().take(5).cloned().collect();
            let generation_start = Instant::now();
            match generator
                .generate(&request.text, &top_chunks, &GenerationConfig::default())
                .await
            {
                Ok(answer) => {
                    let elapsed = generation_start.elapsed();
                    generation_ms = Some(elapsed.as_millis() as u64);
                    self.events.append(
                        EventType::GenerationComplete,
                        json!({
                            "query_id": query_id,
                            "model_id": answer.model_id,
                            "chunks_used": answer.chunks_used,
                        }),
                        Some(elapsed),
                    );
                    generated = Some(answer);
                }
                Err(err) => {
                    tracing::warn!(error = %err, "generation failed; returning retrieval result");
                    self.events.append(
                        EventType::GenerationError,
                        json!({"query_id": query_id, "error": err.to_string()}),
                        None,
                    );
                }
            }
        }

        // Post-processing (best effort, short-circuits on first failure).
        let mut polish_ms = None;
        if let Some(answer) = generated.as_mut() {
            let enabled = enabled_post_processors(&config.post_process, request.polish);
            for id in &enabled {
                let processor = self
                    .post_processors
                    .get(id)
                    .ok_or_else(|| EngineError::UnknownStrategy(id.clone()))?;
                let polish_start = Instant::now();
                match processor
                    .process(&answer.answer, &request.text, &result_chunks)
                    .await
                {
                    Ok(next) => {
                        let elapsed = polish_start.elapsed();
                        polish_ms = Some(polish_ms.unwrap_or(0) + elapsed.as_millis() as u64);
                        self.events.append(
                            EventType::PolishComplete,
                            json!({"query_id": query_id, "processor": id}),
                            Some(elapsed),
                        );
                        answer.answer = next;
                    }
                    Err(err) => {
                        tracing::warn!(
                            processor = %id,
                            error = %err,
                            "post-processor failed; keeping prior answer"
                        );
                        self.events.append(
                            EventType::PolishError,
                            json!({"query_id": query_id, "processor": id, "error": err.to_string()}),
                            None,
                        );
                        break;
                    }
                }
            }
        }

        Ok(QueryResult {
            chunks: result_chunks,
            citations,
            scores,
            latency: LatencyBreakdown {
                retrieval_ms: retrieval_elapsed.as_millis() as u64,
                generation_ms,
                polish_ms,
                total_ms: 0,
            },
            generated_answer: generated,
        })
    }

    // ── lifecycle ──────────────────────────────────────────────────────

    /// Delete a document plus all derived state and rebuild the snapshot.
    pub fn delete_document(&self, doc_id: &str) -> Result<bool, EngineError> {
        let existed = self.store.delete_doc_cascade(doc_id)?;
        if existed {
            self.rebuild_lexical()?;
        }
        Ok(existed)
    }

    /// Wipe the corpus entirely.
    pub fn reset(&self) -> Result<(), EngineError> {
        self.store.reset()?;
        *self
            .snapshot_cache
            .lock()
            .unwrap_or_else(|p| p.into_inner()) = None;
        self.store
            .set_meta(EMBEDDER_META_KEY, self.embedder().id())?;
        Ok(())
    }

    /// Corpus and latency overview.
    pub fn stats(&self) -> Result<CorpusStats, EngineError> {
        Ok(CorpusStats {
            docs: self.store.doc_count()?,
            chunks: self.store.chunk_count()?,
            vectors: self.store.vector_count()?,
            lexical_fresh: self.store.get_lexical_blob()?.is_some(),
            latency: self.latency.summary(),
        })
    }

    /// Re-embed every chunk whose vector is missing or has the wrong width.
    /// Clears the re-embed flag. Returns how many chunks were embedded.
    pub async fn reembed_corpus(&self) -> Result<usize, EngineError> {
        let config = self.config();
        let embedder = self.embedder();
        self.ensure_embedder_ready(&embedder, config.model_init_timeout_secs)
            .await?;

        let chunks = self.store.all_chunks()?;
        let dimensions = embedder.dimensions();
        let mut pending: Vec<&Chunk> = Vec::new();
        for chunk in &chunks {
            let stale = match self.store.get_vector(&chunk.id)? {
                Some(record) => record.embedding.len() != dimensions,
                None => true,
            };
            if stale {
                pending.push(chunk);
            }
        }

        if !pending.is_empty() {
            let texts: Vec<String> = pending.iter().map(|c| c.text.clone()).collect();
            let vectors = self.embed_batch_with_retry(&embedder, &texts).await?;
            let records: Vec<VectorRecord> = pending
                .iter()
                .zip(vectors)
                .map(|(chunk, embedding)| VectorRecord {
                    chunk_id: chunk.id.clone(),
                    embedding,
                })
                .collect();
            self.store.put_vectors(&records)?;
        }
        self.store.delete_meta(NEEDS_REEMBED_FLAG)?;
        Ok(pending.len())
    }

    // ── index plumbing ─────────────────────────────────────────────────

    /// Rebuild the lexical snapshot over every persisted chunk, persist it,
    /// mark all docs lexically indexed, and refresh the cache.
    fn rebuild_lexical(&self) -> Result<Arc<LexicalSnapshot>, EngineError> {
        let chunks = self.store.all_chunks()?;
        let snapshot = lexical::build_snapshot(&chunks);
        self.store.put_lexical_blob(&snapshot.to_bytes()?)?;

        for mut doc in self.store.list_docs()? {
            if !doc.status.indexed_lexical {
                doc.status.indexed_lexical = true;
                self.store.put_doc(&doc)?;
            }
        }

        let snapshot = Arc::new(snapshot);
        *self
            .snapshot_cache
            .lock()
            .unwrap_or_else(|p| p.into_inner()) = Some(snapshot.clone());
        Ok(snapshot)
    }

    /// Cached snapshot, else the persisted one, else a lazy rebuild.
    fn snapshot_or_rebuild(&self) -> Result<Arc<LexicalSnapshot>, EngineError> {
        {
            let cache = self
                .snapshot_cache
                .lock()
                .unwrap_or_else(|p| p.into_inner());
            if let Some(snapshot) = cache.as_ref() {
                return Ok(snapshot.clone());
            }
        }
        if let Some(blob) = self.store.get_lexical_blob()? {
            match LexicalSnapshot::from_bytes(&blob) {
                Ok(snapshot) => {
                    let snapshot = Arc::new(snapshot);
                    *self
                        .snapshot_cache
                        .lock()
                        .unwrap_or_else(|p| p.into_inner()) = Some(snapshot.clone());
                    return Ok(snapshot);
                }
                Err(err) => {
                    tracing::warn!(error = %err, "stored snapshot unreadable; rebuilding");
                }
            }
        }
        self.rebuild_lexical()
    }

    // ── embedder plumbing ──────────────────────────────────────────────

    async fn ensure_embedder_ready(
        &self,
        embedder: &Arc<dyn Embedder>,
        timeout_secs: u64,
    ) -> Result<(), EngineError> {
        if embedder.is_ready() {
            return Ok(());
        }
        let deadline = Duration::from_secs(timeout_secs);
        let timed_out =
            || EngineError::Resource(format!("model init timed out after {timeout_secs}s"));

        match tokio::time::timeout(deadline, embedder.initialize()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => {
                let err: EngineError = err.into();
                if !err.is_transient() {
                    return Err(err);
                }
                tracing::warn!(error = %err, "embedder init failed; retrying once");
                tokio::time::sleep(RETRY_BACKOFF).await;
                tokio::time::timeout(deadline, embedder.initialize())
                    .await
                    .map_err(|_| timed_out())?
                    .map_err(EngineError::from)
            }
            Err(_) => Err(timed_out()),
        }
    }

    async fn embed_with_retry(
        &self,
        embedder: &Arc<dyn Embedder>,
        text: &str,
    ) -> Result<Vec<f32>, EngineError> {
        match embedder.embed(text).await {
            Ok(vector) => Ok(vector),
            Err(err) => {
                let err: EngineError = err.into();
                if !err.is_transient() {
                    return Err(err);
                }
                tokio::time::sleep(RETRY_BACKOFF).await;
                Ok(embedder.embed(text).await?)
            }
        }
    }

    async fn embed_batch_with_retry(
        &self,
        embedder: &Arc<dyn Embedder>,
        texts: &[String],
    ) -> Result<Vec<Vec<f32>>, EngineError> {
        match embedder.embed_batch(texts).await {
            Ok(vectors) => Ok(vectors),
            Err(err) => {
                let err: EngineError = err.into();
                if !err.is_transient() {
                    return Err(err);
                }
                tokio::time::sleep(RETRY_BACKOFF).await;
                Ok(embedder.embed_batch(texts).await?)
            }
        }
    }

    async fn store_write_with_retry<T>(
        &self,
        mut op: impl FnMut() -> Result<T, store::StoreError>,
    ) -> Result<T, EngineError> {
        match op() {
            Ok(value) => Ok(value),
            Err(store::StoreError::Backend(message)) => {
                tracing::warn!(error = %message, "store write failed; retrying once");
                tokio::time::sleep(RETRY_BACKOFF).await;
                Ok(op()?)
            }
            Err(err) => Err(err.into()),
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("retrievers", &self.retrievers.ids())
            .field("events", &self.events.len())
            .finish()
    }
}

fn enabled_post_processors(configured: &[String], polish_override: Option<bool>) -> Vec<String> {
    match polish_override {
        Some(false) => Vec::new(),
        Some(true) => {
            let mut enabled = configured.to_vec();
            if !enabled.iter().any(|id| id == TidyPolish::ID) {
                enabled.push(TidyPolish::ID.to_string());
            }
            enabled
        }
        None => configured.to_vec(),
    }
}

fn report_progress(options: &IngestOptions, value: f32) {
    if let Some(callback) = &options.on_progress {
        callback(value);
    }
}

fn check_cancel(options: &IngestOptions) -> Result<(), EngineError> {
    match &options.cancel {
        Some(flag) if flag.is_cancelled() => Err(EngineError::Cancelled),
        _ => Ok(()),
    }
}
