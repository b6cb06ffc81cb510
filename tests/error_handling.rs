//! Error taxonomy behavior: input rejection, best-effort stages,
//! consistency handling, and cancellation.

use std::sync::Arc;

use async_trait::async_trait;
use ingest::{DocKind, IngestInput};
use retrieve::RetrievalMode;
use satchel::{
    CancelFlag, Engine, EngineError, EventType, GeneratedAnswer, Generator, GenerationConfig,
    IngestOptions, Preset, QueryRequest, VectorRecord,
};
use segment::Chunk;

fn txt(name: &str, body: &str) -> IngestInput {
    IngestInput::new(name, DocKind::Txt, body.as_bytes().to_vec())
}

fn engine() -> Engine {
    Engine::builder()
        .in_memory()
        .unwrap()
        .config(Preset::Balanced.config())
        .build()
        .unwrap()
}

#[tokio::test]
async fn bad_input_leaves_no_persisted_state() {
    let engine = engine();

    let empty = IngestInput::new("empty.txt", DocKind::Txt, Vec::new());
    assert!(matches!(
        engine.ingest(empty, IngestOptions::default()).await,
        Err(EngineError::Ingest(_))
    ));

    let garbage = IngestInput::new("bad.md", DocKind::Md, vec![0xff, 0xfe]);
    assert!(matches!(
        engine.ingest(garbage, IngestOptions::default()).await,
        Err(EngineError::Ingest(_))
    ));

    assert!(IngestInput::from_named_bytes("data.xyz", vec![1, 2]).is_err());

    let stats = engine.stats().unwrap();
    assert_eq!(stats.docs, 0);
    assert_eq!(stats.chunks, 0);
}

#[tokio::test]
async fn out_of_range_params_are_rejected() {
    let engine = engine();
    engine
        .ingest(txt("a.txt", "some indexable text"), IngestOptions::default())
        .await
        .unwrap();

    let err = engine
        .query(QueryRequest::new("text").with_top_k(31))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Retrieve(_)));

    let err = engine
        .query(QueryRequest::new("text").with_alpha(1.5))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Retrieve(_)));
}

#[tokio::test]
async fn stop_word_only_query_yields_no_lexical_hits_but_semantic_ranks() {
    let engine = engine();
    engine
        .ingest(
            txt("a.txt", "Content words carry the lexical signal"),
            IngestOptions::default(),
        )
        .await
        .unwrap();

    let lexical = engine
        .query(QueryRequest::new("the and of with").with_mode(RetrievalMode::Lexical))
        .await
        .unwrap();
    assert!(lexical.citations.is_empty());

    let semantic = engine
        .query(QueryRequest::new("the and of with").with_mode(RetrievalMode::Semantic))
        .await
        .unwrap();
    assert!(!semantic.citations.is_empty());
}

#[tokio::test]
async fn mismatched_vector_is_skipped_and_corpus_flagged() {
    let engine = engine();
    let doc_a = engine
        .ingest(
            txt("a.txt", "The quick brown fox jumps over the lazy dog"),
            IngestOptions::default(),
        )
        .await
        .unwrap();
    engine
        .ingest(
            txt("b.txt", "Machine learning algorithms process data efficiently"),
            IngestOptions::default(),
        )
        .await
        .unwrap();

    // Corrupt one chunk's vector with the wrong width.
    let victim = engine.store().chunks_for_doc(&doc_a.id).unwrap()[0]
        .id
        .clone();
    engine
        .store()
        .put_vectors(&[VectorRecord {
            chunk_id: victim.clone(),
            embedding: vec![0.5, 0.5, 0.5],
        }])
        .unwrap();

    let result = engine
        .query(QueryRequest::new("anything").with_mode(RetrievalMode::Semantic))
        .await
        .unwrap();

    assert!(result.citations.iter().all(|c| c.chunk_id != victim));
    assert!(!result.citations.is_empty(), "healthy chunks still rank");
    assert_eq!(
        engine.store().get_meta("needs_reembed").unwrap(),
        Some("true".into())
    );

    // Re-embedding repairs exactly the corrupted chunk and clears the flag.
    let repaired = engine.reembed_corpus().await.unwrap();
    assert_eq!(repaired, 1);
    assert!(engine.store().get_meta("needs_reembed").unwrap().is_none());
    let record = engine.store().get_vector(&victim).unwrap().unwrap();
    assert_ne!(record.embedding.len(), 3);
}

struct ExplodingGenerator;

#[async_trait]
impl Generator for ExplodingGenerator {
    fn id(&self) -> &str {
        "exploding-generator"
    }

    async fn generate(
        &self,
        _question: &str,
        _chunks: &[Chunk],
        _config: &GenerationConfig,
    ) -> Result<GeneratedAnswer, EngineError> {
        Err(EngineError::Resource("model fell over".into()))
    }
}

#[tokio::test]
async fn generation_failure_still_returns_retrieval_results() {
    let mut config = Preset::Balanced.config();
    config.generation = "exploding-generator".into();
    let engine = Engine::builder()
        .in_memory()
        .unwrap()
        .config(config)
        .register_generator("exploding-generator", Arc::new(ExplodingGenerator))
        .build()
        .unwrap();

    engine
        .ingest(
            txt("a.txt", "Grounded answers come from retrieved passages."),
            IngestOptions::default(),
        )
        .await
        .unwrap();

    let result = engine
        .query(QueryRequest::new("where do answers come from?").chat())
        .await
        .unwrap();

    assert!(result.generated_answer.is_none());
    assert!(!result.citations.is_empty());

    let types: Vec<EventType> = engine
        .events()
        .snapshot()
        .iter()
        .map(|e| e.event_type)
        .collect();
    assert!(types.contains(&EventType::GenerationError));
    assert!(types.contains(&EventType::QueryComplete));
}

#[tokio::test]
async fn cancellation_mid_ingest_leaves_partial_state_and_fresh_retry_works() {
    let engine = engine();
    let flag = CancelFlag::new();
    let flag_in_callback = flag.clone();
    // Cancel once chunking has committed but before embedding.
    let options = IngestOptions {
        cancel: Some(flag.clone()),
        on_progress: Some(Arc::new(move |progress: f32| {
            if progress >= 0.45 {
                flag_in_callback.cancel();
            }
        })),
    };

    let err = engine
        .ingest(
            txt("big.txt", "A document whose ingest gets interrupted mid-way."),
            options,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Cancelled));

    // Partial writes stay: the doc row and its chunks exist, vectors do not.
    let docs = engine.store().list_docs().unwrap();
    assert_eq!(docs.len(), 1);
    let partial = &docs[0];
    assert!(!partial.status.indexed_vector);
    assert!(engine.stats().unwrap().chunks > 0);
    assert_eq!(engine.stats().unwrap().vectors, 0);

    // A later ingest of the same bytes starts fresh under a new id.
    let done = engine
        .ingest(
            txt("big.txt", "A document whose ingest gets interrupted mid-way."),
            IngestOptions::default(),
        )
        .await
        .unwrap();
    assert_ne!(done.id, partial.id);
    assert!(done.status.indexed_vector);
    assert!(done.status.indexed_lexical);
}

#[tokio::test]
async fn chat_on_empty_retrieval_skips_generation() {
    let engine = engine();
    engine
        .ingest(txt("a.txt", "totally unrelated content"), IngestOptions::default())
        .await
        .unwrap();

    // Stop-word-only query retrieves nothing lexically; chat must not
    // fabricate an answer from zero citations.
    let result = engine
        .query(
            QueryRequest::new("the of and")
                .with_mode(RetrievalMode::Lexical)
                .chat(),
        )
        .await
        .unwrap();
    assert!(result.citations.is_empty());
    assert!(result.generated_answer.is_none());
    assert!(result.chunks.is_empty());
}

#[tokio::test]
async fn snapshot_referencing_a_missing_chunk_self_heals() {
    let store = satchel::ObjectStore::in_memory().unwrap();
    let engine = Engine::builder()
        .store(store.clone())
        .config(Preset::Balanced.config())
        .build()
        .unwrap();
    engine
        .ingest(
            txt("garden.txt", "Real content about gardens and soil health"),
            IngestOptions::default(),
        )
        .await
        .unwrap();

    // Poison the persisted snapshot with a chunk the store does not hold.
    let mut chunks = store.all_chunks().unwrap();
    chunks.push(Chunk {
        id: "ghost-chunk-0".into(),
        doc_id: "ghost".into(),
        page_number: 1,
        text: "gardens gardens gardens".into(),
        start_offset: 0,
        end_offset: 23,
        token_estimate: 6,
    });
    let poisoned = lexical::build_snapshot(&chunks);
    store.put_lexical_blob(&poisoned.to_bytes().unwrap()).unwrap();

    // A fresh engine over the same store reloads the poisoned snapshot.
    let healed = Engine::builder()
        .store(store.clone())
        .config(Preset::Balanced.config())
        .build()
        .unwrap();
    let result = healed
        .query(QueryRequest::new("gardens").with_mode(RetrievalMode::Lexical))
        .await
        .unwrap();

    assert!(!result.citations.is_empty());
    assert!(result.citations.iter().all(|c| c.chunk_id != "ghost-chunk-0"));

    // The retry left a rebuilt, ghost-free snapshot behind.
    let blob = store.get_lexical_blob().unwrap().unwrap();
    let snapshot = satchel::LexicalSnapshot::from_bytes(&blob).unwrap();
    assert!(!snapshot.chunk_ids.iter().any(|id| id == "ghost-chunk-0"));
}

#[tokio::test]
async fn unknown_strategy_in_request_fails_fast() {
    let mut config = Preset::Balanced.config();
    config.post_process = vec!["no-such-processor".into()];
    let err = Engine::builder()
        .in_memory()
        .unwrap()
        .config(config)
        .build()
        .unwrap_err();
    assert!(matches!(err, EngineError::UnknownStrategy(id) if id == "no-such-processor"));
}
