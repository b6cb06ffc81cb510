//! The retriever capability and its three built-in strategies.

use lexical::LexicalSnapshot;
use segment::Chunk;
use serde_json::json;

use crate::fusion::fuse;
use crate::types::{RetrievalOutput, RetrievalParams, ScoredChunk};
use crate::RetrieveError;

/// Everything a retriever may read, borrowed from the orchestrator.
///
/// The orchestrator performs every suspension (store reads, query
/// embedding) before building the context, so `retrieve` itself is pure
/// computation.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetrieverContext<'a> {
    pub query: &'a str,
    pub chunks: &'a [Chunk],
    /// BM25 snapshot; present whenever the corpus has one.
    pub snapshot: Option<&'a LexicalSnapshot>,
    /// Embedding of `query`; present when the strategy requires embeddings.
    pub query_vector: Option<&'a [f32]>,
    /// Stored `(chunk_id, embedding)` pairs; present alongside
    /// `query_vector`.
    pub vectors: Option<&'a [(String, Vec<f32>)]>,
}

/// A named retrieval strategy.
pub trait Retriever: Send + Sync {
    /// Canonical strategy id used in configs and the registry.
    fn id(&self) -> &'static str;

    /// Human-readable name for diagnostics.
    fn name(&self) -> &'static str;

    /// Whether the orchestrator must prepare a query vector and the stored
    /// vector set before calling [`Self::retrieve`].
    fn requires_embeddings(&self) -> bool;

    /// Declarative description of the accepted parameters.
    fn config_schema(&self) -> serde_json::Value;

    /// Rank chunks for a query. Pure; must not suspend.
    fn retrieve(
        &self,
        ctx: &RetrieverContext<'_>,
        params: &RetrievalParams,
    ) -> Result<RetrievalOutput, RetrieveError>;
}

fn top_k_schema() -> serde_json::Value {
    json!({"type": "integer", "minimum": 1, "maximum": 30, "default": 10})
}

/// BM25-only retrieval.
#[derive(Debug, Default, Clone, Copy)]
pub struct LexicalRetriever;

impl LexicalRetriever {
    pub const ID: &'static str = "lexical";
}

impl Retriever for LexicalRetriever {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn name(&self) -> &'static str {
        "Lexical (BM25)"
    }

    fn requires_embeddings(&self) -> bool {
        false
    }

    fn config_schema(&self) -> serde_json::Value {
        json!({"type": "object", "properties": {"top_k": top_k_schema()}})
    }

    fn retrieve(
        &self,
        ctx: &RetrieverContext<'_>,
        params: &RetrievalParams,
    ) -> Result<RetrievalOutput, RetrieveError> {
        params.validate()?;
        let snapshot = ctx.snapshot.ok_or(RetrieveError::MissingLexicalIndex)?;

        let scored = lexical::search(snapshot, ctx.query, params.top_k);
        let candidates = scored.len();
        let hits = scored
            .into_iter()
            .map(|s| ScoredChunk {
                chunk_id: s.chunk_id,
                score: s.score,
            })
            .collect();

        Ok(RetrievalOutput {
            hits,
            skipped_chunks: Vec::new(),
            metadata: json!({"retriever": Self::ID, "candidates": candidates}),
        })
    }
}

/// Cosine-similarity retrieval over stored vectors.
#[derive(Debug, Default, Clone, Copy)]
pub struct SemanticRetriever;

impl SemanticRetriever {
    pub const ID: &'static str = "semantic";
}

impl Retriever for SemanticRetriever {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn name(&self) -> &'static str {
        "Semantic (cosine)"
    }

    fn requires_embeddings(&self) -> bool {
        true
    }

    fn config_schema(&self) -> serde_json::Value {
        json!({"type": "object", "properties": {"top_k": top_k_schema()}})
    }

    fn retrieve(
        &self,
        ctx: &RetrieverContext<'_>,
        params: &RetrievalParams,
    ) -> Result<RetrievalOutput, RetrieveError> {
        params.validate()?;
        let query_vector = ctx.query_vector.ok_or(RetrieveError::MissingEmbeddings)?;
        let vectors = ctx.vectors.ok_or(RetrieveError::MissingEmbeddings)?;

        let ranked = semantic::rank_by_cosine(
            query_vector,
            vectors.iter().cloned(),
            Some(params.top_k),
        );
        let hits = ranked
            .hits
            .into_iter()
            .map(|(chunk_id, score)| ScoredChunk { chunk_id, score })
            .collect();

        Ok(RetrievalOutput {
            hits,
            skipped_chunks: ranked.skipped,
            metadata: json!({"retriever": Self::ID, "candidates": vectors.len()}),
        })
    }
}

/// Normalized BM25 + cosine fusion.
#[derive(Debug, Default, Clone, Copy)]
pub struct HybridRetriever;

impl HybridRetriever {
    pub const ID: &'static str = "hybrid";
}

impl Retriever for HybridRetriever {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn name(&self) -> &'static str {
        "Hybrid (BM25 + cosine)"
    }

    fn requires_embeddings(&self) -> bool {
        true
    }

    fn config_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "top_k": top_k_schema(),
                "alpha": {"type": "number", "minimum": 0.0, "maximum": 1.0, "default": 0.5},
            },
        })
    }

    fn retrieve(
        &self,
        ctx: &RetrieverContext<'_>,
        params: &RetrievalParams,
    ) -> Result<RetrievalOutput, RetrieveError> {
        params.validate()?;
        let snapshot = ctx.snapshot.ok_or(RetrieveError::MissingLexicalIndex)?;
        let query_vector = ctx.query_vector.ok_or(RetrieveError::MissingEmbeddings)?;
        let vectors = ctx.vectors.ok_or(RetrieveError::MissingEmbeddings)?;

        // Both rankers run unbounded so normalization sees the full sets;
        // top-K truncation happens after fusion.
        let lexical_full: Vec<(String, f32)> = lexical::score_all(snapshot, ctx.query)
            .into_iter()
            .map(|s| (s.chunk_id, s.score))
            .collect();
        let ranked = semantic::rank_by_cosine(query_vector, vectors.iter().cloned(), None);

        let fused = fuse(&lexical_full, &ranked.hits, params.alpha);
        let lexical_candidates = lexical_full.len();
        let semantic_candidates = ranked.hits.len();

        let hits = fused
            .into_iter()
            .take(params.top_k)
            .map(|hit| ScoredChunk {
                chunk_id: hit.chunk_id,
                score: hit.final_score,
            })
            .collect();

        Ok(RetrievalOutput {
            hits,
            skipped_chunks: ranked.skipped,
            metadata: json!({
                "retriever": Self::ID,
                "alpha": params.alpha,
                "lexical_candidates": lexical_candidates,
                "semantic_candidates": semantic_candidates,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin_retrievers;
    use lexical::build_snapshot;

    fn chunk(id: &str, text: &str) -> Chunk {
        Chunk {
            id: id.into(),
            doc_id: "d1".into(),
            page_number: 1,
            text: text.into(),
            start_offset: 0,
            end_offset: text.chars().count(),
            token_estimate: 1,
        }
    }

    fn fixture() -> (Vec<Chunk>, LexicalSnapshot, Vec<(String, Vec<f32>)>) {
        let chunks = vec![
            chunk("c0", "the quick brown fox jumps over the lazy dog"),
            chunk("c1", "machine learning algorithms process data efficiently"),
            chunk("c2", "lazy dogs sleep all day"),
        ];
        let snapshot = build_snapshot(&chunks);
        let vectors = vec![
            ("c0".to_string(), vec![1.0, 0.0]),
            ("c1".to_string(), vec![0.0, 1.0]),
            ("c2".to_string(), vec![0.9, 0.1]),
        ];
        (chunks, snapshot, vectors)
    }

    #[test]
    fn builtins_register_under_canonical_ids() {
        let registry = builtin_retrievers();
        assert_eq!(registry.ids(), vec!["hybrid", "lexical", "semantic"]);
        assert!(!registry.get("lexical").unwrap().requires_embeddings());
        assert!(registry.get("semantic").unwrap().requires_embeddings());
        assert!(registry.get("hybrid").unwrap().requires_embeddings());
    }

    #[test]
    fn lexical_retriever_needs_snapshot() {
        let ctx = RetrieverContext {
            query: "anything",
            ..Default::default()
        };
        let err = LexicalRetriever
            .retrieve(&ctx, &RetrievalParams::default())
            .unwrap_err();
        assert_eq!(err, RetrieveError::MissingLexicalIndex);
    }

    #[test]
    fn lexical_retriever_ranks_bm25() {
        let (chunks, snapshot, _) = fixture();
        let ctx = RetrieverContext {
            query: "lazy dog",
            chunks: &chunks,
            snapshot: Some(&snapshot),
            ..Default::default()
        };
        let out = LexicalRetriever
            .retrieve(&ctx, &RetrievalParams::default())
            .unwrap();
        assert!(!out.hits.is_empty());
        assert_eq!(out.hits[0].chunk_id, "c0");
        assert!(out.hits.iter().all(|h| h.chunk_id != "c1"));
    }

    #[test]
    fn semantic_retriever_needs_vectors() {
        let (chunks, snapshot, _) = fixture();
        let ctx = RetrieverContext {
            query: "anything",
            chunks: &chunks,
            snapshot: Some(&snapshot),
            ..Default::default()
        };
        let err = SemanticRetriever
            .retrieve(&ctx, &RetrievalParams::default())
            .unwrap_err();
        assert_eq!(err, RetrieveError::MissingEmbeddings);
    }

    #[test]
    fn semantic_retriever_ranks_by_cosine() {
        let (chunks, snapshot, vectors) = fixture();
        let query_vector = vec![1.0f32, 0.0];
        let ctx = RetrieverContext {
            query: "ignored by cosine",
            chunks: &chunks,
            snapshot: Some(&snapshot),
            query_vector: Some(&query_vector),
            vectors: Some(&vectors),
        };
        let out = SemanticRetriever
            .retrieve(&ctx, &RetrievalParams::default())
            .unwrap();
        let ids: Vec<&str> = out.hits.iter().map(|h| h.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["c0", "c2", "c1"]);
    }

    #[test]
    fn hybrid_alpha_bounds_match_pure_rankers() {
        let (chunks, snapshot, vectors) = fixture();
        let query_vector = vec![0.0f32, 1.0];
        // The query hits every chunk lexically, so both rankers produce a
        // full, strictly-ordered result set and the alpha bounds reproduce
        // the pure rankers exactly.
        let ctx = RetrieverContext {
            query: "lazy dog data",
            chunks: &chunks,
            snapshot: Some(&snapshot),
            query_vector: Some(&query_vector),
            vectors: Some(&vectors),
        };

        let lexical_only = LexicalRetriever
            .retrieve(&ctx, &RetrievalParams::default())
            .unwrap();
        let semantic_only = SemanticRetriever
            .retrieve(&ctx, &RetrievalParams::default())
            .unwrap();
        assert_eq!(lexical_only.hits.len(), 3);

        let at_zero = HybridRetriever
            .retrieve(&ctx, &RetrievalParams { top_k: 10, alpha: 0.0 })
            .unwrap();
        let lexical_ids: Vec<&str> = lexical_only.hits.iter().map(|h| h.chunk_id.as_str()).collect();
        let zero_ids: Vec<&str> = at_zero.hits.iter().map(|h| h.chunk_id.as_str()).collect();
        assert_eq!(zero_ids, lexical_ids);

        let at_one = HybridRetriever
            .retrieve(&ctx, &RetrievalParams { top_k: 10, alpha: 1.0 })
            .unwrap();
        let semantic_ids: Vec<&str> = semantic_only.hits.iter().map(|h| h.chunk_id.as_str()).collect();
        let one_ids: Vec<&str> = at_one.hits.iter().map(|h| h.chunk_id.as_str()).collect();
        assert_eq!(one_ids, semantic_ids);
    }

    #[test]
    fn hybrid_reports_dimension_skips() {
        let (chunks, snapshot, mut vectors) = fixture();
        vectors.push(("c3".to_string(), vec![1.0, 2.0, 3.0]));
        let query_vector = vec![1.0f32, 0.0];
        let ctx = RetrieverContext {
            query: "lazy dog",
            chunks: &chunks,
            snapshot: Some(&snapshot),
            query_vector: Some(&query_vector),
            vectors: Some(&vectors),
        };
        let out = HybridRetriever
            .retrieve(&ctx, &RetrievalParams::default())
            .unwrap();
        assert_eq!(out.skipped_chunks, vec!["c3".to_string()]);
        assert!(out.hits.iter().all(|h| h.chunk_id != "c3"));
    }

    #[test]
    fn invalid_params_rejected_before_work() {
        let (chunks, snapshot, _) = fixture();
        let ctx = RetrieverContext {
            query: "lazy",
            chunks: &chunks,
            snapshot: Some(&snapshot),
            ..Default::default()
        };
        let err = LexicalRetriever
            .retrieve(&ctx, &RetrievalParams { top_k: 0, alpha: 0.5 })
            .unwrap_err();
        assert!(matches!(err, RetrieveError::InvalidParams(_)));
    }
}
