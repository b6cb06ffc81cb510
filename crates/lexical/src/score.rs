//! BM25 scoring and search over a snapshot.

use segment::tokenize;

use crate::LexicalSnapshot;

/// Term-frequency saturation constant.
pub const K1: f32 = 1.5;
/// Length-normalization constant.
pub const B: f32 = 0.75;

/// A chunk id with its BM25 score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredId {
    pub chunk_id: String,
    pub score: f32,
}

/// Score every chunk in the snapshot against `query`, keeping non-zero hits.
///
/// Results come back sorted by score descending; equal scores keep snapshot
/// order (earlier chunk wins). Query duplicates are not deduplicated: each
/// occurrence of a term contributes its own summand, which is standard BM25
/// behavior. Unknown terms (df = 0) contribute nothing.
pub fn score_all(snapshot: &LexicalSnapshot, query: &str) -> Vec<ScoredId> {
    if snapshot.is_empty() {
        return Vec::new();
    }
    let query_tokens = tokenize(query);
    if query_tokens.is_empty() {
        return Vec::new();
    }

    let n = snapshot.chunk_count() as f32;
    let avg = snapshot.avg_doc_length;

    let mut hits = Vec::new();
    for chunk_id in &snapshot.chunk_ids {
        let Some(counts) = snapshot.tf.get(chunk_id) else {
            continue;
        };
        let length: u32 = counts.values().sum();

        let mut score = 0.0f32;
        for term in &query_tokens {
            let df = snapshot.df.get(term).copied().unwrap_or(0);
            if df == 0 {
                continue;
            }
            let tf = counts.get(term).copied().unwrap_or(0) as f32;
            if tf == 0.0 {
                continue;
            }
            let idf = ((n - df as f32 + 0.5) / (df as f32 + 0.5) + 1.0).ln();
            let norm = if avg > 0.0 {
                1.0 - B + B * length as f32 / avg
            } else {
                1.0
            };
            score += idf * tf * (K1 + 1.0) / (tf + K1 * norm);
        }

        if score > 0.0 {
            hits.push(ScoredId {
                chunk_id: chunk_id.clone(),
                score,
            });
        }
    }

    // Stable sort keeps snapshot order among equal scores.
    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    hits
}

/// Top-K BM25 search: [`score_all`] truncated to `top_k`.
pub fn search(snapshot: &LexicalSnapshot, query: &str, top_k: usize) -> Vec<ScoredId> {
    let mut hits = score_all(snapshot, query);
    hits.truncate(top_k);
    hits
}
