//! Snapshot construction and (de)serialization.

use std::collections::HashMap;

use segment::{tokenize, Chunk};
use serde::{Deserialize, Serialize};

use crate::LexicalError;

/// Persisted image of the BM25 statistics over the whole corpus.
///
/// Invariants at build time:
/// - `df[t]` equals the number of chunks whose `tf` map contains `t`;
/// - `chunk_ids` holds every indexed chunk, in build order;
/// - `avg_doc_length` is the mean of per-chunk tf-sums (0.0 when empty).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LexicalSnapshot {
    pub df: HashMap<String, u32>,
    pub tf: HashMap<String, HashMap<String, u32>>,
    pub chunk_ids: Vec<String>,
    pub avg_doc_length: f32,
}

impl LexicalSnapshot {
    pub fn is_empty(&self) -> bool {
        self.chunk_ids.is_empty()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_ids.len()
    }

    /// Tf-sum length of one chunk; 0 for ids the snapshot does not know.
    pub fn chunk_length(&self, chunk_id: &str) -> u32 {
        self.tf
            .get(chunk_id)
            .map(|terms| terms.values().sum())
            .unwrap_or(0)
    }

    /// Serialize for storage as one opaque blob.
    pub fn to_bytes(&self) -> Result<Vec<u8>, LexicalError> {
        serde_json::to_vec(self).map_err(|e| LexicalError::Corrupt(e.to_string()))
    }

    /// Rehydrate a stored snapshot blob.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LexicalError> {
        serde_json::from_slice(bytes).map_err(|e| LexicalError::Corrupt(e.to_string()))
    }
}

/// Build a snapshot over the full chunk set.
///
/// The iteration order of `chunks` becomes the snapshot order, which in turn
/// fixes tie-breaking at search time.
pub fn build_snapshot(chunks: &[Chunk]) -> LexicalSnapshot {
    let mut df: HashMap<String, u32> = HashMap::new();
    let mut tf: HashMap<String, HashMap<String, u32>> = HashMap::new();
    let mut chunk_ids = Vec::with_capacity(chunks.len());
    let mut total_length = 0u64;

    for chunk in chunks {
        let tokens = tokenize(&chunk.text);
        total_length += tokens.len() as u64;

        let mut counts: HashMap<String, u32> = HashMap::new();
        for token in tokens {
            *counts.entry(token).or_insert(0) += 1;
        }
        for term in counts.keys() {
            *df.entry(term.clone()).or_insert(0) += 1;
        }

        chunk_ids.push(chunk.id.clone());
        tf.insert(chunk.id.clone(), counts);
    }

    let avg_doc_length = if chunk_ids.is_empty() {
        0.0
    } else {
        total_length as f32 / chunk_ids.len() as f32
    };

    tracing::debug!(
        chunks = chunk_ids.len(),
        terms = df.len(),
        avg_doc_length,
        "built lexical snapshot"
    );

    LexicalSnapshot {
        df,
        tf,
        chunk_ids,
        avg_doc_length,
    }
}
