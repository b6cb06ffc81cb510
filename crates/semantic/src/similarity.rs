//! Cosine similarity and brute-force vector ranking.

/// In-place L2 normalization; zero vectors stay zero.
pub fn l2_normalize_in_place(v: &mut [f32]) {
    let norm_sq: f32 = v.iter().map(|x| x * x).sum();
    if norm_sq > 0.0 {
        let inv_norm = norm_sq.sqrt().recip();
        for x in v.iter_mut() {
            *x *= inv_norm;
        }
    }
}

/// Cosine similarity `dot(a, b) / (|a| * |b|)`.
///
/// Returns 0.0 when either vector has zero magnitude. Callers are expected
/// to have checked dimensions; mismatched slices compare over the shorter
/// prefix, which [`rank_by_cosine`] never allows to happen.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// A cosine ranking plus the ids that had to be skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankedVectors {
    /// `(chunk_id, similarity)` sorted by similarity descending, ties by id.
    pub hits: Vec<(String, f32)>,
    /// Ids whose stored vector width did not match the query vector.
    pub skipped: Vec<String>,
}

/// Rank stored vectors against a query vector by cosine similarity.
///
/// Vectors whose dimension differs from the query's are skipped with a
/// warning and reported in [`RankedVectors::skipped`] so the caller can mark
/// the corpus for re-embedding. `top_k = None` returns the full ranking,
/// which hybrid fusion requires.
pub fn rank_by_cosine<I>(query: &[f32], vectors: I, top_k: Option<usize>) -> RankedVectors
where
    I: IntoIterator<Item = (String, Vec<f32>)>,
{
    let mut hits = Vec::new();
    let mut skipped = Vec::new();

    for (chunk_id, vector) in vectors {
        if vector.len() != query.len() {
            tracing::warn!(
                chunk_id = %chunk_id,
                expected = query.len(),
                got = vector.len(),
                "skipping vector with mismatched dimension"
            );
            skipped.push(chunk_id);
            continue;
        }
        let score = cosine_similarity(query, &vector);
        hits.push((chunk_id, score));
    }

    hits.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    if let Some(k) = top_k {
        hits.truncate(k);
    }

    RankedVectors { hits, skipped }
}
