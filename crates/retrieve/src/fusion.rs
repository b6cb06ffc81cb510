//! Score normalization and hybrid fusion.
//!
//! Each ranker's scores are min-max scaled over its *full* result set
//! (normalizing only a top-K slice makes fusion unstable at the truncation
//! boundary) and then convex-combined: `final = alpha * semantic +
//! (1 - alpha) * lexical`. A chunk missing from one ranker contributes 0
//! on that side.

/// Min–max scale scores into `[0, 1]`.
///
/// A constant input (including a single element) maps every score to 1.0,
/// so "everything tied" reads as "everything equally best".
pub fn min_max_normalize(scores: &[f32]) -> Vec<f32> {
    if scores.is_empty() {
        return Vec::new();
    }
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    for &s in scores {
        min = min.min(s);
        max = max.max(s);
    }
    if max == min {
        return vec![1.0; scores.len()];
    }
    let range = max - min;
    scores.iter().map(|&s| (s - min) / range).collect()
}

/// A fused hit with both normalized components kept for tie-breaking and
/// diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedHit {
    pub chunk_id: String,
    pub final_score: f32,
    pub lexical_norm: f32,
    pub semantic_norm: f32,
}

/// Fuse full lexical and semantic rankings with semantic weight `alpha`.
///
/// Output is sorted by final score descending; ties break on the
/// lexical-normalized score, then on chunk id.
pub fn fuse(
    lexical: &[(String, f32)],
    semantic: &[(String, f32)],
    alpha: f32,
) -> Vec<FusedHit> {
    let alpha = alpha.clamp(0.0, 1.0);

    let lexical_scores: Vec<f32> = lexical.iter().map(|(_, s)| *s).collect();
    let semantic_scores: Vec<f32> = semantic.iter().map(|(_, s)| *s).collect();
    let lexical_norm = min_max_normalize(&lexical_scores);
    let semantic_norm = min_max_normalize(&semantic_scores);

    // Union keyed by chunk id; first-seen order is irrelevant because the
    // sort below is total.
    let mut merged: std::collections::HashMap<String, (f32, f32)> = std::collections::HashMap::new();
    for ((id, _), norm) in lexical.iter().zip(lexical_norm) {
        merged.entry(id.clone()).or_insert((0.0, 0.0)).0 = norm;
    }
    for ((id, _), norm) in semantic.iter().zip(semantic_norm) {
        merged.entry(id.clone()).or_insert((0.0, 0.0)).1 = norm;
    }

    let mut hits: Vec<FusedHit> = merged
        .into_iter()
        .map(|(chunk_id, (lex, sem))| FusedHit {
            chunk_id,
            final_score: alpha * sem + (1.0 - alpha) * lex,
            lexical_norm: lex,
            semantic_norm: sem,
        })
        .collect();

    hits.sort_by(|a, b| {
        b.final_score
            .partial_cmp(&a.final_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                b.lexical_norm
                    .partial_cmp(&a.lexical_norm)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.chunk_id.cmp(&b.chunk_id))
    });
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(pairs: &[(&str, f32)]) -> Vec<(String, f32)> {
        pairs.iter().map(|(id, s)| (id.to_string(), *s)).collect()
    }

    #[test]
    fn normalize_spreads_to_unit_interval() {
        let norm = min_max_normalize(&[2.0, 4.0, 6.0]);
        assert_eq!(norm, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn normalize_constant_input_is_all_ones() {
        assert_eq!(min_max_normalize(&[3.0, 3.0, 3.0]), vec![1.0, 1.0, 1.0]);
        assert_eq!(min_max_normalize(&[7.5]), vec![1.0]);
        assert!(min_max_normalize(&[]).is_empty());
    }

    #[test]
    fn alpha_zero_is_pure_lexical_order() {
        let lexical = scored(&[("a", 10.0), ("b", 5.0), ("c", 1.0)]);
        let semantic = scored(&[("c", 0.9), ("b", 0.5), ("a", 0.1)]);
        let hits = fuse(&lexical, &semantic, 0.0);
        let ids: Vec<&str> = hits.iter().map(|h| h.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn alpha_one_is_pure_semantic_order() {
        let lexical = scored(&[("a", 10.0), ("b", 5.0), ("c", 1.0)]);
        let semantic = scored(&[("c", 0.9), ("b", 0.5), ("a", 0.1)]);
        let hits = fuse(&lexical, &semantic, 1.0);
        let ids: Vec<&str> = hits.iter().map(|h| h.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }

    #[test]
    fn one_sided_chunks_contribute_zero_for_missing_side() {
        let lexical = scored(&[("only-lex", 3.0), ("shared", 1.0)]);
        let semantic = scored(&[("shared", 0.8), ("only-sem", 0.2)]);
        let hits = fuse(&lexical, &semantic, 0.5);

        let get = |id: &str| hits.iter().find(|h| h.chunk_id == id).unwrap();
        assert_eq!(get("only-lex").semantic_norm, 0.0);
        assert_eq!(get("only-sem").lexical_norm, 0.0);
        // shared: lexical min of two → 0.0; semantic max of two → 1.0.
        assert!((get("shared").final_score - 0.5).abs() < 1e-6);
    }

    #[test]
    fn ties_break_on_lexical_then_id() {
        // Both chunks fuse to the same final score, but "b" carries the
        // higher lexical component and must come first.
        let lexical = scored(&[("b", 2.0), ("a", 1.0)]);
        let semantic = scored(&[("a", 2.0), ("b", 1.0)]);
        let hits = fuse(&lexical, &semantic, 0.5);
        assert!((hits[0].final_score - hits[1].final_score).abs() < 1e-6);
        assert_eq!(hits[0].chunk_id, "b");

        // Fully symmetric inputs: id ascending decides.
        let lexical = scored(&[("x", 1.0), ("y", 1.0)]);
        let semantic = scored(&[("x", 1.0), ("y", 1.0)]);
        let hits = fuse(&lexical, &semantic, 0.5);
        assert_eq!(hits[0].chunk_id, "x");
        assert_eq!(hits[1].chunk_id, "y");
    }

    #[test]
    fn fusion_over_empty_rankers() {
        assert!(fuse(&[], &[], 0.5).is_empty());
        let hits = fuse(&scored(&[("a", 1.0)]), &[], 0.5);
        assert_eq!(hits.len(), 1);
        // Sole lexical hit normalizes to 1.0; semantic side is 0.
        assert!((hits[0].final_score - 0.5).abs() < 1e-6);
    }
}
