//! Hybrid fusion (C4): normalize, classify, combine dense+sparse scores.
//!
//! Generalizes `db/hybrid_search.rs`'s alpha-blending algorithm
//! (min-max normalize each side, then weighted sum) with a
//! per-query adaptive α (not present there, which only exposes a
//! fixed `alpha` field on `HybridSearchConfig`) and optional metadata boost.

pub mod classifier;

use std::collections::HashMap;

use crate::config::{BoostTarget, MetadataBoostConfig};
use crate::models::{metadata_f32, Metadata};

/// One fused candidate before threshold/rerank is applied.
#[derive(Debug, Clone)]
pub struct FusedResult {
    pub id: String,
    pub final_score: f32,
    pub dense_normalized: Option<f32>,
    pub sparse_normalized: Option<f32>,
}

/// Min-max normalize a score list to `[0, 1]`. Per §4.4 step 1: if the
/// list has fewer than two distinct values, every entry maps to 0.5.
fn min_max_normalize(scores: &[(String, f32)]) -> HashMap<String, f32> {
    if scores.is_empty() {
        return HashMap::new();
    }
    let min = scores.iter().map(|(_, s)| *s).fold(f32::INFINITY, f32::min);
    let max = scores
        .iter()
        .map(|(_, s)| *s)
        .fold(f32::NEG_INFINITY, f32::max);
    if (max - min).abs() < f32::EPSILON {
        return scores.iter().map(|(id, _)| (id.clone(), 0.5)).collect();
    }
    scores
        .iter()
        .map(|(id, s)| (id.clone(), (s - min) / (max - min)))
        .collect()
}

/// Fuse dense and sparse hit lists for `query`, using `alpha` as the dense
/// weight (already resolved by the classifier if enabled). Applies the
/// optional metadata boost (§4.4 step 5) using each id's metadata, when
/// a `metadata_lookup` is supplied.
pub fn fuse(
    dense_hits: &[(String, f32)],
    sparse_hits: &[(String, f32)],
    alpha: f32,
    boost: &MetadataBoostConfig,
    metadata_lookup: impl Fn(&str) -> Option<Metadata>,
) -> Vec<FusedResult> {
    let dense_norm = min_max_normalize(dense_hits);
    let sparse_norm = min_max_normalize(sparse_hits);

    let mut ids: Vec<String> = dense_norm.keys().cloned().collect();
    for id in sparse_norm.keys() {
        if !dense_norm.contains_key(id) {
            ids.push(id.clone());
        }
    }

    let mut results: Vec<FusedResult> = ids
        .into_iter()
        .map(|id| {
            let d = dense_norm.get(&id).copied();
            let s = sparse_norm.get(&id).copied();
            let mut score = alpha * d.unwrap_or(0.0) + (1.0 - alpha) * s.unwrap_or(0.0);

            if boost.w_recency != 0.0 || boost.w_authority != 0.0 {
                if let Some(meta) = metadata_lookup(&id) {
                    let recency = metadata_f32(&meta, "recency_score");
                    let authority = metadata_f32(&meta, "authority_score");
                    let multiplier = 1.0 + boost.w_recency * recency + boost.w_authority * authority;
                    match boost.apply_to {
                        BoostTarget::Fused => score *= multiplier,
                        BoostTarget::DenseOnly => {
                            let boosted_dense = d.unwrap_or(0.0) * multiplier;
                            score = alpha * boosted_dense + (1.0 - alpha) * s.unwrap_or(0.0);
                        }
                    }
                }
            }

            FusedResult {
                id,
                final_score: score,
                dense_normalized: d,
                sparse_normalized: s,
            }
        })
        .collect();

    results.sort_by(|a, b| {
        b.final_score
            .partial_cmp(&a.final_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    results
}
