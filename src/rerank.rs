//! Reranker (C5): optional cross-encoder rescoring blended with the fusion
//! score.
//!
//! Grounded on a Python `LLMReranker.rerank` implementation: hybrid
//! vector/cross-encoder blend, min-max
//! normalization of the raw scorer output, and a hard rule that a scorer
//! failure degrades to the fusion order rather than surfacing an error
//! (§4.5 / §7).

use async_trait::async_trait;

use crate::error::Result;

/// External pairwise scorer the reranker calls per `(query, text)` pair.
/// Production callers implement this against a real cross-encoder; nothing
/// in this crate depends on which one.
#[async_trait]
pub trait CrossEncoderScorer: Send + Sync {
    /// Score a batch of `(query, text)` pairs. Implementations should
    /// return one raw score per input pair, same order. Returning `Err`
    /// signals scorer unavailability; the reranker treats that as a
    /// degraded path, not a caller-visible error.
    async fn score_batch(&self, query: &str, texts: &[String]) -> Result<Vec<f32>>;
}

/// One candidate going into the reranker: id, text, and its pre-rerank
/// fusion score, with its original position preserved.
#[derive(Debug, Clone)]
pub struct RerankCandidate {
    pub id: String,
    pub text: String,
    pub fusion_score: f32,
}

/// A reranked result: blended score plus the original fusion-order rank.
#[derive(Debug, Clone)]
pub struct RerankedResult {
    pub id: String,
    pub blended_score: f32,
    pub original_rank: usize,
}

fn min_max_normalize(values: &[f32]) -> Vec<f32> {
    if values.is_empty() {
        return Vec::new();
    }
    let min = values.iter().copied().fold(f32::INFINITY, f32::min);
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if (max - min).abs() < f32::EPSILON {
        return vec![0.5; values.len()];
    }
    values.iter().map(|v| (v - min) / (max - min)).collect()
}

/// Rerank `candidates` (already in fusion order) against `query`, blending
/// `w_v * fusion_normalized + (1 - w_v) * cross_normalized`. On scorer
/// failure, returns the fusion order unchanged truncated to `k` (§4.5,
/// §7, scenario S6) rather than propagating the error.
pub async fn rerank(
    scorer: &dyn CrossEncoderScorer,
    query: &str,
    candidates: Vec<RerankCandidate>,
    w_v: f32,
    k: usize,
) -> Vec<RerankedResult> {
    if candidates.is_empty() {
        return Vec::new();
    }

    let texts: Vec<String> = candidates.iter().map(|c| c.text.clone()).collect();
    let raw_scores = match scorer.score_batch(query, &texts).await {
        Ok(scores) if scores.len() == candidates.len() => scores,
        _ => {
            tracing::warn!("reranker unavailable or returned a mismatched batch; preserving fusion order");
            return candidates
                .into_iter()
                .enumerate()
                .map(|(rank, c)| RerankedResult {
                    id: c.id,
                    blended_score: c.fusion_score,
                    original_rank: rank + 1,
                })
                .take(k)
                .collect();
        }
    };

    let fusion_scores: Vec<f32> = candidates.iter().map(|c| c.fusion_score).collect();
    let fusion_normalized = min_max_normalize(&fusion_scores);
    let cross_normalized = min_max_normalize(&raw_scores);

    let mut results: Vec<RerankedResult> = candidates
        .into_iter()
        .enumerate()
        .map(|(i, c)| {
            let blended = w_v * fusion_normalized[i] + (1.0 - w_v) * cross_normalized[i];
            RerankedResult {
                id: c.id,
                blended_score: blended,
                original_rank: i + 1,
            }
        })
        .collect();

    results.sort_by(|a, b| {
        b.blended_score
            .partial_cmp(&a.blended_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.original_rank.cmp(&b.original_rank))
    });
    results.truncate(k);
    results
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    struct FixedScorer(Vec<f32>);

    #[async_trait]
    impl CrossEncoderScorer for FixedScorer {
        async fn score_batch(&self, _query: &str, _texts: &[String]) -> Result<Vec<f32>> {
            Ok(self.0.clone())
        }
    }

    struct FailingScorer;

    #[async_trait]
    impl CrossEncoderScorer for FailingScorer {
        async fn score_batch(&self, _query: &str, _texts: &[String]) -> Result<Vec<f32>> {
            Err(crate::error::MemoryError::SummarizerUnavailable(
                "offline".to_string(),
            ))
        }
    }

    fn candidates() -> Vec<RerankCandidate> {
        vec![
            RerankCandidate {
                id: "a".into(),
                text: "alpha".into(),
                fusion_score: 0.9,
            },
            RerankCandidate {
                id: "b".into(),
                text: "beta".into(),
                fusion_score: 0.5,
            },
            RerankCandidate {
                id: "c".into(),
                text: "gamma".into(),
                fusion_score: 0.1,
            },
        ]
    }

    #[tokio::test]
    async fn blends_fusion_and_cross_encoder_scores() {
        let scorer = FixedScorer(vec![0.1, 0.9, 0.5]);
        let results = rerank(&scorer, "q", candidates(), 0.5, 3).await;
        assert_eq!(results.len(), 3);
        assert!(results[0].blended_score >= results[1].blended_score);
    }

    #[tokio::test]
    async fn failing_scorer_preserves_fusion_order() {
        let results = rerank(&FailingScorer, "q", candidates(), 0.7, 3).await;
        assert_eq!(results.iter().map(|r| r.id.clone()).collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn truncates_to_k() {
        let scorer = FixedScorer(vec![0.1, 0.9, 0.5]);
        let results = rerank(&scorer, "q", candidates(), 0.5, 2).await;
        assert_eq!(results.len(), 2);
    }
}
