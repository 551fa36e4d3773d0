//! Long-term store (C6): owns the dense and sparse indices plus the
//! id→(text, metadata) map, and orchestrates search through fusion and the
//! optional reranker.
//!
//! Grounded on `db/hybrid_search.rs`'s orchestration shape and
//! `db/hnsw_index.rs`'s store-level API. The single-writer/multi-reader
//! discipline §5 asks for is implemented with `parking_lot::RwLock`
//! around the two indices, the same lock reached for elsewhere
//! in `db/` and `cache/` for exactly this kind of shared mutable state.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::config::MetadataBoostConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{MemoryError, Result};
use crate::fusion::{classifier, fuse};
use crate::index::sparse::tokenize;
use crate::index::{DenseIndex, SparseIndex};
use crate::models::{Metadata, RetrievalResult, ScoreComponents};
use crate::rerank::{self, CrossEncoderScorer, RerankCandidate};

struct StoredEntry {
    text: String,
    metadata: Metadata,
}

/// Options for a single `search` call, overriding the store's configured
/// defaults (§4.6).
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub threshold: Option<f32>,
    pub enable_rerank: Option<bool>,
}

/// Owns C2 (dense) + C3 (sparse) and the raw text/metadata map.
pub struct LongTermStore {
    dense: RwLock<DenseIndex>,
    sparse: RwLock<SparseIndex>,
    entries: DashMap<String, StoredEntry>,
    embedder: Arc<dyn EmbeddingProvider>,
    default_alpha: f32,
    enable_classifier: bool,
    default_threshold: f32,
    default_rerank: bool,
    reranker_weight: f32,
    k_rerank_pool_factor: usize,
    metadata_boost: MetadataBoostConfig,
}

impl LongTermStore {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        bm25_k1: f32,
        bm25_b: f32,
        default_alpha: f32,
        enable_classifier: bool,
        default_threshold: f32,
        default_rerank: bool,
        reranker_weight: f32,
        k_rerank_pool_factor: usize,
        metadata_boost: MetadataBoostConfig,
    ) -> Self {
        let dimension = embedder.dimension();
        Self {
            dense: RwLock::new(DenseIndex::new(dimension)),
            sparse: RwLock::new(SparseIndex::new(bm25_k1, bm25_b)),
            entries: DashMap::new(),
            embedder,
            default_alpha,
            enable_classifier,
            default_threshold,
            default_rerank,
            reranker_weight,
            k_rerank_pool_factor,
            metadata_boost,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert `text` with `metadata`, generating and returning a fresh id.
    /// Rejects empty text (§4.6).
    pub async fn insert(&self, text: &str, metadata: Metadata) -> Result<String> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(MemoryError::InvalidInput("text must not be empty".to_string()));
        }

        let embedding = self
            .embedder
            .embed(trimmed)
            .await
            .map_err(|e| MemoryError::EmbeddingFailure(e.to_string()))?;

        let id = Uuid::new_v4().to_string();

        self.dense.write().add(id.clone(), embedding)?;
        self.sparse.write().add(id.clone(), trimmed)?;
        self.entries.insert(
            id.clone(),
            StoredEntry {
                text: trimmed.to_string(),
                metadata,
            },
        );

        Ok(id)
    }

    /// Remove `id` from both indices and the metadata map.
    pub fn remove(&self, id: &str) -> bool {
        let in_dense = self.dense.write().remove(id);
        let in_sparse = self.sparse.write().remove(id);
        let in_map = self.entries.remove(id).is_some();
        in_dense || in_sparse || in_map
    }

    pub fn clear(&self) {
        self.dense.write().clear();
        self.sparse.write().clear();
        self.entries.clear();
    }

    /// Search for `query`, returning up to `k` ranked results (§4.6).
    pub async fn search(
        &self,
        query: &str,
        k: usize,
        options: SearchOptions,
        scorer: Option<&dyn CrossEncoderScorer>,
    ) -> Result<Vec<RetrievalResult>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let enable_rerank = options.enable_rerank.unwrap_or(self.default_rerank) && scorer.is_some();
        let pool = if enable_rerank {
            k * self.k_rerank_pool_factor.max(1)
        } else {
            k
        };

        // §4.6: an embedding failure during search is raised to the caller,
        // unlike an index-level failure, which degrades to the surviving
        // side with a log (handled below for the sparse-empty case).
        let query_embedding = self
            .embedder
            .embed_query(query)
            .await
            .map_err(|e| MemoryError::EmbeddingFailure(e.to_string()))?;
        let query_tokens = tokenize(query);

        let mut degraded: Option<&'static str> = None;

        // Dense and sparse search are issued concurrently and joined before
        // fusion (§5); neither suspends on anything but the embedding
        // call above, already awaited.
        let dense_search = async { self.dense.read().search(&query_embedding, pool) };
        let sparse_search = async { self.sparse.read().search(&query_tokens, pool) };
        let (dense_result, sparse_hits) = tokio::join!(dense_search, sparse_search);

        // §4.6/§7: a dense index failure degrades to sparse-only rather
        // than surfacing to the caller, unlike the embedding failure above.
        let dense_hits = match dense_result {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!("dense index search failed, degrading to sparse-only: {e}");
                degraded = Some("dense-index-unavailable");
                Vec::new()
            }
        };

        if sparse_hits.is_empty() && !self.sparse.read().is_empty() && query_tokens.is_empty() {
            degraded = Some("lexical-query-empty");
        }

        let alpha = classifier::resolve_alpha(
            query,
            self.default_alpha,
            self.enable_classifier,
            0.97,
            0.70,
        );

        let entries = &self.entries;
        let fused = fuse(&dense_hits, &sparse_hits, alpha, &self.metadata_boost, |id| {
            entries.get(id).map(|e| e.metadata.clone())
        });

        let dense_scores: std::collections::HashMap<String, f32> = dense_hits.into_iter().collect();
        let sparse_scores: std::collections::HashMap<String, f32> = sparse_hits.into_iter().collect();

        let mut ranked: Vec<RetrievalResult> = if enable_rerank {
            let pool_candidates: Vec<RerankCandidate> = fused
                .iter()
                .take(pool)
                .filter_map(|f| {
                    self.entries.get(&f.id).map(|e| RerankCandidate {
                        id: f.id.clone(),
                        text: e.text.clone(),
                        fusion_score: f.final_score,
                    })
                })
                .collect();

            // SAFETY: enable_rerank implies scorer.is_some() above.
            #[allow(clippy::unwrap_used)]
            let scorer = scorer.unwrap();
            let reranked = rerank::rerank(scorer, query, pool_candidates, self.reranker_weight, pool).await;

            reranked
                .into_iter()
                .filter_map(|r| {
                    let entry = self.entries.get(&r.id)?;
                    Some(RetrievalResult {
                        id: r.id.clone(),
                        text: entry.text.clone(),
                        score: r.blended_score,
                        components: ScoreComponents {
                            vector: dense_scores.get(&r.id).copied(),
                            lexical: sparse_scores.get(&r.id).copied(),
                            hybrid: fused
                                .iter()
                                .find(|f| f.id == r.id)
                                .map(|f| f.final_score),
                        },
                        metadata: entry.metadata.clone(),
                        rank: 0,
                        degraded: degraded.map(str::to_string),
                    })
                })
                .collect()
        } else {
            fused
                .into_iter()
                .filter_map(|f| {
                    let entry = self.entries.get(&f.id)?;
                    Some(RetrievalResult {
                        id: f.id.clone(),
                        text: entry.text.clone(),
                        score: f.final_score,
                        components: ScoreComponents {
                            vector: dense_scores.get(&f.id).copied(),
                            lexical: sparse_scores.get(&f.id).copied(),
                            hybrid: None,
                        },
                        metadata: entry.metadata.clone(),
                        rank: 0,
                        degraded: degraded.map(str::to_string),
                    })
                })
                .collect()
        };

        let threshold = options.threshold.unwrap_or(self.default_threshold);
        ranked.retain(|r| r.score >= threshold);
        ranked.truncate(k);
        for (i, r) in ranked.iter_mut().enumerate() {
            r.rank = i + 1;
        }

        Ok(ranked)
    }
}
