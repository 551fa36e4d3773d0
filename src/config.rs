//! Configuration for the memory core.
//!
//! Mirrors `config/vectorizer.rs`'s per-field `#[serde(default = "...")]`
//! pattern so that a partial YAML/JSON document merges
//! cleanly with documented defaults.

use serde::{Deserialize, Serialize};

/// Top-level configuration, covering every knob §6 names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// C7 capacity.
    #[serde(default = "MemoryConfig::default_short_term_window")]
    pub short_term_window: usize,

    /// C4 default dense weight, used when the classifier is disabled or
    /// does not fire.
    #[serde(default = "MemoryConfig::default_hybrid_vector_weight")]
    pub hybrid_vector_weight: f32,

    /// If false, `hybrid_vector_weight` is fixed and the classifier never runs.
    #[serde(default = "MemoryConfig::default_true")]
    pub enable_query_classifier: bool,

    /// Gates C5.
    #[serde(default)]
    pub enable_reranking: bool,

    /// C5 blend weight for the pre-rerank fusion score.
    #[serde(default = "MemoryConfig::default_reranker_fusion_weight")]
    pub reranker_fusion_weight: f32,

    /// C6 post-fusion score filter.
    #[serde(default)]
    pub similarity_threshold: f32,

    /// Default `k` for `search` when the caller does not override it.
    #[serde(default = "MemoryConfig::default_top_k")]
    pub top_k_default: usize,

    /// BM25 parameters.
    #[serde(default = "MemoryConfig::default_bm25_k1")]
    pub bm25_k1: f32,
    #[serde(default = "MemoryConfig::default_bm25_b")]
    pub bm25_b: f32,

    #[serde(default)]
    pub chunker: ChunkerConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub metadata_boost: MetadataBoostConfig,

    /// Turn text longer than this into chunks before C6 insertion from C10.
    #[serde(default = "MemoryConfig::default_chunk_threshold")]
    pub chunk_threshold: usize,

    /// Multiplier applied to `k` to size the reranker candidate pool
    /// (`k_rerank_pool = k_rerank_pool_factor * k`) when reranking is enabled.
    #[serde(default = "MemoryConfig::default_k_rerank_pool_factor")]
    pub k_rerank_pool_factor: usize,
}

impl MemoryConfig {
    fn default_short_term_window() -> usize {
        4
    }
    fn default_hybrid_vector_weight() -> f32 {
        0.90
    }
    fn default_true() -> bool {
        true
    }
    fn default_reranker_fusion_weight() -> f32 {
        0.7
    }
    fn default_top_k() -> usize {
        5
    }
    fn default_bm25_k1() -> f32 {
        1.5
    }
    fn default_bm25_b() -> f32 {
        0.75
    }
    fn default_chunk_threshold() -> usize {
        800
    }
    fn default_k_rerank_pool_factor() -> usize {
        4
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            short_term_window: Self::default_short_term_window(),
            hybrid_vector_weight: Self::default_hybrid_vector_weight(),
            enable_query_classifier: true,
            enable_reranking: false,
            reranker_fusion_weight: Self::default_reranker_fusion_weight(),
            similarity_threshold: 0.0,
            top_k_default: Self::default_top_k(),
            bm25_k1: Self::default_bm25_k1(),
            bm25_b: Self::default_bm25_b(),
            chunker: ChunkerConfig::default(),
            cache: CacheConfig::default(),
            metadata_boost: MetadataBoostConfig::default(),
            chunk_threshold: Self::default_chunk_threshold(),
            k_rerank_pool_factor: Self::default_k_rerank_pool_factor(),
        }
    }
}

/// C8 chunker knobs (§6 `chunker`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkerConfig {
    #[serde(default = "ChunkerConfig::default_min_chars")]
    pub min_chars: usize,
    #[serde(default = "ChunkerConfig::default_max_chars")]
    pub max_chars: usize,
    #[serde(default = "ChunkerConfig::default_floor")]
    pub absolute_floor: f32,
    #[serde(default = "ChunkerConfig::default_percentile")]
    pub percentile: u8,
}

impl ChunkerConfig {
    fn default_min_chars() -> usize {
        100
    }
    fn default_max_chars() -> usize {
        500
    }
    fn default_floor() -> f32 {
        0.5
    }
    fn default_percentile() -> u8 {
        75
    }
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            min_chars: Self::default_min_chars(),
            max_chars: Self::default_max_chars(),
            absolute_floor: Self::default_floor(),
            percentile: Self::default_percentile(),
        }
    }
}

/// C9 fetch cache knobs (§6 `cache`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "CacheConfig::default_ttl")]
    pub ttl_seconds: u64,
    #[serde(default = "CacheConfig::default_timeout")]
    pub http_timeout_seconds: u64,
    #[serde(default = "CacheConfig::default_max_summary_input")]
    pub max_summary_input: usize,
    #[serde(default = "CacheConfig::default_summary_max_words")]
    pub summary_max_words: usize,
    #[serde(default = "CacheConfig::default_user_agent")]
    pub user_agent: String,
}

impl CacheConfig {
    fn default_ttl() -> u64 {
        86_400
    }
    fn default_timeout() -> u64 {
        10
    }
    fn default_max_summary_input() -> usize {
        3_000
    }
    fn default_summary_max_words() -> usize {
        300
    }
    fn default_user_agent() -> String {
        "Mozilla/5.0 (compatible; MemoryCore-Bot/1.0)".to_string()
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: Self::default_ttl(),
            http_timeout_seconds: Self::default_timeout(),
            max_summary_input: Self::default_max_summary_input(),
            summary_max_words: Self::default_summary_max_words(),
            user_agent: Self::default_user_agent(),
        }
    }
}

/// Metadata boost knobs (§4.4 step 5). Both weights zero = no-op.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct MetadataBoostConfig {
    #[serde(default)]
    pub w_recency: f32,
    #[serde(default)]
    pub w_authority: f32,
    /// Whether the boost multiplies the fused score (default, Open Question
    /// (a) decision) or only the dense component.
    #[serde(default)]
    pub apply_to: BoostTarget,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum BoostTarget {
    #[default]
    Fused,
    DenseOnly,
}
