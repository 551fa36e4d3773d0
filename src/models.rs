//! Shared data model: memory entries, messages, retrieval results, and the
//! typed score-component breakdown that replaces the source's dynamically
//! typed score dict (§9 redesign flag).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Free-form metadata with a handful of recognized keys, mirroring §3's
/// "recognized keys plus arbitrary user keys" entry.
pub type Metadata = HashMap<String, Value>;

/// Read `authority_score` / `recency_score` out of a metadata map, clamped
/// to the invariant in §3 (`in [0,1]` when present, else 0.0).
pub fn metadata_f32(meta: &Metadata, key: &str) -> f32 {
    meta.get(key)
        .and_then(Value::as_f64)
        .map(|v| v.clamp(0.0, 1.0) as f32)
        .unwrap_or(0.0)
}

/// A single entry stored in the long-term store (C6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub id: String,
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: Metadata,
}

/// Per-side score breakdown attached to a retrieval result (§9).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ScoreComponents {
    pub vector: Option<f32>,
    pub lexical: Option<f32>,
    /// Pre-rerank fusion score, present only when reranking ran.
    pub hybrid: Option<f32>,
}

/// One ranked hit returned from `search`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub id: String,
    pub text: String,
    /// Final score after fusion and (if enabled) reranking.
    pub score: f32,
    pub components: ScoreComponents,
    pub metadata: Metadata,
    /// 1-based rank within this call's result list.
    pub rank: usize,
    /// Set when a side of the index was unavailable and the result reflects
    /// a degraded (lexical-only or dense-only) path (§7).
    pub degraded: Option<String>,
}

/// A single turn in the short-term buffer (C7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub metadata: Metadata,
}

impl Message {
    /// `ROLE: content` rendering used by the conversational style.
    pub fn format_conversational(&self) -> String {
        format!("{}: {}", self.role.to_uppercase(), self.content)
    }
}

/// A cache record for a single URL (C9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheRecord {
    pub summary: String,
    pub timestamp: i64,
    pub original_length: usize,
    pub summary_length: usize,
}
