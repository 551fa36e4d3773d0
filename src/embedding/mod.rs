//! Embedding adapter (C1): deterministic text→dense vector.
//!
//! The memory core treats the embedding model as an external collaborator
//! (§1), so the public contract here is a trait, not a model loader.
//! `HashingEmbedder` is the deterministic default/test implementation: a
//! signed hashing-trick bag-of-words projection, L2-normalized so dot
//! product equals cosine similarity (§4.1 / testable property 1).
//! Production callers are expected to supply their own `EmbeddingProvider`
//! backed by a real model; nothing else in this crate depends on which one
//! is in use.

use async_trait::async_trait;

use crate::error::{MemoryError, Result};

/// Contract for C1: `embed`, `embed_query`, `embed_batch`.
///
/// `embed_query` defaults to `embed` but implementations may override it to
/// apply a query-side instruction prefix, as long as the result lives in the
/// same vector space (§4.1).
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single passage.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of passages. Default implementation calls `embed` per
    /// item; implementations backed by a batching model should override it.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    /// Embed a query string. Defaults to `embed`.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(text).await
    }

    /// Fixed dimension of vectors this provider produces.
    fn dimension(&self) -> usize;

    /// Human-readable identifier for the backend/model in use, surfaced
    /// verbatim as `MemoryManager::summary`'s `backend` field (spec §6).
    /// Production providers should override this with a real model name;
    /// the default is deliberately generic.
    fn name(&self) -> &str {
        "custom"
    }
}

/// Deterministic hashing-trick embedder.
///
/// Tokens are lowercased, hashed into `dimension` signed buckets (the sign
/// of the hash flips the contribution, standard feature-hashing practice),
/// counted, and the resulting vector is L2-normalized. Two calls on the same
/// text in the same process always produce bit-identical vectors — no
/// randomness, no model I/O, no startup cost — satisfying §4.1's
/// "deterministic given identical inputs" requirement for every caller that
/// doesn't plug in a real model.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        assert!(dimension > 0, "embedding dimension must be positive");
        Self { dimension }
    }

    fn project(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dimension];
        for token in text.split_whitespace() {
            let token: String = token
                .chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase();
            if token.is_empty() {
                continue;
            }
            let h = fnv1a(&token);
            let bucket = (h % self.dimension as u64) as usize;
            let sign = if (h >> 63) & 1 == 0 { 1.0 } else { -1.0 };
            v[bucket] += sign;
        }
        l2_normalize(&mut v);
        v
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(MemoryError::InvalidInput("empty text".to_string()));
        }
        Ok(self.project(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "hashing-bow"
    }
}

/// FNV-1a 64-bit hash, used instead of `DefaultHasher` (whose algorithm is
/// not guaranteed stable across Rust versions) so embeddings stay
/// byte-identical across builds.
fn fnv1a(s: &str) -> u64 {
    const OFFSET: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;
    let mut hash = OFFSET;
    for byte in s.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

/// L2-normalize in place. Zero vectors are left as-is (norm 0).
pub fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Cosine similarity between two equal-length vectors. Assumes both are
/// already L2-normalized (callers in this crate always embed through
/// `EmbeddingProvider`, which guarantees this); falls back to the full
/// formula otherwise so it stays correct for externally supplied vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
