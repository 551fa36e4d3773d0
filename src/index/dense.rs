//! Dense index (C2): exact nearest-neighbor search over L2-normalized
//! vectors.
//!
//! Grounded on `db/hnsw_index.rs`'s id-bookkeeping shape, but
//! exact rather than approximate: §4.2 requires the index to be
//! deterministic across runs on an unchanged corpus, and an unseeded ANN
//! index does not guarantee that. Exact search over the corpus sizes this
//! core targets (short-term conversational memory, not a billion-vector
//! store) is cheap enough that the determinism is free.

use std::collections::HashMap;

use rayon::prelude::*;

use crate::embedding::cosine_similarity;
use crate::error::{MemoryError, Result};

/// Exact cosine-similarity dense index.
pub struct DenseIndex {
    dimension: usize,
    vectors: HashMap<String, Vec<f32>>,
}

impl DenseIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: HashMap::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Add a vector under `id`. Rejects a dimension mismatch (§4.1/§7:
    /// fatal at startup for an already-populated index; here, rejected per
    /// insert since this core builds the index incrementally).
    pub fn add(&mut self, id: String, vector: Vec<f32>) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(MemoryError::InvalidInput(format!(
                "dense index dimension mismatch: expected {}, got {}",
                self.dimension,
                vector.len()
            )));
        }
        self.vectors.insert(id, vector);
        Ok(())
    }

    /// Remove `id`; returns whether it was present.
    pub fn remove(&mut self, id: &str) -> bool {
        self.vectors.remove(id).is_some()
    }

    pub fn clear(&mut self) {
        self.vectors.clear();
    }

    /// Top-`k` by cosine similarity, descending, ties broken by id so that
    /// results are reproducible across runs.
    ///
    /// Fails with `IndexFailure` if `query`'s length doesn't match the
    /// index's dimension (§4.6/§7: an index-level failure, distinct from
    /// the `InvalidInput` `add` returns, since by the time a query reaches
    /// here the mismatch is the embedding provider's dimension lying about
    /// its own output, not caller error). Callers degrade to the
    /// surviving side rather than surface this to the end caller.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(String, f32)>> {
        if self.vectors.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(MemoryError::IndexFailure(format!(
                "dense index query dimension mismatch: expected {}, got {}",
                self.dimension,
                query.len()
            )));
        }
        let mut scored: Vec<(String, f32)> = self
            .vectors
            .par_iter()
            .map(|(id, vec)| (id.clone(), cosine_similarity(query, vec)))
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(k);
        Ok(scored)
    }
}
