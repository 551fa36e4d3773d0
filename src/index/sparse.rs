//! Sparse index (C3): BM25-style lexical scoring over a tokenized corpus.
//!
//! Grounded on `embedding/bm25.rs` (`BM25Config`,
//! `calculate_bm25_score`) and `embedding/mod.rs`'s `Bm25Embedding`, adapted
//! so that document-frequency and average-length statistics are maintained
//! incrementally on insert/remove, as §4.3 requires, rather than
//! rebuilt from a fixed training corpus.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use unicode_normalization::UnicodeNormalization;

use crate::error::Result;

/// A fixed English stop-word set, per §4.3. Not exhaustive — just the
/// closed-class words whose IDF would otherwise drown out content terms.
static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "an", "the", "and", "or", "but", "if", "then", "else", "of", "in", "on", "at", "to",
        "for", "with", "without", "by", "from", "as", "is", "are", "was", "were", "be", "been",
        "being", "it", "its", "this", "that", "these", "those", "i", "you", "he", "she", "we",
        "they", "them", "his", "her", "their", "our", "your", "what", "which", "who", "whom",
        "do", "does", "did", "have", "has", "had", "not", "no", "so", "than", "too", "very",
        "can", "will", "just", "about", "into", "over", "after", "before", "up", "down", "out",
        "off", "again", "further", "once", "here", "there", "when", "where", "why", "how", "all",
        "any", "both", "each", "few", "more", "most", "other", "some", "such", "only", "own",
        "same",
    ]
    .into_iter()
    .collect()
});

/// Lowercase, Unicode-aware word split, strip punctuation, drop stop words.
/// No stemming, per §4.3.
pub fn tokenize(text: &str) -> Vec<String> {
    text.nfkc()
        .collect::<String>()
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty() && !STOP_WORDS.contains(*w))
        .map(|w| w.to_string())
        .collect()
}

struct DocStats {
    term_counts: HashMap<String, usize>,
    length: usize,
}

/// Incremental BM25 index (k1, b configurable; defaults 1.5 / 0.75).
pub struct SparseIndex {
    k1: f32,
    b: f32,
    docs: HashMap<String, DocStats>,
    doc_freq: HashMap<String, usize>,
    total_length: usize,
}

impl SparseIndex {
    pub fn new(k1: f32, b: f32) -> Self {
        Self {
            k1,
            b,
            docs: HashMap::new(),
            doc_freq: HashMap::new(),
            total_length: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    fn avg_doc_length(&self) -> f32 {
        if self.docs.is_empty() {
            0.0
        } else {
            self.total_length as f32 / self.docs.len() as f32
        }
    }

    /// Index `text` under `id`, tokenizing internally.
    pub fn add(&mut self, id: String, text: &str) -> Result<()> {
        let tokens = tokenize(text);
        let mut term_counts: HashMap<String, usize> = HashMap::new();
        for t in &tokens {
            *term_counts.entry(t.clone()).or_insert(0) += 1;
        }
        for term in term_counts.keys() {
            *self.doc_freq.entry(term.clone()).or_insert(0) += 1;
        }
        self.total_length += tokens.len();
        self.docs.insert(
            id,
            DocStats {
                term_counts,
                length: tokens.len(),
            },
        );
        Ok(())
    }

    /// Remove `id`; returns whether it was present. Decrements document
    /// frequencies and total length so corpus statistics stay exact.
    pub fn remove(&mut self, id: &str) -> bool {
        if let Some(stats) = self.docs.remove(id) {
            for term in stats.term_counts.keys() {
                if let Some(df) = self.doc_freq.get_mut(term) {
                    *df = df.saturating_sub(1);
                    if *df == 0 {
                        self.doc_freq.remove(term);
                    }
                }
            }
            self.total_length = self.total_length.saturating_sub(stats.length);
            true
        } else {
            false
        }
    }

    pub fn clear(&mut self) {
        self.docs.clear();
        self.doc_freq.clear();
        self.total_length = 0;
    }

    fn idf(&self, term: &str) -> f32 {
        let n = self.docs.len() as f32;
        let df = *self.doc_freq.get(term).unwrap_or(&0) as f32;
        if df == 0.0 {
            return 0.0;
        }
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    /// Top-`k` by BM25 score, descending, ties broken by id.
    pub fn search(&self, query_tokens: &[String], k: usize) -> Vec<(String, f32)> {
        if self.docs.is_empty() || k == 0 || query_tokens.is_empty() {
            return Vec::new();
        }
        let avg_len = self.avg_doc_length();
        let mut scored: Vec<(String, f32)> = self
            .docs
            .iter()
            .map(|(id, stats)| {
                let mut score = 0.0f32;
                for term in query_tokens {
                    let tf = *stats.term_counts.get(term).unwrap_or(&0) as f32;
                    if tf == 0.0 {
                        continue;
                    }
                    let idf = self.idf(term);
                    let numerator = tf * (self.k1 + 1.0);
                    let denominator = tf
                        + self.k1 * (1.0 - self.b + self.b * stats.length as f32 / avg_len.max(1.0));
                    score += idf * numerator / denominator;
                }
                (id.clone(), score)
            })
            .filter(|(_, score)| *score > 0.0)
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(k);
        scored
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn tokenizer_lowercases_strips_punctuation_and_stopwords() {
        let tokens = tokenize("The Capital of Italy is Rome!");
        assert_eq!(tokens, vec!["capital", "italy", "rome"]);
    }

    #[test]
    fn scores_are_non_negative() {
        let mut idx = SparseIndex::new(1.5, 0.75);
        idx.add("a".into(), "the capital of france is paris").unwrap();
        idx.add("b".into(), "the capital of italy is rome").unwrap();
        let results = idx.search(&tokenize("what is the capital of italy"), 5);
        for (_, score) in &results {
            assert!(*score >= 0.0);
        }
    }

    #[test]
    fn disambiguates_lexically_similar_documents() {
        let mut idx = SparseIndex::new(1.5, 0.75);
        idx.add("a".into(), "The capital of France is Paris").unwrap();
        idx.add("b".into(), "The capital of Italy is Rome").unwrap();
        idx.add("c".into(), "Paris is known for the Eiffel Tower").unwrap();

        let results = idx.search(&tokenize("What is the capital of Italy?"), 3);
        assert_eq!(results[0].0, "b");
    }

    #[test]
    fn remove_recomputes_statistics() {
        let mut idx = SparseIndex::new(1.5, 0.75);
        idx.add("a".into(), "rust systems programming").unwrap();
        idx.add("b".into(), "rust memory safety").unwrap();
        assert!(idx.remove("a"));
        assert_eq!(idx.len(), 1);
        let results = idx.search(&tokenize("rust"), 5);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, "b");
    }
}
