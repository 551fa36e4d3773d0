//! Semantic chunker (C8): splits long-form text into topic-coherent chunks
//! using embedding similarity between consecutive sentences.
//!
//! Grounded on a Python `SemanticChunker.split_text` implementation:
//! sentence split → embed → consecutive
//! cosine similarity → percentile breakpoint → merge small chunks. The
//! sentence splitter and size-boundary handling borrow
//! `file_loader/chunker.rs`'s char-boundary discipline, since this module's
//! text comes from arbitrary caller input rather than a pre-validated corpus.

use std::sync::Arc;

use regex::Regex;

use crate::config::ChunkerConfig;
use crate::embedding::{cosine_similarity, EmbeddingProvider};
use crate::error::Result;

/// One semantically coherent chunk produced by `split_text`.
#[derive(Debug, Clone)]
pub struct SemanticChunk {
    pub text: String,
    pub sentence_start: usize,
    pub sentence_end: usize,
}

/// Splits text into sentences, embeds them, and groups consecutive sentences
/// into chunks at similarity breakpoints.
pub struct SemanticChunker {
    config: ChunkerConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    sentence_boundary: Regex,
}

impl SemanticChunker {
    pub fn new(config: ChunkerConfig, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            config,
            embedder,
            #[allow(clippy::unwrap_used)]
            sentence_boundary: Regex::new(r"[.!?]+[\s\n]+").unwrap(),
        }
    }

    /// Split `text` on `. ! ?` followed by whitespace, keeping the
    /// terminating punctuation attached to the sentence it closes.
    fn split_into_sentences(&self, text: &str) -> Vec<String> {
        let mut sentences = Vec::new();
        let mut last_end = 0;
        for m in self.sentence_boundary.find_iter(text) {
            let sentence = text[last_end..m.end()].trim();
            if !sentence.is_empty() {
                sentences.push(sentence.to_string());
            }
            last_end = m.end();
        }
        let tail = text[last_end..].trim();
        if !tail.is_empty() {
            sentences.push(tail.to_string());
        }
        if sentences.is_empty() {
            vec![text.to_string()]
        } else {
            sentences
        }
    }

    fn find_split_points(&self, similarities: &[f32]) -> Vec<usize> {
        if similarities.is_empty() {
            return Vec::new();
        }
        let mut sorted = similarities.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let rank = 100usize.saturating_sub(self.config.percentile as usize);
        let idx = ((rank as f32 / 100.0) * (sorted.len() - 1) as f32).round() as usize;
        let percentile_threshold = sorted[idx.min(sorted.len() - 1)];
        let threshold = percentile_threshold.max(self.config.absolute_floor);

        similarities
            .iter()
            .enumerate()
            .filter(|(_, &sim)| sim < threshold)
            .map(|(i, _)| i + 1)
            .collect()
    }

    fn merge_small_chunks(&self, chunks: Vec<SemanticChunk>) -> Vec<SemanticChunk> {
        if chunks.is_empty() {
            return chunks;
        }
        let mut merged = Vec::new();
        let mut current = chunks[0].clone();
        for next in chunks.into_iter().skip(1) {
            if current.text.len() < self.config.min_chars {
                current = SemanticChunk {
                    text: format!("{} {}", current.text, next.text),
                    sentence_start: current.sentence_start,
                    sentence_end: next.sentence_end,
                };
            } else {
                merged.push(current);
                current = next;
            }
        }
        merged.push(current);
        merged
    }

    /// Enforce `max_chars` on a chunk by splitting at the nearest whitespace
    /// boundary under the limit, recursing on the remainder.
    fn enforce_max_chars(&self, text: &str) -> Vec<String> {
        if text.len() <= self.config.max_chars {
            return vec![text.to_string()];
        }
        let mut end = self.config.max_chars.min(text.len());
        while end > 0 && !text.is_char_boundary(end) {
            end -= 1;
        }
        let split_at = text[..end]
            .rfind(char::is_whitespace)
            .map(|p| p + 1)
            .unwrap_or(end)
            .max(1);
        let (head, tail) = text.split_at(split_at);
        let mut out = vec![head.trim().to_string()];
        if !tail.trim().is_empty() {
            out.extend(self.enforce_max_chars(tail.trim()));
        }
        out
    }

    /// Split `text` into semantically coherent chunks (§4.8). Text
    /// shorter than `min_chars`, or with a single sentence, is returned as
    /// one chunk unchanged.
    pub async fn split_text(&self, text: &str) -> Result<Vec<SemanticChunk>> {
        if text.is_empty() || text.len() < self.config.min_chars {
            return Ok(vec![SemanticChunk {
                text: text.to_string(),
                sentence_start: 0,
                sentence_end: 1,
            }]);
        }

        let sentences = self.split_into_sentences(text);
        if sentences.len() <= 1 {
            return Ok(vec![SemanticChunk {
                text: text.to_string(),
                sentence_start: 0,
                sentence_end: sentences.len(),
            }]);
        }

        let embeddings = self.embedder.embed_batch(&sentences).await?;

        let similarities: Vec<f32> = embeddings
            .windows(2)
            .map(|w| cosine_similarity(&w[0], &w[1]))
            .collect();

        let split_points = self.find_split_points(&similarities);

        let mut boundaries = vec![0];
        boundaries.extend(split_points);
        boundaries.push(sentences.len());
        boundaries.dedup();

        let chunks: Vec<SemanticChunk> = boundaries
            .windows(2)
            .map(|w| SemanticChunk {
                text: sentences[w[0]..w[1]].join(" "),
                sentence_start: w[0],
                sentence_end: w[1],
            })
            .collect();

        let merged = self.merge_small_chunks(chunks);

        let mut final_chunks = Vec::new();
        for chunk in merged {
            for piece in self.enforce_max_chars(&chunk.text) {
                final_chunks.push(SemanticChunk {
                    text: piece,
                    sentence_start: chunk.sentence_start,
                    sentence_end: chunk.sentence_end,
                });
            }
        }
        Ok(final_chunks)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::embedding::HashingEmbedder;

    fn chunker() -> SemanticChunker {
        SemanticChunker::new(ChunkerConfig::default(), Arc::new(HashingEmbedder::new(64)))
    }

    #[tokio::test]
    async fn short_text_is_a_single_chunk() {
        let chunker = chunker();
        let chunks = chunker.split_text("Too short.").await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Too short.");
    }

    #[tokio::test]
    async fn splits_topic_shift_into_multiple_chunks() {
        let chunker = chunker();
        let text = "Nuclear reactors generate electricity through controlled fission. \
                     Fission releases enormous amounts of heat energy. \
                     Meanwhile, tropical rainforests host over half of the planet's species. \
                     Rainforests are disappearing due to agricultural expansion.";
        let chunks = chunker.split_text(text).await.unwrap();
        assert!(chunks.len() >= 2, "expected a topic split, got {} chunks", chunks.len());
    }

    #[tokio::test]
    async fn no_chunk_exceeds_max_chars() {
        let mut config = ChunkerConfig::default();
        config.max_chars = 60;
        config.min_chars = 10;
        let chunker = SemanticChunker::new(config, Arc::new(HashingEmbedder::new(32)));
        let text = "word ".repeat(60);
        let chunks = chunker.split_text(&text).await.unwrap();
        for c in &chunks {
            assert!(c.text.len() <= 60, "chunk too long: {} chars", c.text.len());
        }
    }

    #[tokio::test]
    async fn all_text_is_preserved_across_chunks() {
        let chunker = chunker();
        let text = "First idea here in full. Second idea follows right after. \
                     Third idea wraps things up nicely.";
        let chunks = chunker.split_text(text).await.unwrap();
        let rejoined: String = chunks.iter().map(|c| c.text.as_str()).collect::<Vec<_>>().join(" ");
        for word in ["First", "Second", "Third"] {
            assert!(rejoined.contains(word));
        }
    }
}
