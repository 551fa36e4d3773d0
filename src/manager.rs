//! Memory manager (C10): orchestrates the long-term store, short-term
//! buffer, chunker, and fetch cache behind the public API, and assembles the
//! 4-zone context payload.
//!
//! Grounded on a Python `MemoryEnhancedAgent.generate`'s context-build call
//! and its `add_interaction`'s `store_in_rag` flag for the orchestration
//! shape, generalized away from that module's LLM-calling responsibilities
//! (out of scope here) down to payload assembly and storage.

use std::sync::Arc;

use regex::Regex;

use crate::buffer::{RenderStyle, ShortTermBuffer};
use crate::cache::{ExternalFetchCache, Summarizer};
use crate::chunker::SemanticChunker;
use crate::config::MemoryConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::models::Metadata;
use crate::rerank::CrossEncoderScorer;
use crate::store::{LongTermStore, SearchOptions};

fn url_regex() -> &'static Regex {
    static RE: once_cell::sync::Lazy<Regex> = once_cell::sync::Lazy::new(|| {
        #[allow(clippy::unwrap_used)]
        Regex::new(r#"https?://[^\s<>"{}|\\^`\[\]]+"#).unwrap()
    });
    &RE
}

/// Summary of the manager's current state (§6: `summary() → {turn_counter,
/// short_term_count, long_term_count, backend}`), plus the short-term
/// buffer's own richer summary and the active debate id.
#[derive(Debug, Clone)]
pub struct ManagerSummary {
    pub turn_counter: u64,
    pub short_term_count: usize,
    pub long_term_count: usize,
    /// Identifies the active embedding backend (§4.1's "changing models
    /// requires rebuilding" language) — the embedding provider's `name()`.
    pub backend: String,
    pub short_term: crate::buffer::BufferSummary,
    pub debate_id: Option<String>,
}

/// Options for `build_context_payload` (§4.10).
#[derive(Debug, Clone)]
pub struct ContextOptions<'a> {
    pub query: Option<&'a str>,
    pub k: usize,
    pub use_short: bool,
    pub use_long: bool,
    pub enable_web: bool,
}

impl Default for ContextOptions<'_> {
    fn default() -> Self {
        Self {
            query: None,
            k: 4,
            use_short: true,
            use_long: true,
            enable_web: false,
        }
    }
}

/// Orchestrates C6-C9 and exposes the crate's public surface (§6).
pub struct MemoryManager {
    long_term: LongTermStore,
    short_term: parking_lot::Mutex<ShortTermBuffer>,
    chunker: SemanticChunker,
    cache: ExternalFetchCache,
    chunk_threshold: usize,
    turn: std::sync::atomic::AtomicU64,
    debate_id: parking_lot::Mutex<Option<String>>,
    backend: String,
}

impl MemoryManager {
    pub fn new(config: MemoryConfig, embedder: Arc<dyn EmbeddingProvider>, cache: ExternalFetchCache) -> Self {
        let backend = embedder.name().to_string();
        let long_term = LongTermStore::new(
            embedder.clone(),
            config.bm25_k1,
            config.bm25_b,
            config.hybrid_vector_weight,
            config.enable_query_classifier,
            config.similarity_threshold,
            config.enable_reranking,
            config.reranker_fusion_weight,
            config.k_rerank_pool_factor,
            config.metadata_boost,
        );
        let chunker = SemanticChunker::new(config.chunker.clone(), embedder);
        Self {
            long_term,
            short_term: parking_lot::Mutex::new(ShortTermBuffer::new(config.short_term_window)),
            chunker,
            cache,
            chunk_threshold: config.chunk_threshold,
            turn: std::sync::atomic::AtomicU64::new(0),
            debate_id: parking_lot::Mutex::new(None),
            backend,
        }
    }

    /// Move to a new conversation: reset the turn counter, clear the
    /// short-term buffer, and remember `debate_id` so it gets stamped into
    /// every subsequent `add_interaction`'s metadata. Preserves the
    /// long-term store (§4.10, §3's `debate_id` metadata key).
    pub fn set_context(&self, debate_id: &str) {
        *self.debate_id.lock() = Some(debate_id.to_string());
        self.short_term.lock().clear();
        self.turn.store(0, std::sync::atomic::Ordering::SeqCst);
    }

    /// Record one conversational turn: push to C7 and, if `store_long`,
    /// insert into C6 (chunking first when the content exceeds
    /// `chunk_threshold`). Stamps the turn number into the stored metadata.
    ///
    /// Returns the turn number plus the ids of any long-term entries created
    /// (§6: `add_interaction(...) → {turn, id?}`). A chunked insert produces
    /// one id per chunk; `store_long=false` yields an empty id list.
    pub async fn add_interaction(
        &self,
        role: &str,
        content: &str,
        mut metadata: Metadata,
        store_long: bool,
    ) -> Result<(u64, Vec<String>)> {
        let turn = self.turn.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
        metadata.insert("turn".to_string(), serde_json::Value::from(turn));
        if let Some(debate_id) = self.debate_id.lock().clone() {
            metadata.insert("debate_id".to_string(), serde_json::Value::from(debate_id));
        }

        self.short_term.lock().push(role, content, metadata.clone())?;

        let mut ids = Vec::new();
        if store_long {
            if content.len() > self.chunk_threshold {
                let chunks = self.chunker.split_text(content).await?;
                for chunk in chunks {
                    ids.push(self.long_term.insert(&chunk.text, metadata.clone()).await?);
                }
            } else {
                ids.push(self.long_term.insert(content, metadata).await?);
            }
        }

        Ok((turn, ids))
    }

    /// Search the long-term store (§4.6).
    pub async fn search(
        &self,
        query: &str,
        k: usize,
        options: SearchOptions,
        scorer: Option<&dyn CrossEncoderScorer>,
    ) -> Result<Vec<crate::models::RetrievalResult>> {
        self.long_term.search(query, k, options, scorer).await
    }

    /// Insert raw text directly into the long-term store, bypassing C7.
    pub async fn insert(&self, text: &str, metadata: Metadata) -> Result<String> {
        self.long_term.insert(text, metadata).await
    }

    /// Assemble the 4-zone context payload (§4.10). Zone ordering is
    /// fixed; missing optional zones are omitted entirely.
    pub async fn build_context_payload(
        &self,
        system_prompt: &str,
        current_task: &str,
        options: ContextOptions<'_>,
        summarizer: Option<&dyn Summarizer>,
        scorer: Option<&dyn CrossEncoderScorer>,
    ) -> Result<String> {
        let mut sections = Vec::new();

        sections.push(format!("[ZONE 1: SYSTEM PROMPT]\n{system_prompt}"));

        if options.use_long {
            let query = options.query.unwrap_or(current_task);
            let results = self
                .long_term
                .search(query, options.k, SearchOptions::default(), scorer)
                .await?;

            let mut zone2 = String::new();
            if results.is_empty() {
                zone2.push_str("[NO EXTERNAL EVIDENCE RETRIEVED]");
            } else {
                zone2.push_str("[ZONE 2: RETRIEVED EVIDENCE]\n");
                for (i, r) in results.iter().enumerate() {
                    zone2.push_str(&format!("{}. {}\n", i + 1, r.text));
                }
            }

            if options.enable_web {
                if let Some(url) = url_regex().find(current_task).map(|m| m.as_str()) {
                    match self.cache.fetch(url, summarizer, false).await {
                        Ok(fetched) => {
                            zone2.push_str(&format!(
                                "\n--- LIVE WEB CONTENT ---\n{}\n",
                                fetched.summary
                            ));
                        }
                        Err(e) => {
                            // Only persistence failures surface as `Err`
                            // here; fetch/network failures already degrade
                            // to an in-band error summary (§4.9, §7).
                            tracing::warn!("web cache persistence failed for {url}: {e}");
                        }
                    }
                }
            }

            sections.push(zone2.trim_end().to_string());
        }

        if options.use_short {
            let rendered = self.short_term.lock().render(None, RenderStyle::Conversational);
            sections.push(format!("[ZONE 3: SHORT-TERM MEMORY]\n{rendered}"));
        }

        sections.push(format!("[ZONE 4: CURRENT TASK]\n{current_task}"));

        Ok(sections.join("\n\n"))
    }

    pub fn summary(&self) -> ManagerSummary {
        let short_term = self.short_term.lock().summary();
        ManagerSummary {
            turn_counter: self.turn.load(std::sync::atomic::Ordering::SeqCst),
            short_term_count: short_term.current_count,
            long_term_count: self.long_term.len(),
            backend: self.backend.clone(),
            short_term,
            debate_id: self.debate_id.lock().clone(),
        }
    }

    /// Clear both the long-term store and the short-term buffer, and reset
    /// the turn counter and current debate id.
    pub fn clear_all(&self) {
        self.long_term.clear();
        self.short_term.lock().clear();
        self.turn.store(0, std::sync::atomic::Ordering::SeqCst);
        *self.debate_id.lock() = None;
    }
}
