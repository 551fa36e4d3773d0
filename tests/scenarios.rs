//! End-to-end scenarios from the component spec (S1-S6), exercised through
//! the public API only.
#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::Arc;

use memory_core::{
    ContextOptions, ExternalFetchCache, HashingEmbedder, MemoryConfig, MemoryManager, SearchOptions,
};

fn test_manager() -> MemoryManager {
    let embedder = Arc::new(HashingEmbedder::new(96));
    let cache = ExternalFetchCache::new(memory_core::config::CacheConfig::default())
        .expect("fetch cache without persistence never fails to construct");
    MemoryManager::new(MemoryConfig::default(), embedder, cache)
}

/// S1 - Lexical disambiguation: a query sharing surface vocabulary with two
/// documents should still rank the document it's actually about first.
#[tokio::test]
async fn s1_lexical_disambiguation() {
    let mgr = test_manager();
    mgr.insert("The capital of France is Paris", HashMap::new()).await.unwrap();
    let id_b = mgr
        .insert("The capital of Italy is Rome", HashMap::new())
        .await
        .unwrap();
    mgr.insert("Paris is known for the Eiffel Tower", HashMap::new())
        .await
        .unwrap();

    let results = mgr
        .search("What is the capital of Italy?", 3, SearchOptions::default(), None)
        .await
        .unwrap();

    assert_eq!(results[0].id, id_b, "expected Italy's capital document at rank 1");
    assert_eq!(results[0].rank, 1);
}

/// S2 - Semantic recall: the one relevant entry among unrelated filler turns
/// should surface in the top 3 for a paraphrased query.
#[tokio::test]
async fn s2_semantic_recall_among_filler() {
    let mgr = test_manager();
    let id_x = mgr
        .insert(
            "Nuclear energy is the safest energy source with the lowest death rate per terawatt-hour",
            HashMap::new(),
        )
        .await
        .unwrap();

    let filler_topics = [
        "The weather today is mild with a light breeze",
        "Stock markets closed slightly higher this afternoon",
        "The new bridge construction is ahead of schedule",
        "Local bakeries reported a busy holiday weekend",
        "The museum added a new dinosaur fossil exhibit",
        "City council approved funding for bike lanes",
        "A popular streaming service released its fall lineup",
        "The marathon route was changed due to road work",
        "Farmers reported a strong harvest this season",
        "The library extended its weekend hours",
    ];
    for text in filler_topics {
        mgr.insert(text, HashMap::new()).await.unwrap();
    }

    let results = mgr
        .search("how safe is nuclear power?", 5, SearchOptions::default(), None)
        .await
        .unwrap();

    let top_three: Vec<&str> = results.iter().take(3).map(|r| r.id.as_str()).collect();
    assert!(top_three.contains(&id_x.as_str()), "expected nuclear safety entry in top 3, got {top_three:?}");
}

/// S3 - Chunking: a long two-topic passage splits into multiple chunks, each
/// within the configured size bounds.
#[tokio::test]
async fn s3_chunking_respects_size_bounds() {
    let embedder = Arc::new(HashingEmbedder::new(64));
    let mut config = memory_core::config::ChunkerConfig::default();
    config.min_chars = 80;
    config.max_chars = 700;
    let chunker = memory_core::SemanticChunker::new(config.clone(), embedder);

    let paragraph_one = "Solar panels convert sunlight directly into electricity through the photovoltaic effect. \
                          Panel efficiency has steadily improved over the last two decades. \
                          Grid-scale solar farms now compete on cost with fossil fuel plants in many regions. ".repeat(2);
    let paragraph_two = "Coral reefs support roughly a quarter of all marine species despite covering a tiny fraction of the ocean floor. \
                          Rising ocean temperatures are causing widespread coral bleaching events. \
                          Conservation efforts increasingly focus on heat-resistant coral strains. ".repeat(2);
    let text = format!("{paragraph_one}{paragraph_two}");
    assert!(text.len() > 1200);

    let chunks = chunker.split_text(&text).await.unwrap();
    assert!(chunks.len() >= 2, "expected a topic-shift split, got {} chunk(s)", chunks.len());
    for chunk in &chunks {
        assert!(chunk.text.len() <= config.max_chars, "chunk exceeded max_chars: {}", chunk.text.len());
    }
}

/// S4 - Cache: a second fetch within the TTL returns the byte-identical
/// summary marked as cached, without a network round trip.
#[tokio::test]
async fn s4_cache_hit_is_byte_identical_and_marked_cached() {
    let cache = ExternalFetchCache::new(memory_core::config::CacheConfig::default()).unwrap();
    cache.seed("https://example.com", "a cached summary");

    let first = cache.fetch("https://example.com", None, false).await.unwrap();
    assert_eq!(first.origin, memory_core::FetchOrigin::Cached);

    let second = cache.fetch("https://example.com", None, false).await.unwrap();
    assert_eq!(second.origin, memory_core::FetchOrigin::Cached);
    assert_eq!(first.summary, second.summary);

    let stats = cache.stats();
    assert_eq!(stats.total_urls, 1);
}

/// S5 - Zone assembly: system prompt, task, short-term buffer, and long-term
/// hits all appear under their markers, in the fixed zone order.
#[tokio::test]
async fn s5_zone_assembly_includes_all_markers_in_order() {
    let mgr = test_manager();
    mgr.set_context("debate-1");

    mgr.add_interaction("user", "What did the opponent say about safety?", HashMap::new(), false)
        .await
        .unwrap();
    mgr.add_interaction(
        "opponent",
        "Nuclear waste storage remains an unsolved long-term problem.",
        HashMap::new(),
        true,
    )
    .await
    .unwrap();
    mgr.add_interaction(
        "proponent",
        "Modern dry cask storage has an excellent multi-decade safety record.",
        HashMap::new(),
        true,
    )
    .await
    .unwrap();

    let payload = mgr
        .build_context_payload(
            "You are ATLAS",
            "What did the opponent say about safety?",
            ContextOptions {
                k: 2,
                ..ContextOptions::default()
            },
            None,
            None,
        )
        .await
        .unwrap();

    let z1 = payload.find("[ZONE 1: SYSTEM PROMPT]").unwrap();
    let z2 = payload.find("ZONE 2").unwrap();
    let z3 = payload.find("[ZONE 3: SHORT-TERM MEMORY]").unwrap();
    let z4 = payload.find("[ZONE 4: CURRENT TASK]").unwrap();
    assert!(z1 < z2 && z2 < z3 && z3 < z4);
    assert!(payload.contains("dry cask storage") || payload.contains("waste storage"));
}

/// S6 - Degraded reranker: a failing cross-encoder falls back to fusion
/// order rather than surfacing an error to the caller.
#[tokio::test]
async fn s6_degraded_reranker_preserves_fusion_order() {
    use async_trait::async_trait;
    use memory_core::{CrossEncoderScorer, MemoryError, Result};

    struct OfflineScorer;

    #[async_trait]
    impl CrossEncoderScorer for OfflineScorer {
        async fn score_batch(&self, _query: &str, _texts: &[String]) -> Result<Vec<f32>> {
            Err(MemoryError::SummarizerUnavailable("cross-encoder offline".to_string()))
        }
    }

    let mut config = MemoryConfig::default();
    config.enable_reranking = true;

    let embedder = Arc::new(HashingEmbedder::new(64));
    let cache = ExternalFetchCache::new(memory_core::config::CacheConfig::default()).unwrap();
    let mgr = MemoryManager::new(config, embedder, cache);

    mgr.insert("renewable energy storage solutions", HashMap::new()).await.unwrap();
    mgr.insert("renewable energy grid integration challenges", HashMap::new()).await.unwrap();
    mgr.insert("renewable energy policy incentives worldwide", HashMap::new()).await.unwrap();

    let without_rerank = mgr
        .search(
            "renewable energy",
            3,
            SearchOptions {
                enable_rerank: Some(false),
                ..SearchOptions::default()
            },
            None,
        )
        .await
        .unwrap();

    let scorer = OfflineScorer;
    let with_failing_rerank = mgr
        .search(
            "renewable energy",
            3,
            SearchOptions {
                enable_rerank: Some(true),
                ..SearchOptions::default()
            },
            Some(&scorer),
        )
        .await
        .unwrap();

    let fusion_order: Vec<&str> = without_rerank.iter().map(|r| r.id.as_str()).collect();
    let degraded_order: Vec<&str> = with_failing_rerank.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(fusion_order, degraded_order);
}
