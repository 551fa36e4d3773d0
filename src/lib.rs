//! memory-core - hybrid retrieval-augmented memory core for multi-agent
//! debate systems.
//!
//! Combines dense (C2) and sparse (C3) retrieval behind an adaptive fusion
//! layer (C4), an optional cross-encoder reranker (C5), a bounded short-term
//! conversational buffer (C7), a semantic chunker for long-form content
//! (C8), and a TTL-backed external fetch cache (C9), orchestrated by the
//! Memory Manager (C10) which assembles the 4-zone context payload consumed
//! by downstream agents.

pub mod buffer;
pub mod cache;
pub mod chunker;
pub mod config;
pub mod embedding;
pub mod error;
pub mod fusion;
pub mod index;
pub mod manager;
pub mod models;
pub mod rerank;
pub mod store;

pub use cache::{CacheStats, ExternalFetchCache, FetchOrigin, FetchResult, Summarizer};
pub use chunker::{SemanticChunk, SemanticChunker};
pub use config::MemoryConfig;
pub use embedding::{EmbeddingProvider, HashingEmbedder};
pub use error::{MemoryError, Result};
pub use manager::{ContextOptions, ManagerSummary, MemoryManager};
pub use models::{MemoryEntry, Message, Metadata, RetrievalResult, ScoreComponents};
pub use rerank::CrossEncoderScorer;
pub use store::{LongTermStore, SearchOptions};

/// Crate version, read from `Cargo.toml` at build time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
