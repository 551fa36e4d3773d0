//! Error types for the memory core.

use thiserror::Error;

/// Main error type for memory core operations.
#[derive(Error, Debug)]
pub enum MemoryError {
    /// Caller passed empty text, a mismatched embedding dimension, or
    /// another structurally invalid input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The embedding function failed or is unavailable.
    #[error("embedding failure: {0}")]
    EmbeddingFailure(String),

    /// A dense or sparse index operation failed.
    #[error("index failure: {0}")]
    IndexFailure(String),

    /// An operation with a hard deadline (fetch, rerank batch) exceeded it.
    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The fetch cache's HTTP GET failed for a reason other than timeout.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The external summarizer could not be reached or errored.
    #[error("summarizer unavailable: {0}")]
    SummarizerUnavailable(String),

    /// Cache persistence failed to read or write its backing file.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for memory core operations.
pub type Result<T> = std::result::Result<T, MemoryError>;
