//! # Error Types Module
//!
//! This module defines the error taxonomy for raglite operations. Layer
//! errors ([`EmbeddingError`](crate::embeddings::EmbeddingError),
//! [`GenerationError`](crate::generation::GenerationError),
//! [`StoreError`](crate::persistence::StoreError)) nest into the top-level
//! [`RagLiteError`] so that callers can match on structured variants instead
//! of strings.

use thiserror::Error;

/// Main error type for raglite operations
#[derive(Error, Debug)]
pub enum RagLiteError {
    /// Chunker precondition violated: the window would never advance
    #[error("Chunking precondition violated: overlap {overlap} must be smaller than max_chars {max_chars}")]
    ChunkingPrecondition { max_chars: usize, overlap: usize },

    /// Vector dimension mismatch against the index's established dimensionality
    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Vector and metadata sequences of differing length presented together
    #[error("Vector/metadata length mismatch: {vectors} vectors, {metadata} metadata records")]
    LengthMismatch { vectors: usize, metadata: usize },

    /// Embedding provider or normalization layer error
    #[error("Embedding failed: {0}")]
    Embedding(#[from] crate::embeddings::EmbeddingError),

    /// Generation port error
    #[error("Generation failed: {0}")]
    Generation(#[from] crate::generation::GenerationError),

    /// Persistence error (save/load of index artifacts)
    #[error("Store error: {0}")]
    Store(#[from] crate::persistence::StoreError),

    /// Zero-length query rejected before any embedding call
    #[error("Query must not be empty")]
    EmptyQuery,

    /// Retrieval cap must allow at least one hit
    #[error("max_retrieval must be >= 1, got {0}")]
    InvalidMaxRetrieval(usize),

    /// Configuration file error
    #[error("Config error: {0}")]
    Config(String),

    /// Lock acquisition error (a writer panicked while holding the index lock)
    #[error("Failed to acquire lock: {0}")]
    Lock(String),
}

/// Result type for raglite operations
pub type RagLiteResult<T> = Result<T, RagLiteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_offending_values() {
        let err = RagLiteError::ChunkingPrecondition {
            max_chars: 100,
            overlap: 100,
        };
        let msg = err.to_string();
        assert!(msg.contains("100"));
        assert!(msg.contains("overlap"));

        let err = RagLiteError::DimensionMismatch {
            expected: 384,
            actual: 256,
        };
        assert!(err.to_string().contains("expected 384, got 256"));
    }

    #[test]
    fn test_layer_errors_nest_into_top_level() {
        let embedding = crate::embeddings::EmbeddingError::Provider("timeout".to_string());
        let top: RagLiteError = embedding.into();
        assert!(matches!(top, RagLiteError::Embedding(_)));

        let generation = crate::generation::GenerationError::Provider("503".to_string());
        let top: RagLiteError = generation.into();
        assert!(matches!(top, RagLiteError::Generation(_)));
    }
}
