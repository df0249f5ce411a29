//! Error types for the embeddings system.

use thiserror::Error;

/// Result type alias for embedding operations.
pub type Result<T> = std::result::Result<T, EmbeddingError>;

/// Errors that can occur in the embeddings system.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// Network failure talking to the embedding service.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The request did not complete before the configured deadline.
    #[error("embedding request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// The service was reachable but answered with a non-success status.
    #[error("embedding service error {status}: {reason}")]
    Remote { status: u16, reason: String },

    /// A success response whose body is not a usable embedding.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Dimension mismatch.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

impl EmbeddingError {
    /// Whether this error came from the network layer rather than the service.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout { .. })
    }
}
