//! Error types for generation.

use thiserror::Error;

/// Result type alias for generation operations.
pub type Result<T> = std::result::Result<T, GenerationError>;

/// Errors that can occur while requesting or reading a generation stream.
#[derive(Error, Debug)]
pub enum GenerationError {
    /// Network failure, before or during the stream.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// No response headers, or no stream data, within the deadline.
    #[error("generation timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// The service answered with a non-success status.
    #[error("generation service error {status}: {reason}")]
    Remote { status: u16, reason: String },
}

impl GenerationError {
    /// Whether this error came from the network layer rather than the service.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout { .. })
    }
}
