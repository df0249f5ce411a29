//! # Embeddings
//!
//! This crate turns text fragments into dense vectors by calling an external
//! embedding service, and provides the similarity primitive used to rank them.
//!
//! ## Features
//!
//! - **Embedding Generation**: One request per text against an Ollama-style
//!   `/api/embeddings` endpoint
//! - **Batch Embedding**: Sequential, positionally aligned, all-or-nothing
//! - **Similarity**: Cosine similarity with zero-magnitude safety
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Embeddings System                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  EmbeddingProvider ──► embed_batch ──► Vec<Embedding>           │
//! │       │                    │                                    │
//! │       ▼                    ▼                                    │
//! │  OllamaProvider      EmbedProgress       cosine_similarity      │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod provider;
pub mod similarity;

pub use error::{EmbeddingError, Result};
pub use provider::{
    DEFAULT_PROGRESS_INTERVAL, EmbedProgress, EmbeddingProvider, OllamaProvider,
    embed_batch_observed,
};
pub use similarity::{cosine_similarity, magnitude};

/// A dense vector embedding.
pub type Embedding = Vec<f32>;

/// Default embedding model served by a local Ollama instance.
pub const DEFAULT_MODEL: &str = "nomic-embed-text";

/// Default base URL of a local Ollama instance.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
