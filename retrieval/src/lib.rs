//! # Retrieval Pipeline
//!
//! This crate ties the pieces of repository question answering together:
//!
//! - **Repo Walker**: Which files of a repository to read
//! - **Context Files**: Chunking, fragment storage and ranking
//! - **Embeddings**: Vectors for fragments and queries
//! - **Generation**: Streamed, grounded answers
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       Retrieval Pipeline                        │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ingest:  RepoWalker ──► Chunker ──► Embeddings ──► ContextStore│
//! │                                                                 │
//! │  search:  ContextStore ──► Embeddings(query) ──► rank           │
//! │                                                                 │
//! │  chat:    search ──► build_prompt ──► Generation ──► Reassembler│
//! │                 │                                               │
//! │                 └──► sources / grounding (before the answer)    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use whisperer_retrieval::{Conversation, RetrievalConfig, RetrievalPipeline};
//!
//! let pipeline = RetrievalPipeline::new(RetrievalConfig::default()).await?;
//! pipeline.ingest("~/src/my-app", None).await?;
//!
//! let mut conversation = Conversation::new();
//! conversation.push_user("Where is the HTTP router defined?");
//! let response = pipeline.chat("my-app", &conversation).await?;
//! let answer = response.collect(|text| render(text)).await?;
//! ```

pub mod config;
pub mod conversation;
pub mod engine;
pub mod error;
pub mod prompt;

pub use config::{
    ChunkingConfig, EmbeddingConfig, GenerationConfig, IngestConfig, QueryConfig,
    RetrievalConfig,
};
pub use conversation::{Conversation, ConversationTurn, GroundingRef, Role, SourceRef};
pub use engine::{ChatResponse, IngestReport, RetrievalPipeline, RetrievalPipelineBuilder};
pub use error::{ErrorKind, Result, RetrievalError};
pub use prompt::build_prompt;

// Re-export from dependencies for convenience
pub use whisperer_context_files::{CollectionInfo, Fragment, ScoredFragment};
pub use whisperer_embeddings::{EmbedProgress, EmbeddingProvider};
pub use whisperer_generation::GenerationProvider;
