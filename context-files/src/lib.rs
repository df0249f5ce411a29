//! # Context Files
//!
//! A "context" is a named collection of fragments cut from one repository and
//! embedded into one vector space. This crate owns everything about contexts
//! that does not talk to the network:
//!
//! - **Chunking**: Deterministic fixed-window slicing of source text
//! - **Fragments**: The `{source, text, embedding}` data model and the
//!   dimensionality invariant
//! - **Ranking**: Exact cosine top-k with stable tie-breaking
//! - **Storage**: One JSON file per context, with sanitized names
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Context Files                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  source text ──► FixedWindowChunker ──► Vec<String>             │
//! │                                                                 │
//! │  ContextStore ──► Collection ──► rank_collection ──► Scored     │
//! │   (JSON file)     (Fragments)        (cosine)        Fragments  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod chunker;
pub mod error;
pub mod fragment;
pub mod ranker;
pub mod storage;

pub use chunker::{
    ChunkerConfig, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, FixedWindowChunker, chunk,
};
pub use error::{ContextError, Result, StorageError};
pub use fragment::{Collection, Fragment, ScoredFragment};
pub use ranker::{DEFAULT_TOP_K, rank, rank_collection};
pub use storage::{CollectionInfo, ContextStore, sanitize_name};
