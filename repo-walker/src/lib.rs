//! # Repo Walker
//!
//! Finds the files of a repository that are worth ingesting.
//!
//! ## Features
//!
//! - **Recursive Traversal**: Files only, in sorted path order
//! - **Exclusion Patterns**: Dependency, build, VCS, lock and media files are
//!   skipped by default
//! - **Size Guard**: Files above a byte limit are reported, never read

pub mod config;
pub mod error;
pub mod walker;

pub use config::{DEFAULT_MAX_FILE_BYTES, WalkConfig, default_excludes};
pub use error::{Result, WalkerError};
pub use walker::{RepoWalker, WalkOutcome, WalkedFile};
