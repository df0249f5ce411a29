//! Configuration for the retrieval pipeline.
//!
//! Every section is optional in the TOML file; missing keys take the
//! defaults below.
//!
//! ```toml
//! data_dir = "data"
//!
//! [embedding]
//! base_url = "http://localhost:11434"
//! model = "nomic-embed-text"
//!
//! [generation]
//! model = "llama3.1"
//! idle_timeout_secs = 120
//!
//! [chunking]
//! size = 1000
//! overlap = 200
//!
//! [query]
//! top_k = 5
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use whisperer_context_files::{
    ChunkerConfig, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, DEFAULT_TOP_K,
};
use whisperer_embeddings::{DEFAULT_PROGRESS_INTERVAL, OllamaProvider};
use whisperer_generation::OllamaGenerator;
use whisperer_repo_walker::{DEFAULT_MAX_FILE_BYTES, WalkConfig, default_excludes};

use crate::error::{Result, RetrievalError};

/// Configuration for the retrieval pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Directory holding one JSON file per context.
    pub data_dir: PathBuf,

    /// Embedding service configuration.
    pub embedding: EmbeddingConfig,

    /// Generation service configuration.
    pub generation: GenerationConfig,

    /// Chunking parameters.
    pub chunking: ChunkingConfig,

    /// Query configuration.
    pub query: QueryConfig,

    /// Ingestion configuration.
    pub ingest: IngestConfig,
}

impl RetrievalConfig {
    /// Create a configuration with default values and the given data directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| RetrievalError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            RetrievalError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Set the data directory.
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Set the embedding configuration.
    pub fn with_embedding(mut self, config: EmbeddingConfig) -> Self {
        self.embedding = config;
        self
    }

    /// Set the generation configuration.
    pub fn with_generation(mut self, config: GenerationConfig) -> Self {
        self.generation = config;
        self
    }

    /// Set the chunking configuration.
    pub fn with_chunking(mut self, config: ChunkingConfig) -> Self {
        self.chunking = config;
        self
    }

    /// Set the query configuration.
    pub fn with_query(mut self, config: QueryConfig) -> Self {
        self.query = config;
        self
    }

    /// Set the ingestion configuration.
    pub fn with_ingest(mut self, config: IngestConfig) -> Self {
        self.ingest = config;
        self
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<()> {
        self.chunking.chunker_config()?;
        if self.embedding.progress_interval == 0 {
            return Err(RetrievalError::Config(
                "embedding.progress_interval must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            embedding: EmbeddingConfig::default(),
            generation: GenerationConfig::default(),
            chunking: ChunkingConfig::default(),
            query: QueryConfig::default(),
            ingest: IngestConfig::default(),
        }
    }
}

/// Configuration for the embedding service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Service base URL.
    pub base_url: String,

    /// Embedding model name.
    pub model: String,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Log and report progress every this many fragments.
    pub progress_interval: usize,
}

impl EmbeddingConfig {
    /// Build the provider this section describes.
    pub fn provider(&self) -> OllamaProvider {
        OllamaProvider::new()
            .with_base_url(&self.base_url)
            .with_model(&self.model)
            .with_timeout(Duration::from_secs(self.timeout_secs))
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: whisperer_embeddings::DEFAULT_BASE_URL.to_string(),
            model: whisperer_embeddings::DEFAULT_MODEL.to_string(),
            timeout_secs: 30,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

/// Configuration for the generation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Service base URL.
    pub base_url: String,

    /// Generation model name.
    pub model: String,

    /// Deadline for the response headers, in seconds.
    pub connect_timeout_secs: u64,

    /// Deadline for each read of the response stream, in seconds.
    pub idle_timeout_secs: u64,
}

impl GenerationConfig {
    /// Build the generator this section describes.
    pub fn generator(&self) -> OllamaGenerator {
        OllamaGenerator::new()
            .with_base_url(&self.base_url)
            .with_model(&self.model)
            .with_response_timeout(Duration::from_secs(self.connect_timeout_secs))
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: whisperer_generation::DEFAULT_BASE_URL.to_string(),
            model: whisperer_generation::DEFAULT_MODEL.to_string(),
            connect_timeout_secs: 30,
            idle_timeout_secs: 120,
        }
    }
}

/// Chunking parameters, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Window size.
    pub size: usize,

    /// Characters shared by consecutive windows.
    pub overlap: usize,
}

impl ChunkingConfig {
    /// Validate into a [`ChunkerConfig`].
    pub fn chunker_config(&self) -> Result<ChunkerConfig> {
        Ok(ChunkerConfig::new(self.size, self.overlap)?)
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// Configuration for queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Number of fragments retrieved per query.
    pub top_k: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
        }
    }
}

/// Configuration for ingestion runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Files larger than this many bytes are skipped.
    pub max_file_bytes: u64,

    /// Glob patterns excluded from the walk.
    pub exclude_patterns: Vec<String>,

    /// Whether to follow symbolic links.
    pub follow_symlinks: bool,
}

impl IngestConfig {
    /// Walk configuration for a repository at `root`.
    pub fn walk_config(&self, root: impl Into<PathBuf>) -> WalkConfig {
        WalkConfig::new(root)
            .with_excludes(self.exclude_patterns.clone())
            .with_max_file_bytes(Some(self.max_file_bytes))
            .follow_symlinks(self.follow_symlinks)
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            exclude_patterns: default_excludes(),
            follow_symlinks: false,
        }
    }
}
