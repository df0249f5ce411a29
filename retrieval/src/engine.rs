//! Retrieval pipeline implementation.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use whisperer_context_files::{
    CollectionInfo, ContextStore, FixedWindowChunker, Fragment, ScoredFragment, rank_collection,
    sanitize_name,
};
use whisperer_embeddings::{EmbedProgress, EmbeddingError, EmbeddingProvider, embed_batch_observed};
use whisperer_generation::{ByteStream, GenerationProvider, reassemble};
use whisperer_repo_walker::RepoWalker;

use crate::config::RetrievalConfig;
use crate::conversation::{Conversation, ConversationTurn, GroundingRef, SourceRef};
use crate::error::{Result, RetrievalError};
use crate::prompt::build_prompt;

/// Outcome of one ingestion run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Sanitized context name.
    pub name: String,

    /// File name of the stored context.
    pub file_name: String,

    /// Files the walk selected, including oversized ones.
    pub files_found: usize,

    /// Files chunked into the context.
    pub files_processed: usize,

    /// Oversized, unreadable or non-UTF-8 files.
    pub files_skipped: usize,

    /// Fragments written.
    pub chunks_generated: usize,

    /// Path of the stored context.
    pub path: PathBuf,
}

/// Answer to a chat turn: the grounding manifest plus the unread answer stream.
///
/// `sources` and `grounding` are known before the first byte of the answer
/// is read, so callers can show provenance immediately.
pub struct ChatResponse {
    /// Sources of the grounding fragments, in rank order.
    pub sources: Vec<SourceRef>,

    /// The grounding fragments themselves.
    pub grounding: Vec<GroundingRef>,

    stream: ByteStream,
    idle_timeout: Option<Duration>,
}

impl ChatResponse {
    /// Read the answer to the end.
    ///
    /// `on_update` receives the full answer so far after every record that
    /// adds text.
    pub async fn collect<F: FnMut(&str)>(self, on_update: F) -> Result<String> {
        Ok(reassemble(self.stream, self.idle_timeout, on_update).await?)
    }

    /// Read the answer into a streaming assistant turn, then freeze it.
    ///
    /// The turn is frozen on failure too, keeping whatever text arrived.
    pub async fn stream_into(self, turn: &mut ConversationTurn) -> Result<String> {
        let result = reassemble(self.stream, self.idle_timeout, |text| {
            turn.apply_update(text);
        })
        .await;
        turn.finish();
        Ok(result?)
    }
}

impl std::fmt::Debug for ChatResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatResponse")
            .field("sources", &self.sources)
            .field("idle_timeout", &self.idle_timeout)
            .finish_non_exhaustive()
    }
}

/// Ingest, search and chat over named contexts.
///
/// The active context is passed to every call; the pipeline holds no
/// selection state of its own.
pub struct RetrievalPipeline {
    /// Configuration.
    config: RetrievalConfig,

    /// Context file storage.
    store: ContextStore,

    /// Validated chunker.
    chunker: FixedWindowChunker,

    /// Embedding service.
    embedder: Arc<dyn EmbeddingProvider>,

    /// Generation service.
    generator: Arc<dyn GenerationProvider>,
}

impl RetrievalPipeline {
    /// Create a new pipeline builder.
    pub fn builder(config: RetrievalConfig) -> RetrievalPipelineBuilder {
        RetrievalPipelineBuilder::new(config)
    }

    /// Create a pipeline talking to the services named in `config`.
    pub async fn new(config: RetrievalConfig) -> Result<Self> {
        Self::builder(config).build().await
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub fn store(&self) -> &ContextStore {
        &self.store
    }

    /// Ingest the repository at `repo_path` into a context.
    ///
    /// See [`ingest_with_progress`](Self::ingest_with_progress).
    pub async fn ingest(&self, repo_path: impl AsRef<Path>, name: Option<&str>) -> Result<IngestReport> {
        self.ingest_with_progress(repo_path, name, &|_| {}).await
    }

    /// Ingest the repository at `repo_path` into a context, reporting
    /// embedding progress to `observer`.
    ///
    /// The context name defaults to the directory's base name. Files that
    /// cannot be read as UTF-8 text are skipped. If any embedding fails,
    /// nothing is written and an existing context of the same name is kept.
    pub async fn ingest_with_progress(
        &self,
        repo_path: impl AsRef<Path>,
        name: Option<&str>,
        observer: &(dyn Fn(EmbedProgress) + Send + Sync),
    ) -> Result<IngestReport> {
        let repo_path = repo_path.as_ref();
        if repo_path.as_os_str().is_empty() {
            return Err(RetrievalError::Validation("path is required".to_string()));
        }

        let name = match name {
            Some(name) if !name.trim().is_empty() => sanitize_name(name)?,
            _ => sanitize_name(&default_context_name(repo_path)?)?,
        };

        let walker = RepoWalker::new(self.config.ingest.walk_config(repo_path));
        let outcome = tokio::task::spawn_blocking(move || walker.walk())
            .await
            .map_err(|e| RetrievalError::Io(std::io::Error::other(e)))??;

        let files_found = outcome.files.len() + outcome.oversized.len();
        let mut files_skipped = outcome.oversized.len();
        let mut sources = Vec::new();
        let mut texts = Vec::new();

        for file in &outcome.files {
            let bytes = match tokio::fs::read(&file.path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("Error reading file {}: {e}", file.path.display());
                    files_skipped += 1;
                    continue;
                }
            };
            let content = match String::from_utf8(bytes) {
                Ok(content) => content,
                Err(_) => {
                    warn!("Skipping non-UTF-8 file: {}", file.path.display());
                    files_skipped += 1;
                    continue;
                }
            };

            let source = file.path.display().to_string();
            for chunk in self.chunker.chunk(&content) {
                sources.push(source.clone());
                texts.push(chunk);
            }
        }

        info!(
            "Generated {} chunks from {} files. Starting embedding...",
            texts.len(),
            files_found - files_skipped
        );

        let embeddings = embed_batch_observed(
            self.embedder.as_ref(),
            &texts,
            self.config.embedding.progress_interval,
            observer,
        )
        .await?;

        if embeddings.len() != texts.len() {
            return Err(EmbeddingError::InvalidResponse(format!(
                "{} embeddings for {} chunks",
                embeddings.len(),
                texts.len()
            ))
            .into());
        }

        let fragments: Vec<Fragment> = sources
            .into_iter()
            .zip(texts)
            .zip(embeddings)
            .map(|((source, text), embedding)| Fragment::new(source, text, embedding))
            .collect();
        let chunks_generated = fragments.len();

        let saved = self.store.save(&name, fragments).await?;

        Ok(IngestReport {
            name: saved.name,
            file_name: saved.file_name,
            files_found,
            files_processed: files_found - files_skipped,
            files_skipped,
            chunks_generated,
            path: saved.path,
        })
    }

    /// Return the `k` fragments of `context` most similar to `query`.
    ///
    /// The context is loaded before the query is embedded, so a missing
    /// context never costs a remote call.
    pub async fn search(&self, context: &str, query: &str, k: usize) -> Result<Vec<ScoredFragment>> {
        if query.trim().is_empty() {
            return Err(RetrievalError::Validation("query is required".to_string()));
        }

        let collection = self.store.load(context).await?;
        if collection.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        debug!("Searching {} for: {query}", collection.name());
        let embedding = self.embedder.embed(query).await?;
        Ok(rank_collection(&embedding, &collection, k)?)
    }

    /// Answer the last user turn of `conversation` from `context`.
    ///
    /// Retrieval and the generation request both complete before this
    /// returns; the answer body is read through the returned
    /// [`ChatResponse`].
    pub async fn chat(&self, context: &str, conversation: &Conversation) -> Result<ChatResponse> {
        let question = conversation
            .last_question()
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| RetrievalError::Validation("messages are required".to_string()))?;

        let top = self.search(context, question, self.config.query.top_k).await?;
        let prompt = build_prompt(question, &top);

        info!(
            "Asking {} with {} grounding fragments",
            self.generator.model(),
            top.len()
        );
        let stream = self.generator.generate(&prompt).await?;

        Ok(ChatResponse {
            sources: top
                .iter()
                .map(|f| SourceRef {
                    source: f.fragment.source.clone(),
                })
                .collect(),
            grounding: top.iter().map(GroundingRef::from).collect(),
            stream,
            idle_timeout: Some(self.config.generation.idle_timeout()),
        })
    }

    /// List stored contexts, sorted by name.
    pub async fn list_contexts(&self) -> Result<Vec<CollectionInfo>> {
        Ok(self.store.list().await?)
    }

    /// Delete a context. Returns the sanitized name that was removed.
    pub async fn delete_context(&self, name: &str) -> Result<String> {
        Ok(self.store.delete(name).await?)
    }
}

/// Base name of the repository directory, resolving `.` and similar.
fn default_context_name(repo_path: &Path) -> Result<String> {
    let base = match repo_path.file_name() {
        Some(base) => Some(base.to_os_string()),
        None => std::fs::canonicalize(repo_path)
            .ok()
            .and_then(|p| p.file_name().map(|b| b.to_os_string())),
    };

    base.map(|b| b.to_string_lossy().into_owned())
        .ok_or_else(|| {
            RetrievalError::Validation(format!(
                "cannot derive a context name from {}",
                repo_path.display()
            ))
        })
}

/// Builder for [`RetrievalPipeline`].
pub struct RetrievalPipelineBuilder {
    config: RetrievalConfig,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    generator: Option<Arc<dyn GenerationProvider>>,
}

impl RetrievalPipelineBuilder {
    /// Create a new builder.
    pub fn new(config: RetrievalConfig) -> Self {
        Self {
            config,
            embedder: None,
            generator: None,
        }
    }

    /// Use `embedder` instead of the configured embedding service.
    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Use `generator` instead of the configured generation service.
    pub fn with_generator(mut self, generator: Arc<dyn GenerationProvider>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Build the pipeline, creating the data directory if needed.
    pub async fn build(self) -> Result<RetrievalPipeline> {
        self.config.validate()?;
        let chunker = FixedWindowChunker::new(self.config.chunking.chunker_config()?);
        let store = ContextStore::new(&self.config.data_dir).await?;

        let embedder = self
            .embedder
            .unwrap_or_else(|| Arc::new(self.config.embedding.provider()));
        let generator = self
            .generator
            .unwrap_or_else(|| Arc::new(self.config.generation.generator()));

        info!(
            "Retrieval pipeline ready (data dir {}, embeddings {}/{}, generation {}/{})",
            store.root().display(),
            embedder.name(),
            embedder.model(),
            generator.name(),
            generator.model()
        );

        Ok(RetrievalPipeline {
            config: self.config,
            store,
            chunker,
            embedder,
            generator,
        })
    }
}
