//! Embedding providers.
//!
//! A provider embeds one text per call. Batching is layered on top by
//! [`embed_batch_observed`], which walks the inputs sequentially and keeps the
//! output positionally aligned with them.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::error::{EmbeddingError, Result};
use crate::{DEFAULT_BASE_URL, DEFAULT_MODEL, Embedding};

/// How often batch progress is reported, in items.
pub const DEFAULT_PROGRESS_INTERVAL: usize = 10;

/// Progress of a batch embedding run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbedProgress {
    /// Number of texts embedded so far.
    pub completed: usize,

    /// Total number of texts in the batch.
    pub total: usize,
}

/// Trait for embedding providers.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Get the name of this provider.
    fn name(&self) -> &str;

    /// Get the model this provider embeds with.
    fn model(&self) -> &str;

    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Embedding>;

    /// Generate embeddings for multiple texts.
    ///
    /// `result[i]` is the embedding of `texts[i]`. The first failure aborts
    /// the whole batch and nothing computed so far is returned.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        embed_batch_observed(self, texts, DEFAULT_PROGRESS_INTERVAL, &|_| {}).await
    }
}

/// Embed `texts` one at a time, notifying `observer` every `interval` items.
///
/// The observer is informational only. It never changes ordering or results.
pub async fn embed_batch_observed<P>(
    provider: &P,
    texts: &[String],
    interval: usize,
    observer: &(dyn Fn(EmbedProgress) + Send + Sync),
) -> Result<Vec<Embedding>>
where
    P: EmbeddingProvider + ?Sized,
{
    let total = texts.len();
    let interval = interval.max(1);
    info!("Generating embeddings for {total} chunks with {}", provider.model());

    let mut embeddings = Vec::with_capacity(total);
    for (index, text) in texts.iter().enumerate() {
        let embedding = provider.embed(text).await.map_err(|e| {
            error!("Failed to embed chunk index {index}: {e}");
            e
        })?;
        embeddings.push(embedding);

        let completed = index + 1;
        if completed % interval == 0 || completed == total {
            info!("Processed {completed}/{total} chunks");
            observer(EmbedProgress { completed, total });
        }
    }

    Ok(embeddings)
}

/// Request body for the Ollama embeddings endpoint.
#[derive(Debug, Serialize)]
struct OllamaEmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

/// Response body from the Ollama embeddings endpoint.
#[derive(Debug, Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Embedding,
}

/// Embedding provider backed by an Ollama-compatible `/api/embeddings` endpoint.
pub struct OllamaProvider {
    /// API base URL.
    base_url: String,

    /// Model name sent with every request.
    model: String,

    /// Per-request deadline.
    timeout: Duration,

    /// HTTP client.
    client: reqwest::Client,
}

impl OllamaProvider {
    /// Create a provider pointed at a local Ollama instance.
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(30),
            client: reqwest::Client::new(),
        }
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/api/embeddings", self.base_url)
    }

    fn transport_error(&self, err: reqwest::Error) -> EmbeddingError {
        if err.is_timeout() {
            EmbeddingError::Timeout {
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            EmbeddingError::Transport(err)
        }
    }
}

impl Default for OllamaProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        let body = OllamaEmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(self.endpoint())
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EmbeddingError::Remote {
                status: status.as_u16(),
                reason: status
                    .canonical_reason()
                    .unwrap_or("unknown status")
                    .to_string(),
            });
        }

        let payload = response.text().await.map_err(|e| self.transport_error(e))?;
        let parsed: OllamaEmbeddingResponse = serde_json::from_str(&payload)
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        if parsed.embedding.is_empty() {
            return Err(EmbeddingError::InvalidResponse(
                "empty embedding in response".to_string(),
            ));
        }

        debug!("Generated embedding with {} dimensions", parsed.embedding.len());
        Ok(parsed.embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    /// Embeds each text as `[len, 1.0]`, failing on a marker text.
    struct LengthProvider;

    #[async_trait]
    impl EmbeddingProvider for LengthProvider {
        fn name(&self) -> &str {
            "length"
        }

        fn model(&self) -> &str {
            "length-v1"
        }

        async fn embed(&self, text: &str) -> Result<Embedding> {
            if text == "boom" {
                return Err(EmbeddingError::Remote {
                    status: 500,
                    reason: "Internal Server Error".to_string(),
                });
            }
            Ok(vec![text.len() as f32, 1.0])
        }
    }

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_batch_is_positionally_aligned() {
        let input = texts(&["a", "bbb", "cc"]);
        let result = LengthProvider.embed_batch(&input).await.unwrap();

        assert_eq!(result.len(), input.len());
        assert_eq!(result[0], vec![1.0, 1.0]);
        assert_eq!(result[1], vec![3.0, 1.0]);
        assert_eq!(result[2], vec![2.0, 1.0]);
    }

    #[tokio::test]
    async fn test_batch_failure_returns_no_partial_result() {
        let input = texts(&["a", "boom", "cc"]);
        let err = LengthProvider.embed_batch(&input).await.unwrap_err();
        assert!(matches!(err, EmbeddingError::Remote { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let result = LengthProvider.embed_batch(&[]).await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_progress_observer_every_interval() {
        let seen = Mutex::new(Vec::new());
        let input: Vec<String> = (0..5).map(|i| format!("t{i}")).collect();

        let observer = |p: EmbedProgress| seen.lock().unwrap().push(p.completed);
        let result = embed_batch_observed(&LengthProvider, &input, 2, &observer)
            .await
            .unwrap();

        assert_eq!(result.len(), 5);
        assert_eq!(*seen.lock().unwrap(), vec![2, 4, 5]);
    }

    #[test]
    fn test_provider_builder() {
        let provider = OllamaProvider::new()
            .with_base_url("http://example.test:11434/")
            .with_model("mxbai-embed-large");

        assert_eq!(provider.model(), "mxbai-embed-large");
        assert_eq!(provider.endpoint(), "http://example.test:11434/api/embeddings");
    }
}
