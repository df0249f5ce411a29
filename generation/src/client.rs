//! Generation providers.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{GenerationError, Result};
use crate::{DEFAULT_BASE_URL, DEFAULT_MODEL};

/// Raw body of a streamed generation response, chunked however the
/// transport delivered it.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Trait for generation providers.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Get the name of this provider.
    fn name(&self) -> &str;

    /// Get the model this provider generates with.
    fn model(&self) -> &str;

    /// Start a streamed generation for `prompt`.
    ///
    /// Resolves once response headers confirm success, before any body is
    /// read. A non-success status is an error and no stream is returned.
    async fn generate(&self, prompt: &str) -> Result<ByteStream>;
}

#[derive(Debug, Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

/// Generation provider backed by an Ollama-compatible `/api/generate` endpoint.
pub struct OllamaGenerator {
    /// API base URL.
    base_url: String,

    /// Model name sent with every request.
    model: String,

    /// Deadline for the response headers.
    response_timeout: Duration,

    /// HTTP client.
    client: reqwest::Client,
}

impl OllamaGenerator {
    /// Create a generator pointed at a local Ollama instance.
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            response_timeout: Duration::from_secs(30),
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

    /// Set how long to wait for response headers.
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }
}

impl Default for OllamaGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationProvider for OllamaGenerator {
    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<ByteStream> {
        let body = OllamaGenerateRequest {
            model: &self.model,
            prompt,
            stream: true,
        };

        debug!("Requesting generation with model {} ({} prompt bytes)", self.model, prompt.len());

        let request = self.client.post(self.endpoint()).json(&body).send();
        let response = tokio::time::timeout(self.response_timeout, request)
            .await
            .map_err(|_| GenerationError::Timeout {
                timeout_secs: self.response_timeout.as_secs(),
            })??;

        let status = response.status();
        if !status.is_success() {
            return Err(GenerationError::Remote {
                status: status.as_u16(),
                reason: status
                    .canonical_reason()
                    .unwrap_or("unknown status")
                    .to_string(),
            });
        }

        info!("Generation stream opened ({})", self.model);
        Ok(Box::pin(
            response
                .bytes_stream()
                .map(|chunk| chunk.map_err(GenerationError::from)),
        ))
    }
}
