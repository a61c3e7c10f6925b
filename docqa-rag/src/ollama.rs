//! Ollama embedding and completion provider for a local model server.
//!
//! This module is only available when the `ollama` feature is enabled.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::completion::CompletionProvider;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// The default Ollama server address.
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// The default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";

/// The default generation model.
pub const DEFAULT_COMPLETION_MODEL: &str = "llama3";

const PROVIDER: &str = "Ollama";

/// An [`EmbeddingProvider`] and [`CompletionProvider`] backed by an Ollama server.
///
/// Uses `/api/embeddings` and non-streaming `/api/generate`.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::ollama::OllamaProvider;
///
/// let provider = OllamaProvider::new(OLLAMA_BASE_URL)?.with_completion_model("mistral");
/// let answer = provider.complete("Say hi").await?;
/// ```
pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
    embedding_model: String,
    completion_model: String,
}

impl OllamaProvider {
    /// Create a provider for the server at `base_url` with a 120 second request timeout.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(120))
    }

    /// Create a provider with an explicit request timeout.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build().map_err(|e| {
            RagError::ConfigError(format!("failed to create Ollama HTTP client: {e}"))
        })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.into(),
            completion_model: DEFAULT_COMPLETION_MODEL.into(),
        })
    }

    /// Set the embedding model name.
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    /// Set the generation model name.
    pub fn with_completion_model(mut self, model: impl Into<String>) -> Self {
        self.completion_model = model.into();
        self
    }

    async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> std::result::Result<R, String> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| format!("request to {url} failed: {e}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail =
                serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error).unwrap_or(body);
            return Err(format!("API returned {status}: {detail}"));
        }

        response.json().await.map_err(|e| format!("failed to parse response: {e}"))
    }
}

// ── Ollama API request/response types ──────────────────────────────

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

// ── Provider implementations ───────────────────────────────────────

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(
            provider = PROVIDER,
            model = %self.embedding_model,
            text_len = text.len(),
            "embedding single text"
        );

        let body = EmbeddingRequest { model: &self.embedding_model, prompt: text };
        let response: EmbeddingResponse =
            self.post("/api/embeddings", &body).await.map_err(|message| {
                error!(provider = PROVIDER, error = %message, "embedding request failed");
                RagError::EmbeddingError { provider: PROVIDER.into(), message }
            })?;

        if response.embedding.is_empty() {
            return Err(RagError::EmbeddingError {
                provider: PROVIDER.into(),
                message: format!("model '{}' returned an empty embedding", self.embedding_model),
            });
        }
        Ok(response.embedding)
    }
}

#[async_trait]
impl CompletionProvider for OllamaProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        debug!(provider = PROVIDER, model = %self.completion_model, "generating completion");

        let body = GenerateRequest { model: &self.completion_model, prompt, stream: false };
        let response: GenerateResponse =
            self.post("/api/generate", &body).await.map_err(|message| {
                error!(provider = PROVIDER, error = %message, "generation request failed");
                RagError::CompletionError { provider: PROVIDER.into(), message }
            })?;

        Ok(response.response)
    }
}
