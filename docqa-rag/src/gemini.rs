//! Gemini embedding and completion provider over the Generative Language REST API.
//!
//! This module is only available when the `gemini` feature is enabled.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::completion::CompletionProvider;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// The default Generative Language API base URL.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// The default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "embedding-001";

/// The default generation model.
pub const DEFAULT_COMPLETION_MODEL: &str = "gemini-1.5-flash";

const PROVIDER: &str = "Gemini";

/// An [`EmbeddingProvider`] and [`CompletionProvider`] backed by the Gemini API.
///
/// # Configuration
///
/// - `api_key` – from the constructor or the `GEMINI_API_KEY` environment variable.
/// - `embedding_model` – defaults to `embedding-001`.
/// - `completion_model` – defaults to `gemini-1.5-flash`.
/// - `timeout` – per-request timeout applied by the HTTP client.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::gemini::GeminiProvider;
///
/// let provider = GeminiProvider::from_env()?;
/// let embedding = provider.embed("hello world").await?;
/// let answer = provider.complete("Say hi").await?;
/// ```
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    embedding_model: String,
    completion_model: String,
}

impl GeminiProvider {
    /// Create a new provider with the given API key and a 60 second request timeout.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_timeout(api_key, Duration::from_secs(60))
    }

    /// Create a new provider with an explicit request timeout.
    pub fn with_timeout(api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RagError::ConfigError("Gemini API key must not be empty".into()));
        }

        let client = reqwest::Client::builder().timeout(timeout).build().map_err(|e| {
            RagError::ConfigError(format!("failed to create Gemini HTTP client: {e}"))
        })?;

        Ok(Self {
            client,
            api_key,
            base_url: GEMINI_BASE_URL.into(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.into(),
            completion_model: DEFAULT_COMPLETION_MODEL.into(),
        })
    }

    /// Create a new provider using the `GEMINI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY").map_err(|_| {
            RagError::ConfigError("GEMINI_API_KEY environment variable not set".into())
        })?;
        Self::new(api_key)
    }

    /// Override the API base URL (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the embedding model name (without the `models/` prefix).
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    /// Set the generation model name (without the `models/` prefix).
    pub fn with_completion_model(mut self, model: impl Into<String>) -> Self {
        self.completion_model = model.into();
        self
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!("{}/models/{model}:{method}", self.base_url)
    }

    async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> std::result::Result<R, String> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(format!("API returned {status}: {detail}"));
        }

        response.json().await.map_err(|e| format!("failed to parse response: {e}"))
    }
}

// ── Gemini API request/response types ──────────────────────────────

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct EmbedContentRequest<'a> {
    model: String,
    content: Content<'a>,
}

#[derive(Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate.
    fn text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().map(|p| p.text).collect();
        Some(text)
    }
}

fn embedding_error(message: String) -> RagError {
    error!(provider = PROVIDER, error = %message, "embedding request failed");
    RagError::EmbeddingError { provider: PROVIDER.into(), message }
}

// ── Provider implementations ───────────────────────────────────────

#[async_trait]
impl EmbeddingProvider for GeminiProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, text_len = text.len(), "embedding single text");

        let body = EmbedContentRequest {
            model: format!("models/{}", self.embedding_model),
            content: Content { parts: vec![Part { text }] },
        };
        let url = self.model_url(&self.embedding_model, "embedContent");
        let response: EmbedContentResponse =
            self.post(&url, &body).await.map_err(embedding_error)?;

        Ok(response.embedding.values)
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(provider = PROVIDER, batch_size = texts.len(), "embedding batch");

        let body = BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|&text| EmbedContentRequest {
                    model: format!("models/{}", self.embedding_model),
                    content: Content { parts: vec![Part { text }] },
                })
                .collect(),
        };
        let url = self.model_url(&self.embedding_model, "batchEmbedContents");
        let response: BatchEmbedResponse = self.post(&url, &body).await.map_err(embedding_error)?;

        if response.embeddings.len() != texts.len() {
            return Err(embedding_error(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                response.embeddings.len()
            )));
        }
        Ok(response.embeddings.into_iter().map(|e| e.values).collect())
    }
}

#[async_trait]
impl CompletionProvider for GeminiProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        debug!(
            provider = PROVIDER,
            model = %self.completion_model,
            prompt_len = prompt.len(),
            "generating completion"
        );

        let body =
            GenerateContentRequest { contents: vec![Content { parts: vec![Part { text: prompt }] }] };
        let url = self.model_url(&self.completion_model, "generateContent");
        let response: GenerateContentResponse = self.post(&url, &body).await.map_err(|message| {
            error!(provider = PROVIDER, error = %message, "generation request failed");
            RagError::CompletionError { provider: PROVIDER.into(), message }
        })?;

        response.text().ok_or_else(|| RagError::CompletionError {
            provider: PROVIDER.into(),
            message: "response contained no candidates".into(),
        })
    }
}
