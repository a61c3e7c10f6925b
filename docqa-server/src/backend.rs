//! Wires the configured model backend and extractor into a [`RagPipeline`].

use std::sync::Arc;
use std::time::Duration;

use docqa_rag::gemini::GeminiProvider;
use docqa_rag::ocr::OcrExtractor;
use docqa_rag::ollama::OllamaProvider;
use docqa_rag::{
    CompletionProvider, EmbeddingProvider, HashEmbeddingProvider, PlainTextExtractor,
    RagPipeline, StubCompletionProvider, TextExtractor,
};
use tracing::info;

use crate::config::{Backend, ExtractorKind, ServerConfig};
use crate::error::ServerError;

/// Build the pipeline described by `config`.
///
/// # Errors
///
/// Fails when the Gemini backend is selected without an API key, or when the chunking
/// parameters are inconsistent.
pub fn build_pipeline(config: &ServerConfig) -> Result<RagPipeline, ServerError> {
    let (embedder, completer) = providers(config)?;
    let extractor = extractor(config);

    info!(
        backend = ?config.backend,
        extractor = ?config.extractor,
        embedding_provider = embedder.name(),
        completion_provider = completer.name(),
        "pipeline configured"
    );

    let pipeline = RagPipeline::builder()
        .config(config.rag_config()?)
        .embedding_provider(embedder)
        .completion_provider(completer)
        .extractor(extractor)
        .build()?;
    Ok(pipeline)
}

fn providers(
    config: &ServerConfig,
) -> Result<(Arc<dyn EmbeddingProvider>, Arc<dyn CompletionProvider>), ServerError> {
    let timeout = Duration::from_secs(config.request_timeout_secs);

    match config.backend {
        Backend::Gemini => {
            let api_key = config
                .gemini_api_key
                .as_deref()
                .filter(|key| !key.trim().is_empty())
                .ok_or(ServerError::MissingApiKey { backend: "gemini" })?;

            let mut provider = GeminiProvider::with_timeout(api_key, timeout)?;
            if let Some(model) = &config.embedding_model {
                provider = provider.with_embedding_model(model.clone());
            }
            if let Some(model) = &config.completion_model {
                provider = provider.with_completion_model(model.clone());
            }

            let provider = Arc::new(provider);
            let embedder: Arc<dyn EmbeddingProvider> = provider.clone();
            let completer: Arc<dyn CompletionProvider> = provider;
            Ok((embedder, completer))
        }
        Backend::Ollama => {
            let mut provider = OllamaProvider::with_timeout(config.ollama_url.clone(), timeout)?;
            if let Some(model) = &config.embedding_model {
                provider = provider.with_embedding_model(model.clone());
            }
            if let Some(model) = &config.completion_model {
                provider = provider.with_completion_model(model.clone());
            }

            let provider = Arc::new(provider);
            let embedder: Arc<dyn EmbeddingProvider> = provider.clone();
            let completer: Arc<dyn CompletionProvider> = provider;
            Ok((embedder, completer))
        }
        Backend::Stub => {
            let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashEmbeddingProvider::default());
            let completer: Arc<dyn CompletionProvider> =
                Arc::new(StubCompletionProvider::default());
            Ok((embedder, completer))
        }
    }
}

fn extractor(config: &ServerConfig) -> Arc<dyn TextExtractor> {
    match config.extractor {
        ExtractorKind::Ocr => Arc::new(
            OcrExtractor::new()
                .with_tesseract(config.tesseract.clone())
                .with_pdftoppm(config.pdftoppm.clone())
                .with_language(config.ocr_language.clone())
                .with_dpi(config.ocr_dpi),
        ),
        ExtractorKind::Text => Arc::new(PlainTextExtractor),
    }
}
