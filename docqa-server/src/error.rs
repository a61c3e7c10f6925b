use docqa_rag::RagError;
use thiserror::Error;

/// Errors raised while assembling the service at startup.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("the {backend} backend needs an API key; set GEMINI_API_KEY or pass --gemini-api-key")]
    MissingApiKey { backend: &'static str },

    #[error("failed to initialise logging: {0}")]
    Telemetry(String),

    #[error(transparent)]
    Rag(#[from] RagError),
}
