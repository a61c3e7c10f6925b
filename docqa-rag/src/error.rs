//! Error types for the `docqa-rag` crate.

use thiserror::Error;

/// Errors that can occur while building or querying the document index.
#[derive(Debug, Error)]
pub enum RagError {
    /// The extraction collaborator could not read text from the upload.
    #[error("Extraction error: {0}")]
    ExtractionError(String),

    /// Extraction succeeded but normalization left nothing to index.
    #[error("No text extracted")]
    NoTextExtracted,

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The completion service failed or timed out.
    #[error("Completion error ({provider}): {message}")]
    CompletionError {
        /// The completion provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A vector's length disagrees with the index dimensionality.
    #[error("Dimension mismatch: index has {expected} dimensions, got {actual}")]
    DimensionMismatch {
        /// Dimensionality fixed by the first vector of the document.
        expected: usize,
        /// Dimensionality of the offending vector.
        actual: usize,
    },

    /// The vector index cannot serve the request (e.g. it is empty).
    #[error("Index error: {0}")]
    IndexError(String),

    /// Invalid chunking parameters.
    #[error("Chunking error: {0}")]
    ChunkingError(String),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A question was asked before any document was uploaded.
    #[error("Upload document first")]
    NotReady,

    /// The caller sent a request the pipeline cannot act on.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// An error in the pipeline orchestration.
    #[error("Pipeline error: {0}")]
    PipelineError(String),

    /// Filesystem or process I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RagError {
    /// Whether the failure came from an external model service rather than from the input.
    pub fn is_service_error(&self) -> bool {
        matches!(self, Self::EmbeddingError { .. } | Self::CompletionError { .. })
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
