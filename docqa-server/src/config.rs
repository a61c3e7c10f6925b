//! Command line and environment configuration for the `docqa` binary.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use docqa_rag::config::{
    DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, DEFAULT_EMBED_CONCURRENCY, DEFAULT_TOP_K,
};
use docqa_rag::ocr::{DEFAULT_DPI, DEFAULT_LANGUAGE};
use docqa_rag::ollama::OLLAMA_BASE_URL;
use docqa_rag::{RagConfig, Result};

/// Largest accepted upload body, 25 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Which model service answers embedding and completion calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    Gemini,
    Ollama,
    /// Offline hash embeddings and a canned answer.
    Stub,
}

/// How uploaded files are turned into text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ExtractorKind {
    /// OCR for PDFs and images, plain decoding for text files.
    Ocr,
    /// Text files only.
    Text,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Clone, Debug, Parser)]
#[command(name = "docqa", version, about = "Ask questions about an uploaded PDF or image")]
pub struct ServerConfig {
    #[arg(long, env = "DOCQA_HOST", default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, env = "DOCQA_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Directory receiving a copy of every uploaded file.
    #[arg(long, env = "DOCQA_UPLOAD_DIR", default_value = "uploads")]
    pub upload_dir: PathBuf,

    #[arg(long, env = "DOCQA_MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,

    #[arg(long, env = "DOCQA_BACKEND", value_enum, default_value_t = Backend::Gemini)]
    pub backend: Backend,

    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    #[arg(long, env = "DOCQA_OLLAMA_URL", default_value = OLLAMA_BASE_URL)]
    pub ollama_url: String,

    /// Overrides the backend's default embedding model.
    #[arg(long, env = "DOCQA_EMBEDDING_MODEL")]
    pub embedding_model: Option<String>,

    /// Overrides the backend's default completion model.
    #[arg(long, env = "DOCQA_COMPLETION_MODEL")]
    pub completion_model: Option<String>,

    /// Per-request timeout for embedding and completion calls.
    #[arg(long, env = "DOCQA_REQUEST_TIMEOUT_SECS", default_value_t = 60)]
    pub request_timeout_secs: u64,

    #[arg(long, env = "DOCQA_EXTRACTOR", value_enum, default_value_t = ExtractorKind::Ocr)]
    pub extractor: ExtractorKind,

    #[arg(long, env = "DOCQA_TESSERACT", default_value = "tesseract")]
    pub tesseract: PathBuf,

    #[arg(long, env = "DOCQA_PDFTOPPM", default_value = "pdftoppm")]
    pub pdftoppm: PathBuf,

    #[arg(long, env = "DOCQA_OCR_LANGUAGE", default_value = DEFAULT_LANGUAGE)]
    pub ocr_language: String,

    #[arg(long, env = "DOCQA_OCR_DPI", default_value_t = DEFAULT_DPI)]
    pub ocr_dpi: u32,

    #[arg(long, env = "DOCQA_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    #[arg(long, env = "DOCQA_CHUNK_OVERLAP", default_value_t = DEFAULT_CHUNK_OVERLAP)]
    pub chunk_overlap: usize,

    #[arg(long, env = "DOCQA_TOP_K", default_value_t = DEFAULT_TOP_K)]
    pub top_k: usize,

    #[arg(long, env = "DOCQA_EMBED_CONCURRENCY", default_value_t = DEFAULT_EMBED_CONCURRENCY)]
    pub embed_concurrency: usize,

    #[arg(long, env = "DOCQA_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

impl ServerConfig {
    /// The pipeline parameters selected on the command line, validated.
    pub fn rag_config(&self) -> Result<RagConfig> {
        RagConfig::builder()
            .chunk_size(self.chunk_size)
            .chunk_overlap(self.chunk_overlap)
            .top_k(self.top_k)
            .embed_concurrency(self.embed_concurrency)
            .build()
    }
}
