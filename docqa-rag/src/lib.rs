//! # docqa-rag
//!
//! Question answering over a single uploaded document.
//!
//! ## Overview
//!
//! - [`normalize`] cleans raw extractor output
//! - [`FixedSizeChunker`] splits text into overlapping character windows
//! - [`EmbeddingProvider`] and [`CompletionProvider`] wrap the model backends
//! - [`FlatL2Index`] answers exact nearest-neighbour queries by squared L2 distance
//! - [`RagPipeline`] ties them together: upload builds a [`KnowledgeBase`], ask queries it
//!
//! ## Features
//!
//! - `gemini`: [`gemini::GeminiProvider`] for the hosted Gemini API
//! - `ollama`: [`ollama::OllamaProvider`] for a local Ollama server
//! - `ocr`: [`ocr::OcrExtractor`] for PDFs and images via tesseract
//! - `full`: all of the above
//!
//! The [`stub`] providers are always available and need no network.

pub mod chunking;
pub mod completion;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod extraction;
pub mod index;
pub mod normalize;
pub mod pipeline;
pub mod stub;

#[cfg(feature = "gemini")]
pub mod gemini;
#[cfg(feature = "ocr")]
pub mod ocr;
#[cfg(feature = "ollama")]
pub mod ollama;

pub use chunking::{Chunker, FixedSizeChunker, chunk_text};
pub use completion::CompletionProvider;
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Answer, Chunk, Document, RetrievedChunk, SearchHit, UploadSummary};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use extraction::{DocumentKind, PlainTextExtractor, TextExtractor};
pub use index::{FlatL2Index, squared_l2};
pub use normalize::normalize;
pub use pipeline::{
    DocumentStatus, KnowledgeBase, PipelineStatus, RagPipeline, RagPipelineBuilder, build_prompt,
};
pub use stub::{HashEmbeddingProvider, StubCompletionProvider};
