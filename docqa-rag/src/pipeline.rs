//! Retrieval pipeline orchestrator.
//!
//! The [`RagPipeline`] owns the single answerable document and coordinates both workflows:
//!
//! - upload: extract → normalize → chunk → embed → build index → swap
//! - ask: embed question → search → assemble context → complete
//!
//! The document, its chunks and its index live together in one [`KnowledgeBase`] behind an
//! `Arc`. Upload builds a new one off-lock and swaps the pointer only after every step succeeded,
//! so a failed upload leaves the previous state untouched. Ask clones the `Arc` once and works on
//! that snapshot for the whole request.
//!
//! # Example
//!
//! ```rust,ignore
//! use docqa_rag::{RagPipeline, RagConfig, HashEmbeddingProvider, StubCompletionProvider};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(HashEmbeddingProvider::default()))
//!     .completion_provider(Arc::new(StubCompletionProvider::default()))
//!     .build()?;
//!
//! pipeline.upload(&bytes, "notes.txt").await?;
//! let answer = pipeline.ask("What is this about?").await?;
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::{StreamExt, TryStreamExt, stream};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::chunking::{Chunker, FixedSizeChunker};
use crate::completion::CompletionProvider;
use crate::config::RagConfig;
use crate::document::{Answer, Chunk, Document, RetrievedChunk, UploadSummary};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::extraction::{PlainTextExtractor, TextExtractor};
use crate::index::{FlatL2Index, first_non_finite};
use crate::normalize::normalize;

/// Separator placed between retrieved chunks in the prompt context.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// Build the completion prompt that restricts the model to the retrieved context.
pub fn build_prompt(context: &str, question: &str) -> String {
    format!("\nAnswer ONLY from context.\n\nCONTEXT:\n{context}\n\nQUESTION:\n{question}\n")
}

/// A fully built document: text, chunks and the index aligned with them.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    document: Document,
    chunks: Vec<Chunk>,
    index: FlatL2Index,
}

impl KnowledgeBase {
    /// Assemble a knowledge base, checking that every chunk has exactly one vector.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] if `chunks` and `index` differ in length.
    pub fn new(document: Document, chunks: Vec<Chunk>, index: FlatL2Index) -> Result<Self> {
        if chunks.len() != index.len() {
            return Err(RagError::PipelineError(format!(
                "{} chunks but {} indexed vectors",
                chunks.len(),
                index.len()
            )));
        }
        Ok(Self { document, chunks, index })
    }

    /// The indexed document.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Chunks in document order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// The vector index; slot `i` belongs to `chunks()[i]`.
    pub fn index(&self) -> &FlatL2Index {
        &self.index
    }

    /// Summary of the indexed document.
    pub fn status(&self) -> DocumentStatus {
        DocumentStatus {
            document_id: self.document.id.clone(),
            filename: self.document.source_name.clone(),
            chunks: self.chunks.len(),
            characters: self.document.char_count(),
            dimensions: self.index.dimensions(),
            created_at: self.document.created_at,
        }
    }
}

/// Details of the currently indexed document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentStatus {
    /// Identifier assigned on ingestion.
    pub document_id: String,
    /// Filename declared by the uploader.
    pub filename: String,
    /// Number of indexed chunks.
    pub chunks: usize,
    /// Number of characters in the normalized text.
    pub characters: usize,
    /// Embedding dimensionality of the index.
    pub dimensions: usize,
    /// When the document was ingested.
    pub created_at: DateTime<Utc>,
}

/// Pipeline state as seen by callers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum PipelineStatus {
    /// Nothing has been uploaded successfully yet.
    Empty,
    /// A document is indexed and questions can be answered.
    Ready(DocumentStatus),
}

/// The retrieval pipeline orchestrator. Construct one via [`RagPipeline::builder()`].
pub struct RagPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    completion_provider: Arc<dyn CompletionProvider>,
    extractor: Arc<dyn TextExtractor>,
    chunker: Arc<dyn Chunker>,
    current: RwLock<Option<Arc<KnowledgeBase>>>,
    upload_lock: Mutex<()>,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// The knowledge base questions are currently answered from, if any.
    pub async fn snapshot(&self) -> Option<Arc<KnowledgeBase>> {
        self.current.read().await.clone()
    }

    /// Whether a document is indexed.
    pub async fn status(&self) -> PipelineStatus {
        match self.snapshot().await {
            Some(kb) => PipelineStatus::Ready(kb.status()),
            None => PipelineStatus::Empty,
        }
    }

    /// Extract text from an uploaded file and index it, replacing the current document.
    ///
    /// # Errors
    ///
    /// - [`RagError::ExtractionError`] if the extractor cannot read the file
    /// - everything [`ingest_text`](Self::ingest_text) can return
    ///
    /// On any error the previously indexed document stays in place.
    pub async fn upload(&self, bytes: &[u8], filename: &str) -> Result<UploadSummary> {
        debug!(filename, size = bytes.len(), "extracting upload");
        let raw = self.extractor.extract(bytes, filename).await.map_err(|e| {
            error!(filename, error = %e, "text extraction failed");
            e
        })?;
        self.ingest_text(&raw, filename).await
    }

    /// Normalize, chunk, embed and index `raw` text, then swap it in as the current document.
    ///
    /// # Errors
    ///
    /// - [`RagError::NoTextExtracted`] if nothing is left after normalization
    /// - [`RagError::EmbeddingError`] if any chunk fails to embed
    /// - [`RagError::DimensionMismatch`] if the embedder returns vectors of differing lengths
    pub async fn ingest_text(&self, raw: &str, source_name: &str) -> Result<UploadSummary> {
        let text = normalize(raw);
        if text.is_empty() {
            warn!(source_name, "no text left after normalization");
            return Err(RagError::NoTextExtracted);
        }

        let _upload = self.upload_lock.lock().await;

        let chunks = self.chunker.chunk(&text);
        if chunks.is_empty() {
            return Err(RagError::NoTextExtracted);
        }

        let vectors = self.embed_chunks(&chunks, source_name).await?;
        let index = FlatL2Index::build(vectors).map_err(|e| {
            error!(source_name, error = %e, "embedder returned inconsistent vectors");
            e
        })?;
        if index.dimensions() == 0 {
            return Err(RagError::EmbeddingError {
                provider: self.embedding_provider.name().to_string(),
                message: "provider returned empty vectors".to_string(),
            });
        }

        let document = Document::new(source_name, text);
        let summary = UploadSummary { chunks: chunks.len(), characters: document.char_count() };
        let kb = Arc::new(KnowledgeBase::new(document, chunks, index)?);

        *self.current.write().await = Some(Arc::clone(&kb));

        info!(
            document.id = %kb.document().id,
            source_name,
            chunk_count = summary.chunks,
            characters = summary.characters,
            dimensions = kb.index().dimensions(),
            "indexed document"
        );
        Ok(summary)
    }

    /// Embed chunk texts in batches, several batches in flight, results in chunk order.
    async fn embed_chunks(&self, chunks: &[Chunk], source_name: &str) -> Result<Vec<Vec<f32>>> {
        let provider = &self.embedding_provider;
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();

        let requests: Vec<_> =
            texts.chunks(self.config.embed_batch_size).map(|batch| provider.embed_batch(batch)).collect();
        let batches: Vec<Vec<Vec<f32>>> = stream::iter(requests)
            .buffered(self.config.embed_concurrency)
            .try_collect()
            .await
            .map_err(|e| {
                error!(source_name, error = %e, "embedding failed during upload");
                e
            })?;

        let vectors: Vec<Vec<f32>> = batches.into_iter().flatten().collect();
        if vectors.len() != chunks.len() {
            return Err(RagError::EmbeddingError {
                provider: provider.name().to_string(),
                message: format!("expected {} embeddings, got {}", chunks.len(), vectors.len()),
            });
        }
        for (position, vector) in vectors.iter().enumerate() {
            self.check_finite(vector, &format!("chunk {position}"))?;
        }
        Ok(vectors)
    }

    fn check_finite(&self, vector: &[f32], what: &str) -> Result<()> {
        match first_non_finite(vector) {
            Some(i) => {
                let provider = self.embedding_provider.name();
                error!(provider, component = i, "embedding contains NaN or infinity");
                Err(RagError::EmbeddingError {
                    provider: provider.to_string(),
                    message: format!("embedding for {what} has a non-finite component at {i}"),
                })
            }
            None => Ok(()),
        }
    }

    /// Answer a question from the current document.
    ///
    /// Retrieves the `top_k` nearest chunks, passes them nearest-first as context to the
    /// completion provider, and returns the answer with the cited chunk texts.
    ///
    /// # Errors
    ///
    /// - [`RagError::NotReady`] if nothing has been uploaded, whatever the question
    /// - [`RagError::InvalidRequest`] if the question is blank
    /// - [`RagError::EmbeddingError`] / [`RagError::CompletionError`] on service failure,
    ///   including a question embedding with NaN or infinite components
    /// - [`RagError::DimensionMismatch`] if the question vector does not fit the index
    ///
    /// The question is embedded and quoted in the prompt exactly as given.
    pub async fn ask(&self, question: &str) -> Result<Answer> {
        let kb = self.snapshot().await.ok_or(RagError::NotReady)?;

        if question.trim().is_empty() {
            return Err(RagError::InvalidRequest("question cannot be empty".to_string()));
        }

        let query = self.embedding_provider.embed(question).await.map_err(|e| {
            error!(error = %e, "embedding failed during query");
            e
        })?;
        self.check_finite(&query, "question")?;

        let hits = kb.index().search(&query, self.config.top_k).map_err(|e| {
            error!(document.id = %kb.document().id, error = %e, "index search failed");
            e
        })?;

        let sources = hits
            .iter()
            .map(|hit| {
                let chunk = kb.chunks().get(hit.position).ok_or_else(|| {
                    RagError::PipelineError(format!("no chunk at index slot {}", hit.position))
                })?;
                Ok(RetrievedChunk {
                    position: hit.position,
                    distance: hit.distance,
                    text: chunk.text.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let context =
            sources.iter().map(|s| s.text.as_str()).collect::<Vec<_>>().join(CONTEXT_SEPARATOR);
        let prompt = build_prompt(&context, question);

        let answer = self.completion_provider.complete(&prompt).await.map_err(|e| {
            error!(error = %e, "completion failed");
            e
        })?;

        info!(
            document.id = %kb.document().id,
            source_count = sources.len(),
            "answered question"
        );

        Ok(Answer {
            answer,
            sources,
            document_preview: kb.document().preview(self.config.preview_chars),
        })
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// `config`, `embedding_provider` and `completion_provider` are required. The extractor
/// defaults to [`PlainTextExtractor`] and the chunker to a [`FixedSizeChunker`] using the
/// configured size and overlap.
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    completion_provider: Option<Arc<dyn CompletionProvider>>,
    extractor: Option<Arc<dyn TextExtractor>>,
    chunker: Option<Arc<dyn Chunker>>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider used for both chunks and questions.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the completion provider.
    pub fn completion_provider(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.completion_provider = Some(provider);
        self
    }

    /// Set the text extractor used by [`RagPipeline::upload`].
    pub fn extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Replace the default fixed-size chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Build the [`RagPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if any required field is missing or the configuration
    /// is inconsistent.
    pub fn build(self) -> Result<RagPipeline> {
        let config =
            self.config.ok_or_else(|| RagError::ConfigError("config is required".to_string()))?;
        config.validate()?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let completion_provider = self
            .completion_provider
            .ok_or_else(|| RagError::ConfigError("completion_provider is required".to_string()))?;
        let chunker = match self.chunker {
            Some(chunker) => chunker,
            None => Arc::new(FixedSizeChunker::new(config.chunk_size, config.chunk_overlap)?),
        };

        Ok(RagPipeline {
            config,
            embedding_provider,
            completion_provider,
            extractor: self.extractor.unwrap_or_else(|| Arc::new(PlainTextExtractor)),
            chunker,
            current: RwLock::new(None),
            upload_lock: Mutex::new(()),
        })
    }
}
