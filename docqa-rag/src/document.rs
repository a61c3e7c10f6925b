//! Data types for the indexed document, its chunks, and answers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The single text body currently answerable by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier assigned on ingestion.
    pub id: String,
    /// Filename declared by the uploader.
    pub source_name: String,
    /// Normalized text content.
    pub text: String,
    /// When the document was ingested.
    pub created_at: DateTime<Utc>,
}

impl Document {
    /// Create a document with a fresh id from already-normalized text.
    pub fn new(source_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            source_name: source_name.into(),
            text: text.into(),
            created_at: Utc::now(),
        }
    }

    /// Number of characters (Unicode scalar values) in the text.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// The first `max_chars` characters of the text.
    pub fn preview(&self, max_chars: usize) -> String {
        self.text.chars().take(max_chars).collect()
    }
}

/// A contiguous window of a [`Document`]'s text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    /// Position in document order; also the chunk's slot in the index.
    pub position: usize,
    /// Character offset of the window start within the document.
    pub start: usize,
    /// The window text.
    pub text: String,
}

/// One nearest-neighbour result from the vector index.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    /// Position of the matching vector (and chunk).
    pub position: usize,
    /// Squared Euclidean distance to the query.
    pub distance: f32,
}

/// A chunk cited as context for an answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedChunk {
    /// Position of the chunk in the document.
    pub position: usize,
    /// Squared Euclidean distance to the question embedding.
    pub distance: f32,
    /// The literal chunk text.
    pub text: String,
}

/// The result of a successful upload.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadSummary {
    /// Number of chunks indexed.
    pub chunks: usize,
    /// Number of characters in the normalized document.
    pub characters: usize,
}

/// The result of a successful question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    /// Text produced by the completion provider.
    pub answer: String,
    /// Retrieved chunks, nearest first.
    pub sources: Vec<RetrievedChunk>,
    /// Leading slice of the document text for display.
    pub document_preview: String,
}
