//! Fixed-size overlapping chunking.
//!
//! Windows are measured in characters, not bytes, so multi-byte text never splits inside a code
//! point. [`chunk_text`] is the plain function; [`FixedSizeChunker`] implements the [`Chunker`]
//! trait used by the pipeline and records each window's position and start offset.

use crate::config::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::document::Chunk;
use crate::error::{RagError, Result};

/// A strategy for splitting document text into chunks.
pub trait Chunker: Send + Sync {
    /// Split text into chunks in document order.
    ///
    /// Returns an empty `Vec` if the text is empty.
    fn chunk(&self, text: &str) -> Vec<Chunk>;
}

/// Splits text into `chunk_size`-character windows that advance by `chunk_size - chunk_overlap`.
///
/// # Example
///
/// ```rust
/// use docqa_rag::{Chunker, FixedSizeChunker};
///
/// let chunker = FixedSizeChunker::new(4, 2).unwrap();
/// let texts: Vec<String> = chunker.chunk("ABCDEFGHIJ").into_iter().map(|c| c.text).collect();
/// assert_eq!(texts, ["ABCD", "CDEF", "EFGH", "GHIJ", "IJ"]);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ChunkingError`] when `chunk_size` is zero or
    /// `chunk_overlap >= chunk_size`, either of which would never advance.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RagError::ChunkingError("chunk_size must be greater than zero".into()));
        }
        if chunk_overlap >= chunk_size {
            return Err(RagError::ChunkingError(format!(
                "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, chunk_overlap })
    }

    /// Window size in characters.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Overlap between consecutive windows in characters.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    fn step(&self) -> usize {
        self.chunk_size - self.chunk_overlap
    }
}

impl Default for FixedSizeChunker {
    fn default() -> Self {
        Self { chunk_size: DEFAULT_CHUNK_SIZE, chunk_overlap: DEFAULT_CHUNK_OVERLAP }
    }
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, text: &str) -> Vec<Chunk> {
        if text.is_empty() {
            return Vec::new();
        }

        // Byte offset of every char, plus the end of the string.
        let mut bounds: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        let char_len = bounds.len();
        bounds.push(text.len());

        let mut chunks = Vec::with_capacity(char_len.div_ceil(self.step()));
        let mut start = 0;
        while start < char_len {
            let end = (start + self.chunk_size).min(char_len);
            chunks.push(Chunk {
                position: chunks.len(),
                start,
                text: text[bounds[start]..bounds[end]].to_string(),
            });
            start += self.step();
        }

        chunks
    }
}

/// Split `text` into overlapping windows of `size` characters.
///
/// # Errors
///
/// Returns [`RagError::ChunkingError`] if `size == 0` or `overlap >= size`.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Result<Vec<String>> {
    let chunker = FixedSizeChunker::new(size, overlap)?;
    Ok(chunker.chunk(text).into_iter().map(|c| c.text).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(chunks: Vec<Chunk>) -> Vec<String> {
        chunks.into_iter().map(|c| c.text).collect()
    }

    #[test]
    fn windows_advance_by_size_minus_overlap() {
        let chunks = FixedSizeChunker::new(4, 2).unwrap().chunk("ABCDEFGHIJ");
        let starts: Vec<usize> = chunks.iter().map(|c| c.start).collect();
        assert_eq!(starts, [0, 2, 4, 6, 8]);
        assert_eq!(texts(chunks), ["ABCD", "CDEF", "EFGH", "GHIJ", "IJ"]);
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(chunk_text("", 800, 200).unwrap().is_empty());
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        assert_eq!(chunk_text("hello", 800, 200).unwrap(), ["hello"]);
    }

    #[test]
    fn positions_follow_document_order() {
        let chunks = FixedSizeChunker::new(3, 1).unwrap().chunk("abcdefgh");
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.position, i);
        }
    }

    #[test]
    fn multibyte_text_is_split_on_char_boundaries() {
        let out = chunk_text("αβγδε", 2, 1).unwrap();
        assert_eq!(out, ["αβ", "βγ", "γδ", "δε", "ε"]);
    }

    #[test]
    fn rejects_non_advancing_parameters() {
        assert!(matches!(FixedSizeChunker::new(4, 4), Err(RagError::ChunkingError(_))));
        assert!(matches!(FixedSizeChunker::new(4, 9), Err(RagError::ChunkingError(_))));
        assert!(matches!(FixedSizeChunker::new(0, 0), Err(RagError::ChunkingError(_))));
    }
}
