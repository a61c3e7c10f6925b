//! Text extraction from uploaded files.
//!
//! The pipeline only sees the [`TextExtractor`] trait. [`PlainTextExtractor`] handles text
//! files; the OCR-backed extractor lives in [`crate::ocr`] behind the `ocr` feature.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

const TEXT_EXTENSIONS: &[&str] = &["txt", "text", "md", "markdown", "csv", "tsv", "log"];

/// Coarse file type used to route extraction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// A PDF, rasterised page by page before OCR.
    Pdf,
    /// A raster image read directly by OCR.
    Image,
    /// Already-textual content.
    Text,
}

impl DocumentKind {
    /// Classify by file extension, case-insensitively.
    ///
    /// Unknown or missing extensions are treated as images.
    pub fn from_filename(filename: &str) -> Self {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        if ext == "pdf" {
            Self::Pdf
        } else if TEXT_EXTENSIONS.contains(&ext.as_str()) {
            Self::Text
        } else {
            Self::Image
        }
    }
}

/// Turns uploaded bytes into raw (unnormalized) text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract text from `bytes`, using `filename` to decide how to read them.
    ///
    /// An empty string is a valid result; the pipeline decides what to do with it.
    async fn extract(&self, bytes: &[u8], filename: &str) -> Result<String>;
}

/// Reads text files as UTF-8 (invalid sequences are replaced) and refuses everything else.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

#[async_trait]
impl TextExtractor for PlainTextExtractor {
    async fn extract(&self, bytes: &[u8], filename: &str) -> Result<String> {
        match DocumentKind::from_filename(filename) {
            DocumentKind::Text => Ok(String::from_utf8_lossy(bytes).into_owned()),
            kind => Err(RagError::ExtractionError(format!(
                "cannot read '{filename}' as text ({kind:?}); OCR extraction is not enabled"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_extension() {
        assert_eq!(DocumentKind::from_filename("Report.PDF"), DocumentKind::Pdf);
        assert_eq!(DocumentKind::from_filename("scan.jpeg"), DocumentKind::Image);
        assert_eq!(DocumentKind::from_filename("notes.md"), DocumentKind::Text);
        assert_eq!(DocumentKind::from_filename("no_extension"), DocumentKind::Image);
    }

    #[tokio::test]
    async fn plain_extractor_reads_text_files() {
        let text = PlainTextExtractor.extract(b"hello\nworld", "a.txt").await.unwrap();
        assert_eq!(text, "hello\nworld");
    }

    #[tokio::test]
    async fn plain_extractor_rejects_binary_kinds() {
        let err = PlainTextExtractor.extract(b"%PDF-1.7", "a.pdf").await.unwrap_err();
        assert!(matches!(err, RagError::ExtractionError(_)));
    }
}
