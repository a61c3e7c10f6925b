//! OCR extraction through the `tesseract` and `pdftoppm` command-line tools.
//!
//! This module is only available when the `ocr` feature is enabled.

use std::path::{Path, PathBuf};
use std::process::Output;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, error};

use crate::error::{RagError, Result};
use crate::extraction::{DocumentKind, PlainTextExtractor, TextExtractor};

/// Default OCR language passed to tesseract.
pub const DEFAULT_LANGUAGE: &str = "eng";

/// Default rasterisation resolution for PDF pages.
pub const DEFAULT_DPI: u32 = 200;

/// A [`TextExtractor`] that OCRs images and rasterised PDF pages.
///
/// PDFs are rendered to PNG with `pdftoppm` in a temporary directory, then each page is passed
/// to `tesseract` in page order. Text files skip OCR.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::ocr::OcrExtractor;
///
/// let extractor = OcrExtractor::new().with_language("deu");
/// let text = extractor.extract(&bytes, "scan.pdf").await?;
/// ```
#[derive(Debug, Clone)]
pub struct OcrExtractor {
    tesseract: PathBuf,
    pdftoppm: PathBuf,
    language: String,
    dpi: u32,
}

impl Default for OcrExtractor {
    fn default() -> Self {
        Self {
            tesseract: PathBuf::from("tesseract"),
            pdftoppm: PathBuf::from("pdftoppm"),
            language: DEFAULT_LANGUAGE.to_string(),
            dpi: DEFAULT_DPI,
        }
    }
}

impl OcrExtractor {
    /// Create an extractor that finds both tools on `PATH`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific `tesseract` binary.
    pub fn with_tesseract(mut self, path: impl Into<PathBuf>) -> Self {
        self.tesseract = path.into();
        self
    }

    /// Use a specific `pdftoppm` binary.
    pub fn with_pdftoppm(mut self, path: impl Into<PathBuf>) -> Self {
        self.pdftoppm = path.into();
        self
    }

    /// Set the tesseract language code (e.g. `eng`, `eng+fra`).
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Set the PDF rasterisation resolution.
    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    async fn ocr_image_file(&self, path: &Path) -> Result<String> {
        let output = run_tool(
            Command::new(&self.tesseract).arg(path).arg("stdout").arg("-l").arg(&self.language),
            "tesseract",
        )
        .await?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn ocr_image(&self, bytes: &[u8], filename: &str) -> Result<String> {
        let dir = tempfile::tempdir()?;
        let ext = Path::new(filename).extension().and_then(|e| e.to_str()).unwrap_or("img");
        let path = dir.path().join(format!("input.{ext}"));
        tokio::fs::write(&path, bytes).await?;
        self.ocr_image_file(&path).await
    }

    async fn ocr_pdf(&self, bytes: &[u8]) -> Result<String> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("input.pdf");
        tokio::fs::write(&input, bytes).await?;

        let prefix = dir.path().join("page");
        run_tool(
            Command::new(&self.pdftoppm)
                .arg("-r")
                .arg(self.dpi.to_string())
                .arg("-png")
                .arg(&input)
                .arg(&prefix),
            "pdftoppm",
        )
        .await?;

        let pages = rendered_pages(dir.path()).await?;
        debug!(page_count = pages.len(), "rasterised pdf");

        let mut text = String::new();
        for page in &pages {
            let page_text = self.ocr_image_file(page).await?;
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(&page_text);
        }
        Ok(text)
    }
}

/// PNG files written by `pdftoppm`, in page order.
///
/// pdftoppm zero-pads page numbers to a common width, so name order is page order.
async fn rendered_pages(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut pages = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with("page") && name.ends_with(".png") {
            pages.push(entry.path());
        }
    }
    pages.sort();
    Ok(pages)
}

async fn run_tool(command: &mut Command, tool: &str) -> Result<Output> {
    let output = command.output().await.map_err(|e| {
        error!(tool, error = %e, "failed to launch OCR tool");
        RagError::ExtractionError(format!("failed to run {tool}: {e}"))
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        error!(tool, status = %output.status, "OCR tool exited with an error");
        return Err(RagError::ExtractionError(format!(
            "{tool} exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }
    Ok(output)
}

#[async_trait]
impl TextExtractor for OcrExtractor {
    async fn extract(&self, bytes: &[u8], filename: &str) -> Result<String> {
        match DocumentKind::from_filename(filename) {
            DocumentKind::Text => PlainTextExtractor.extract(bytes, filename).await,
            DocumentKind::Pdf => self.ocr_pdf(bytes).await,
            DocumentKind::Image => self.ocr_image(bytes, filename).await,
        }
    }
}
