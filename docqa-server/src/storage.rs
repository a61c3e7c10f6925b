//! Keeps a copy of every uploaded file on disk.

use std::io;
use std::path::{Path, PathBuf};

use uuid::Uuid;

/// Fallback name for uploads whose filename is empty or only path separators.
const UNNAMED_UPLOAD: &str = "upload";

/// Writes raw uploads to a directory as `{uuid}_{filename}`.
///
/// Files are never read back; the pipeline works from the bytes in memory.
#[derive(Clone, Debug)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save `bytes`, creating the directory on first use, and return the written path.
    pub async fn save(&self, bytes: &[u8], filename: &str) -> io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(format!("{}_{}", Uuid::new_v4(), sanitize_filename(filename)));
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }
}

/// Reduce a client-supplied filename to its final path component.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    if base.is_empty() || base == "." || base == ".." {
        UNNAMED_UPLOAD.to_string()
    } else {
        base.to_string()
    }
}
