//! Request-scoped temporary files.
//!
//! pdfium is opened file-backed and the recognition engine reads images from
//! disk, so each request needs somewhere to put the document and its page
//! bitmaps. Everything lives in one uniquely named [`TempDir`] per request:
//! two concurrent requests rendering "page 1" write to different directories,
//! and dropping the [`RequestScratch`] removes whatever is left, whether the
//! request succeeded, failed half-way through the page loop, or panicked.

use crate::error::OcrServiceError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

const SCRATCH_PREFIX: &str = "pdf-ocr-";
const DOCUMENT_NAME: &str = "document.pdf";

/// Temporary directory owned by one request.
#[derive(Debug)]
pub struct RequestScratch {
    dir: TempDir,
}

impl RequestScratch {
    /// Create a fresh directory under `root`, or the system temp dir if `None`.
    pub fn create(root: Option<&Path>) -> Result<Self, OcrServiceError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(SCRATCH_PREFIX);
        let dir = match root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(|e| OcrServiceError::Internal(format!("Failed to create scratch dir: {e}")))?;

        let scratch = Self { dir };
        debug!("Created scratch dir {}", scratch.path().display());
        Ok(scratch)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Persist the downloaded document and return its path.
    pub async fn write_document(&self, bytes: &[u8]) -> Result<PathBuf, OcrServiceError> {
        let path = self.path().join(DOCUMENT_NAME);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| OcrServiceError::Internal(format!("Failed to write temp file: {e}")))?;
        Ok(path)
    }

    /// Path for the bitmap of a 0-indexed page.
    pub fn page_image_path(&self, index: usize) -> PathBuf {
        self.path().join(format!("page-{index}.png"))
    }
}

/// A page bitmap on disk, deleted when the guard is dropped.
#[derive(Debug)]
pub struct ScratchImage {
    path: PathBuf,
}

impl ScratchImage {
    /// Take ownership of an already-written file.
    pub fn adopt(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchImage {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove {}: {}", self.path.display(), e);
            }
        }
    }
}
