//! Request orchestration: URL in, per-page text out.
//!
//! ```text
//! START ──download──▶ FETCHED ──open──▶ OPENED ──(render ▸ recognise)*──▶ RESPONDED
//!   │                   │
//!   ▼                   ▼
//! DOWNLOAD_FAILED     PARSE_FAILED
//! ```
//!
//! Caller-input failures (download, invalid document) are detected before any
//! page is rendered and end the request with no partial results. Page
//! failures follow [`PageFailurePolicy`].

use crate::config::{PageFailurePolicy, ServiceConfig};
use crate::error::{OcrServiceError, PageError};
use crate::output::OcrResponse;
use crate::pipeline::fetch::{self, FetchOptions};
use crate::pipeline::recognize::{self, SharedRecognizer};
use crate::pipeline::render;
use crate::pipeline::scratch::{RequestScratch, ScratchImage};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, warn};

/// The OCR service: configuration plus the injected recogniser.
///
/// Cheap to share behind an `Arc`; all per-request state lives inside
/// [`OcrService::extract`].
pub struct OcrService {
    config: ServiceConfig,
    recognizer: SharedRecognizer,
    recognizer_name: String,
}

impl OcrService {
    pub fn new(config: ServiceConfig, recognizer: SharedRecognizer) -> Self {
        let recognizer_name = recognizer
            .lock()
            .map(|r| r.name().to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        Self {
            config,
            recognizer,
            recognizer_name,
        }
    }

    pub fn recognizer_name(&self) -> &str {
        &self.recognizer_name
    }

    /// Download the PDF at `url` and return the recognised text of every page.
    ///
    /// # Errors
    /// - Download failures and invalid documents (client-input errors)
    /// - pdfium binding failures
    /// - Render or recognition failures under [`PageFailurePolicy::Abort`]
    pub async fn extract(&self, url: &str) -> Result<OcrResponse, OcrServiceError> {
        let total_start = Instant::now();
        info!("Starting extraction: {}", url);

        // ── Step 1: Fetch ────────────────────────────────────────────────────
        let opts = FetchOptions {
            timeout_secs: self.config.download_timeout_secs,
            max_bytes: self.config.max_download_bytes,
        };
        let bytes = fetch::download(url, &opts).await?;
        fetch::check_pdf_magic(&bytes)?;

        // ── Step 2: Persist into the request scratch dir ─────────────────────
        let scratch = RequestScratch::create(self.config.scratch_dir.as_deref())?;
        let pdf_path = scratch.write_document(&bytes).await?;
        drop(bytes);

        // ── Step 3: Open, render and recognise on the blocking pool ──────────
        // The scratch dir moves into the task so it is removed only once the
        // task is done with it, even if this future is dropped.
        let job = PageJob {
            config: self.config.clone(),
            recognizer: self.recognizer.clone(),
            pdf_path,
        };
        let response = tokio::task::spawn_blocking(move || {
            let result = job.run(&scratch);
            drop(scratch);
            result
        })
        .await
        .map_err(|e| OcrServiceError::Internal(format!("Page task panicked: {}", e)))??;

        info!(
            "Extraction complete: {} pages ({} failed), {}ms total",
            response.pages.len(),
            response.errors.len(),
            total_start.elapsed().as_millis()
        );
        Ok(response)
    }
}

/// Everything the blocking page loop needs, owned.
struct PageJob {
    config: ServiceConfig,
    recognizer: SharedRecognizer,
    pdf_path: PathBuf,
}

impl PageJob {
    fn run(&self, scratch: &RequestScratch) -> Result<OcrResponse, OcrServiceError> {
        let pdfium = render::bind_pdfium(self.config.pdfium_lib_path.as_deref())?;
        let document = render::open_document(&pdfium, &self.pdf_path)?;
        let total_pages = document.pages().len() as usize;

        collect_pages(total_pages, self.config.page_failure, |index| {
            let image = render::render_page(
                &document,
                index,
                self.config.dpi,
                self.config.max_rendered_pixels,
                &scratch.page_image_path(index),
            )?;
            recognize_image(&self.recognizer, image, index)
        })
    }
}

/// Run `process` over pages `0..total_pages` in order and apply `policy` to
/// each page failure.
fn collect_pages<F>(
    total_pages: usize,
    policy: PageFailurePolicy,
    mut process: F,
) -> Result<OcrResponse, OcrServiceError>
where
    F: FnMut(usize) -> Result<String, PageError>,
{
    let mut response = OcrResponse {
        pages: Vec::with_capacity(total_pages),
        errors: Vec::new(),
    };

    for index in 0..total_pages {
        let page_start = Instant::now();
        match process(index) {
            Ok(text) => {
                debug!(
                    "Page {}/{}: {} chars in {}ms",
                    index + 1,
                    total_pages,
                    text.len(),
                    page_start.elapsed().as_millis()
                );
                response.pages.push(text);
            }
            Err(page_err) => match policy {
                PageFailurePolicy::Abort => return Err(page_err.into()),
                PageFailurePolicy::Record => {
                    warn!("{}", page_err);
                    response.pages.push(String::new());
                    response.errors.push(page_err);
                }
            },
        }
    }

    Ok(response)
}

/// Recognise the 0-indexed page bitmap `image`, consuming it.
///
/// The bitmap is deleted on return, whether recognition succeeded or not.
fn recognize_image(
    recognizer: &SharedRecognizer,
    image: ScratchImage,
    index: usize,
) -> Result<String, PageError> {
    recognize::recognize_page(recognizer, image.path()).map_err(|e| PageError::RecognitionFailed {
        page: index + 1,
        detail: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::recognize::{share, RawLine, RecognitionError, TextRecognizer};
    use std::path::Path;
    use tempfile::TempDir;

    /// Answers `p1`, `p2`, … and fails on call `fail_at`. Also fails if the
    /// bitmap is not on disk when asked.
    struct Flaky {
        calls: usize,
        fail_at: Option<usize>,
    }

    impl TextRecognizer for Flaky {
        fn name(&self) -> &str {
            "flaky"
        }

        fn recognize(&mut self, image: &Path) -> Result<Vec<RawLine>, RecognitionError> {
            let n = self.calls;
            self.calls += 1;
            if !image.exists() {
                return Err(RecognitionError::Engine(format!("{} missing", image.display())));
            }
            if Some(n) == self.fail_at {
                return Err(RecognitionError::Engine("model crashed".into()));
            }
            Ok(vec![RawLine::flat(format!("p{}", n + 1), 0.9)])
        }
    }

    /// Write a fake bitmap for page `index` and recognise it the way the
    /// page loop does.
    fn fake_page(
        scratch: &RequestScratch,
        recognizer: &SharedRecognizer,
        index: usize,
    ) -> Result<String, PageError> {
        let path = scratch.page_image_path(index);
        std::fs::write(&path, b"\x89PNG").unwrap();
        recognize_image(recognizer, ScratchImage::adopt(path), index)
    }

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn pages_come_back_in_order() {
        let response =
            collect_pages(4, PageFailurePolicy::Abort, |i| Ok(format!("page {}", i + 1))).unwrap();
        assert_eq!(response.pages, ["page 1", "page 2", "page 3", "page 4"]);
        assert!(response.is_complete());
    }

    #[test]
    fn zero_pages_is_an_empty_response() {
        let response = collect_pages(0, PageFailurePolicy::Abort, |_| {
            panic!("no page to process")
        })
        .unwrap();
        assert_eq!(response, OcrResponse::default());
    }

    #[test]
    fn abort_stops_at_the_first_failure() {
        let mut calls = 0;
        let err = collect_pages(3, PageFailurePolicy::Abort, |i| {
            calls += 1;
            if i == 1 {
                Err(PageError::RenderFailed {
                    page: i + 1,
                    detail: "bitmap".into(),
                })
            } else {
                Ok("ok".into())
            }
        })
        .unwrap_err();
        assert_eq!(calls, 2);
        assert_eq!(err.code(), "render_failed");
        assert!(err.to_string().contains("page 2"), "{err}");
    }

    #[test]
    fn record_keeps_going_and_lists_failures() {
        let response = collect_pages(3, PageFailurePolicy::Record, |i| {
            if i == 1 {
                Err(PageError::RecognitionFailed {
                    page: i + 1,
                    detail: "engine exited".into(),
                })
            } else {
                Ok(format!("p{}", i + 1))
            }
        })
        .unwrap();
        assert_eq!(response.pages, ["p1", "", "p3"]);
        assert_eq!(response.errors.len(), 1);
        assert_eq!(response.errors[0].page(), 2);
    }

    #[test]
    fn aborted_request_leaves_no_bitmaps() {
        let root = TempDir::new().unwrap();
        let scratch = RequestScratch::create(Some(root.path())).unwrap();
        let recognizer = share(Flaky {
            calls: 0,
            fail_at: Some(1),
        });

        let err = collect_pages(3, PageFailurePolicy::Abort, |i| {
            fake_page(&scratch, &recognizer, i)
        })
        .unwrap_err();

        assert_eq!(err.code(), "recognition_failed");
        assert_eq!(entries(scratch.path()), 0);
        drop(scratch);
        assert_eq!(entries(root.path()), 0);
    }

    #[test]
    fn recorded_failure_leaves_no_bitmaps() {
        let root = TempDir::new().unwrap();
        let scratch = RequestScratch::create(Some(root.path())).unwrap();
        let recognizer = share(Flaky {
            calls: 0,
            fail_at: Some(0),
        });

        let response = collect_pages(3, PageFailurePolicy::Record, |i| {
            fake_page(&scratch, &recognizer, i)
        })
        .unwrap();

        assert_eq!(response.pages, ["", "p2", "p3"]);
        assert!(matches!(
            response.errors[0],
            PageError::RecognitionFailed { page: 1, .. }
        ));
        assert_eq!(entries(scratch.path()), 0);
    }
}
