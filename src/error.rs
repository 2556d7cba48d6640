//! Error types for the pdf-ocr-service library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`OcrServiceError`]: **Fatal**: the request cannot produce a response
//!   (unreachable URL, not a PDF, engine failure under the abort policy).
//!   Returned as `Err(OcrServiceError)` from [`crate::OcrService::extract`].
//!
//! * [`PageError`]: **Non-fatal**: a single page failed while the
//!   [`crate::PageFailurePolicy::Record`] policy is active. Stored in
//!   [`crate::OcrResponse::errors`] next to the page's empty text.
//!
//! Every fatal variant is either a *client-input* error (the caller supplied a
//! bad URL or a bad document) or a server-side error; see
//! [`OcrServiceError::is_client_error`].

use axum::http::StatusCode;
use thiserror::Error;

/// All fatal errors returned by the pdf-ocr-service library.
#[derive(Debug, Error)]
pub enum OcrServiceError {
    // ── Download errors (client input) ────────────────────────────────────
    /// The URL could not be fetched: bad syntax, DNS failure, refused
    /// connection, non-success status, or a broken body.
    #[error("download error: failed to fetch '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// The download exceeded the configured timeout.
    #[error("download error: timed out after {secs}s fetching '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    /// The document is larger than the configured limit.
    #[error("download error: '{url}' exceeds the {limit}-byte size limit")]
    DownloadTooLarge { url: String, limit: u64 },

    // ── Document errors (client input) ────────────────────────────────────
    /// The fetched bytes carry no `%PDF` header near their start.
    #[error("invalid PDF: no %PDF header in the first 1024 bytes (first bytes: {magic:?})")]
    NotAPdf { magic: Vec<u8> },

    /// pdfium could not parse the document.
    #[error("invalid PDF: {detail}")]
    CorruptPdf { detail: String },

    /// The document is encrypted; passwords are not accepted by this service.
    #[error("invalid PDF: document is encrypted and requires a password")]
    PasswordRequired,

    // ── Pipeline errors (server side) ─────────────────────────────────────
    /// pdfium failed to rasterise a page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// The recognition engine failed on a page.
    #[error("Recognition failed for page {page}: {detail}")]
    RecognitionFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH (or --pdfium-lib) to an existing libpdfium."
    )]
    PdfiumBindingFailed(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl OcrServiceError {
    /// `true` when the fault lies with the caller-supplied URL or document.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::DownloadFailed { .. }
                | Self::DownloadTimeout { .. }
                | Self::DownloadTooLarge { .. }
                | Self::NotAPdf { .. }
                | Self::CorruptPdf { .. }
                | Self::PasswordRequired
        )
    }

    /// HTTP status for the wire response: 400 for client-input errors,
    /// 500 otherwise.
    pub fn status(&self) -> StatusCode {
        if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    /// Stable machine-readable code for the wire response.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DownloadFailed { .. } => "download_failed",
            Self::DownloadTimeout { .. } => "download_timeout",
            Self::DownloadTooLarge { .. } => "download_too_large",
            Self::NotAPdf { .. } | Self::CorruptPdf { .. } | Self::PasswordRequired => {
                "invalid_document"
            }
            Self::RasterisationFailed { .. } => "render_failed",
            Self::RecognitionFailed { .. } => "recognition_failed",
            Self::PdfiumBindingFailed(_) => "engine_unavailable",
            Self::InvalidConfig(_) | Self::Internal(_) => "internal_error",
        }
    }
}

/// A non-fatal error for a single page.
///
/// Only produced under [`crate::PageFailurePolicy::Record`]; the page's text
/// is left empty and the error is reported alongside the pages.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageError {
    /// Page rasterisation failed.
    #[error("Page {page}: rasterisation failed: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// The recognition engine failed on this page.
    #[error("Page {page}: recognition failed: {detail}")]
    RecognitionFailed { page: usize, detail: String },
}

impl PageError {
    /// 1-indexed page number the error belongs to.
    pub fn page(&self) -> usize {
        match self {
            Self::RenderFailed { page, .. } | Self::RecognitionFailed { page, .. } => *page,
        }
    }
}

impl From<PageError> for OcrServiceError {
    fn from(e: PageError) -> Self {
        match e {
            PageError::RenderFailed { page, detail } => {
                OcrServiceError::RasterisationFailed { page, detail }
            }
            PageError::RecognitionFailed { page, detail } => {
                OcrServiceError::RecognitionFailed { page, detail }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_errors_are_client_errors() {
        let e = OcrServiceError::DownloadFailed {
            url: "http://nowhere.invalid/a.pdf".into(),
            reason: "dns error".into(),
        };
        assert!(e.is_client_error());
        assert_eq!(e.status(), StatusCode::BAD_REQUEST);
        assert_eq!(e.code(), "download_failed");
        assert!(e.to_string().starts_with("download error"), "got: {e}");
        assert!(e.to_string().contains("dns error"));
    }

    #[test]
    fn document_errors_share_a_code() {
        let not_pdf = OcrServiceError::NotAPdf {
            magic: b"<htm".to_vec(),
        };
        let corrupt = OcrServiceError::CorruptPdf {
            detail: "xref".into(),
        };
        assert_eq!(not_pdf.code(), "invalid_document");
        assert_eq!(corrupt.code(), "invalid_document");
        assert!(not_pdf.is_client_error() && corrupt.is_client_error());
        assert!(corrupt.to_string().starts_with("invalid PDF"));
    }

    #[test]
    fn pipeline_errors_are_server_errors() {
        let e = OcrServiceError::RecognitionFailed {
            page: 3,
            detail: "engine exited".into(),
        };
        assert!(!e.is_client_error());
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(e.code(), "recognition_failed");
        assert!(e.to_string().contains("page 3"));
    }

    #[test]
    fn timeout_display() {
        let e = OcrServiceError::DownloadTimeout {
            url: "http://slow.example/doc.pdf".into(),
            secs: 15,
        };
        assert!(e.to_string().contains("15s"));
        assert_eq!(e.code(), "download_timeout");
    }

    #[test]
    fn page_error_serialises_with_kind_tag() {
        let e = PageError::RecognitionFailed {
            page: 2,
            detail: "boom".into(),
        };
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["kind"], "recognition_failed");
        assert_eq!(json["page"], 2);
        assert_eq!(e.page(), 2);
    }

    #[test]
    fn page_error_escalates_to_fatal() {
        let fatal: OcrServiceError = PageError::RenderFailed {
            page: 1,
            detail: "bitmap".into(),
        }
        .into();
        assert_eq!(fatal.code(), "render_failed");
    }
}
