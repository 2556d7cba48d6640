//! Fetcher: download the caller's document into memory.
//!
//! Every failure here is the caller's problem (bad URL, unreachable host,
//! oversized body) and surfaces as a client-input error. There is no retry.
//! Nothing touches the filesystem until the bytes are fully in hand, so a
//! failed download leaves no artefacts behind.

use crate::error::OcrServiceError;
use bytes::{Bytes, BytesMut};
use std::time::Duration;
use tracing::{debug, info};

/// The PDF header signature.
pub const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// How far into the body the signature may start.
pub const HEADER_SEARCH_WINDOW: usize = 1024;

/// Knobs for a single download.
#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    pub timeout_secs: u64,
    pub max_bytes: u64,
}

/// Check if the input string looks like an HTTP(S) URL.
pub fn is_http_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Download `url` and return its body.
///
/// The body is read chunk by chunk so `max_bytes` is enforced without
/// buffering an oversized response first.
pub async fn download(url: &str, opts: &FetchOptions) -> Result<Bytes, OcrServiceError> {
    info!("Downloading document from: {}", url);

    let failed = |reason: String| OcrServiceError::DownloadFailed {
        url: url.to_string(),
        reason,
    };
    let from_reqwest = |e: reqwest::Error| {
        if e.is_timeout() {
            OcrServiceError::DownloadTimeout {
                url: url.to_string(),
                secs: opts.timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    };

    if !is_http_url(url) {
        return Err(failed("not an http:// or https:// URL".to_string()));
    }

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(opts.timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let mut response = client.get(url).send().await.map_err(from_reqwest)?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let too_large = || OcrServiceError::DownloadTooLarge {
        url: url.to_string(),
        limit: opts.max_bytes,
    };

    if let Some(declared) = response.content_length() {
        if declared > opts.max_bytes {
            return Err(too_large());
        }
    }

    let mut body = BytesMut::new();
    while let Some(chunk) = response.chunk().await.map_err(from_reqwest)? {
        if (body.len() + chunk.len()) as u64 > opts.max_bytes {
            return Err(too_large());
        }
        body.extend_from_slice(&chunk);
    }

    debug!("Downloaded {} bytes from {}", body.len(), url);
    Ok(body.freeze())
}

/// Reject bytes that do not carry the PDF signature.
///
/// PDF readers tolerate junk before the header, so the signature may start
/// anywhere in the first [`HEADER_SEARCH_WINDOW`] bytes. Catches HTML error
/// pages and other non-PDF bodies before pdfium is even bound.
pub fn check_pdf_magic(bytes: &[u8]) -> Result<(), OcrServiceError> {
    let head = &bytes[..bytes.len().min(HEADER_SEARCH_WINDOW)];
    if !head.windows(PDF_MAGIC.len()).any(|w| w == PDF_MAGIC) {
        return Err(OcrServiceError::NotAPdf {
            magic: bytes.iter().take(PDF_MAGIC.len()).copied().collect(),
        });
    }
    Ok(())
}
