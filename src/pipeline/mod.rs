//! Pipeline stages for PDF-to-text recognition.
//!
//! Each submodule implements one step. Stages are driven by
//! [`crate::extract::OcrService`], which owns the ordering and the failure
//! policy.
//!
//! ## Data Flow
//!
//! ```text
//! fetch ──▶ scratch ──▶ render ──▶ recognize
//! (HTTP)    (TempDir)   (pdfium)   (engine)
//! ```
//!
//! 1. [`fetch`]    : download the document and check its `%PDF` magic
//! 2. [`scratch`]  : request-scoped temp dir holding the document and bitmaps
//! 3. [`render`]   : rasterise each page to PNG; blocking, because pdfium is
//!    not async-safe
//! 4. [`recognize`]: run the shared recogniser and normalise its line records

pub mod fetch;
pub mod recognize;
pub mod render;
pub mod scratch;
