//! # pdf-ocr-service
//!
//! An HTTP service that takes the URL of a PDF, rasterises every page and runs
//! it through an OCR engine, returning the recognised text page by page.
//!
//! ## Pipeline Overview
//!
//! ```text
//! POST /ocr?url=…
//!  │
//!  ├─ 1. Fetch      download the document, check the %PDF signature
//!  ├─ 2. Scratch    write it into a request-scoped temp dir
//!  ├─ 3. Render     rasterise each page at 300 DPI via pdfium (spawn_blocking)
//!  ├─ 4. Recognise  one locked call into the shared recognition engine
//!  └─ 5. Respond    {"pages": ["text of page 1", "text of page 2", …]}
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_ocr_service::{router, share, CommandEngine, EngineConfig, OcrService, ServiceConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = CommandEngine::spawn(EngineConfig::default())?;
//!     let service = Arc::new(OcrService::new(ServiceConfig::default(), share(engine)));
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
//!     axum::serve(listener, router(service)).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `server` | on      | Enables the `pdf-ocr-server` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `server` when embedding the router in another application:
//! ```toml
//! pdf-ocr-service = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{EngineConfig, PageFailurePolicy, ServiceConfig, ServiceConfigBuilder};
pub use engine::CommandEngine;
pub use error::{OcrServiceError, PageError};
pub use extract::OcrService;
pub use output::OcrResponse;
pub use pipeline::recognize::{
    share, RawLine, RecognitionError, SharedRecognizer, TextPayload, TextRecognizer,
};
pub use server::router;
