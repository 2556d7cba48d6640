//! Server binary for pdf-ocr-service.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ServiceConfig` / `EngineConfig`, starts the recognition engine and serves
//! the router.

use anyhow::{Context, Result};
use clap::Parser;
use pdf_ocr_service::config::{
    DEFAULT_DOWNLOAD_TIMEOUT_SECS, DEFAULT_DPI, DEFAULT_MAX_DOWNLOAD_BYTES,
    DEFAULT_MAX_RENDERED_PIXELS,
};
use pdf_ocr_service::pipeline::render;
use pdf_ocr_service::{
    router, share, CommandEngine, EngineConfig, OcrService, PageFailurePolicy, ServiceConfig,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"ENGINE PROTOCOL:
  The engine is started once with the --engine-arg values followed by
    --lang <L> --use-gpu <bool> --drop-score <f> --use-angle-cls <bool>
  It reads one JSON request per line on stdin:   {"image": "/path/page-0.png"}
  and answers one JSON line on stdout: the per-image result list, e.g.
    [[ [[[x,y],...], ["text", 0.97]], ... ]]
  or {"error": "message"}.

EXAMPLES:
  pdf-ocr-server --port 8000 --engine ./paddle_engine.py --lang en
  curl -X POST 'http://localhost:8000/ocr?url=https://example.com/doc.pdf'

PDFIUM:
  Set PDFIUM_LIB_PATH (or --pdfium-lib) to an existing libpdfium, or place
  the library in the working directory.
"#;

/// Serve per-page OCR text for PDFs fetched by URL.
#[derive(Parser, Debug)]
#[command(
    name = "pdf-ocr-server",
    version,
    about = "Serve per-page OCR text for PDFs fetched by URL",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Address to bind.
    #[arg(long, env = "PDF_OCR_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to bind.
    #[arg(long, env = "PDF_OCR_PORT", default_value_t = 8000)]
    port: u16,

    /// Rendering DPI (72–600).
    #[arg(long, env = "PDF_OCR_DPI", default_value_t = DEFAULT_DPI,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Maximum rendered width or height in pixels.
    #[arg(long, env = "PDF_OCR_MAX_RENDERED_PIXELS", default_value_t = DEFAULT_MAX_RENDERED_PIXELS)]
    max_rendered_pixels: u32,

    /// Download timeout in seconds.
    #[arg(long, env = "PDF_OCR_DOWNLOAD_TIMEOUT", default_value_t = DEFAULT_DOWNLOAD_TIMEOUT_SECS)]
    download_timeout: u64,

    /// Largest accepted document, in bytes.
    #[arg(long, env = "PDF_OCR_MAX_DOWNLOAD_BYTES", default_value_t = DEFAULT_MAX_DOWNLOAD_BYTES)]
    max_download_bytes: u64,

    /// What to do when one page fails: abort or record.
    #[arg(long, env = "PDF_OCR_ON_PAGE_FAILURE", default_value = "abort")]
    on_page_failure: PageFailurePolicy,

    /// Root for per-request scratch directories (default: system temp).
    #[arg(long, env = "PDF_OCR_SCRATCH_DIR")]
    scratch_dir: Option<PathBuf>,

    /// Path to the pdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Recognition engine executable.
    #[arg(long, env = "PDF_OCR_ENGINE", default_value = "paddleocr-engine")]
    engine: PathBuf,

    /// Extra argument for the engine, placed before the generated flags.
    /// Repeatable.
    #[arg(long = "engine-arg", allow_hyphen_values = true)]
    engine_args: Vec<String>,

    /// Recognition language code.
    #[arg(long, env = "PDF_OCR_LANG", default_value = "uz")]
    lang: String,

    /// Run the engine on GPU.
    #[arg(long, env = "PDF_OCR_USE_GPU")]
    use_gpu: bool,

    /// Detection drop score.
    #[arg(long, env = "PDF_OCR_DROP_SCORE", default_value_t = 0.05)]
    drop_score: f32,

    /// Enable text-angle classification.
    #[arg(long, env = "PDF_OCR_USE_ANGLE_CLS")]
    use_angle_cls: bool,

    /// Enable debug logging.
    #[arg(short, long, env = "PDF_OCR_VERBOSE")]
    verbose: bool,
}

impl Cli {
    fn service_config(&self) -> Result<ServiceConfig> {
        let mut builder = ServiceConfig::builder()
            .dpi(self.dpi)
            .max_rendered_pixels(self.max_rendered_pixels)
            .download_timeout_secs(self.download_timeout)
            .max_download_bytes(self.max_download_bytes)
            .page_failure(self.on_page_failure);
        if let Some(dir) = &self.scratch_dir {
            builder = builder.scratch_dir(dir);
        }
        if let Some(lib) = &self.pdfium_lib {
            builder = builder.pdfium_lib_path(lib);
        }
        builder.build().context("Invalid service configuration")
    }

    fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            program: self.engine.clone(),
            extra_args: self.engine_args.clone(),
            language: self.lang.clone(),
            use_gpu: self.use_gpu,
            drop_score: self.drop_score,
            use_angle_cls: self.use_angle_cls,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = cli.service_config()?;

    // ── Fail fast if pdfium cannot be bound ──────────────────────────────
    let lib_path = config.pdfium_lib_path.clone();
    tokio::task::spawn_blocking(move || render::bind_pdfium(lib_path.as_deref()).map(drop))
        .await
        .context("pdfium check panicked")?
        .context("PDFium is not available")?;

    // ── Start the recognition engine ─────────────────────────────────────
    let engine_config = cli.engine_config();
    let engine = CommandEngine::spawn(engine_config.clone()).with_context(|| {
        format!(
            "Failed to start recognition engine '{}'",
            engine_config.program.display()
        )
    })?;

    let service = Arc::new(OcrService::new(config, share(engine)));
    let app = router(service);

    let addr = format!("{}:{}", cli.host, cli.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
