//! Configuration types for the OCR service.
//!
//! Language, DPI, GPU flag, drop score and angle classification are plain
//! data, fixed when the service is constructed.
//!
//! * [`ServiceConfig`]: fetch, render and failure-handling knobs, built via
//!   [`ServiceConfigBuilder`].
//! * [`EngineConfig`]: how to start the external recognition engine.

use crate::error::OcrServiceError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Default rendering resolution. 300 DPI keeps small fonts legible for the
/// recogniser.
pub const DEFAULT_DPI: u32 = 300;

/// Default download timeout in seconds.
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 15;

/// Default cap on the downloaded document size (100 MiB).
pub const DEFAULT_MAX_DOWNLOAD_BYTES: u64 = 100 * 1024 * 1024;

/// Default cap on either edge of a rendered page, in pixels.
pub const DEFAULT_MAX_RENDERED_PIXELS: u32 = 10_000;

/// Configuration for one [`crate::OcrService`].
///
/// Built via [`ServiceConfig::builder()`] or [`ServiceConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf_ocr_service::{PageFailurePolicy, ServiceConfig};
///
/// let config = ServiceConfig::builder()
///     .dpi(200)
///     .download_timeout_secs(30)
///     .page_failure(PageFailurePolicy::Record)
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 200);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Rendering DPI for every page. Range: 72–600. Default: 300.
    pub dpi: u32,

    /// Maximum rendered width or height in pixels. Default: 10 000.
    ///
    /// A 300-DPI render of an A0 poster would be ~10 000 × 14 000 px; the cap
    /// scales the longer edge down and the other proportionally.
    pub max_rendered_pixels: u32,

    /// HTTP download timeout in seconds. Default: 15.
    pub download_timeout_secs: u64,

    /// Largest document accepted, in bytes. Default: 100 MiB.
    pub max_download_bytes: u64,

    /// What happens when a single page fails to render or recognise.
    /// Default: [`PageFailurePolicy::Abort`].
    pub page_failure: PageFailurePolicy,

    /// Root under which per-request scratch directories are created.
    /// `None` uses the system temporary directory.
    pub scratch_dir: Option<PathBuf>,

    /// Explicit path to the pdfium shared library.
    /// `None` tries the working directory, then the system library.
    pub pdfium_lib_path: Option<PathBuf>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_DPI,
            max_rendered_pixels: DEFAULT_MAX_RENDERED_PIXELS,
            download_timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
            max_download_bytes: DEFAULT_MAX_DOWNLOAD_BYTES,
            page_failure: PageFailurePolicy::default(),
            scratch_dir: None,
            pdfium_lib_path: None,
        }
    }
}

impl ServiceConfig {
    /// Create a new builder for `ServiceConfig`.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ServiceConfig`].
#[derive(Debug)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn max_download_bytes(mut self, bytes: u64) -> Self {
        self.config.max_download_bytes = bytes;
        self
    }

    pub fn page_failure(mut self, policy: PageFailurePolicy) -> Self {
        self.config.page_failure = policy;
        self
    }

    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.scratch_dir = Some(dir.into());
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServiceConfig, OcrServiceError> {
        let c = &self.config;
        if c.download_timeout_secs == 0 {
            return Err(OcrServiceError::InvalidConfig(
                "Download timeout must be ≥ 1 second".into(),
            ));
        }
        if c.max_download_bytes == 0 {
            return Err(OcrServiceError::InvalidConfig(
                "Maximum download size must be ≥ 1 byte".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Policy for a page that fails to render or recognise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageFailurePolicy {
    /// Fail the whole request on the first bad page; no partial results. (default)
    #[default]
    Abort,
    /// Leave the page's text empty, record a [`crate::PageError`], and continue.
    Record,
}

impl FromStr for PageFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(Self::Abort),
            "record" => Ok(Self::Record),
            other => Err(format!("unknown page-failure policy '{other}' (expected abort|record)")),
        }
    }
}

/// How to launch the external recognition engine.
///
/// The engine process is started once and receives these values as
/// command-line flags; they cannot change per request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Engine executable, resolved through `PATH` when not absolute.
    pub program: PathBuf,

    /// Extra arguments placed before the generated flags.
    pub extra_args: Vec<String>,

    /// Recognition language code. Default: `uz`.
    pub language: String,

    /// Run the engine on GPU. Default: false.
    pub use_gpu: bool,

    /// Detection drop score. Default: 0.05, so low-confidence lines are kept.
    pub drop_score: f32,

    /// Enable text-angle classification. Default: false.
    pub use_angle_cls: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("paddleocr-engine"),
            extra_args: Vec::new(),
            language: "uz".to_string(),
            use_gpu: false,
            drop_score: 0.05,
            use_angle_cls: false,
        }
    }
}

impl EngineConfig {
    /// Full argument list passed to the engine process.
    pub fn command_args(&self) -> Vec<String> {
        let mut args = self.extra_args.clone();
        args.extend([
            "--lang".to_string(),
            self.language.clone(),
            "--use-gpu".to_string(),
            self.use_gpu.to_string(),
            "--drop-score".to_string(),
            self.drop_score.to_string(),
            "--use-angle-cls".to_string(),
            self.use_angle_cls.to_string(),
        ]);
        args
    }
}
