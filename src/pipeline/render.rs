//! Page Renderer: open a PDF with pdfium and rasterise pages to PNG.
//!
//! ## Why blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! Everything in this module is synchronous and is driven from inside
//! `tokio::task::spawn_blocking` by [`crate::extract`].
//!
//! ## Resolution
//!
//! Pages are rendered at a fixed DPI (target size = page points × dpi / 72),
//! with each edge capped at `max_pixels` so an oversized page cannot exhaust
//! memory.

use crate::error::{OcrServiceError, PageError};
use crate::pipeline::scratch::ScratchImage;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info};

const POINTS_PER_INCH: f32 = 72.0;

/// Bind to a pdfium library.
///
/// Resolution order: the explicit `lib_path`, then `PDFIUM_LIB_PATH`, then a
/// library in the working directory, then the system library.
pub fn bind_pdfium(lib_path: Option<&Path>) -> Result<Pdfium, OcrServiceError> {
    let env_path = std::env::var_os("PDFIUM_LIB_PATH").map(std::path::PathBuf::from);

    let bindings = match lib_path.map(Path::to_path_buf).or(env_path) {
        Some(path) => Pdfium::bind_to_library(&path),
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| OcrServiceError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

/// Open a PDF from a file on disk.
///
/// Any parse failure is a client-input error: the caller supplied the bytes.
pub fn open_document<'a>(
    pdfium: &'a Pdfium,
    pdf_path: &Path,
) -> Result<PdfDocument<'a>, OcrServiceError> {
    let document = pdfium.load_pdf_from_file(pdf_path, None).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            OcrServiceError::PasswordRequired
        } else {
            OcrServiceError::CorruptPdf { detail: err_str }
        }
    })?;

    info!("PDF loaded: {} pages", document.pages().len());
    Ok(document)
}

/// Target bitmap size for a page of `width_pts` × `height_pts` at `dpi`,
/// scaled down proportionally so neither edge exceeds `max_pixels`.
pub fn target_size(width_pts: f32, height_pts: f32, dpi: u32, max_pixels: u32) -> (i32, i32) {
    let scale = dpi as f32 / POINTS_PER_INCH;
    let mut width = width_pts * scale;
    let mut height = height_pts * scale;

    let longest = width.max(height);
    if longest > max_pixels as f32 {
        let shrink = max_pixels as f32 / longest;
        width *= shrink;
        height *= shrink;
    }

    ((width.round() as i32).max(1), (height.round() as i32).max(1))
}

/// Rasterise the 0-indexed page `index` and write it as PNG to `dest`.
///
/// The returned guard deletes the file when dropped.
pub fn render_page(
    document: &PdfDocument<'_>,
    index: usize,
    dpi: u32,
    max_pixels: u32,
    dest: &Path,
) -> Result<ScratchImage, PageError> {
    let page_num = index + 1;
    let failed = |detail: String| PageError::RenderFailed {
        page: page_num,
        detail,
    };

    let page = document
        .pages()
        .get(index as u16)
        .map_err(|e| failed(format!("{:?}", e)))?;

    let (width, height) = target_size(page.width().value, page.height().value, dpi, max_pixels);
    let render_config = PdfRenderConfig::new()
        .set_target_width(width)
        .set_target_height(height);

    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| failed(format!("{:?}", e)))?;

    let image = bitmap.as_image();
    image
        .save_with_format(dest, image::ImageFormat::Png)
        .map_err(|e| failed(format!("PNG write failed: {e}")))?;

    debug!(
        "Rendered page {} → {}x{} px at {} DPI",
        page_num,
        image.width(),
        image.height(),
        dpi
    );

    Ok(ScratchImage::adopt(dest.to_path_buf()))
}
