//! PDF rasterisation: render a page range to images via pdfium.
//!
//! ## Why cap pixels as well as DPI?
//!
//! Page sizes vary wildly: an A0 poster at 300 DPI would produce a
//! 10,000 × 14,000 px image. `max_pixels` caps the longest edge regardless
//! of physical size so one odd page cannot blow the per-batch memory bound.
//!
//! pdfium uses thread-local state and must not run on a Tokio worker; the
//! file-level API drives the rasterizer from `spawn_blocking`.

use crate::error::{BoxError, DeblankError};
use crate::model::{PageRange, RasterImage};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Collaborator that renders a contiguous page range.
///
/// Returns exactly one image per page in `range`, in range order.
pub trait Rasterizer {
    type Image;

    fn rasterize(&mut self, range: PageRange, dpi: u32) -> Result<Vec<Self::Image>, BoxError>;
}

/// Bind to the pdfium shared library.
///
/// `PDFIUM_LIB_PATH` may name the library file or the directory holding it;
/// otherwise the platform's system library search path is used.
pub fn bind_pdfium() -> Result<Pdfium, DeblankError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(p) if !p.is_empty() => {
            let path = PathBuf::from(p);
            let lib = if path.is_dir() {
                Pdfium::pdfium_platform_library_name_at_path(&path)
            } else {
                path
            };
            debug!("Binding pdfium from {}", lib.display());
            Pdfium::bind_to_library(&lib)
        }
        _ => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| DeblankError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

/// Renders pages of one open document.
pub struct PdfiumRasterizer<'a> {
    document: PdfDocument<'a>,
    max_pixels: u32,
}

impl<'a> PdfiumRasterizer<'a> {
    /// Open `pdf_path` for rendering.
    pub fn open(pdfium: &'a Pdfium, pdf_path: &Path, max_pixels: u32) -> Result<Self, DeblankError> {
        let document = pdfium.load_pdf_from_file(pdf_path, None).map_err(|e| {
            DeblankError::document_read(format!(
                "pdfium could not open '{}': {:?}",
                pdf_path.display(),
                e
            ))
        })?;
        info!("pdfium opened {} ({} pages)", pdf_path.display(), document.pages().len());
        Ok(Self {
            document,
            max_pixels,
        })
    }

    /// Render from bytes already in memory.
    pub fn from_bytes(pdfium: &'a Pdfium, bytes: &'a [u8], max_pixels: u32) -> Result<Self, DeblankError> {
        let document = pdfium
            .load_pdf_from_byte_slice(bytes, None)
            .map_err(|e| DeblankError::document_read(format!("pdfium could not open PDF: {:?}", e)))?;
        Ok(Self {
            document,
            max_pixels,
        })
    }

    /// Page count as pdfium sees it.
    pub fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }
}

impl Rasterizer for PdfiumRasterizer<'_> {
    type Image = RasterImage;

    fn rasterize(&mut self, range: PageRange, dpi: u32) -> Result<Vec<RasterImage>, BoxError> {
        let pages = self.document.pages();
        let total_pages = pages.len() as usize;
        if range.end > total_pages {
            return Err(format!("range {} exceeds page count {}", range, total_pages).into());
        }

        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(dpi as f32 / 72.0)
            .set_maximum_width(self.max_pixels as i32)
            .set_maximum_height(self.max_pixels as i32);

        let mut images = Vec::with_capacity(range.len());
        for idx in range.indices() {
            let page = pages
                .get(idx as u16)
                .map_err(|e| format!("page index {}: {:?}", idx, e))?;

            let bitmap = page
                .render_with_config(&render_config)
                .map_err(|e| format!("page index {}: {:?}", idx, e))?;

            let image = bitmap.as_image();
            debug!(
                "Rendered page {} → {}x{} px",
                idx + 1,
                image.width(),
                image.height()
            );
            images.push(RasterImage::new(idx, image));
        }

        Ok(images)
    }
}
