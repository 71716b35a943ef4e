//! Blank-page classification policies.
//!
//! The pipeline only knows [`PageClassifier`]. Two policies ship with the
//! crate:
//!
//! * [`GeometricClassifier`]: a page is blank when no ink bounding region
//!   survives thresholding and despeckling. Cheap, no models. Keeps pages
//!   whose only content is a dark stamp, line art or a watermark darker than
//!   the ink threshold; drops watermarks lighter than it.
//! * [`TextContentClassifier`]: a page is blank when OCR recognises no text
//!   after normalisation. Drops pages with graphics but no characters,
//!   including most watermarks. Recognition is delegated to a
//!   [`TextRecognizer`]; the `ocr` feature provides one backed by ocrs.
//!
//! Both are pure and deterministic for a fixed image.

use crate::config::{BlankStrategy, GeometricOptions};
use crate::error::{BoxError, DeblankError};
use crate::model::RasterImage;
use image::{DynamicImage, GrayImage, Luma};
use imageproc::filter::median_filter;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Decides whether one rendered page is blank.
///
/// Must be side-effect free and return the same answer for the same image.
/// An `Err` aborts the whole run; it is never treated as "blank" or "not blank".
pub trait PageClassifier<I: ?Sized = RasterImage> {
    fn classify(&self, image: &I) -> Result<bool, BoxError>;
}

impl<I: ?Sized, C: PageClassifier<I> + ?Sized> PageClassifier<I> for Box<C> {
    fn classify(&self, image: &I) -> Result<bool, BoxError> {
        (**self).classify(image)
    }
}

impl<I: ?Sized, C: PageClassifier<I> + ?Sized> PageClassifier<I> for &C {
    fn classify(&self, image: &I) -> Result<bool, BoxError> {
        (**self).classify(image)
    }
}

/// Classifier chosen at runtime from a [`BlankStrategy`].
pub type BoxedClassifier = Box<dyn PageClassifier<RasterImage> + Send + Sync>;

/// Build the classifier a strategy describes.
///
/// The strategy is validated first, so options that would report every page
/// blank are rejected here rather than producing an empty document.
pub fn build_classifier(strategy: &BlankStrategy) -> Result<BoxedClassifier, DeblankError> {
    strategy.validate()?;
    match strategy {
        BlankStrategy::Geometric(opts) => Ok(Box::new(GeometricClassifier::new(opts.clone()))),
        #[cfg(feature = "ocr")]
        BlankStrategy::TextContent(opts) => {
            let recognizer = crate::pipeline::ocr::OcrsRecognizer::from_options(opts)?;
            Ok(Box::new(TextContentClassifier::new(
                recognizer,
                opts.binarize_threshold,
            )))
        }
        #[cfg(not(feature = "ocr"))]
        BlankStrategy::TextContent(_) => Err(DeblankError::InvalidConfiguration(
            "the text-content strategy needs the `ocr` feature".into(),
        )),
    }
}

// ── Geometric ────────────────────────────────────────────────────────────

/// Bounding box of the ink found on a page, in pixel coordinates (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InkBounds {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub ink_pixels: u64,
}

/// Blank iff the rendered page has no ink bounding region.
#[derive(Debug, Clone, Default)]
pub struct GeometricClassifier {
    options: GeometricOptions,
}

impl GeometricClassifier {
    pub fn new(options: GeometricOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &GeometricOptions {
        &self.options
    }

    /// Locate the ink region, or `None` when the page is blank.
    pub fn ink_bounds(&self, image: &DynamicImage) -> Option<InkBounds> {
        let gray = image.to_luma8();
        let gray = if self.options.despeckle {
            median_filter(&gray, 1, 1)
        } else {
            gray
        };

        let (width, height) = gray.dimensions();
        let margin_x = (width as f32 * self.options.margin_fraction) as u32;
        let margin_y = (height as f32 * self.options.margin_fraction) as u32;
        let x_end = width.saturating_sub(margin_x);
        let y_end = height.saturating_sub(margin_y);

        let mut bounds: Option<InkBounds> = None;
        for y in margin_y..y_end {
            for x in margin_x..x_end {
                if gray.get_pixel(x, y).0[0] >= self.options.ink_threshold {
                    continue;
                }
                let b = bounds.get_or_insert(InkBounds {
                    left: x,
                    top: y,
                    right: x,
                    bottom: y,
                    ink_pixels: 0,
                });
                b.left = b.left.min(x);
                b.right = b.right.max(x);
                b.bottom = y;
                b.ink_pixels += 1;
            }
        }

        bounds.filter(|b| b.ink_pixels >= u64::from(self.options.min_ink_pixels))
    }
}

impl PageClassifier<DynamicImage> for GeometricClassifier {
    fn classify(&self, image: &DynamicImage) -> Result<bool, BoxError> {
        Ok(self.ink_bounds(image).is_none())
    }
}

impl PageClassifier<RasterImage> for GeometricClassifier {
    fn classify(&self, image: &RasterImage) -> Result<bool, BoxError> {
        let bounds = self.ink_bounds(image.image());
        debug!(page = image.page_index(), ?bounds, "Geometric classification");
        Ok(bounds.is_none())
    }
}

// ── Text content ─────────────────────────────────────────────────────────

/// Extracts text from a preprocessed, binarised page image.
pub trait TextRecognizer {
    fn recognize(&self, image: &GrayImage) -> Result<String, BoxError>;
}

/// Blank iff the recognised text is empty after [`normalize_text`].
pub struct TextContentClassifier<R> {
    recognizer: R,
    binarize_threshold: u8,
}

impl<R: TextRecognizer> TextContentClassifier<R> {
    pub fn new(recognizer: R, binarize_threshold: u8) -> Self {
        Self {
            recognizer,
            binarize_threshold,
        }
    }

    /// Recognised text for a page, normalised.
    pub fn extract_text(&self, image: &DynamicImage) -> Result<String, BoxError> {
        let prepared = prepare_for_ocr(image, self.binarize_threshold);
        let raw = self.recognizer.recognize(&prepared)?;
        Ok(normalize_text(&raw))
    }
}

impl<R: TextRecognizer> PageClassifier<RasterImage> for TextContentClassifier<R> {
    fn classify(&self, image: &RasterImage) -> Result<bool, BoxError> {
        let text = self.extract_text(image.image())?;
        debug!(
            page = image.page_index(),
            chars = text.chars().count(),
            "Text-content classification"
        );
        Ok(text.is_empty())
    }
}

/// Grayscale → autocontrast → binarise → 3×3 median.
pub fn prepare_for_ocr(image: &DynamicImage, threshold: u8) -> GrayImage {
    let gray = autocontrast(&image.to_luma8());
    let mut binary = gray;
    for pixel in binary.pixels_mut() {
        *pixel = if pixel.0[0] > threshold {
            Luma([255])
        } else {
            Luma([0])
        };
    }
    median_filter(&binary, 1, 1)
}

/// Stretch the luma histogram to the full 0–255 range.
fn autocontrast(gray: &GrayImage) -> GrayImage {
    let (lo, hi) = gray
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p.0[0]), hi.max(p.0[0])));
    if hi <= lo {
        return gray.clone();
    }
    let span = u32::from(hi - lo);
    let mut out = gray.clone();
    for pixel in out.pixels_mut() {
        let v = u32::from(pixel.0[0] - lo) * 255 / span;
        *pixel = Luma([v as u8]);
    }
    out
}

/// Drop whitespace, control characters and invisible Unicode.
pub fn normalize_text(text: &str) -> String {
    const INVISIBLE: [char; 7] = [
        '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{180E}',
    ];
    text.chars()
        .filter(|c| !c.is_whitespace() && !c.is_control() && !INVISIBLE.contains(c))
        .collect()
}
