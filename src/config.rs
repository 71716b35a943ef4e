//! Configuration types for blank-page removal.
//!
//! All behaviour is controlled through [`FilterConfig`], built via its
//! [`FilterConfigBuilder`]. The builder clamps numeric knobs into their
//! supported ranges and `build()` rejects what cannot be clamped (a batch
//! size of zero, an out-of-range margin). A config written as a struct
//! literal skips the builder, so the entry points run
//! [`FilterConfig::validate`] again before any page is rendered.

use crate::error::DeblankError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Default number of pages rasterised per batch.
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Default rendering resolution in dots per inch.
pub const DEFAULT_DPI: u32 = 300;

/// Configuration for a blank-page removal run.
///
/// # Example
/// ```rust
/// use pdf_deblank::{BlankStrategy, FilterConfig};
///
/// let config = FilterConfig::builder()
///     .batch_size(8)
///     .dpi(150)
///     .strategy(BlankStrategy::default())
///     .build()
///     .unwrap();
/// assert_eq!(config.batch_size, 8);
/// ```
#[derive(Clone)]
pub struct FilterConfig {
    /// Pages rasterised and classified together. Default: 5.
    ///
    /// Peak raster memory is proportional to this number and independent of
    /// the document length: at most `batch_size` page images exist at once.
    pub batch_size: usize,

    /// Rendering DPI. Range: 36–600. Default: 300.
    pub dpi: u32,

    /// Cap on either edge of a rendered page, in pixels. Default: 4000.
    ///
    /// A 300-DPI render of an A0 poster would otherwise be ~10 000 × 14 000 px.
    pub max_rendered_pixels: u32,

    /// How a page is judged blank. Default: [`BlankStrategy::Geometric`].
    pub strategy: BlankStrategy,

    /// Classify the pages of one batch on the rayon thread pool. Default: false.
    ///
    /// Forwarding order and the one-batch-at-a-time memory bound are the same
    /// in both modes.
    pub parallel_classification: bool,

    /// Optional per-batch / per-page progress events.
    pub progress_callback: Option<ProgressCallback>,

    /// Raise this flag to stop the run at the next batch boundary.
    pub cancel_flag: Option<Arc<AtomicBool>>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            dpi: DEFAULT_DPI,
            max_rendered_pixels: 4000,
            strategy: BlankStrategy::default(),
            parallel_classification: false,
            progress_callback: None,
            cancel_flag: None,
        }
    }
}

impl fmt::Debug for FilterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterConfig")
            .field("batch_size", &self.batch_size)
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("strategy", &self.strategy)
            .field("parallel_classification", &self.parallel_classification)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn FilterProgressCallback>"),
            )
            .field("cancel_flag", &self.cancel_flag.is_some())
            .finish()
    }
}

impl FilterConfig {
    /// Create a new builder for `FilterConfig`.
    pub fn builder() -> FilterConfigBuilder {
        FilterConfigBuilder {
            config: Self::default(),
        }
    }

    /// Check every constraint the builder enforces.
    pub fn validate(&self) -> Result<(), DeblankError> {
        if self.batch_size == 0 {
            return Err(DeblankError::InvalidConfiguration(
                "batch size must be ≥ 1, got 0".into(),
            ));
        }
        if self.dpi < 36 || self.dpi > 600 {
            return Err(DeblankError::InvalidConfiguration(format!(
                "DPI must be 36–600, got {}",
                self.dpi
            )));
        }
        if self.max_rendered_pixels < 100 {
            return Err(DeblankError::InvalidConfiguration(format!(
                "max rendered pixels must be ≥ 100, got {}",
                self.max_rendered_pixels
            )));
        }
        self.strategy.validate()
    }
}

/// Builder for [`FilterConfig`].
#[derive(Debug)]
pub struct FilterConfigBuilder {
    config: FilterConfig,
}

impl FilterConfigBuilder {
    /// Not clamped: zero is reported by [`build`](Self::build).
    pub fn batch_size(mut self, n: usize) -> Self {
        self.config.batch_size = n;
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(36, 600);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn strategy(mut self, strategy: BlankStrategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    pub fn parallel_classification(mut self, v: bool) -> Self {
        self.config.parallel_classification = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.config.cancel_flag = Some(flag);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<FilterConfig, DeblankError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// ── Strategies ───────────────────────────────────────────────────────────

/// Which blank-detection policy classifies each page.
///
/// The two policies disagree on pages that carry only non-text marks (a
/// stamp, a faint logo, a ruled form with nothing filled in): the geometric
/// policy keeps any mark darker than its ink threshold, the text policy drops
/// any page on which no characters are recognised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlankStrategy {
    /// Blank iff no ink bounding region survives thresholding and despeckling.
    Geometric(GeometricOptions),
    /// Blank iff OCR recognises no text after normalisation.
    TextContent(TextContentOptions),
}

impl Default for BlankStrategy {
    fn default() -> Self {
        BlankStrategy::Geometric(GeometricOptions::default())
    }
}

impl BlankStrategy {
    /// Short name used in logs and the CLI.
    pub fn name(&self) -> &'static str {
        match self {
            BlankStrategy::Geometric(_) => "geometric",
            BlankStrategy::TextContent(_) => "text",
        }
    }

    /// Reject options the classifier cannot honour.
    ///
    /// A margin of half the page or more leaves nothing to scan, which would
    /// report every page blank.
    pub fn validate(&self) -> Result<(), DeblankError> {
        match self {
            BlankStrategy::Geometric(opts) => {
                if !(0.0..0.5).contains(&opts.margin_fraction) {
                    return Err(DeblankError::InvalidConfiguration(format!(
                        "margin fraction must be in [0.0, 0.5), got {}",
                        opts.margin_fraction
                    )));
                }
                if opts.min_ink_pixels == 0 {
                    return Err(DeblankError::InvalidConfiguration(
                        "min ink pixels must be ≥ 1".into(),
                    ));
                }
                Ok(())
            }
            BlankStrategy::TextContent(_) => Ok(()),
        }
    }
}

/// Tuning for the geometric (bounding-box) policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometricOptions {
    /// Luma below this value counts as ink. Default: 200.
    ///
    /// Light-grey watermarks and scanner noise sit above 200 on typical
    /// office scans; pencil marks and faded toner sit below.
    pub ink_threshold: u8,

    /// Fraction of width/height ignored on each edge. Default: 0.01.
    ///
    /// Scanner shadows and punch holes live in the outer margin.
    pub margin_fraction: f32,

    /// Minimum number of ink pixels inside the bounding region for the page
    /// to count as non-blank. Default: 1.
    pub min_ink_pixels: u32,

    /// Apply a 3×3 median filter before looking for ink. Default: true.
    pub despeckle: bool,
}

impl Default for GeometricOptions {
    fn default() -> Self {
        Self {
            ink_threshold: 200,
            margin_fraction: 0.01,
            min_ink_pixels: 1,
            despeckle: true,
        }
    }
}

/// Tuning for the text-content (OCR) policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContentOptions {
    /// Directory holding `text-detection.rten` and `text-recognition.rten`.
    /// `None` uses the ocrs cache directory.
    pub model_dir: Option<PathBuf>,

    /// Binarisation threshold applied after autocontrast. Default: 150.
    pub binarize_threshold: u8,
}

impl Default for TextContentOptions {
    fn default() -> Self {
        Self {
            model_dir: None,
            binarize_threshold: 150,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = FilterConfig::default();
        assert_eq!(c.batch_size, 5);
        assert_eq!(c.dpi, 300);
        assert!(!c.parallel_classification);
        assert_eq!(c.strategy.name(), "geometric");
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let err = FilterConfig::builder().batch_size(0).build().unwrap_err();
        assert!(matches!(err, DeblankError::InvalidConfiguration(_)));
    }

    #[test]
    fn dpi_is_clamped() {
        let c = FilterConfig::builder().dpi(5000).build().unwrap();
        assert_eq!(c.dpi, 600);
        let c = FilterConfig::builder().dpi(1).build().unwrap();
        assert_eq!(c.dpi, 36);
    }

    #[test]
    fn bad_margin_is_rejected() {
        let strategy = BlankStrategy::Geometric(GeometricOptions {
            margin_fraction: 0.6,
            ..GeometricOptions::default()
        });
        assert!(FilterConfig::builder().strategy(strategy).build().is_err());
    }

    #[test]
    fn struct_literal_config_is_validated() {
        let config = FilterConfig {
            strategy: BlankStrategy::Geometric(GeometricOptions {
                margin_fraction: 0.6,
                ..GeometricOptions::default()
            }),
            ..FilterConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, DeblankError::InvalidConfiguration(_)));

        let config = FilterConfig {
            dpi: 10_000,
            ..FilterConfig::default()
        };
        assert!(config.validate().is_err());

        let config = FilterConfig {
            max_rendered_pixels: 0,
            ..FilterConfig::default()
        };
        assert!(config.validate().is_err());

        assert!(FilterConfig::default().validate().is_ok());
    }

    #[test]
    fn strategy_serialises_with_kind_tag() {
        let json = serde_json::to_string(&BlankStrategy::TextContent(
            TextContentOptions::default(),
        ))
        .unwrap();
        assert!(json.contains("\"kind\":\"text_content\""), "got: {json}");
        let back: BlankStrategy = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name(), "text");
    }

    #[test]
    fn debug_hides_callback() {
        let c = FilterConfig::default();
        let s = format!("{c:?}");
        assert!(s.contains("batch_size"));
        assert!(s.contains("progress_callback: None"));
    }
}
