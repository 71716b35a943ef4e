//! Text recognition backed by the pure-Rust `ocrs` engine.
//!
//! Only compiled with the `ocr` feature. The engine needs two model files:
//!
//! - `text-detection.rten` locates text regions in the image.
//! - `text-recognition.rten` decodes characters from detected regions.
//!
//! Running `ocrs-cli` once downloads both to `$XDG_CACHE_HOME/ocrs`
//! (typically `~/.cache/ocrs`), which is where [`OcrsRecognizer`] looks by
//! default. Build in release mode: debug builds of `rten` are 10–100× slower.

use crate::config::TextContentOptions;
use crate::error::{BoxError, DeblankError};
use crate::pipeline::classify::TextRecognizer;
use image::{DynamicImage, GrayImage};
use ocrs::{ImageSource, OcrEngine, OcrEngineParams};
use rten::Model;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

/// `$XDG_CACHE_HOME/ocrs`, falling back to `~/.cache/ocrs`.
pub fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}

/// [`TextRecognizer`] over a loaded ocrs engine.
///
/// Loading the models is the expensive step; build one recognizer per run.
pub struct OcrsRecognizer {
    engine: OcrEngine,
}

impl OcrsRecognizer {
    /// Load models according to the text-content strategy options.
    pub fn from_options(options: &TextContentOptions) -> Result<Self, DeblankError> {
        let dir = options.model_dir.clone().unwrap_or_else(default_model_dir);
        Self::from_dir(&dir)
    }

    /// Load `text-detection.rten` and `text-recognition.rten` from `dir`.
    pub fn from_dir(dir: &Path) -> Result<Self, DeblankError> {
        let detection = load_model(&dir.join(DETECTION_MODEL_FILENAME))?;
        let recognition = load_model(&dir.join(RECOGNITION_MODEL_FILENAME))?;

        let engine = OcrEngine::new(OcrEngineParams {
            detection_model: Some(detection),
            recognition_model: Some(recognition),
            ..Default::default()
        })
        .map_err(|e| {
            DeblankError::InvalidConfiguration(format!("failed to initialise OCR engine: {}", e))
        })?;

        info!("OCR engine ready (models from {})", dir.display());
        Ok(Self { engine })
    }
}

fn load_model(path: &Path) -> Result<Model, DeblankError> {
    if !path.exists() {
        return Err(DeblankError::InvalidConfiguration(format!(
            "OCR model not found at {}; run `ocrs-cli` once to download models",
            path.display()
        )));
    }
    Model::load_file(path).map_err(|e| {
        DeblankError::InvalidConfiguration(format!(
            "failed to load OCR model {}: {}",
            path.display(),
            e
        ))
    })
}

impl TextRecognizer for OcrsRecognizer {
    fn recognize(&self, image: &GrayImage) -> Result<String, BoxError> {
        // ocrs expects RGB8.
        let rgb = DynamicImage::ImageLuma8(image.clone()).to_rgb8();
        let (width, height) = rgb.dimensions();

        let source = ImageSource::from_bytes(rgb.as_raw(), (width, height))
            .map_err(|e| format!("failed to create image source ({}x{}): {}", width, height, e))?;
        let input = self
            .engine
            .prepare_input(source)
            .map_err(|e| format!("OCR preprocessing failed: {}", e))?;
        let text = self
            .engine
            .get_text(&input)
            .map_err(|e| format!("OCR text recognition failed: {}", e))?;

        debug!(chars = text.len(), "OCR recognition complete");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_dir_ends_with_ocrs() {
        let dir = default_model_dir();
        assert!(dir.ends_with("ocrs") || dir.ends_with("ocrs-models"));
    }

    #[test]
    fn missing_models_are_a_configuration_error() {
        let err = OcrsRecognizer::from_dir(Path::new("/nonexistent/ocr-models"))
            .err()
            .expect("loading from a missing directory must fail");
        assert!(matches!(err, DeblankError::InvalidConfiguration(_)));
    }
}
