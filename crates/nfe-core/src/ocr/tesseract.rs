//! Region recognizer backed by Tesseract through `leptess`.

use std::io::Cursor;

use image::GrayImage;
use leptess::LepTess;
use tracing::debug;

use crate::error::OcrError;
use crate::models::config::OcrConfig;

use super::RegionRecognizer;

/// Tesseract with a fixed language set and resolution hint.
///
/// A fresh Tesseract handle is created per region; handles are not shareable.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    languages: String,
    dpi: i32,
}

impl TesseractRecognizer {
    /// Verify Tesseract can load `config.languages` and build the recognizer.
    pub fn new(config: &OcrConfig) -> Result<Self, OcrError> {
        let _probe = LepTess::new(None, &config.languages)
            .map_err(|e| OcrError::ModelLoad(format!("tesseract ({}): {}", config.languages, e)))?;

        Ok(Self {
            languages: config.languages.clone(),
            dpi: config.dpi as i32,
        })
    }
}

impl RegionRecognizer for TesseractRecognizer {
    fn recognize(&self, region: &GrayImage) -> Result<Option<String>, OcrError> {
        let (width, height) = region.dimensions();
        if width == 0 || height == 0 {
            return Err(OcrError::InvalidImage(format!("{}x{} region", width, height)));
        }

        let mut tess = LepTess::new(None, &self.languages)
            .map_err(|e| OcrError::ModelLoad(format!("tesseract: {}", e)))?;

        let mut png = Cursor::new(Vec::new());
        region
            .write_to(&mut png, image::ImageFormat::Png)
            .map_err(|e| OcrError::InvalidImage(e.to_string()))?;

        tess.set_image_from_mem(png.get_ref())
            .map_err(|e| OcrError::InvalidImage(format!("tesseract: {}", e)))?;
        tess.set_source_resolution(self.dpi);

        let text = tess
            .get_utf8_text()
            .map_err(|e| OcrError::Recognition(format!("tesseract: {}", e)))?;

        debug!("Tesseract read {} chars from {}x{} region", text.len(), width, height);

        if text.trim().is_empty() {
            Ok(None)
        } else {
            Ok(Some(text))
        }
    }

    fn name(&self) -> &str {
        "tesseract"
    }
}
