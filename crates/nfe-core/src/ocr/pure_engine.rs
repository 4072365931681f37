//! Region recognizer backed by `pure-onnx-ocr`.

use std::path::Path;
use std::time::Instant;

use image::{DynamicImage, GrayImage};
use tracing::{debug, info};

use crate::error::OcrError;
use crate::models::config::OcrConfig;

use super::{join_lines, sort_reading_order, RegionRecognizer, TextLine};

/// Lines whose tops fall within this many pixels share a reading row.
const ROW_HEIGHT: f32 = 20.0;

/// Pure Rust detection + recognition engine.
pub struct PureOcrRecognizer {
    engine: pure_onnx_ocr::engine::OcrEngine,
    config: OcrConfig,
}

impl PureOcrRecognizer {
    /// Load models named in `config` from its model directory.
    pub fn from_config(config: OcrConfig) -> Result<Self, OcrError> {
        let model_dir = config.model_dir.clone();
        Self::from_dir(&model_dir, config)
    }

    /// Load models from `model_dir`, using the file names in `config`.
    pub fn from_dir(model_dir: &Path, config: OcrConfig) -> Result<Self, OcrError> {
        let det_path = model_dir.join(&config.detection_model);
        let rec_path = model_dir.join(&config.recognition_model);
        let dict_path = model_dir.join(&config.dictionary);

        for path in [&det_path, &rec_path, &dict_path] {
            if !path.exists() {
                return Err(OcrError::ModelLoad(format!("{} not found", path.display())));
            }
        }

        let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
            .det_model_path(&det_path)
            .rec_model_path(&rec_path)
            .dictionary_path(&dict_path)
            .build()
            .map_err(|e| OcrError::ModelLoad(format!("pure-onnx-ocr: {}", e)))?;

        info!("Loaded pure-onnx-ocr engine from {}", model_dir.display());

        Ok(Self { engine, config })
    }

    fn lines(&self, region: &GrayImage) -> Result<Vec<TextLine>, OcrError> {
        let image = DynamicImage::ImageRgb8(DynamicImage::ImageLuma8(region.clone()).to_rgb8());

        let results = self
            .engine
            .run_from_image(&image)
            .map_err(|e| OcrError::Recognition(format!("pure-onnx-ocr: {}", e)))?;

        Ok(results
            .iter()
            .map(|r| {
                let text = if self.config.keep_unk {
                    r.text.clone()
                } else {
                    r.text.replace("[UNK]", " ")
                };
                TextLine {
                    bbox: polygon_to_bbox(&r.bounding_box),
                    text,
                    confidence: r.confidence,
                }
            })
            .collect())
    }
}

impl RegionRecognizer for PureOcrRecognizer {
    fn recognize(&self, region: &GrayImage) -> Result<Option<String>, OcrError> {
        let (width, height) = region.dimensions();
        if width == 0 || height == 0 {
            return Err(OcrError::InvalidImage(format!("{}x{} region", width, height)));
        }

        let start = Instant::now();
        let mut lines = self.lines(region)?;
        sort_reading_order(&mut lines, ROW_HEIGHT);

        debug!(
            "Recognized {} lines in {}x{} region in {}ms",
            lines.len(),
            width,
            height,
            start.elapsed().as_millis()
        );

        Ok(join_lines(&lines))
    }

    fn name(&self) -> &str {
        "pure-onnx-ocr"
    }
}

/// Convert a `Polygon<f64>` to our `[f32; 8]` bbox format.
fn polygon_to_bbox(polygon: &pure_onnx_ocr::Polygon<f64>) -> [f32; 8] {
    let mut bbox = [0.0f32; 8];
    for (i, coord) in polygon.exterior().coords().take(4).enumerate() {
        bbox[i * 2] = coord.x as f32;
        bbox[i * 2 + 1] = coord.y as f32;
    }
    bbox
}
