//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::NfeError;

/// Main configuration for the nfe pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NfeConfig {
    /// Page segmentation and region cropping.
    pub segmentation: SegmentationConfig,

    /// OCR adapter configuration.
    pub ocr: OcrConfig,

    /// Field extraction configuration.
    pub extraction: ExtractionConfig,

    /// PDF page source configuration.
    pub pdf: PdfConfig,

    /// Polling job loop configuration.
    pub watch: WatchConfig,
}

/// Shape of a morphological structuring element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelShape {
    /// Full square.
    Rect,
    /// Plus-shaped: center row and center column.
    Cross,
    /// Inscribed ellipse.
    Ellipse,
}

/// Tuning constants for the ruling-line segmenter.
///
/// Defaults are calibrated for pages rasterized at 500 DPI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Height of the 1-wide vertical structuring element.
    pub vertical_kernel_len: u32,
    /// Erosion passes isolating vertical strokes.
    pub vertical_erode_iterations: u32,
    /// Dilation passes reconnecting vertical rules.
    pub vertical_dilate_iterations: u32,
    /// Value assumed outside the page while reconnecting vertical rules.
    pub vertical_border_fill: u8,

    /// Width of the 1-tall horizontal structuring element.
    pub horizontal_kernel_len: u32,
    /// Erosion passes isolating horizontal strokes.
    pub horizontal_erode_iterations: u32,
    /// Dilation passes reconnecting horizontal rules.
    pub horizontal_dilate_iterations: u32,

    /// Weight of the vertical mask in the blend (horizontal gets `1 - alpha`).
    pub blend_alpha: f32,

    /// Side of the square used to scrub noise from the blended mask.
    pub noise_kernel_size: u32,
    /// Erosion passes of the noise scrub.
    pub noise_erode_iterations: u32,

    /// Shape of the element that closes gaps in the ruling grid.
    pub close_kernel_shape: KernelShape,
    /// Side of the grid-closing element.
    pub close_kernel_size: u32,
    /// Dilation passes closing the grid.
    pub close_iterations: u32,

    /// Taps of the smoothing kernel (odd). The kernel is not widened to fit sigma.
    pub blur_kernel_size: u32,
    /// Sigma of the smoothing pass. With 5 taps, sigma 5 is close to a box filter.
    pub blur_sigma: f32,

    /// Side of the elliptical element rounding cell regions.
    pub smooth_kernel_size: u32,
    /// Erosion passes with the elliptical element.
    pub smooth_erode_iterations: u32,

    /// Contours must have a perimeter strictly above this.
    pub min_perimeter: f64,
    /// Contours must have a perimeter strictly below this.
    pub max_perimeter: f64,
    /// Polygon simplification tolerance as a fraction of the perimeter.
    pub approx_epsilon_ratio: f64,
    /// Maximum vertices of the simplified polygon.
    pub max_vertices: usize,

    /// Margin added around each region before cropping.
    pub roi_padding: u32,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            vertical_kernel_len: 9,
            vertical_erode_iterations: 13,
            vertical_dilate_iterations: 9,
            vertical_border_fill: 10,
            horizontal_kernel_len: 7,
            horizontal_erode_iterations: 13,
            horizontal_dilate_iterations: 3,
            blend_alpha: 0.5,
            noise_kernel_size: 3,
            noise_erode_iterations: 3,
            close_kernel_shape: KernelShape::Cross,
            close_kernel_size: 5,
            close_iterations: 11,
            blur_kernel_size: 5,
            blur_sigma: 5.0,
            smooth_kernel_size: 5,
            smooth_erode_iterations: 2,
            min_perimeter: 1000.0,
            max_perimeter: 10000.0,
            approx_epsilon_ratio: 0.03,
            max_vertices: 5,
            roi_padding: 25,
        }
    }
}

/// OCR adapter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Recognition languages (Tesseract syntax).
    pub languages: String,

    /// Resolution hint handed to the recognizer.
    pub dpi: u32,

    /// Directory containing ONNX detection/recognition models.
    pub model_dir: PathBuf,

    /// Detection model file name.
    pub detection_model: String,

    /// Recognition model file name.
    pub recognition_model: String,

    /// Character dictionary file name.
    pub dictionary: String,

    /// Keep `[UNK]` tokens emitted by the ONNX recognizer.
    pub keep_unk: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            languages: "eng+por".to_string(),
            dpi: 150,
            model_dir: PathBuf::from("models"),
            detection_model: "det.onnx".to_string(),
            recognition_model: "latin_rec.onnx".to_string(),
            dictionary: "latin_dict.txt".to_string(),
            keep_unk: false,
        }
    }
}

impl OcrConfig {
    /// Get full path to a model file.
    pub fn model_path(&self, model_name: &str) -> PathBuf {
        self.model_dir.join(model_name)
    }
}

/// Field extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// A rule fires when its label score exceeds this (0-100).
    pub label_threshold: f64,

    /// Blocks shorter than this many characters are treated as noise.
    pub min_block_chars: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            label_threshold: 90.0,
            min_block_chars: 5,
        }
    }
}

/// PDF page source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Page to rasterize (1-indexed).
    pub page: u32,

    /// Resolution PDF scans are resampled to. Perimeter bounds and ROI
    /// padding are calibrated against 500 DPI.
    pub render_dpi: u32,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            page: 1,
            render_dpi: 500,
        }
    }
}

/// Polling job loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Directory scanned for new documents; results are written next to them.
    pub input_dir: PathBuf,

    /// Parent of the per-document working directories.
    pub processing_dir: PathBuf,

    /// Seconds between scan cycles.
    pub poll_interval_secs: u64,

    /// Keep region crops and the annotated page after a document finishes.
    pub keep_working_dir: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("input"),
            processing_dir: PathBuf::from("processing"),
            poll_interval_secs: 30,
            keep_working_dir: false,
        }
    }
}

impl NfeConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), NfeError> {
        let seg = &self.segmentation;

        for (name, value) in [
            ("vertical_kernel_len", seg.vertical_kernel_len),
            ("horizontal_kernel_len", seg.horizontal_kernel_len),
            ("noise_kernel_size", seg.noise_kernel_size),
            ("close_kernel_size", seg.close_kernel_size),
            ("smooth_kernel_size", seg.smooth_kernel_size),
            ("blur_kernel_size", seg.blur_kernel_size),
        ] {
            if value == 0 {
                return Err(NfeError::Config(format!("segmentation.{name} must be positive")));
            }
        }

        if seg.blur_kernel_size % 2 == 0 {
            return Err(NfeError::Config("segmentation.blur_kernel_size must be odd".into()));
        }

        if !(seg.blur_sigma > 0.0) {
            return Err(NfeError::Config("segmentation.blur_sigma must be positive".into()));
        }
        if !(0.0..=1.0).contains(&seg.blend_alpha) {
            return Err(NfeError::Config("segmentation.blend_alpha must be within 0..=1".into()));
        }
        if seg.min_perimeter >= seg.max_perimeter {
            return Err(NfeError::Config(format!(
                "segmentation perimeter bounds are inverted ({} >= {})",
                seg.min_perimeter, seg.max_perimeter
            )));
        }
        if self.pdf.render_dpi == 0 {
            return Err(NfeError::Config("pdf.render_dpi must be positive".into()));
        }
        if !(0.0..=100.0).contains(&self.extraction.label_threshold) {
            return Err(NfeError::Config(
                "extraction.label_threshold must be within 0..=100".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_keep_calibrated_constants() {
        let config = NfeConfig::default();

        assert_eq!(config.extraction.label_threshold, 90.0);
        assert_eq!(config.extraction.min_block_chars, 5);
        assert_eq!(config.segmentation.min_perimeter, 1000.0);
        assert_eq!(config.segmentation.max_perimeter, 10000.0);
        assert_eq!(config.segmentation.roi_padding, 25);
        assert_eq!(config.ocr.languages, "eng+por");
        assert_eq!(config.ocr.dpi, 150);
        assert_eq!(config.pdf.render_dpi, 500);
        assert_eq!(config.segmentation.blur_kernel_size, 5);
        assert_eq!(config.segmentation.blur_sigma, 5.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let config: NfeConfig =
            serde_json::from_str(r#"{"extraction": {"label_threshold": 85.0}}"#).unwrap();

        assert_eq!(config.extraction.label_threshold, 85.0);
        assert_eq!(config.extraction.min_block_chars, 5);
        assert_eq!(config.segmentation.close_kernel_shape, KernelShape::Cross);
        assert_eq!(config.watch.poll_interval_secs, 30);
    }

    #[test]
    fn test_validate_rejects_inverted_perimeter_bounds() {
        let mut config = NfeConfig::default();
        config.segmentation.min_perimeter = 5000.0;
        config.segmentation.max_perimeter = 100.0;

        assert!(matches!(config.validate(), Err(NfeError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_even_blur_kernel_and_zero_dpi() {
        let mut config = NfeConfig::default();
        config.segmentation.blur_kernel_size = 4;
        assert!(matches!(config.validate(), Err(NfeError::Config(msg)) if msg.contains("blur_kernel_size")));

        let mut config = NfeConfig::default();
        config.pdf.render_dpi = 0;
        assert!(matches!(config.validate(), Err(NfeError::Config(msg)) if msg.contains("render_dpi")));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = NfeConfig::default();
        config.watch.poll_interval_secs = 5;
        config.save(&path).unwrap();

        let loaded = NfeConfig::from_file(&path).unwrap();
        assert_eq!(loaded.watch.poll_interval_secs, 5);
    }
}
