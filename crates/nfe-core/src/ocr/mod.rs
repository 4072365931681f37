//! OCR adapter boundary.
//!
//! The pipeline only sees [`RegionRecognizer`]; concrete engines live behind
//! cargo features.

#[cfg(feature = "native")]
mod pure_engine;
#[cfg(feature = "tesseract")]
mod tesseract;

#[cfg(feature = "native")]
pub use pure_engine::PureOcrRecognizer;
#[cfg(feature = "tesseract")]
pub use tesseract::TesseractRecognizer;

use image::GrayImage;
use serde::{Deserialize, Serialize};
use std::cell::OnceCell;
use std::fmt;
use tracing::info;

use crate::error::OcrError;

/// Transcribes a single binarized region.
///
/// `Ok(None)` means the engine found nothing readable. Callers skip the
/// region in that case and on `Err`.
pub trait RegionRecognizer {
    fn recognize(&self, region: &GrayImage) -> Result<Option<String>, OcrError>;

    /// Short engine name for logs.
    fn name(&self) -> &str {
        "ocr"
    }
}

impl<R: RegionRecognizer + ?Sized> RegionRecognizer for Box<R> {
    fn recognize(&self, region: &GrayImage) -> Result<Option<String>, OcrError> {
        (**self).recognize(region)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<R: RegionRecognizer + ?Sized> RegionRecognizer for &R {
    fn recognize(&self, region: &GrayImage) -> Result<Option<String>, OcrError> {
        (**self).recognize(region)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// A recognized line inside a region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextLine {
    /// Quadrilateral corners (x1, y1, x2, y2, x3, y3, x4, y4).
    pub bbox: [f32; 8],

    pub text: String,

    /// Recognition confidence (0.0 - 1.0).
    pub confidence: f32,
}

impl TextLine {
    /// Axis-aligned bounds as (min_x, min_y, max_x, max_y).
    pub fn rect(&self) -> (f32, f32, f32, f32) {
        let xs = [self.bbox[0], self.bbox[2], self.bbox[4], self.bbox[6]];
        let ys = [self.bbox[1], self.bbox[3], self.bbox[5], self.bbox[7]];

        let min_x = xs.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_x = xs.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let min_y = ys.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_y = ys.iter().cloned().fold(f32::NEG_INFINITY, f32::max);

        (min_x, min_y, max_x, max_y)
    }
}

/// Sort lines top-to-bottom in bands of `row_height`, then left-to-right.
pub fn sort_reading_order(lines: &mut [TextLine], row_height: f32) {
    lines.sort_by(|a, b| {
        let (ax, ay, _, _) = a.rect();
        let (bx, by, _, _) = b.rect();
        let row_a = (ay / row_height) as i32;
        let row_b = (by / row_height) as i32;
        if row_a != row_b {
            row_a.cmp(&row_b)
        } else {
            ax.partial_cmp(&bx).unwrap_or(std::cmp::Ordering::Equal)
        }
    });
}

/// Join sorted lines into the multi-line text a region transcription yields.
pub fn join_lines(lines: &[TextLine]) -> Option<String> {
    if lines.is_empty() {
        return None;
    }
    Some(
        lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n"),
    )
}

type RecognizerFactory = Box<dyn Fn() -> Result<Box<dyn RegionRecognizer>, OcrError>>;

/// Defers engine construction until the first region needs it.
///
/// Documents without a resolvable locale or without regions never load
/// any model.
pub struct LazyRecognizer {
    factory: RecognizerFactory,
    engine: OnceCell<Box<dyn RegionRecognizer>>,
}

impl LazyRecognizer {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Result<Box<dyn RegionRecognizer>, OcrError> + 'static,
    {
        Self {
            factory: Box::new(factory),
            engine: OnceCell::new(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.engine.get().is_some()
    }

    fn engine(&self) -> Result<&dyn RegionRecognizer, OcrError> {
        if let Some(engine) = self.engine.get() {
            return Ok(&**engine);
        }
        let engine = (self.factory)()?;
        info!("Loaded {} recognizer", engine.name());
        Ok(&**self.engine.get_or_init(|| engine))
    }
}

impl RegionRecognizer for LazyRecognizer {
    fn recognize(&self, region: &GrayImage) -> Result<Option<String>, OcrError> {
        self.engine()?.recognize(region)
    }

    fn name(&self) -> &str {
        self.engine.get().map(|e| e.name()).unwrap_or("lazy")
    }
}

impl fmt::Debug for LazyRecognizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyRecognizer")
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Fixed(&'static str);

    impl RegionRecognizer for Fixed {
        fn recognize(&self, _region: &GrayImage) -> Result<Option<String>, OcrError> {
            Ok(Some(self.0.to_string()))
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn line(x: f32, y: f32, text: &str) -> TextLine {
        TextLine {
            bbox: [x, y, x + 50.0, y, x + 50.0, y + 10.0, x, y + 10.0],
            text: text.to_string(),
            confidence: 0.9,
        }
    }

    #[test]
    fn test_reading_order() {
        let mut lines = vec![
            line(200.0, 41.0, "d"),
            line(10.0, 2.0, "b"),
            line(5.0, 45.0, "c"),
            line(0.0, 0.0, "a"),
        ];
        sort_reading_order(&mut lines, 20.0);

        assert_eq!(join_lines(&lines).as_deref(), Some("a\nb\nc\nd"));
        assert_eq!(join_lines(&[]), None);
    }

    #[test]
    fn test_lazy_recognizer_loads_once() {
        let loads = Rc::new(Cell::new(0));
        let counter = Rc::clone(&loads);
        let lazy = LazyRecognizer::new(move || {
            counter.set(counter.get() + 1);
            Ok(Box::new(Fixed("text")) as Box<dyn RegionRecognizer>)
        });

        assert!(!lazy.is_loaded());
        let region = GrayImage::new(4, 4);
        assert_eq!(lazy.recognize(&region).unwrap().as_deref(), Some("text"));
        assert_eq!(lazy.recognize(&region).unwrap().as_deref(), Some("text"));

        assert_eq!(loads.get(), 1);
        assert_eq!(lazy.name(), "fixed");
    }

    #[test]
    fn test_lazy_recognizer_reports_load_failure() {
        let lazy = LazyRecognizer::new(|| Err(OcrError::ModelLoad("missing det.onnx".into())));

        let err = lazy.recognize(&GrayImage::new(2, 2)).unwrap_err();
        assert!(matches!(err, OcrError::ModelLoad(_)));
        assert!(!lazy.is_loaded());
    }
}
