//! Core library for scanned Brazilian service-invoice (NFS-e) extraction.
//!
//! This crate provides:
//! - Ruling-line page segmentation and region cropping
//! - An OCR boundary with pure-Rust ONNX and Tesseract adapters
//! - Locale-specific fuzzy label rules for the Rio de Janeiro and São Paulo layouts
//! - Invoice records serializable to stable JSON

pub mod error;
pub mod invoice;
pub mod layout;
pub mod models;
pub mod ocr;
pub mod pdf;
pub mod pipeline;

pub use error::{NfeError, Result};
pub use invoice::{BlockNormalizer, ExtractionResult, RuleEngine, TextBlock};
pub use layout::{BoundingBox, RegionOfInterest, RegionSegmenter, RoiExtractor};
pub use models::config::NfeConfig;
pub use models::record::{CompositeField, FieldResult, InvoiceRecord, LocaleVariant, ScalarField};
pub use ocr::{LazyRecognizer, RegionRecognizer};
#[cfg(feature = "native")]
pub use ocr::PureOcrRecognizer;
#[cfg(feature = "tesseract")]
pub use ocr::TesseractRecognizer;
pub use pdf::{load_page, PageSource};
pub use pipeline::{DocumentOutcome, DocumentPipeline, RegionSummary, StageTimings};
