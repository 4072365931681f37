//! Error types for the nfe-core library.

use thiserror::Error;

/// Main error type for the nfe library.
#[derive(Error, Debug)]
pub enum NfeError {
    /// Page segmentation error.
    #[error("layout error: {0}")]
    Layout(#[from] LayoutError),

    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Field extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// Image decoding/encoding error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised while segmenting a page into regions.
#[derive(Error, Debug)]
pub enum LayoutError {
    /// The page image could not be decoded as grayscale.
    #[error("page is not decodable: {0}")]
    UndecodablePage(String),

    /// The page has a zero dimension.
    #[error("page has invalid dimensions {width}x{height}")]
    EmptyPage { width: u32, height: u32 },

    /// A segmentation parameter is out of range.
    #[error("invalid segmentation parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// Errors related to OCR processing.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Failed to load OCR models or initialize the engine.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Text recognition failed for a region.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// Invalid image format or dimensions.
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// Every region handed to the recognizer failed.
    #[error("all {0} regions failed recognition")]
    AllRegionsFailed(usize),
}

/// Errors related to invoice field extraction.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// A rule table entry is malformed.
    #[error("invalid rule for {field}: {reason}")]
    InvalidRule { field: String, reason: String },

    /// Failed to parse a captured value.
    #[error("failed to parse {field}: {value}")]
    Parse { field: String, value: String },
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract a page image.
    #[error("failed to extract images: {0}")]
    ImageExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Invalid page number requested.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),
}

/// Result type for the nfe library.
pub type Result<T> = std::result::Result<T, NfeError>;
