//! Page sources: raster scans and image-only PDFs.

mod extractor;

pub use extractor::PdfExtractor;

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{LayoutError, NfeError, PdfError};
use crate::models::config::PdfConfig;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// Trait for PDF processing implementations.
pub trait PdfProcessor {
    /// Load a PDF from bytes.
    fn load(&mut self, data: &[u8]) -> Result<()>;

    /// Get the number of pages in the PDF.
    fn page_count(&self) -> u32;

    /// Extract embedded images from a page (1-indexed).
    fn extract_images(&self, page: u32) -> Result<Vec<DynamicImage>>;

    /// The scan image of a page.
    fn page_image(&self, page: u32) -> Result<DynamicImage>;

    /// Page width and height in points (1/72 inch).
    fn page_size(&self, page: u32) -> Result<(f32, f32)>;
}

/// Kind of input document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSource {
    /// PNG, JPEG, TIFF and other formats the `image` crate decodes.
    Raster,
    /// PDF whose page content is a scanned image.
    ScannedPdf,
}

impl PageSource {
    /// Classify by content, falling back to the file extension.
    pub fn detect(path: &Path, data: &[u8]) -> Self {
        let is_pdf_ext = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);

        if data.starts_with(b"%PDF") || is_pdf_ext {
            Self::ScannedPdf
        } else {
            Self::Raster
        }
    }
}

/// Decode document bytes into the grayscale page the segmenter works on.
///
/// Raster scans are used as stored. PDF scans are resampled so the page spans
/// `render_dpi` pixels per inch.
pub fn decode_page(source: PageSource, data: &[u8], config: &PdfConfig) -> crate::Result<GrayImage> {
    let gray = match source {
        PageSource::Raster => image::load_from_memory(data)
            .map_err(|e| LayoutError::UndecodablePage(e.to_string()))?
            .to_luma8(),
        PageSource::ScannedPdf => {
            let mut extractor = PdfExtractor::new();
            extractor.load(data)?;
            let scan = extractor.page_image(config.page)?.to_luma8();
            match extractor.page_size(config.page) {
                Ok((width_pt, _)) => resample_to_dpi(scan, width_pt, config.render_dpi),
                Err(e) => {
                    warn!("Keeping scan resolution: {}", e);
                    scan
                }
            }
        }
    };

    debug!("Decoded {:?} page {}x{}", source, gray.width(), gray.height());
    Ok(gray)
}

/// Scale `scan` so a page `width_pt` points wide is `dpi` pixels per inch.
fn resample_to_dpi(scan: GrayImage, width_pt: f32, dpi: u32) -> GrayImage {
    let target_width = (width_pt / 72.0 * dpi as f32).round() as u32;
    if target_width == 0 || target_width == scan.width() {
        return scan;
    }

    let scale = target_width as f32 / scan.width() as f32;
    let target_height = ((scan.height() as f32 * scale).round() as u32).max(1);
    debug!(
        "Resampling scan {}x{} -> {}x{} ({} DPI)",
        scan.width(),
        scan.height(),
        target_width,
        target_height,
        dpi
    );
    imageops::resize(&scan, target_width, target_height, FilterType::Triangle)
}

/// Read a document from disk and decode its page.
pub fn load_page(path: &Path, config: &PdfConfig) -> crate::Result<GrayImage> {
    let data = fs::read(path)?;
    let source = PageSource::detect(path, &data);
    decode_page(source, &data, config).map_err(|e| match e {
        NfeError::Pdf(PdfError::Parse(msg)) => {
            NfeError::Pdf(PdfError::Parse(format!("{}: {}", path.display(), msg)))
        }
        other => other,
    })
}
