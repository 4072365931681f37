//! Per-document orchestration: segment, crop, recognize, extract.

use image::{GrayImage, RgbImage};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{NfeError, OcrError, Result};
use crate::invoice::{BlockNormalizer, RuleEngine, RuleMatch};
use crate::layout::{annotate, save_regions, BoundingBox, RegionSegmenter, RoiExtractor};
use crate::models::config::NfeConfig;
use crate::models::record::{InvoiceRecord, LocaleVariant};
use crate::ocr::RegionRecognizer;

/// Location of a region that was handed to OCR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegionSummary {
    /// 1-based contour index.
    pub index: usize,
    pub bbox: BoundingBox,
    /// Whether OCR produced text for the region.
    pub recognized: bool,
}

/// Wall-clock time spent per stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageTimings {
    pub segmentation_ms: u64,
    pub ocr_ms: u64,
    pub extraction_ms: u64,
    pub total_ms: u64,
}

/// Everything produced for one document.
#[derive(Debug, Clone)]
pub struct DocumentOutcome {
    pub locale: Option<LocaleVariant>,
    pub record: InvoiceRecord,
    /// Normalized blocks in processing order.
    pub raw_blocks: Vec<String>,
    pub regions: Vec<RegionSummary>,
    pub matches: Vec<RuleMatch>,
    /// Skipped regions and other non-fatal problems.
    pub warnings: Vec<String>,
    pub timings: StageTimings,
    /// Page with region boxes drawn, when annotation is enabled.
    pub annotated: Option<RgbImage>,
}

impl DocumentOutcome {
    /// Raw block log: one block per line.
    pub fn raw_log(&self) -> String {
        let mut log = self.raw_blocks.join("\n");
        if !log.is_empty() {
            log.push('\n');
        }
        log
    }
}

/// Runs a page through the full extraction chain.
#[derive(Debug, Clone)]
pub struct DocumentPipeline {
    segmenter: RegionSegmenter,
    extractor: RoiExtractor,
    normalizer: BlockNormalizer,
    engine: RuleEngine,
    annotate: bool,
    regions_dir: Option<PathBuf>,
}

impl DocumentPipeline {
    pub fn new(config: &NfeConfig) -> Self {
        Self {
            segmenter: RegionSegmenter::new(config.segmentation.clone()),
            extractor: RoiExtractor::new(&config.segmentation),
            normalizer: BlockNormalizer::new(config.extraction.min_block_chars),
            engine: RuleEngine::new(&config.extraction),
            annotate: false,
            regions_dir: None,
        }
    }

    /// Draw region boxes on a copy of the page.
    pub fn with_annotation(mut self, annotate: bool) -> Self {
        self.annotate = annotate;
        self
    }

    /// Persist every region crop as `roi_<n>.png` under `dir`.
    pub fn with_regions_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.regions_dir = Some(dir.into());
        self
    }

    /// Process one decoded page.
    ///
    /// `hint` selects the layout (see [`LocaleVariant::from_hint`]). Without a
    /// layout the page is still segmented but no region reaches OCR and the
    /// record stays empty.
    pub fn run(&self, page: &GrayImage, hint: &str, recognizer: &dyn RegionRecognizer) -> Result<DocumentOutcome> {
        let start = Instant::now();
        let mut timings = StageTimings::default();
        let locale = LocaleVariant::from_hint(hint);
        if locale.is_none() {
            warn!("No layout token in hint {:?}, nothing will be extracted", hint);
        }

        let stage = Instant::now();
        let contours = self.segmenter.segment(page)?;
        let regions = self.extractor.extract(page, &contours);
        timings.segmentation_ms = stage.elapsed().as_millis() as u64;

        if let Some(dir) = &self.regions_dir {
            save_regions(&regions, dir)?;
        }
        let annotated = self.annotate.then(|| annotate(page, &regions));

        let mut warnings = Vec::new();
        let mut summaries: Vec<RegionSummary> = regions
            .iter()
            .map(|r| RegionSummary {
                index: r.index,
                bbox: r.bbox,
                recognized: false,
            })
            .collect();

        let mut transcripts = Vec::new();
        if locale.is_some() {
            let stage = Instant::now();
            let mut failures = 0usize;

            for (region, summary) in regions.iter().zip(summaries.iter_mut()) {
                match recognizer.recognize(&region.image) {
                    Ok(Some(text)) => {
                        debug!("Region {}: {} chars", region.index, text.chars().count());
                        summary.recognized = true;
                        transcripts.push((region.index, text));
                    }
                    Ok(None) => {
                        debug!("Region {}: no text", region.index);
                    }
                    Err(e @ OcrError::ModelLoad(_)) => return Err(NfeError::Ocr(e)),
                    Err(e) => {
                        warn!("Skipping region {}: {}", region.index, e);
                        warnings.push(format!("region {}: {}", region.index, e));
                        failures += 1;
                    }
                }
            }

            if transcripts.is_empty() && failures > 0 {
                return Err(OcrError::AllRegionsFailed(failures).into());
            }
            timings.ocr_ms = stage.elapsed().as_millis() as u64;
            info!(
                "{} recognized {} of {} regions in {}ms",
                recognizer.name(),
                transcripts.len(),
                regions.len(),
                timings.ocr_ms
            );
        }

        let stage = Instant::now();
        let blocks = self
            .normalizer
            .blocks(transcripts.iter().map(|(index, text)| (*index, text.as_str())));
        let extraction = self.engine.extract(locale, &blocks);
        timings.extraction_ms = stage.elapsed().as_millis() as u64;
        timings.total_ms = start.elapsed().as_millis() as u64;

        info!(
            "Document processed: {} regions, {} blocks, {} fields in {}ms",
            regions.len(),
            extraction.raw_blocks.len(),
            extraction.record.len(),
            timings.total_ms
        );

        Ok(DocumentOutcome {
            locale,
            record: extraction.record,
            raw_blocks: extraction.raw_blocks,
            regions: summaries,
            matches: extraction.matches,
            warnings,
            timings,
            annotated,
        })
    }

    /// Load a document from disk and process its page.
    ///
    /// The file name is the layout hint unless `hint` is given.
    pub fn run_file(
        &self,
        path: &Path,
        hint: Option<&str>,
        config: &NfeConfig,
        recognizer: &dyn RegionRecognizer,
    ) -> Result<DocumentOutcome> {
        let page = crate::pdf::load_page(path, &config.pdf)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.run(&page, hint.unwrap_or(&file_name), recognizer)
    }
}

impl Default for DocumentPipeline {
    fn default() -> Self {
        Self::new(&NfeConfig::default())
    }
}
