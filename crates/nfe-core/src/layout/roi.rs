//! Region-of-interest cropping, binarization and audit output.

use image::{GrayImage, Rgb, RgbImage};
use imageproc::contours::Contour;
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::contour::{bounding_box, ContourFilter};
use super::morphology::binarize_otsu;
use crate::error::NfeError;
use crate::models::config::SegmentationConfig;

/// Stroke colour of annotated region boxes.
const ANNOTATION_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

/// Stroke width of annotated region boxes.
const ANNOTATION_THICKNESS: u32 = 6;

/// Upright pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// Grow by `padding` on every side, clamped to a `page_width x page_height` page.
    pub fn padded(&self, padding: u32, page_width: u32, page_height: u32) -> BoundingBox {
        let x0 = self.x.saturating_sub(padding).min(page_width);
        let y0 = self.y.saturating_sub(padding).min(page_height);
        let x1 = self.right().saturating_add(padding).min(page_width);
        let y1 = self.bottom().saturating_add(padding).min(page_height);
        BoundingBox {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        }
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    pub fn center(&self) -> (u32, u32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Padded, binarized crop believed to hold one printed data box.
#[derive(Debug, Clone)]
pub struct RegionOfInterest {
    /// 1-based position of the source contour in the segmenter output.
    pub index: usize,
    /// Contour bounds before padding.
    pub bbox: BoundingBox,
    /// Bounds actually cropped from the page.
    pub padded: BoundingBox,
    /// Otsu-binarized crop (ink dark, paper white).
    pub image: GrayImage,
}

impl RegionOfInterest {
    /// File name used when the crop is persisted.
    pub fn file_name(&self) -> String {
        format!("roi_{}.png", self.index)
    }
}

/// Filters contours and cuts the surviving boxes out of the page.
#[derive(Debug, Clone)]
pub struct RoiExtractor {
    filter: ContourFilter,
    padding: u32,
}

impl RoiExtractor {
    pub fn new(config: &SegmentationConfig) -> Self {
        Self {
            filter: ContourFilter::from_config(config),
            padding: config.roi_padding,
        }
    }

    /// Crop a region for every contour that passes the box filter.
    ///
    /// Output order follows contour order; it carries no meaning.
    pub fn extract(&self, page: &GrayImage, contours: &[Contour<i32>]) -> Vec<RegionOfInterest> {
        let (page_width, page_height) = page.dimensions();
        let mut regions = Vec::new();

        for (idx, contour) in contours.iter().enumerate() {
            if !self.filter.accepts(contour) {
                continue;
            }
            let Some(bbox) = bounding_box(&contour.points) else {
                continue;
            };
            let padded = bbox.padded(self.padding, page_width, page_height);
            if padded.is_empty() {
                continue;
            }

            let crop = image::imageops::crop_imm(page, padded.x, padded.y, padded.width, padded.height)
                .to_image();
            let image = binarize_otsu(&crop, false);

            debug!(
                "Region {} at ({}, {}) {}x{}",
                idx + 1,
                bbox.x,
                bbox.y,
                bbox.width,
                bbox.height
            );

            regions.push(RegionOfInterest {
                index: idx + 1,
                bbox,
                padded,
                image,
            });
        }

        info!("Kept {} of {} contours as regions", regions.len(), contours.len());
        regions
    }
}

/// Copy of the page with every region's pre-padding box outlined.
pub fn annotate(page: &GrayImage, regions: &[RegionOfInterest]) -> RgbImage {
    let mut canvas = image::DynamicImage::ImageLuma8(page.clone()).to_rgb8();

    for region in regions {
        let b = region.bbox;
        for t in 0..ANNOTATION_THICKNESS {
            let w = b.width.saturating_sub(2 * t);
            let h = b.height.saturating_sub(2 * t);
            if w == 0 || h == 0 {
                break;
            }
            let rect = Rect::at((b.x + t) as i32, (b.y + t) as i32).of_size(w, h);
            draw_hollow_rect_mut(&mut canvas, rect, ANNOTATION_COLOR);
        }
    }

    canvas
}

/// Write every crop as `roi_<index>.png` under `dir`.
pub fn save_regions(regions: &[RegionOfInterest], dir: &Path) -> Result<Vec<PathBuf>, NfeError> {
    std::fs::create_dir_all(dir)?;
    let mut paths = Vec::with_capacity(regions.len());
    for region in regions {
        let path = dir.join(region.file_name());
        region.image.save(&path)?;
        paths.push(path);
    }
    debug!("Saved {} regions to {}", paths.len(), dir.display());
    Ok(paths)
}
