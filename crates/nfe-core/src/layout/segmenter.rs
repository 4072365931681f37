//! Ruling-line segmentation of scanned invoice pages.
//!
//! Printed NFS-e layouts frame every data box with ruled lines. The segmenter
//! isolates long vertical and horizontal strokes, merges them into one grid
//! mask, closes small gaps and traces the outlines of the resulting cells.

use image::GrayImage;
use imageproc::contours::{find_contours, Contour};
use std::time::Instant;
use tracing::{debug, info};

use super::morphology::{
    binarize_otsu, blend, blur, dilate_binary, dilate_line, erode_ellipse, erode_line, erode_square, invert,
    Axis, Border,
};
use crate::error::LayoutError;
use crate::models::config::SegmentationConfig;

/// Finds candidate box outlines on a grayscale page.
#[derive(Debug, Clone, Default)]
pub struct RegionSegmenter {
    config: SegmentationConfig,
}

impl RegionSegmenter {
    pub fn new(config: SegmentationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SegmentationConfig {
        &self.config
    }

    /// Trace every contour of the closed ruling grid, outer and hole borders alike.
    ///
    /// The returned order is whatever the tracer produced.
    pub fn segment(&self, page: &GrayImage) -> Result<Vec<Contour<i32>>, LayoutError> {
        let (width, height) = page.dimensions();
        if width == 0 || height == 0 {
            return Err(LayoutError::EmptyPage { width, height });
        }
        self.check_parameters()?;

        let start = Instant::now();
        let cfg = &self.config;

        let ink = binarize_otsu(page, true);

        let vertical = {
            let strokes = erode_line(
                &ink,
                Axis::Vertical,
                cfg.vertical_kernel_len,
                cfg.vertical_erode_iterations,
                Border::Neutral,
            );
            dilate_line(
                &strokes,
                Axis::Vertical,
                cfg.vertical_kernel_len,
                cfg.vertical_dilate_iterations,
                Border::Constant(cfg.vertical_border_fill),
            )
        };
        let horizontal = {
            let strokes = erode_line(
                &ink,
                Axis::Horizontal,
                cfg.horizontal_kernel_len,
                cfg.horizontal_erode_iterations,
                Border::Neutral,
            );
            dilate_line(
                &strokes,
                Axis::Horizontal,
                cfg.horizontal_kernel_len,
                cfg.horizontal_dilate_iterations,
                Border::Neutral,
            )
        };

        if !has_strokes(&vertical, cfg.vertical_border_fill) && !has_strokes(&horizontal, 0) {
            debug!("No ruling lines survived stroke isolation");
            return Ok(Vec::new());
        }

        let grid = blend(&vertical, &horizontal, cfg.blend_alpha);
        let grid = erode_square(&invert(&grid), cfg.noise_kernel_size, cfg.noise_erode_iterations);
        let grid = binarize_otsu(&grid, false);

        let grid = dilate_binary(
            &invert(&grid),
            cfg.close_kernel_shape,
            cfg.close_kernel_size,
            cfg.close_iterations,
        );
        let grid = blur(&invert(&grid), cfg.blur_kernel_size, cfg.blur_sigma);
        let grid = erode_ellipse(&invert(&grid), cfg.smooth_kernel_size, cfg.smooth_erode_iterations);

        let contours = find_contours::<i32>(&grid);

        info!(
            "Segmented {}x{} page into {} contours in {}ms",
            width,
            height,
            contours.len(),
            start.elapsed().as_millis()
        );
        Ok(contours)
    }

    fn check_parameters(&self) -> Result<(), LayoutError> {
        let cfg = &self.config;
        for (name, value) in [
            ("vertical_kernel_len", cfg.vertical_kernel_len),
            ("horizontal_kernel_len", cfg.horizontal_kernel_len),
            ("noise_kernel_size", cfg.noise_kernel_size),
            ("close_kernel_size", cfg.close_kernel_size),
            ("smooth_kernel_size", cfg.smooth_kernel_size),
            ("blur_kernel_size", cfg.blur_kernel_size),
        ] {
            if value == 0 {
                return Err(LayoutError::InvalidParameter {
                    name,
                    reason: "must be positive".to_string(),
                });
            }
        }
        if !(cfg.blur_sigma > 0.0) {
            return Err(LayoutError::InvalidParameter {
                name: "blur_sigma",
                reason: format!("{} is not positive", cfg.blur_sigma),
            });
        }
        Ok(())
    }
}

/// Whether any pixel rises above the value the border fill alone can produce.
fn has_strokes(mask: &GrayImage, fill: u8) -> bool {
    mask.pixels().any(|p| p.0[0] > fill)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::RoiExtractor;
    use image::Luma;

    /// 1000x700 page with a 2x2 table ruled by 3 px lines.
    fn ruled_page() -> GrayImage {
        let mut page = GrayImage::from_pixel(1000, 700, Luma([245]));
        for &y in &[50u32, 350, 650] {
            for dy in 0..3 {
                for x in 50..953 {
                    page.put_pixel(x, y + dy, Luma([10]));
                }
            }
        }
        for &x in &[50u32, 500, 950] {
            for dx in 0..3 {
                for y in 50..653 {
                    page.put_pixel(x + dx, y, Luma([10]));
                }
            }
        }
        // some body text that must not survive as strokes
        for i in 0..20 {
            page.put_pixel(120 + i * 7, 200, Luma([30]));
            page.put_pixel(600 + i * 5, 480, Luma([30]));
        }
        page
    }

    #[test]
    fn test_ruled_table_yields_cell_regions() {
        let config = SegmentationConfig::default();
        let page = ruled_page();

        let contours = RegionSegmenter::new(config.clone()).segment(&page).unwrap();
        assert!(!contours.is_empty());

        let regions = RoiExtractor::new(&config).extract(&page, &contours);
        assert!(regions.len() >= 4, "found {} regions", regions.len());

        for (cx, cy) in [(275, 200), (725, 200), (275, 500), (725, 500)] {
            assert!(
                regions
                    .iter()
                    .any(|r| r.bbox.contains(cx, cy) && r.bbox.width < 500 && r.bbox.height < 350),
                "no cell region around ({cx}, {cy})"
            );
        }
    }

    #[test]
    fn test_page_without_rules_has_no_contours() {
        let mut page = GrayImage::from_pixel(400, 400, Luma([250]));
        for &(x, y) in &[(30u32, 40u32), (200, 210), (350, 90)] {
            for dy in 0..3 {
                for dx in 0..3 {
                    page.put_pixel(x + dx, y + dy, Luma([5]));
                }
            }
        }

        let contours = RegionSegmenter::default().segment(&page).unwrap();
        assert!(contours.is_empty());
    }

    #[test]
    fn test_empty_page_is_rejected() {
        let page = GrayImage::new(0, 10);
        assert!(matches!(
            RegionSegmenter::default().segment(&page),
            Err(LayoutError::EmptyPage { width: 0, height: 10 })
        ));
    }

    #[test]
    fn test_zero_kernel_is_rejected() {
        let mut config = SegmentationConfig::default();
        config.close_kernel_size = 0;
        let page = GrayImage::new(10, 10);

        assert!(matches!(
            RegionSegmenter::new(config).segment(&page),
            Err(LayoutError::InvalidParameter { name: "close_kernel_size", .. })
        ));
    }
}
