//! Page segmentation into candidate data boxes.

mod contour;
pub mod morphology;
mod roi;
mod segmenter;

pub use contour::{approximate_closed_polygon, bounding_box, closed_perimeter, ContourFilter, ContourShape};
pub use roi::{annotate, save_regions, BoundingBox, RegionOfInterest, RoiExtractor};
pub use segmenter::RegionSegmenter;

pub use imageproc::contours::Contour;
