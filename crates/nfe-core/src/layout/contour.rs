//! Contour geometry and the box-shape filter.

use imageproc::contours::Contour;
use imageproc::geometry::arc_length;
use imageproc::point::Point;

use super::roi::BoundingBox;
use crate::models::config::SegmentationConfig;

/// Decides which traced contours look like printed data boxes.
#[derive(Debug, Clone)]
pub struct ContourFilter {
    min_perimeter: f64,
    max_perimeter: f64,
    epsilon_ratio: f64,
    max_vertices: usize,
}

/// Measurements taken while filtering a contour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContourShape {
    pub perimeter: f64,
    pub vertices: usize,
}

impl ContourFilter {
    pub fn from_config(config: &SegmentationConfig) -> Self {
        Self {
            min_perimeter: config.min_perimeter,
            max_perimeter: config.max_perimeter,
            epsilon_ratio: config.approx_epsilon_ratio,
            max_vertices: config.max_vertices,
        }
    }

    /// Perimeter and simplified vertex count, or `None` if the perimeter
    /// falls outside the open bounds.
    pub fn measure(&self, points: &[Point<i32>]) -> Option<ContourShape> {
        let perimeter = closed_perimeter(points);
        if !(perimeter > self.min_perimeter && perimeter < self.max_perimeter) {
            return None;
        }
        let vertices = simplified_vertices(points, self.epsilon_ratio * perimeter);
        Some(ContourShape { perimeter, vertices })
    }

    pub fn accepts(&self, contour: &Contour<i32>) -> bool {
        self.measure(&contour.points)
            .is_some_and(|shape| shape.vertices <= self.max_vertices)
    }
}

impl Default for ContourFilter {
    fn default() -> Self {
        Self::from_config(&SegmentationConfig::default())
    }
}

/// Arc length of the closed polyline through `points`.
pub fn closed_perimeter(points: &[Point<i32>]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    arc_length(points, true)
}

/// Vertex count after closed Douglas-Peucker simplification.
pub fn simplified_vertices(points: &[Point<i32>], epsilon: f64) -> usize {
    approximate_closed_polygon(points, epsilon).len()
}

/// Douglas-Peucker simplification of a closed outline.
///
/// The outline is cut at its first point and the point farthest from it,
/// and each half is simplified independently, so no vertex is duplicated at
/// the seam.
pub fn approximate_closed_polygon(points: &[Point<i32>], epsilon: f64) -> Vec<Point<i32>> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }

    let origin = points[0];
    let far = (1..n)
        .max_by_key(|&i| squared_distance(origin, points[i]))
        .unwrap_or(1);

    let mut keep = vec![false; n];
    keep[0] = true;
    keep[far] = true;

    // Index `n` stands for the wrap-around back to the first point.
    let mut stack = vec![(0usize, far), (far, n)];
    while let Some((a, b)) = stack.pop() {
        let (pa, pb) = (points[a], points[b % n]);
        let mut split = None;
        let mut max_dist = epsilon;
        for (i, p) in points.iter().enumerate().take(b).skip(a + 1) {
            let d = line_distance(*p, pa, pb);
            if d > max_dist {
                max_dist = d;
                split = Some(i);
            }
        }
        if let Some(i) = split {
            keep[i] = true;
            stack.push((a, i));
            stack.push((i, b));
        }
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(*p))
        .collect()
}

fn squared_distance(a: Point<i32>, b: Point<i32>) -> i64 {
    let dx = (a.x - b.x) as i64;
    let dy = (a.y - b.y) as i64;
    dx * dx + dy * dy
}

/// Distance from `p` to the line through `a` and `b`.
fn line_distance(p: Point<i32>, a: Point<i32>, b: Point<i32>) -> f64 {
    let (dx, dy) = ((b.x - a.x) as f64, (b.y - a.y) as f64);
    let len = (dx * dx + dy * dy).sqrt();
    if len == 0.0 {
        return (squared_distance(p, a) as f64).sqrt();
    }
    ((p.x - a.x) as f64 * dy - (p.y - a.y) as f64 * dx).abs() / len
}

/// Smallest upright rectangle containing every point.
pub fn bounding_box(points: &[Point<i32>]) -> Option<BoundingBox> {
    let first = points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in &points[1..] {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Some(BoundingBox {
        x: min_x.max(0) as u32,
        y: min_y.max(0) as u32,
        width: (max_x - min_x + 1) as u32,
        height: (max_y - min_y + 1) as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rectangle(x0: i32, y0: i32, w: i32, h: i32) -> Vec<Point<i32>> {
        let mut pts = Vec::new();
        for x in x0..x0 + w {
            pts.push(Point::new(x, y0));
        }
        for y in y0 + 1..y0 + h {
            pts.push(Point::new(x0 + w - 1, y));
        }
        for x in (x0..x0 + w - 1).rev() {
            pts.push(Point::new(x, y0 + h - 1));
        }
        for y in (y0 + 1..y0 + h - 1).rev() {
            pts.push(Point::new(x0, y));
        }
        pts
    }

    #[test]
    fn test_rectangle_is_accepted() {
        let pts = rectangle(10, 20, 400, 250);
        let filter = ContourFilter::default();
        let shape = filter.measure(&pts).unwrap();

        assert!((shape.perimeter - 2.0 * (399.0 + 249.0)).abs() < 1e-6);
        assert_eq!(shape.vertices, 4);
    }

    #[test]
    fn test_perimeter_bounds_are_exclusive() {
        let filter = ContourFilter::default();
        // 2 * (250 + 250) = 1000 exactly
        let pts = rectangle(0, 0, 251, 251);
        assert!(filter.measure(&pts).is_none());

        let pts = rectangle(0, 0, 252, 251);
        assert!(filter.measure(&pts).is_some());
    }

    #[test]
    fn test_ragged_outline_has_many_vertices() {
        let mut pts = Vec::new();
        for i in 0..12 {
            let angle = i as f64 * std::f64::consts::PI / 6.0;
            let r = if i % 2 == 0 { 400.0 } else { 150.0 };
            pts.push(Point::new(
                (500.0 + r * angle.cos()) as i32,
                (500.0 + r * angle.sin()) as i32,
            ));
        }
        let filter = ContourFilter::default();
        let shape = filter.measure(&pts).unwrap();
        assert!(shape.vertices > 5);
    }

    #[test]
    fn test_closed_simplification_keeps_corners_once() {
        let pts = rectangle(0, 0, 100, 60);
        let simplified = approximate_closed_polygon(&pts, 5.0);

        assert_eq!(
            simplified,
            vec![
                Point::new(0, 0),
                Point::new(99, 0),
                Point::new(99, 59),
                Point::new(0, 59),
            ]
        );
    }

    #[test]
    fn test_bounding_box() {
        let pts = rectangle(7, 9, 30, 12);
        assert_eq!(
            bounding_box(&pts),
            Some(BoundingBox { x: 7, y: 9, width: 30, height: 12 })
        );
        assert_eq!(bounding_box(&[]), None);
    }
}
