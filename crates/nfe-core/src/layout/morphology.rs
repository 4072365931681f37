//! Grayscale morphology primitives used by the segmenter.
//!
//! Line and square elements run as separable sliding-window extremes, so
//! `n` iterations with a `k`-long element cost the same as one pass.

use image::{GrayImage, Luma};
use imageproc::contrast::otsu_level;
use imageproc::distance_transform::Norm;
use imageproc::filter::separable_filter_equal;

use crate::models::config::KernelShape;

/// Direction of a 1-pixel-thick structuring element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// `k x 1` element, slides along rows.
    Horizontal,
    /// `1 x k` element, slides along columns.
    Vertical,
}

/// Value assumed for pixels outside the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Border {
    /// Outside pixels never affect the result.
    Neutral,
    /// Outside pixels hold this value.
    Constant(u8),
}

#[derive(Debug, Clone, Copy)]
enum Extreme {
    Min,
    Max,
}

impl Extreme {
    fn pick(self, a: u8, b: u8) -> u8 {
        match self {
            Extreme::Min => a.min(b),
            Extreme::Max => a.max(b),
        }
    }

    fn identity(self) -> u8 {
        match self {
            Extreme::Min => u8::MAX,
            Extreme::Max => u8::MIN,
        }
    }
}

/// Global Otsu threshold. Pixels above the level become 255 (0 when inverted).
pub fn binarize_otsu(image: &GrayImage, inverted: bool) -> GrayImage {
    let level = otsu_level(image);
    let (on, off) = if inverted { (0, 255) } else { (255, 0) };

    let mut out = image.clone();
    for p in out.pixels_mut() {
        p.0[0] = if p.0[0] > level { on } else { off };
    }
    out
}

/// Photometric negative.
pub fn invert(image: &GrayImage) -> GrayImage {
    let mut out = image.clone();
    image::imageops::invert(&mut out);
    out
}

/// `alpha * a + (1 - alpha) * b`, rounded and saturated.
pub fn blend(a: &GrayImage, b: &GrayImage, alpha: f32) -> GrayImage {
    let beta = 1.0 - alpha;
    let mut out = a.clone();
    for (o, q) in out.pixels_mut().zip(b.pixels()) {
        let v = o.0[0] as f32 * alpha + q.0[0] as f32 * beta;
        o.0[0] = v.round().clamp(0.0, 255.0) as u8;
    }
    out
}

/// Gaussian blur with a fixed `size`-tap kernel.
///
/// The kernel length does not grow with `sigma`, so a large sigma over a
/// short kernel flattens towards a box filter.
pub fn blur(image: &GrayImage, size: u32, sigma: f32) -> GrayImage {
    separable_filter_equal(image, &gaussian_taps(size, sigma))
}

fn gaussian_taps(size: u32, sigma: f32) -> Vec<f32> {
    let center = (size / 2) as f32;
    let taps: Vec<f32> = (0..size)
        .map(|i| {
            let d = i as f32 - center;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f32 = taps.iter().sum();
    taps.into_iter().map(|t| t / sum).collect()
}

/// Erode with a 1-pixel-thick line element of length `len`.
pub fn erode_line(image: &GrayImage, axis: Axis, len: u32, iterations: u32, border: Border) -> GrayImage {
    line_pass(image, axis, len, iterations, border, Extreme::Min)
}

/// Dilate with a 1-pixel-thick line element of length `len`.
pub fn dilate_line(image: &GrayImage, axis: Axis, len: u32, iterations: u32, border: Border) -> GrayImage {
    line_pass(image, axis, len, iterations, border, Extreme::Max)
}

/// Erode with a `size x size` square element.
pub fn erode_square(image: &GrayImage, size: u32, iterations: u32) -> GrayImage {
    let rows = erode_line(image, Axis::Horizontal, size, iterations, Border::Neutral);
    erode_line(&rows, Axis::Vertical, size, iterations, Border::Neutral)
}

/// Dilate the foreground (non-zero pixels) of a binary image.
///
/// Repeated passes of a small element are folded into one distance-based
/// pass: a square grows as an L-infinity ball, a cross as an L1 ball and an
/// ellipse as an L2 ball.
pub fn dilate_binary(image: &GrayImage, shape: KernelShape, size: u32, iterations: u32) -> GrayImage {
    let reach = (size / 2).saturating_mul(iterations).min(u8::MAX as u32) as u8;
    if reach == 0 {
        return image.clone();
    }
    let norm = match shape {
        KernelShape::Rect => Norm::LInf,
        KernelShape::Cross => Norm::L1,
        KernelShape::Ellipse => Norm::L2,
    };
    imageproc::morphology::dilate(image, norm, reach)
}

/// Grayscale erosion with the ellipse inscribed in a `size x size` square.
pub fn erode_ellipse(image: &GrayImage, size: u32, iterations: u32) -> GrayImage {
    let spans = ellipse_spans(size);
    let mut current = image.clone();
    for _ in 0..iterations {
        current = erode_spans(&current, &spans);
    }
    current
}

/// Half-width of each row of the ellipse element, indexed by row offset.
fn ellipse_spans(size: u32) -> Vec<(i64, u32)> {
    let r = (size / 2) as i64;
    if r == 0 {
        return vec![(0, 0)];
    }
    let c = (size / 2) as f64;
    let r2 = (r * r) as f64;
    (-r..=r)
        .map(|dy| {
            let dx = (c * (((r * r - dy * dy) as f64) / r2).sqrt()).round() as u32;
            (dy, dx)
        })
        .collect()
}

fn erode_spans(image: &GrayImage, spans: &[(i64, u32)]) -> GrayImage {
    let (width, height) = image.dimensions();

    let mut rows_by_width: Vec<(u32, GrayImage)> = Vec::new();
    for &(_, dx) in spans {
        if !rows_by_width.iter().any(|(w, _)| *w == dx) {
            let eroded = erode_line(image, Axis::Horizontal, 2 * dx + 1, 1, Border::Neutral);
            rows_by_width.push((dx, eroded));
        }
    }

    let mut out = GrayImage::from_pixel(width, height, Luma([u8::MAX]));
    for &(dy, dx) in spans {
        let Some((_, rows)) = rows_by_width.iter().find(|(w, _)| *w == dx) else {
            continue;
        };
        for y in 0..height {
            let sy = y as i64 + dy;
            if sy < 0 || sy >= height as i64 {
                continue;
            }
            for x in 0..width {
                let v = rows.get_pixel(x, sy as u32).0[0];
                let o = out.get_pixel_mut(x, y);
                o.0[0] = o.0[0].min(v);
            }
        }
    }
    out
}

fn line_pass(
    image: &GrayImage,
    axis: Axis,
    len: u32,
    iterations: u32,
    border: Border,
    op: Extreme,
) -> GrayImage {
    if len <= 1 || iterations == 0 {
        return image.clone();
    }
    let anchor = (len / 2) as usize;
    let before = anchor * iterations as usize;
    let after = (len as usize - 1 - anchor) * iterations as usize;
    let pad = match border {
        Border::Neutral => op.identity(),
        Border::Constant(v) => v,
    };

    let (width, height) = image.dimensions();
    let (width, height) = (width as usize, height as usize);
    let src = image.as_raw();
    let mut out = image.clone();

    match axis {
        Axis::Horizontal => {
            let dst: &mut [u8] = &mut out;
            for y in 0..height {
                let row = &src[y * width..(y + 1) * width];
                sliding_extreme(row, before, after, pad, op, &mut dst[y * width..(y + 1) * width]);
            }
        }
        Axis::Vertical => {
            let mut column = vec![0u8; height];
            let mut result = vec![0u8; height];
            let dst: &mut [u8] = &mut out;
            for x in 0..width {
                for y in 0..height {
                    column[y] = src[y * width + x];
                }
                sliding_extreme(&column, before, after, pad, op, &mut result);
                for y in 0..height {
                    dst[y * width + x] = result[y];
                }
            }
        }
    }
    out
}

/// Van Herk / Gil-Werman running extreme over `[i - before, i + after]`.
fn sliding_extreme(line: &[u8], before: usize, after: usize, pad: u8, op: Extreme, out: &mut [u8]) {
    let n = line.len();
    let window = before + after + 1;

    let mut padded = Vec::with_capacity(n + before + after);
    padded.extend(std::iter::repeat_n(pad, before));
    padded.extend_from_slice(line);
    padded.extend(std::iter::repeat_n(pad, after));
    let m = padded.len();

    let mut prefix = vec![0u8; m];
    let mut suffix = vec![0u8; m];
    for j in 0..m {
        prefix[j] = if j % window == 0 { padded[j] } else { op.pick(prefix[j - 1], padded[j]) };
    }
    for j in (0..m).rev() {
        suffix[j] = if j == m - 1 || (j + 1) % window == 0 {
            padded[j]
        } else {
            op.pick(suffix[j + 1], padded[j])
        };
    }

    for (i, o) in out.iter_mut().enumerate().take(n) {
        *o = op.pick(suffix[i], prefix[i + window - 1]);
    }
}
