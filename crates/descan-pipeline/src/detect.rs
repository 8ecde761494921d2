//! Document boundary detection over the working image.
//!
//! Edge detection and contour extraction are delegated to `imageproc`
//! ([`imageproc::edges::canny`], [`imageproc::contours::find_contours`]);
//! this module owns the selection policy: rank external contours by
//! enclosed area, try to reduce the largest few to a 4-corner polygon,
//! and fall back to the largest contour's bounding box when none reduces.

use image::GrayImage;
use imageproc::contours::{BorderType, Contour};

use crate::quad::Quad;
use crate::types::{Point, RgbaImage, ScanConfig, ScanError};

/// How many of the largest contours are tried for a 4-corner reduction.
const CANDIDATE_LIMIT: usize = 5;

/// Polygon approximation tolerance, as a fraction of the closed contour
/// perimeter.
const APPROX_TOLERANCE_RATIO: f64 = 0.02;

/// Minimum allowed Canny threshold.
///
/// A threshold of zero treats every gradient pixel as a potential edge,
/// flooding contour extraction with noise.
pub const MIN_CANNY_THRESHOLD: f32 = 1.0;

/// Outcome of boundary detection.
///
/// Callers that care how the boundary was obtained (e.g. to warn a user
/// that corner positions are a guess) can distinguish the variants; both
/// carry four corners suitable for editing and rectification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Boundary {
    /// A contour reduced to exactly four vertices, in detector order.
    Corners(Quad),
    /// No candidate reduced to four vertices; this is the axis-aligned
    /// bounding box of the largest contour, in canonical
    /// top-left, top-right, bottom-right, bottom-left order.
    BoundingBox(Quad),
}

impl Boundary {
    /// The boundary corners, whichever way they were obtained.
    #[must_use]
    pub const fn quad(&self) -> Quad {
        match *self {
            Self::Corners(quad) | Self::BoundingBox(quad) => quad,
        }
    }

    /// `true` when the corners came from the bounding-box fallback.
    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        matches!(*self, Self::BoundingBox(_))
    }
}

/// Detect the document boundary in a working image.
///
/// Convenience composition of [`edge_map`] and [`boundary_from_edges`].
///
/// # Errors
///
/// Returns [`ScanError::NoBoundary`] if the edge map contains no contours
/// at all (e.g. a blank image).
pub fn detect_boundary(working: &RgbaImage, config: &ScanConfig) -> Result<Boundary, ScanError> {
    boundary_from_edges(&edge_map(working, config))
}

/// Produce a binary edge map from the working image: grayscale, Gaussian
/// blur, Canny.
///
/// A non-positive `blur_sigma` skips the blur. Canny thresholds are
/// clamped to at least [`MIN_CANNY_THRESHOLD`], and the low threshold to
/// at most the high one.
#[must_use = "returns the binary edge map"]
pub fn edge_map(working: &RgbaImage, config: &ScanConfig) -> GrayImage {
    let gray = image::imageops::grayscale(working);
    let blurred = if config.blur_sigma > 0.0 {
        imageproc::filter::gaussian_blur_f32(&gray, config.blur_sigma)
    } else {
        gray
    };
    let high = config.canny_high.max(MIN_CANNY_THRESHOLD);
    let low = config.canny_low.max(MIN_CANNY_THRESHOLD).min(high);
    imageproc::edges::canny(&blurred, low, high)
}

/// Select the document boundary from a binary edge map.
///
/// External contours are ranked by enclosed (shoelace) area descending.
/// The first of the top [`CANDIDATE_LIMIT`] candidates whose closed
/// polygon approximation has exactly four vertices is returned as
/// [`Boundary::Corners`], preserving the approximation's vertex order.
/// When none reduces to four vertices, the largest contour's axis-aligned
/// bounding box is returned as [`Boundary::BoundingBox`].
///
/// # Errors
///
/// Returns [`ScanError::NoBoundary`] if there are no contours at all.
pub fn boundary_from_edges(edges: &GrayImage) -> Result<Boundary, ScanError> {
    let contours: Vec<Contour<u32>> = imageproc::contours::find_contours(edges);

    let mut ranked: Vec<(f64, Vec<Point>)> = contours
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer)
        .map(|c| {
            let points: Vec<Point> = c
                .points
                .into_iter()
                .map(|p| Point::new(f64::from(p.x), f64::from(p.y)))
                .collect();
            (contour_area(&points), points)
        })
        .collect();

    if ranked.is_empty() {
        return Err(ScanError::NoBoundary);
    }

    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));

    for (_, contour) in ranked.iter().take(CANDIDATE_LIMIT) {
        let tolerance = APPROX_TOLERANCE_RATIO * closed_perimeter(contour);
        let approx = approximate_closed_polygon(contour, tolerance);
        if let [a, b, c, d] = approx[..] {
            return Ok(Boundary::Corners(Quad::new([a, b, c, d])));
        }
    }

    Ok(Boundary::BoundingBox(bounding_quad(&ranked[0].1)))
}

/// Enclosed area of a closed contour via the shoelace formula.
///
/// Contours with fewer than 3 points enclose nothing.
fn contour_area(points: &[Point]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut doubled = 0.0;
    for i in 0..points.len() {
        let j = (i + 1) % points.len();
        doubled += points[i].x.mul_add(points[j].y, -(points[j].x * points[i].y));
    }
    doubled.abs() / 2.0
}

/// Perimeter of a closed contour, including the closing edge.
fn closed_perimeter(points: &[Point]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    let mut length = 0.0;
    for i in 0..points.len() {
        let j = (i + 1) % points.len();
        length += points[i].distance(points[j]);
    }
    length
}

/// Axis-aligned bounding box of a contour, emitted as a quad in
/// top-left, top-right, bottom-right, bottom-left order.
fn bounding_quad(points: &[Point]) -> Quad {
    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Quad::new([
        Point::new(min_x, min_y),
        Point::new(max_x, min_y),
        Point::new(max_x, max_y),
        Point::new(min_x, max_y),
    ])
}

/// Approximate a closed contour as a polygon using Ramer-Douglas-Peucker.
///
/// The open-curve algorithm always keeps both endpoints, so the split
/// points matter for closed curves: the recursion is anchored at a
/// far-apart vertex pair (the vertex farthest from the start, then the
/// vertex farthest from that), which keeps the base chords from being
/// near-zero slivers of the loop.
fn approximate_closed_polygon(points: &[Point], tolerance: f64) -> Vec<Point> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }

    let start = farthest_from(points, 0);
    let anchor = farthest_from(points, start);

    // Rotate so `start` is index 0 and append a closing copy of it; the
    // two RDP passes then cover index ranges [0, split] and [split, n].
    let mut ring: Vec<Point> = Vec::with_capacity(n + 1);
    ring.extend_from_slice(&points[start..]);
    ring.extend_from_slice(&points[..start]);
    ring.push(points[start]);
    let split = (anchor + n - start) % n;

    let mut kept = vec![false; n + 1];
    kept[0] = true;
    kept[split] = true;
    rdp_recurse(&ring, 0, split, tolerance, &mut kept);
    rdp_recurse(&ring, split, n, tolerance, &mut kept);

    ring.truncate(n);
    ring.iter()
        .zip(&kept)
        .filter(|&(_, k)| *k)
        .map(|(&p, _)| p)
        .collect()
}

/// Index of the point farthest from `points[from]`. On ties the lowest
/// index wins.
fn farthest_from(points: &[Point], from: usize) -> usize {
    let origin = points[from];
    let mut best = 0;
    let mut best_dist = f64::NEG_INFINITY;
    for (i, &p) in points.iter().enumerate() {
        let d = origin.distance_squared(p);
        if d > best_dist {
            best = i;
            best_dist = d;
        }
    }
    best
}

/// Recursive step of the Ramer-Douglas-Peucker algorithm.
///
/// Finds the point between `start` and `end` that is farthest from the
/// chord between them; if that distance exceeds `tolerance`, the point
/// is kept and both sub-segments are processed recursively.
fn rdp_recurse(points: &[Point], start: usize, end: usize, tolerance: f64, kept: &mut [bool]) {
    if end <= start + 1 {
        return;
    }

    let mut max_dist = 0.0;
    let mut max_idx = start;

    for i in (start + 1)..end {
        let d = perpendicular_distance(points[i], points[start], points[end]);
        if d > max_dist {
            max_dist = d;
            max_idx = i;
        }
    }

    if max_dist > tolerance {
        kept[max_idx] = true;
        rdp_recurse(points, start, max_idx, tolerance, kept);
        rdp_recurse(points, max_idx, end, tolerance, kept);
    }
}

/// Perpendicular distance from `p` to the line through `a` and `b`.
///
/// When `a` and `b` coincide, falls back to the distance from `p` to `a`.
fn perpendicular_distance(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let length_sq = dx.mul_add(dx, dy * dy);

    if length_sq == 0.0 {
        return p.distance(a);
    }

    let cross = dx.mul_add(a.y - p.y, -(dy * (a.x - p.x)));
    cross.abs() / length_sq.sqrt()
}
