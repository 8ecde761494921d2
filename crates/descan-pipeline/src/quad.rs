//! Document boundary quadrilaterals and canonical corner ordering.
//!
//! A [`Quad`] is four corner points in whatever order the detector or the
//! editor produced them. Rectification needs the corners in a fixed
//! top-left, top-right, bottom-right, bottom-left order; [`Quad::ordered`]
//! computes that [`OrderedQuad`] from coordinate extrema:
//!
//! - top-left minimizes `x + y`, bottom-right maximizes `x + y`;
//! - top-right minimizes `y - x`, bottom-left maximizes `y - x`.
//!
//! The rule is a pure function of the point set, so it is idempotent and
//! invariant under permutation of the input corners. Ties resolve to the
//! lowest input index.

use serde::{Deserialize, Serialize};

use crate::types::Point;

/// Four corner points of a document boundary, in arbitrary order.
///
/// Corner indices are stable identities for the editor; no spatial order
/// is assumed until [`Quad::ordered`] is called.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quad([Point; 4]);

impl Quad {
    /// Create a quad from four corner points.
    #[must_use]
    pub const fn new(points: [Point; 4]) -> Self {
        Self(points)
    }

    /// The corner points, in their current order.
    #[must_use]
    pub const fn points(&self) -> &[Point; 4] {
        &self.0
    }

    /// Canonicalize into top-left, top-right, bottom-right, bottom-left
    /// order using the sum/difference extrema rule.
    #[must_use]
    pub fn ordered(&self) -> OrderedQuad {
        let top_left = extremum(&self.0, |p| p.x + p.y, Extremum::Min);
        let bottom_right = extremum(&self.0, |p| p.x + p.y, Extremum::Max);
        let top_right = extremum(&self.0, |p| p.y - p.x, Extremum::Min);
        let bottom_left = extremum(&self.0, |p| p.y - p.x, Extremum::Max);
        OrderedQuad([top_left, top_right, bottom_right, bottom_left])
    }
}

/// Which end of the key range to select.
enum Extremum {
    Min,
    Max,
}

/// The point with the smallest or largest key. On ties the lowest index
/// wins, so ordering is deterministic for symmetric inputs.
fn extremum(points: &[Point; 4], key: impl Fn(Point) -> f64, end: Extremum) -> Point {
    let mut best = points[0];
    let mut best_key = key(best);
    for &p in &points[1..] {
        let k = key(p);
        let better = match end {
            Extremum::Min => k < best_key,
            Extremum::Max => k > best_key,
        };
        if better {
            best = p;
            best_key = k;
        }
    }
    best
}

/// A [`Quad`] with the invariant that index 0 is top-left, 1 top-right,
/// 2 bottom-right, 3 bottom-left.
///
/// Only constructed by [`Quad::ordered`] or by uniform scaling of an
/// already-ordered quad, both of which preserve the invariant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OrderedQuad([Point; 4]);

impl OrderedQuad {
    /// The corners in canonical order.
    #[must_use]
    pub const fn points(&self) -> &[Point; 4] {
        &self.0
    }

    /// Top-left corner.
    #[must_use]
    pub const fn top_left(&self) -> Point {
        self.0[0]
    }

    /// Top-right corner.
    #[must_use]
    pub const fn top_right(&self) -> Point {
        self.0[1]
    }

    /// Bottom-right corner.
    #[must_use]
    pub const fn bottom_right(&self) -> Point {
        self.0[2]
    }

    /// Bottom-left corner.
    #[must_use]
    pub const fn bottom_left(&self) -> Point {
        self.0[3]
    }

    /// View as an unordered [`Quad`] (the canonical order is still a valid
    /// arbitrary order).
    #[must_use]
    pub const fn as_quad(&self) -> Quad {
        Quad(self.0)
    }

    /// Scale every coordinate by `ratio`.
    ///
    /// Used to map working-space corners into original space. A positive
    /// uniform scale preserves the canonical order.
    #[must_use]
    pub fn scaled(&self, ratio: f64) -> Self {
        Self(self.0.map(|p| Point::new(p.x * ratio, p.y * ratio)))
    }
}
