//! Perspective rectification of the committed document boundary.
//!
//! Corners are canonicalized, scaled from working space into original
//! space, and mapped onto an axis-aligned destination rectangle whose
//! sides are the longer of each pair of opposing quad edges. The
//! perspective solve and resampling are delegated to
//! [`imageproc::geometric_transformations`].

use image::Rgba;
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};

use crate::quad::{OrderedQuad, Quad};
use crate::types::{RgbaImage, ScanError};

/// Destination rectangle implied by an ordered quad.
///
/// Width is the longer of the top and bottom edges, height the longer of
/// the left and right edges, both rounded to whole pixels.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn destination_size(quad: &OrderedQuad) -> (u32, u32) {
    let top = quad.top_left().distance(quad.top_right());
    let bottom = quad.bottom_left().distance(quad.bottom_right());
    let left = quad.top_left().distance(quad.bottom_left());
    let right = quad.top_right().distance(quad.bottom_right());
    let width = top.max(bottom).round() as u32;
    let height = left.max(right).round() as u32;
    (width, height)
}

/// Rectify the committed corners against the full-resolution original.
///
/// `quad` is in working-space coordinates and may be in any order;
/// `ratio` maps it into the original's coordinate space.
///
/// # Errors
///
/// Returns [`ScanError::DegenerateQuad`] when the corners collapse to a
/// zero-width or zero-height destination, or when no perspective
/// transform maps them onto the destination rectangle (collinear or
/// coincident corners). The size check runs before the solve, which is
/// undefined for degenerate input.
pub fn rectify(original: &RgbaImage, quad: &Quad, ratio: f64) -> Result<RgbaImage, ScanError> {
    rectify_ordered(original, &quad.ordered().scaled(ratio))
}

/// Rectify an already-canonicalized, original-space quad.
///
/// # Errors
///
/// Same conditions as [`rectify`].
#[allow(clippy::cast_possible_truncation)]
pub fn rectify_ordered(
    original: &RgbaImage,
    quad: &OrderedQuad,
) -> Result<RgbaImage, ScanError> {
    let (width, height) = destination_size(quad);
    if width == 0 || height == 0 {
        return Err(ScanError::DegenerateQuad);
    }

    let corner = |p: crate::types::Point| (p.x as f32, p.y as f32);
    let from = [
        corner(quad.top_left()),
        corner(quad.top_right()),
        corner(quad.bottom_right()),
        corner(quad.bottom_left()),
    ];
    #[allow(clippy::cast_precision_loss)]
    let to = [
        (0.0, 0.0),
        (width as f32, 0.0),
        (width as f32, height as f32),
        (0.0, height as f32),
    ];

    let projection =
        Projection::from_control_points(from, to).ok_or(ScanError::DegenerateQuad)?;

    let mut rectified = RgbaImage::new(width, height);
    warp_into(
        original,
        &projection,
        Interpolation::Bilinear,
        Rgba([0, 0, 0, 255]),
        &mut rectified,
    );
    Ok(rectified)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::Point;

    /// A source image whose pixel values encode their own coordinates,
    /// so resampled content can be checked positionally.
    fn coordinate_image(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            image::Rgba([(x % 256) as u8, (y % 256) as u8, 0, 255])
        })
    }

    #[test]
    fn destination_size_uses_longer_opposing_edges() {
        let quad = Quad::new([
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(80.0, 50.0),
            Point::new(0.0, 50.0),
        ])
        .ordered();
        let (width, height) = destination_size(&quad);
        assert_eq!(width, 100); // top edge beats the 80px bottom edge
        assert_eq!(height, 50);
    }

    #[test]
    fn axis_aligned_quad_round_trips_source_region() {
        let source = coordinate_image(100, 80);
        let quad = Quad::new([
            Point::new(10.0, 10.0),
            Point::new(60.0, 10.0),
            Point::new(60.0, 50.0),
            Point::new(10.0, 50.0),
        ]);

        let rectified = rectify(&source, &quad, 1.0).unwrap();
        assert_eq!(rectified.width(), 50);
        assert_eq!(rectified.height(), 40);

        // Content equals the source region, within resampling tolerance.
        for y in 0..rectified.height() {
            for x in 0..rectified.width() {
                let got = rectified.get_pixel(x, y).0;
                let expected = source.get_pixel(x + 10, y + 10).0;
                assert!(
                    i16::from(got[0]).abs_diff(i16::from(expected[0])) <= 2
                        && i16::from(got[1]).abs_diff(i16::from(expected[1])) <= 2,
                    "pixel ({x},{y}): got {got:?}, expected {expected:?}",
                );
            }
        }
    }

    #[test]
    fn unordered_input_rectifies_the_same_as_ordered() {
        let source = coordinate_image(100, 80);
        let ordered = Quad::new([
            Point::new(10.0, 10.0),
            Point::new(60.0, 10.0),
            Point::new(60.0, 50.0),
            Point::new(10.0, 50.0),
        ]);
        let shuffled = Quad::new([
            Point::new(60.0, 50.0),
            Point::new(10.0, 10.0),
            Point::new(10.0, 50.0),
            Point::new(60.0, 10.0),
        ]);
        assert_eq!(
            rectify(&source, &ordered, 1.0).unwrap(),
            rectify(&source, &shuffled, 1.0).unwrap(),
        );
    }

    #[test]
    fn ratio_scales_working_coordinates_into_original_space() {
        let source = coordinate_image(200, 160);
        // Working-space quad; at ratio 2 it covers (20,20)-(120,100).
        let quad = Quad::new([
            Point::new(10.0, 10.0),
            Point::new(60.0, 10.0),
            Point::new(60.0, 50.0),
            Point::new(10.0, 50.0),
        ]);
        let rectified = rectify(&source, &quad, 2.0).unwrap();
        assert_eq!(rectified.width(), 100);
        assert_eq!(rectified.height(), 80);
        let got = rectified.get_pixel(0, 0).0;
        assert!(i16::from(got[0]).abs_diff(20) <= 2);
        assert!(i16::from(got[1]).abs_diff(20) <= 2);
    }

    #[test]
    fn collinear_with_duplicate_is_degenerate() {
        let source = coordinate_image(50, 50);
        let quad = Quad::new([
            Point::new(0.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(20.0, 20.0),
            Point::new(20.0, 20.0),
        ]);
        let result = rectify(&source, &quad, 1.0);
        assert!(matches!(result, Err(ScanError::DegenerateQuad)));
    }

    #[test]
    fn coincident_corners_are_degenerate() {
        let source = coordinate_image(50, 50);
        let p = Point::new(25.0, 25.0);
        let quad = Quad::new([p, p, p, p]);
        let result = rectify(&source, &quad, 1.0);
        assert!(matches!(result, Err(ScanError::DegenerateQuad)));
    }

    #[test]
    fn tiny_quad_that_rounds_to_zero_is_degenerate() {
        let source = coordinate_image(50, 50);
        let quad = Quad::new([
            Point::new(10.0, 10.0),
            Point::new(10.2, 10.0),
            Point::new(10.2, 10.1),
            Point::new(10.0, 10.1),
        ]);
        let result = rectify(&source, &quad, 1.0);
        assert!(matches!(result, Err(ScanError::DegenerateQuad)));
    }

    #[test]
    fn perspective_quad_produces_expected_dimensions() {
        let source = coordinate_image(255, 255);
        let quad = Quad::new([
            Point::new(50.0, 50.0),
            Point::new(200.0, 60.0),
            Point::new(210.0, 220.0),
            Point::new(40.0, 230.0),
        ]);
        let ordered = quad.ordered();
        let (width, height) = destination_size(&ordered);
        let rectified = rectify(&source, &quad, 1.0).unwrap();
        assert_eq!(rectified.width(), width);
        assert_eq!(rectified.height(), height);
    }
}
