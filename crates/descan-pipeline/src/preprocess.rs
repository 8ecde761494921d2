//! Source decoding and working-copy construction.
//!
//! The full-resolution original is kept untouched for the final
//! rectification; detection and corner editing run on a working copy
//! resized to a fixed height. `ratio = original_height / working_height`
//! maps working-space coordinates back into original space.

use image::GenericImageView;
use image::imageops::FilterType;

use crate::types::{RgbaImage, ScanError};

/// Decoded source image plus its downscaled working copy.
#[derive(Debug, Clone)]
pub struct Preprocessed {
    /// Full-resolution source, read only during rectification.
    pub original: RgbaImage,
    /// Downscaled copy used for detection and editing. Never mutated
    /// after this initial resize.
    pub working: RgbaImage,
    /// `original.height() / working.height()`, the working-to-original
    /// coordinate scale.
    pub ratio: f64,
}

/// Decode raw image bytes and build the working copy.
///
/// Supports whatever the `image` crate can decode (PNG, JPEG, BMP, WebP).
///
/// # Errors
///
/// Returns [`ScanError::EmptyInput`] if `bytes` is empty and
/// [`ScanError::ImageDecode`] if the data is corrupt or unrecognized.
/// Returns [`ScanError::InvalidConfig`] if `working_height` is zero.
pub fn preprocess(bytes: &[u8], working_height: u32) -> Result<Preprocessed, ScanError> {
    if bytes.is_empty() {
        return Err(ScanError::EmptyInput);
    }

    let decoded = image::load_from_memory(bytes)?;
    from_original(decoded.to_rgba8(), working_height)
}

/// Build a working copy for an already-decoded source image.
///
/// # Errors
///
/// Returns [`ScanError::EmptyInput`] if the image has no pixels and
/// [`ScanError::InvalidConfig`] if `working_height` is zero.
pub fn from_original(
    original: RgbaImage,
    working_height: u32,
) -> Result<Preprocessed, ScanError> {
    if working_height == 0 {
        return Err(ScanError::InvalidConfig(
            "working_height must be at least 1".to_string(),
        ));
    }
    if original.width() == 0 || original.height() == 0 {
        return Err(ScanError::EmptyInput);
    }

    let ratio = f64::from(original.height()) / f64::from(working_height);
    let working = resize_to_height(&original, working_height);
    Ok(Preprocessed {
        original,
        working,
        ratio,
    })
}

/// Resize an image to the given height, preserving aspect ratio.
///
/// The width rounds to the nearest pixel with a minimum of 1, so extreme
/// aspect ratios never collapse to an empty image. Also used by callers
/// to produce display-sized previews.
#[must_use = "returns the resized image"]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn resize_to_height<I>(
    image: &I,
    height: u32,
) -> image::ImageBuffer<I::Pixel, Vec<<I::Pixel as image::Pixel>::Subpixel>>
where
    I: GenericImageView,
    I::Pixel: 'static,
    <I::Pixel as image::Pixel>::Subpixel: 'static,
{
    let scale = f64::from(height) / f64::from(image.height().max(1));
    let width = (f64::from(image.width()) * scale).round().max(1.0) as u32;
    image::imageops::resize(image, width, height, FilterType::Triangle)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Encode an RGBA image as PNG bytes.
    fn png_bytes(img: &RgbaImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .unwrap();
        buf
    }

    #[test]
    fn empty_input_returns_error() {
        let result = preprocess(&[], 500);
        assert!(matches!(result, Err(ScanError::EmptyInput)));
    }

    #[test]
    fn corrupt_bytes_return_decode_error() {
        let result = preprocess(&[0xFF, 0xFE, 0x00, 0x01], 500);
        assert!(matches!(result, Err(ScanError::ImageDecode(_))));
    }

    #[test]
    fn zero_working_height_rejected() {
        let img = RgbaImage::from_pixel(10, 10, image::Rgba([0, 0, 0, 255]));
        let result = from_original(img, 0);
        assert!(matches!(result, Err(ScanError::InvalidConfig(_))));
    }

    #[test]
    fn working_copy_has_target_height_and_preserved_aspect() {
        let img = RgbaImage::from_pixel(1000, 2000, image::Rgba([128, 128, 128, 255]));
        let pre = from_original(img, 500).unwrap();
        assert_eq!(pre.working.height(), 500);
        assert_eq!(pre.working.width(), 250);
        assert!((pre.ratio - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn small_source_is_upscaled_to_target_height() {
        let img = RgbaImage::from_pixel(60, 100, image::Rgba([0, 0, 0, 255]));
        let pre = from_original(img, 500).unwrap();
        assert_eq!(pre.working.height(), 500);
        assert_eq!(pre.working.width(), 300);
        assert!((pre.ratio - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn original_is_retained_at_full_resolution() {
        let img = RgbaImage::from_pixel(800, 600, image::Rgba([10, 20, 30, 255]));
        let pre = from_original(img.clone(), 500).unwrap();
        assert_eq!(pre.original, img);
    }

    #[test]
    fn decode_path_matches_direct_path() {
        let img = RgbaImage::from_fn(400, 300, |x, y| {
            image::Rgba([(x % 256) as u8, (y % 256) as u8, 0, 255])
        });
        let via_bytes = preprocess(&png_bytes(&img), 150).unwrap();
        let direct = from_original(img, 150).unwrap();
        assert_eq!(via_bytes.working.dimensions(), direct.working.dimensions());
        assert!((via_bytes.ratio - direct.ratio).abs() < f64::EPSILON);
    }

    #[test]
    fn extreme_aspect_never_collapses_width() {
        let img = RgbaImage::from_pixel(1, 4000, image::Rgba([0, 0, 0, 255]));
        let pre = from_original(img, 500).unwrap();
        assert_eq!(pre.working.width(), 1);
        assert_eq!(pre.working.height(), 500);
    }

    #[test]
    fn resize_to_height_rounds_width() {
        let img = RgbaImage::from_pixel(333, 500, image::Rgba([0, 0, 0, 255]));
        let resized = resize_to_height(&img, 250);
        // 333 * 250 / 500 = 166.5 -> 167
        assert_eq!(resized.width(), 167);
        assert_eq!(resized.height(), 250);
    }
}
