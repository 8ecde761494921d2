//! Adaptive binarization of the rectified document.
//!
//! Every pixel is compared against a Gaussian-weighted mean of its own
//! neighborhood, so shadows and uneven lighting shift the threshold with
//! them instead of defeating it. A single global threshold cannot
//! separate ink from paper when the paper's brightness varies across the
//! page; this stage must stay local.

use image::GrayImage;

use crate::types::RgbaImage;

/// Binarize a rectified document image.
///
/// Converts to grayscale, computes a Gaussian-weighted local mean over a
/// `window`-sized neighborhood, and emits 255 where the pixel exceeds
/// `local mean - offset`, otherwise 0. Output pixels are exactly 0 or
/// 255, never anything between.
#[must_use = "returns the binarized scan"]
pub fn binarize(rectified: &RgbaImage, window: u32, offset: f64) -> GrayImage {
    let gray = image::imageops::grayscale(rectified);
    threshold_against_local_mean(&gray, window, offset)
}

/// Apply the local-mean threshold to an already-grayscale image.
#[must_use = "returns the binarized image"]
pub fn threshold_against_local_mean(gray: &GrayImage, window: u32, offset: f64) -> GrayImage {
    let sigma = local_mean_sigma(window);
    let local_mean = if sigma > 0.0 {
        imageproc::filter::gaussian_blur_f32(gray, sigma)
    } else {
        gray.clone()
    };

    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let value = f64::from(gray.get_pixel(x, y).0[0]);
        let threshold = f64::from(local_mean.get_pixel(x, y).0[0]) - offset;
        image::Luma([if value > threshold { 255 } else { 0 }])
    })
}

/// Gaussian sigma for a given neighborhood window: the window spans three
/// standard deviations to each side of the center pixel.
#[allow(clippy::cast_precision_loss)]
fn local_mean_sigma(window: u32) -> f32 {
    window.saturating_sub(1) as f32 / 6.0
}
