//! Shared types for the descan document-scanning pipeline.

use serde::{Deserialize, Serialize};

/// Re-export `GrayImage` so downstream crates can reference the edge map
/// and the binarized scan without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbaImage` so downstream crates can reference the decoded
/// source and the rectified document without depending on `image` directly.
pub use image::RgbaImage;

/// A 2D point in image coordinates.
///
/// Whether the coordinates live in working space or original space is a
/// property of the surrounding call, not of the point itself.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from left edge).
    pub x: f64,
    /// Vertical position (pixels from top edge).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }
}

/// Configuration for the document scanning pipeline.
///
/// All parameters default to the values of the associated constants.
/// `working_height` controls the size of the detection/editing copy;
/// everything up to rectification operates in that coordinate space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Height of the working copy in pixels. The source is resized to this
    /// height (aspect preserved) before detection and corner editing.
    pub working_height: u32,

    /// Gaussian blur sigma applied before edge detection. Non-positive
    /// values skip the blur.
    pub blur_sigma: f32,

    /// Canny low threshold. Gradients between `canny_low` and `canny_high`
    /// are edges only when connected to a strong edge.
    pub canny_low: f32,

    /// Canny high threshold. Gradients above this value are definite edges.
    pub canny_high: f32,

    /// Corner grab distance for the editor, in working-space pixels.
    pub pick_radius: f64,

    /// Local-mean neighborhood size for binarization. Must be odd and at
    /// least 3.
    pub threshold_window: u32,

    /// Subtracted from the local mean before comparison; larger values
    /// push more pixels to white.
    pub threshold_offset: f64,
}

impl ScanConfig {
    /// Default working-copy height.
    pub const DEFAULT_WORKING_HEIGHT: u32 = 500;

    /// Default blur sigma. This is the sigma OpenCV derives for a 5x5
    /// Gaussian kernel, the neighborhood the detector is tuned for.
    pub const DEFAULT_BLUR_SIGMA: f32 = 1.1;

    /// Default Canny low threshold.
    pub const DEFAULT_CANNY_LOW: f32 = 75.0;

    /// Default Canny high threshold.
    pub const DEFAULT_CANNY_HIGH: f32 = 200.0;

    /// Default corner grab distance.
    pub const DEFAULT_PICK_RADIUS: f64 = 20.0;

    /// Default local-mean neighborhood size.
    pub const DEFAULT_THRESHOLD_WINDOW: u32 = 11;

    /// Default local-mean offset.
    pub const DEFAULT_THRESHOLD_OFFSET: f64 = 10.0;

    /// Check the configuration for values no stage can work with.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::InvalidConfig`] when the working height is
    /// zero, the Canny thresholds are inverted, the pick radius is not
    /// positive, or the threshold window is even or smaller than 3.
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.working_height == 0 {
            return Err(ScanError::InvalidConfig(
                "working_height must be at least 1".to_string(),
            ));
        }
        if self.canny_low > self.canny_high {
            return Err(ScanError::InvalidConfig(format!(
                "canny_low ({}) must not exceed canny_high ({})",
                self.canny_low, self.canny_high,
            )));
        }
        if self.pick_radius <= 0.0 {
            return Err(ScanError::InvalidConfig(
                "pick_radius must be positive".to_string(),
            ));
        }
        if self.threshold_window < 3 || self.threshold_window % 2 == 0 {
            return Err(ScanError::InvalidConfig(format!(
                "threshold_window must be odd and at least 3, got {}",
                self.threshold_window,
            )));
        }
        Ok(())
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            working_height: Self::DEFAULT_WORKING_HEIGHT,
            blur_sigma: Self::DEFAULT_BLUR_SIGMA,
            canny_low: Self::DEFAULT_CANNY_LOW,
            canny_high: Self::DEFAULT_CANNY_HIGH,
            pick_radius: Self::DEFAULT_PICK_RADIUS,
            threshold_window: Self::DEFAULT_THRESHOLD_WINDOW,
            threshold_offset: Self::DEFAULT_THRESHOLD_OFFSET,
        }
    }
}

/// Errors that can occur during a scan run.
///
/// Every variant is terminal for the run: a scan either fully succeeds or
/// produces nothing. Messages name the failing stage so callers can report
/// them to a user directly.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// The source image could not be decoded.
    #[error("load: failed to decode source image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The source image bytes were empty.
    #[error("load: source image data is empty")]
    EmptyInput,

    /// The input collaborator yielded no image at all.
    #[error("no input image selected")]
    NoInputSelected,

    /// Edge detection produced no contours to pick a boundary from.
    #[error("detect: no contours found in the working image")]
    NoBoundary,

    /// The committed corners collapse to a zero-width or zero-height
    /// destination, or admit no perspective solution.
    #[error("rectify: boundary corners are degenerate")]
    DegenerateQuad,

    /// The user cancelled corner editing; not a defect, but the run
    /// produces no output.
    #[error("edit: session cancelled")]
    Cancelled,

    /// Pipeline configuration is invalid.
    #[error("invalid scan configuration: {0}")]
    InvalidConfig(String),
}
