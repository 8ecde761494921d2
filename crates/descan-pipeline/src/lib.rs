//! descan-pipeline: pure document scanning pipeline (sans-IO).
//!
//! Turns a photograph of a paper document into a flat, binarized scan:
//! decode + working copy -> boundary detection -> interactive corner
//! correction -> perspective rectification -> adaptive binarization.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! image buffers and an abstract editor event stream, and returns
//! structured data. File access, event sources, and display live in the
//! `descan` CLI (or any other front end).
//!
//! Every stage is a pure function over its inputs; the only mutable
//! state is the corner-editing session, owned by [`editor`] for its
//! lifetime. A failed or cancelled stage therefore never leaves partial
//! results behind.

pub mod binarize;
pub mod detect;
pub mod editor;
pub mod preprocess;
pub mod quad;
pub mod rectify;
pub mod types;

pub use detect::Boundary;
pub use editor::{EditSession, EditorEvent};
pub use preprocess::Preprocessed;
pub use quad::{OrderedQuad, Quad};
pub use types::{GrayImage, Point, RgbaImage, ScanConfig, ScanError};

/// Final outputs of a scan run.
#[derive(Debug, Clone)]
pub struct ScanResult {
    /// Committed corners, canonicalized and scaled into original space.
    pub quad: OrderedQuad,
    /// Perspective-corrected document region, full resolution, color.
    pub rectified: RgbaImage,
    /// Binarized scan; every pixel is 0 or 255. This is the externally
    /// meaningful artifact.
    pub scanned: GrayImage,
}

/// Outputs of a scan run with every intermediate stage retained,
/// for debugging and preview display.
#[derive(Debug, Clone)]
pub struct ScanStages {
    /// Full-resolution decoded source.
    pub original: RgbaImage,
    /// Downscaled working copy used for detection and editing.
    pub working: RgbaImage,
    /// Working-to-original coordinate scale.
    pub ratio: f64,
    /// Binary edge map the boundary was selected from.
    pub edges: GrayImage,
    /// Detection outcome (4-corner reduction or bounding-box fallback),
    /// in working space.
    pub boundary: Boundary,
    /// Corners as committed by the editor, still in detector order and
    /// working space.
    pub committed: Quad,
    /// Committed corners canonicalized and scaled into original space.
    pub quad: OrderedQuad,
    /// Perspective-corrected document region.
    pub rectified: RgbaImage,
    /// Binarized scan.
    pub scanned: GrayImage,
}

impl ScanStages {
    /// Collapse into the final outputs, dropping the intermediates.
    #[must_use]
    pub fn into_result(self) -> ScanResult {
        ScanResult {
            quad: self.quad,
            rectified: self.rectified,
            scanned: self.scanned,
        }
    }
}

/// Run the full scanning pipeline.
///
/// `events` drives the corner editor; a non-interactive caller that
/// trusts detection passes `[EditorEvent::Commit]`.
///
/// # Errors
///
/// - [`ScanError::InvalidConfig`] for an unusable configuration.
/// - [`ScanError::EmptyInput`] / [`ScanError::ImageDecode`] when the
///   source bytes cannot be loaded.
/// - [`ScanError::NoBoundary`] when the working image has no contours.
/// - [`ScanError::Cancelled`] when editing ends without a commit.
/// - [`ScanError::DegenerateQuad`] when the committed corners admit no
///   rectification.
pub fn scan<E>(
    image_bytes: &[u8],
    events: E,
    config: &ScanConfig,
) -> Result<ScanResult, ScanError>
where
    E: IntoIterator<Item = EditorEvent>,
{
    scan_staged(image_bytes, events, config).map(ScanStages::into_result)
}

/// Run the full scanning pipeline, retaining every intermediate output.
///
/// # Errors
///
/// Same conditions as [`scan`].
pub fn scan_staged<E>(
    image_bytes: &[u8],
    events: E,
    config: &ScanConfig,
) -> Result<ScanStages, ScanError>
where
    E: IntoIterator<Item = EditorEvent>,
{
    config.validate()?;

    // 1. Decode and build the working copy.
    let pre = preprocess::preprocess(image_bytes, config.working_height)?;

    // 2. Detect the document boundary on the working copy.
    let edges = detect::edge_map(&pre.working, config);
    let boundary = detect::boundary_from_edges(&edges)?;

    // 3. Let the event stream correct the corners.
    let session = EditSession::new(boundary.quad(), config.pick_radius);
    let committed = editor::drive(session, events)?;

    // 4. Canonicalize, scale to original space, rectify.
    let quad = committed.ordered().scaled(pre.ratio);
    let rectified = rectify::rectify_ordered(&pre.original, &quad)?;

    // 5. Binarize.
    let scanned = binarize::binarize(&rectified, config.threshold_window, config.threshold_offset);

    Ok(ScanStages {
        original: pre.original,
        working: pre.working,
        ratio: pre.ratio,
        edges,
        boundary,
        committed,
        quad,
        rectified,
        scanned,
    })
}
