//! descan: scan a photographed paper document into a flat, binarized image.
//!
//! Runs the full pipeline from `descan-pipeline` on an image file:
//! boundary detection on a downscaled working copy, optional corner
//! override, perspective rectification of the full-resolution source,
//! and adaptive binarization. Progress is reported on stderr; outputs
//! are written as image files.
//!
//! # Usage
//!
//! ```text
//! descan photo.jpg --output scanned.png
//! descan photo.jpg --corners "50,50 450,60 460,480 40,470"
//! descan photo.jpg --stages debug/ --preview
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use descan_pipeline::{
    EditorEvent, Point, RgbaImage, ScanConfig, ScanError, ScanStages, preprocess,
};

/// Exit code for a user-cancelled edit session: an abort, not a defect.
const EXIT_CANCELLED: u8 = 2;

/// Scan a photographed paper document into a flat, binarized image.
#[derive(Parser)]
#[command(name = "descan", version)]
struct Cli {
    /// Path to the photo to scan (PNG, JPEG, BMP, WebP).
    image_path: Option<PathBuf>,

    /// Where to write the binarized scan.
    #[arg(long, default_value = "scanned.png")]
    output: PathBuf,

    /// Also write the color rectified document to this path.
    #[arg(long)]
    rectified: Option<PathBuf>,

    /// Write per-stage debug images (working copy, edge map, outline,
    /// rectified, scanned) into this directory.
    #[arg(long)]
    stages: Option<PathBuf>,

    /// Write display-sized previews of the original and the scan next to
    /// the output.
    #[arg(long)]
    preview: bool,

    /// Height of the preview images.
    #[arg(long, default_value_t = 650)]
    display_height: u32,

    /// Replace the detected corners: four working-space points as
    /// "x1,y1 x2,y2 x3,y3 x4,y4". Applied by dragging each detected
    /// corner to its replacement, so the editing rules still hold.
    #[arg(long)]
    corners: Option<String>,

    /// Working-copy height used for detection and editing.
    #[arg(long, default_value_t = ScanConfig::DEFAULT_WORKING_HEIGHT)]
    working_height: u32,

    /// Gaussian blur sigma before edge detection.
    #[arg(long, default_value_t = ScanConfig::DEFAULT_BLUR_SIGMA)]
    blur_sigma: f32,

    /// Canny low threshold.
    #[arg(long, default_value_t = ScanConfig::DEFAULT_CANNY_LOW)]
    canny_low: f32,

    /// Canny high threshold.
    #[arg(long, default_value_t = ScanConfig::DEFAULT_CANNY_HIGH)]
    canny_high: f32,

    /// Corner grab distance in working-space pixels.
    #[arg(long, default_value_t = ScanConfig::DEFAULT_PICK_RADIUS)]
    pick_radius: f64,

    /// Local-mean neighborhood size for binarization (odd, >= 3).
    #[arg(long, default_value_t = ScanConfig::DEFAULT_THRESHOLD_WINDOW)]
    threshold_window: u32,

    /// Offset subtracted from the local mean during binarization.
    #[arg(long, default_value_t = ScanConfig::DEFAULT_THRESHOLD_OFFSET)]
    threshold_offset: f64,
}

impl Cli {
    fn config(&self) -> ScanConfig {
        ScanConfig {
            working_height: self.working_height,
            blur_sigma: self.blur_sigma,
            canny_low: self.canny_low,
            canny_high: self.canny_high,
            pick_radius: self.pick_radius,
            threshold_window: self.threshold_window,
            threshold_offset: self.threshold_offset,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let Some(ref image_path) = cli.image_path else {
        eprintln!("{}", ScanError::NoInputSelected);
        return ExitCode::FAILURE;
    };

    let config = cli.config();
    if let Err(e) = config.validate() {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    let corner_targets = match cli.corners.as_deref().map(parse_corners).transpose() {
        Ok(targets) => targets,
        Err(msg) => {
            eprintln!("error parsing --corners: {msg}");
            return ExitCode::FAILURE;
        }
    };

    let image_bytes = match std::fs::read(image_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("error reading {}: {e}", image_path.display());
            return ExitCode::FAILURE;
        }
    };

    let stages = match run_pipeline(&image_bytes, corner_targets, &config) {
        Ok(stages) => stages,
        Err(ScanError::Cancelled) => {
            eprintln!("editing cancelled; no scan produced");
            return ExitCode::from(EXIT_CANCELLED);
        }
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    eprintln!(
        "scanned {}x{} -> {}x{}",
        stages.original.width(),
        stages.original.height(),
        stages.scanned.width(),
        stages.scanned.height(),
    );

    if !write_outputs(&cli, &stages) {
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Run the pipeline stage by stage, reporting progress on stderr.
fn run_pipeline(
    image_bytes: &[u8],
    corner_targets: Option<[Point; 4]>,
    config: &ScanConfig,
) -> Result<ScanStages, ScanError> {
    eprintln!("step 1: edge detection");
    let pre = preprocess::preprocess(image_bytes, config.working_height)?;
    let edges = descan_pipeline::detect::edge_map(&pre.working, config);

    eprintln!("step 2: boundary detection");
    let boundary = descan_pipeline::detect::boundary_from_edges(&edges)?;
    if boundary.is_fallback() {
        eprintln!("  no 4-corner boundary found; using the largest contour's bounding box");
    }
    for (i, p) in boundary.quad().points().iter().enumerate() {
        eprintln!("  corner {i}: ({:.1}, {:.1})", p.x, p.y);
    }

    let events = corner_targets.map_or_else(
        || vec![EditorEvent::Commit],
        |targets| drag_events(boundary.quad().points(), &targets),
    );
    let session = descan_pipeline::EditSession::new(boundary.quad(), config.pick_radius);
    let committed = descan_pipeline::editor::drive(session, events)?;

    eprintln!("step 3: perspective transform");
    let quad = committed.ordered().scaled(pre.ratio);
    let rectified = descan_pipeline::rectify::rectify_ordered(&pre.original, &quad)?;
    let scanned = descan_pipeline::binarize::binarize(
        &rectified,
        config.threshold_window,
        config.threshold_offset,
    );

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

/// Parse "x1,y1 x2,y2 x3,y3 x4,y4" into four points.
fn parse_corners(text: &str) -> Result<[Point; 4], String> {
    let mut points = Vec::with_capacity(4);
    for token in text.split_whitespace() {
        let (x, y) = token
            .split_once(',')
            .ok_or_else(|| format!("expected \"x,y\", got \"{token}\""))?;
        let x: f64 = x
            .trim()
            .parse()
            .map_err(|e| format!("bad x in \"{token}\": {e}"))?;
        let y: f64 = y
            .trim()
            .parse()
            .map_err(|e| format!("bad y in \"{token}\": {e}"))?;
        points.push(Point::new(x, y));
    }
    <[Point; 4]>::try_from(points).map_err(|v| format!("expected 4 corners, got {}", v.len()))
}

/// Synthesize editor events that drag each detected corner to its
/// replacement, then commit.
///
/// Corners are grabbed at their detected positions in index order. A
/// replacement that lands within the pick radius of a corner that has
/// not been dragged yet can divert that corner's grab; overrides this
/// tangled are not supported.
fn drag_events(detected: &[Point; 4], targets: &[Point; 4]) -> Vec<EditorEvent> {
    let mut events = Vec::with_capacity(detected.len() * 3 + 1);
    for (held, target) in detected.iter().zip(targets) {
        events.push(EditorEvent::PointerDown {
            x: held.x,
            y: held.y,
        });
        events.push(EditorEvent::PointerMove {
            x: target.x,
            y: target.y,
        });
        events.push(EditorEvent::PointerUp);
    }
    events.push(EditorEvent::Commit);
    events
}

/// Write all requested output files. Returns `false` if any write fails.
fn write_outputs(cli: &Cli, stages: &ScanStages) -> bool {
    let mut ok = save_image(&stages.scanned, &cli.output);

    if let Some(ref path) = cli.rectified {
        ok &= save_image(&stages.rectified, path);
    }

    if let Some(ref dir) = cli.stages {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("error creating {}: {e}", dir.display());
            return false;
        }
        ok &= save_image(&stages.working, &dir.join("working.png"));
        ok &= save_image(&stages.edges, &dir.join("edges.png"));
        ok &= save_image(&outline_overlay(stages), &dir.join("outline.png"));
        ok &= save_image(&stages.rectified, &dir.join("rectified.png"));
        ok &= save_image(&stages.scanned, &dir.join("scanned.png"));
    }

    if cli.preview {
        let original = preprocess::resize_to_height(&stages.original, cli.display_height);
        let scanned = preprocess::resize_to_height(&stages.scanned, cli.display_height);
        ok &= save_image(&original, &preview_path(&cli.output, "original"));
        ok &= save_image(&scanned, &preview_path(&cli.output, "scanned"));
    }

    ok
}

/// Working copy with the committed boundary drawn on top: the polygon in
/// green, the corner handles as red dots.
fn outline_overlay(stages: &ScanStages) -> RgbaImage {
    const OUTLINE: image::Rgba<u8> = image::Rgba([0, 220, 0, 255]);
    const HANDLE: image::Rgba<u8> = image::Rgba([230, 0, 0, 255]);

    let mut overlay = stages.working.clone();
    let points = stages.committed.points();
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        #[allow(clippy::cast_possible_truncation)]
        imageproc::drawing::draw_line_segment_mut(
            &mut overlay,
            (a.x as f32, a.y as f32),
            (b.x as f32, b.y as f32),
            OUTLINE,
        );
    }
    for p in points {
        #[allow(clippy::cast_possible_truncation)]
        imageproc::drawing::draw_filled_circle_mut(
            &mut overlay,
            (p.x.round() as i32, p.y.round() as i32),
            4,
            HANDLE,
        );
    }
    overlay
}

/// `scanned.png` + `original` -> `scanned.original.png`.
fn preview_path(output: &Path, label: &str) -> PathBuf {
    let stem = output
        .file_stem()
        .map_or_else(|| "preview".to_string(), |s| s.to_string_lossy().into_owned());
    let extension = output
        .extension()
        .map_or_else(|| "png".to_string(), |e| e.to_string_lossy().into_owned());
    output.with_file_name(format!("{stem}.{label}.{extension}"))
}

/// Save an image, reporting failures on stderr.
fn save_image<P>(image: &image::ImageBuffer<P, Vec<P::Subpixel>>, path: &Path) -> bool
where
    P: image::PixelWithColorType,
    [P::Subpixel]: image::EncodableLayout,
{
    match image.save(path) {
        Ok(()) => {
            eprintln!("wrote {}", path.display());
            true
        }
        Err(e) => {
            eprintln!("error writing {}: {e}", path.display());
            false
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parse_corners_accepts_four_pairs() {
        let corners = parse_corners("50,50 450,60 460,480 40,470").unwrap();
        assert_eq!(corners[0], Point::new(50.0, 50.0));
        assert_eq!(corners[3], Point::new(40.0, 470.0));
    }

    #[test]
    fn parse_corners_rejects_wrong_count() {
        assert!(parse_corners("1,2 3,4").is_err());
        assert!(parse_corners("1,2 3,4 5,6 7,8 9,10").is_err());
    }

    #[test]
    fn parse_corners_rejects_malformed_pairs() {
        assert!(parse_corners("1;2 3,4 5,6 7,8").is_err());
        assert!(parse_corners("a,b c,d e,f g,h").is_err());
    }

    #[test]
    fn drag_events_end_with_a_single_commit() {
        let detected = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        let targets = [
            Point::new(1.0, 1.0),
            Point::new(9.0, 1.0),
            Point::new(9.0, 9.0),
            Point::new(1.0, 9.0),
        ];
        let events = drag_events(&detected, &targets);
        assert_eq!(events.len(), 13);
        assert_eq!(events[12], EditorEvent::Commit);
        assert!(
            events[..12]
                .iter()
                .all(|e| !matches!(e, EditorEvent::Commit | EditorEvent::Cancel)),
        );
    }

    #[test]
    fn preview_path_inserts_label_before_extension() {
        let path = preview_path(Path::new("out/scan.png"), "original");
        assert_eq!(path, Path::new("out/scan.original.png"));
    }
}
