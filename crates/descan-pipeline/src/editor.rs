//! Interactive corner correction as an event-driven state machine.
//!
//! The editor consumes an abstract event stream -- any concrete input
//! device maps to [`EditorEvent`] -- and owns the only mutable state in
//! the pipeline: an [`EditSession`] holding the four boundary corners.
//! Corner indices are stable identities for the whole session; dragging
//! changes coordinates, never which point an index refers to.

use serde::{Deserialize, Serialize};

use crate::quad::Quad;
use crate::types::{Point, ScanError};

/// An abstract interaction event, in working-space coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EditorEvent {
    /// Pointer pressed at the given position.
    PointerDown {
        /// Horizontal pointer position.
        x: f64,
        /// Vertical pointer position.
        y: f64,
    },
    /// Pointer moved to the given position.
    PointerMove {
        /// Horizontal pointer position.
        x: f64,
        /// Vertical pointer position.
        y: f64,
    },
    /// Pointer released.
    PointerUp,
    /// Finalize the current corners. Ignored while a corner is grabbed.
    Commit,
    /// Abort the session. Honored in any state.
    Cancel,
}

/// Terminal outcome of an edit session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionEnd {
    /// The user committed; these are the final corners, still in the
    /// detector's arbitrary order.
    Committed(Quad),
    /// The user aborted; no output may be produced from this session.
    Cancelled,
}

/// Live state of a corner-editing session.
#[derive(Debug, Clone)]
pub struct EditSession {
    points: [Point; 4],
    dragging: Option<usize>,
    pick_radius: f64,
}

impl EditSession {
    /// Start a session over the detected boundary corners.
    #[must_use]
    pub const fn new(quad: Quad, pick_radius: f64) -> Self {
        Self {
            points: *quad.points(),
            dragging: None,
            pick_radius,
        }
    }

    /// The current corner positions, by stable index.
    #[must_use]
    pub const fn points(&self) -> &[Point; 4] {
        &self.points
    }

    /// The current corners as a quad.
    #[must_use]
    pub const fn quad(&self) -> Quad {
        Quad::new(self.points)
    }

    /// Index of the grabbed corner, if any.
    #[must_use]
    pub const fn dragging(&self) -> Option<usize> {
        self.dragging
    }

    /// Apply one event. Returns the terminal outcome once the session
    /// ends; the session must not be used after that.
    pub fn apply(&mut self, event: EditorEvent) -> Option<SessionEnd> {
        match event {
            EditorEvent::PointerDown { x, y } => {
                if self.dragging.is_none() {
                    self.dragging = self.pick(Point::new(x, y));
                }
                None
            }
            EditorEvent::PointerMove { x, y } => {
                if let Some(index) = self.dragging {
                    self.points[index] = Point::new(x, y);
                }
                None
            }
            EditorEvent::PointerUp => {
                self.dragging = None;
                None
            }
            EditorEvent::Commit => {
                if self.dragging.is_none() {
                    Some(SessionEnd::Committed(self.quad()))
                } else {
                    None
                }
            }
            EditorEvent::Cancel => Some(SessionEnd::Cancelled),
        }
    }

    /// The lowest-indexed corner strictly within the pick radius of the
    /// pointer. Scan order is the tie-break and must stay deterministic.
    fn pick(&self, pointer: Point) -> Option<usize> {
        self.points
            .iter()
            .position(|&p| p.distance(pointer) < self.pick_radius)
    }
}

/// Drive a session over an event stream until it ends, returning the
/// committed corners.
///
/// # Errors
///
/// Returns [`ScanError::Cancelled`] if the user cancels, or if the stream
/// ends without a terminal action -- an unfinished session must never
/// produce output.
pub fn drive<E>(session: EditSession, events: E) -> Result<Quad, ScanError>
where
    E: IntoIterator<Item = EditorEvent>,
{
    drive_with_frames(session, events, |_| {})
}

/// Like [`drive`], invoking `on_frame` with the current corner positions
/// after every consumed event -- the redraw hook for a display layer.
///
/// # Errors
///
/// Same conditions as [`drive`].
pub fn drive_with_frames<E, F>(
    mut session: EditSession,
    events: E,
    mut on_frame: F,
) -> Result<Quad, ScanError>
where
    E: IntoIterator<Item = EditorEvent>,
    F: FnMut(&[Point; 4]),
{
    for event in events {
        let end = session.apply(event);
        on_frame(session.points());
        match end {
            Some(SessionEnd::Committed(quad)) => return Ok(quad),
            Some(SessionEnd::Cancelled) => return Err(ScanError::Cancelled),
            None => {}
        }
    }
    Err(ScanError::Cancelled)
}
