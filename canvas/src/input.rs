//! Input model: drawing modes, modifier keys, mouse buttons, and the gesture state machine.
//!
//! This module defines the types consumed by the input engine. `Mode` and
//! `Modifiers` capture the user's intent at the time of a pointer event.
//! `UiState` is the local, never-persisted state the renderer shows
//! (selection, marquee, measurement, in-progress shape and fog path).
//! `InputState` is the active gesture being tracked between pointer-down and
//! pointer-up, carrying the context needed to apply deltas and commit the
//! final scene mutation on release.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use serde::{Deserialize, Serialize};

use crate::camera::Point;
use crate::consts::DEFAULT_DRAW_COLOR;
use crate::hit::ResizeAnchor;
use crate::scene::{EntityId, Shape};

/// The global drawing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Select, move, and transform entities (default).
    #[default]
    Select,
    /// Straight two-point line.
    Line,
    /// Freehand polyline.
    Free,
    /// Paint grid cells.
    Paint,
    /// Measure a distance.
    Measure,
    /// Reveal areas through the fog of war.
    Fog,
    /// Circle outline.
    Circle,
    /// Square outline.
    Square,
}

impl Mode {
    /// Every mode, in toolbar order.
    pub const ALL: [Mode; 8] = [
        Self::Select,
        Self::Line,
        Self::Free,
        Self::Paint,
        Self::Measure,
        Self::Fog,
        Self::Circle,
        Self::Square,
    ];
}

/// Keyboard/mouse modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    /// Ctrl on most platforms, Command on macOS.
    #[must_use]
    pub fn command(self) -> bool {
        self.ctrl || self.meta
    }
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    /// Left mouse button (or single-finger tap).
    Primary,
    /// Middle mouse button; always pans.
    Middle,
    /// Right mouse button; ignored by the canvas.
    Secondary,
}

/// A keyboard key as reported by the browser (e.g. `"Delete"`, `"Escape"`, `"z"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key(pub String);

impl Key {
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.0.eq_ignore_ascii_case(name)
    }
}

/// Wheel / trackpad scroll delta.
#[derive(Debug, Clone, Copy)]
pub struct WheelDelta {
    pub dx: f64,
    /// Vertical scroll amount in pixels (positive = down = zoom out).
    pub dy: f64,
}

/// Rubber-band selection rectangle, kept in screen space while dragging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marquee {
    pub start: Point,
    pub end: Point,
}

/// A distance readout between two world points.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub start: Point,
    pub end: Point,
    /// Set on pointer-up; the measurement is cleared by the first tick at or
    /// after this time.
    pub expires_at_ms: Option<u64>,
}

impl Measurement {
    /// World-space length.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.start.distance(self.end)
    }
}

/// Local UI state visible to the renderer. Never persisted.
#[derive(Debug, Clone)]
pub struct UiState {
    pub mode: Mode,
    /// Selected entity ids, in selection order, without duplicates.
    pub selected_ids: Vec<EntityId>,
    /// Layer receiving new drawings. Falls back to the first layer.
    pub active_layer: Option<EntityId>,
    /// Stroke, shape, and paint color for new drawings.
    pub color: String,
    pub marquee: Option<Marquee>,
    pub measurement: Option<Measurement>,
    /// Circle or square being dragged out.
    pub draft_shape: Option<Shape>,
    /// Fog reveal path being traced.
    pub fog_draft: Vec<f64>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            selected_ids: Vec::new(),
            active_layer: None,
            color: DEFAULT_DRAW_COLOR.to_owned(),
            marquee: None,
            measurement: None,
            draft_shape: None,
            fog_draft: Vec::new(),
        }
    }
}

impl UiState {
    #[must_use]
    pub fn is_selected(&self, id: &str) -> bool {
        self.selected_ids.iter().any(|s| s == id)
    }

    /// Replace the selection with exactly one id.
    pub fn select_only(&mut self, id: &str) {
        self.selected_ids.clear();
        self.selected_ids.push(id.to_owned());
    }

    /// Add or remove one id from the selection.
    pub fn toggle_selected(&mut self, id: &str) {
        if let Some(pos) = self.selected_ids.iter().position(|s| s == id) {
            self.selected_ids.remove(pos);
        } else {
            self.selected_ids.push(id.to_owned());
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected_ids.clear();
    }

    /// Drop any transient drawing state (marquee, draft shape, fog draft).
    pub fn clear_drafts(&mut self) {
        self.marquee = None;
        self.draft_shape = None;
        self.fog_draft.clear();
    }
}

/// Internal state for the input state machine.
///
/// Each active variant carries gesture context needed to compute deltas and
/// commit the result on pointer-up.
#[derive(Debug, Clone, Default)]
pub enum InputState {
    /// No gesture in progress; waiting for the next pointer-down.
    #[default]
    Idle,
    /// Middle-button drag panning the view.
    Panning {
        /// Screen-space position of the previous pointer event.
        last_screen: Point,
    },
    /// Rubber-band selection on empty canvas (geometry lives in `UiState::marquee`).
    SelectingArea,
    /// Dragging the selected tokens/assets.
    MovingEntities {
        ids: Vec<EntityId>,
        /// World-space pointer position at the previous event.
        last_world: Point,
        /// Whether the pointer has moved since pointer-down.
        moved: bool,
    },
    /// Resizing an asset by one of its eight handles.
    ResizingAsset {
        id: EntityId,
        anchor: ResizeAnchor,
        start_world: Point,
        /// Asset `(x, y, width, height)` at the start of the gesture.
        orig: (f64, f64, f64, f64),
        rotation: f64,
    },
    /// Rotating an asset about its center.
    RotatingAsset {
        id: EntityId,
        center: Point,
        /// Pointer angle (degrees) at the start of the gesture.
        start_angle: f64,
        orig_rotation: f64,
    },
    /// Rubber-banding a straight line.
    DrawingLine { layer_id: EntityId, line_id: EntityId },
    /// Appending points to a freehand stroke.
    DrawingFree { layer_id: EntityId, line_id: EntityId },
    /// Painting cells while the pointer is down.
    Painting {
        /// Whether any cell actually changed during this drag.
        changed: bool,
        /// Alt was held on press: the drag clears cells instead.
        erasing: bool,
    },
    /// Dragging out a measurement.
    Measuring,
    /// Tracing a fog reveal polygon.
    RevealingFog,
    /// Dragging out a circle or square from an anchor.
    DrawingShape { anchor: Point },
}
