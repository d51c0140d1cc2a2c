#[cfg(test)]
#[path = "camera_test.rs"]
mod camera_test;

use crate::consts::{MAX_ZOOM, MIN_ZOOM, ZOOM_STEP};

/// A point in either screen or world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point in the same space.
    #[must_use]
    pub fn distance(self, other: Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// Direction of a discrete zoom step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomDirection {
    In,
    Out,
}

/// Camera state for pan/zoom over the map.
///
/// `pan_x` / `pan_y` are in CSS pixels.
/// `zoom` is a scale factor (1.0 = no zoom).
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub pan_x: f64,
    pub pan_y: f64,
    pub zoom: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self { pan_x: 0.0, pan_y: 0.0, zoom: 1.0 }
    }
}

impl Camera {
    /// Convert a screen-space point (CSS pixels) to world coordinates.
    #[must_use]
    pub fn screen_to_world(&self, screen: Point) -> Point {
        Point {
            x: (screen.x - self.pan_x) / self.zoom,
            y: (screen.y - self.pan_y) / self.zoom,
        }
    }

    /// Convert a world-space point to screen coordinates (CSS pixels).
    #[must_use]
    pub fn world_to_screen(&self, world: Point) -> Point {
        Point {
            x: world.x * self.zoom + self.pan_x,
            y: world.y * self.zoom + self.pan_y,
        }
    }

    /// Convert a screen-space distance (pixels) to world-space distance.
    #[must_use]
    pub fn screen_dist_to_world(&self, screen_dist: f64) -> f64 {
        screen_dist / self.zoom
    }

    /// Shift the view by a screen-space delta.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.pan_x += dx;
        self.pan_y += dy;
    }

    /// Scale the zoom by `factor` while keeping the world point under
    /// `anchor` (screen space) at the same screen position.
    ///
    /// The resulting zoom is clamped to `[MIN_ZOOM, MAX_ZOOM]`.
    pub fn zoom_at(&mut self, anchor: Point, factor: f64) {
        let world = self.screen_to_world(anchor);
        let zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        self.zoom = zoom;
        self.pan_x = anchor.x - world.x * zoom;
        self.pan_y = anchor.y - world.y * zoom;
    }

    /// Apply one `ZOOM_STEP` in the given direction, anchored at `anchor`.
    pub fn step_zoom(&mut self, anchor: Point, direction: ZoomDirection) {
        let factor = match direction {
            ZoomDirection::In => ZOOM_STEP,
            ZoomDirection::Out => 1.0 / ZOOM_STEP,
        };
        self.zoom_at(anchor, factor);
    }
}
