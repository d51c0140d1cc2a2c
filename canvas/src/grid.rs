//! Grid snapping, cell indexing, and axis-aligned rectangle tests.
//!
//! Everything here operates in world units and is pure arithmetic.

#[cfg(test)]
#[path = "grid_test.rs"]
mod grid_test;

use crate::camera::Point;
use crate::consts::{GRID_SIZE, UNIT_SCALE};

/// Round `value` to the nearest multiple of `grid`.
///
/// A non-positive `grid` disables snapping and returns `value` unchanged.
#[must_use]
pub fn snap_to_grid(value: f64, grid: f64) -> f64 {
    if grid <= 0.0 {
        return value;
    }
    (value / grid).round() * grid
}

/// Index of the grid cell containing `coord` (floor division).
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn cell_index(coord: f64, grid: f64) -> i64 {
    (coord / grid).floor() as i64
}

/// Cell indices of the cell containing a world point.
#[must_use]
pub fn cell_at(p: Point, grid: f64) -> (i64, i64) {
    (cell_index(p.x, grid), cell_index(p.y, grid))
}

/// Convert a world-space distance into real-world meters.
#[must_use]
pub fn distance_in_units(pixels: f64, grid: f64, unit_scale: f64) -> f64 {
    (pixels / grid) * unit_scale
}

/// Measurement readout for a world-space distance using the default grid.
#[must_use]
pub fn distance_label(pixels: f64) -> String {
    format!("{:.1} m", distance_in_units(pixels, GRID_SIZE, UNIT_SCALE))
}

/// Axis-aligned rectangle in world coordinates. `width` and `height` are
/// never negative once built through [`Rect::from_corners`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Rectangle spanning two arbitrary corners.
    #[must_use]
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }

    /// Bounding square of a circle.
    #[must_use]
    pub fn around_circle(center: Point, radius: f64) -> Self {
        Self::new(center.x - radius, center.y - radius, radius * 2.0, radius * 2.0)
    }

    /// Axis-aligned bounds of this rectangle after rotating it by
    /// `rotation_deg` about its top-left corner.
    #[must_use]
    pub fn rotated_bounds(self, rotation_deg: f64) -> Self {
        if rotation_deg == 0.0 {
            return self;
        }
        let origin = Point::new(self.x, self.y);
        let corners = [
            origin,
            rotate_about(Point::new(self.x + self.width, self.y), origin, rotation_deg),
            rotate_about(Point::new(self.x + self.width, self.y + self.height), origin, rotation_deg),
            rotate_about(Point::new(self.x, self.y + self.height), origin, rotation_deg),
        ];
        let min_x = corners.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
        let min_y = corners.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
        let max_x = corners.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
        let max_y = corners.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);
        Self::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Whether the two rectangles overlap. Touching edges count.
    #[must_use]
    pub fn intersects(&self, other: &Rect) -> bool {
        rects_intersect(self, other)
    }

    /// Whether `p` lies inside or on the boundary.
    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }
}

/// Standard axis-aligned overlap test.
#[must_use]
pub fn rects_intersect(a: &Rect, b: &Rect) -> bool {
    !(b.x > a.right() || b.right() < a.x || b.y > a.bottom() || b.bottom() < a.y)
}

/// Rotate `p` about `pivot` by `deg` degrees (clockwise in screen space).
#[must_use]
pub fn rotate_about(p: Point, pivot: Point, deg: f64) -> Point {
    let (sin, cos) = deg.to_radians().sin_cos();
    let dx = p.x - pivot.x;
    let dy = p.y - pivot.y;
    Point::new(pivot.x + dx * cos - dy * sin, pivot.y + dx * sin + dy * cos)
}

/// Shortest distance from `p` to the segment `a`–`b`.
#[must_use]
pub fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return p.distance(a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    p.distance(Point::new(a.x + t * dx, a.y + t * dy))
}

/// Iterate the `(x, y)` pairs of a flattened point list. A trailing odd value is ignored.
pub fn points_of(flat: &[f64]) -> impl Iterator<Item = Point> + '_ {
    flat.chunks_exact(2).map(|c| Point::new(c[0], c[1]))
}
