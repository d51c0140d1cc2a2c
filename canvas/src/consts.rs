//! Shared numeric constants for the canvas crate.

// ── Grid ────────────────────────────────────────────────────────

/// Edge length of one map grid cell in world units.
pub const GRID_SIZE: f64 = 32.0;

/// Real-world distance represented by one grid cell, in meters.
pub const UNIT_SCALE: f64 = 1.5;

// ── Camera ──────────────────────────────────────────────────────

/// Multiplicative zoom step per wheel tick or zoom button press.
pub const ZOOM_STEP: f64 = 1.1;

/// Smallest allowed camera zoom.
pub const MIN_ZOOM: f64 = 0.1;

/// Largest allowed camera zoom.
pub const MAX_ZOOM: f64 = 10.0;

// ── Interaction ─────────────────────────────────────────────────

/// Screen-space hit slop in pixels for handles and thin strokes.
pub const HANDLE_RADIUS_PX: f64 = 8.0;

/// Distance from the bounding box edge to the rotate handle, in screen pixels.
pub const ROTATE_HANDLE_OFFSET_PX: f64 = 24.0;

/// Marquee drags smaller than this (screen pixels, both axes) count as clicks.
pub const MARQUEE_MIN_PX: f64 = 2.0;

/// Smallest width or height an asset can be resized to, in world units.
pub const MIN_ASSET_SIZE: f64 = 8.0;

/// How long a finished measurement stays on screen.
pub const MEASURE_DISPLAY_MS: u64 = 3000;

// ── Scene defaults ──────────────────────────────────────────────

/// Radius of a freshly placed token, in world units.
pub const DEFAULT_TOKEN_RADIUS: f64 = 20.0;

/// Solid fill used by tokens without an image.
pub const DEFAULT_TOKEN_FILL: &str = "#d94b4b";

/// Default map background.
pub const DEFAULT_BACKGROUND: &str = "#ffffff";

/// Default stroke and paint color for new drawings.
pub const DEFAULT_DRAW_COLOR: &str = "#1f1a17";

/// Maximum number of snapshots retained by the undo history.
pub const MAX_HISTORY: usize = 200;
