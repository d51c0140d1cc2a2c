#![allow(clippy::float_cmp)]

use super::*;

// --- snap_to_grid ---

#[test]
fn snap_rounds_to_nearest_multiple() {
    assert_eq!(snap_to_grid(0.0, 32.0), 0.0);
    assert_eq!(snap_to_grid(15.9, 32.0), 0.0);
    assert_eq!(snap_to_grid(16.1, 32.0), 32.0);
    assert_eq!(snap_to_grid(47.0, 32.0), 32.0);
    assert_eq!(snap_to_grid(-20.0, 32.0), -32.0);
}

#[test]
fn snap_is_idempotent() {
    let grids = [1.0, 7.5, 32.0, 50.0, 100.0];
    let values = [-1234.567, -31.9, -0.2, 0.0, 0.49, 13.0, 16.0, 99.99, 4321.0];
    for g in grids {
        for v in values {
            let once = snap_to_grid(v, g);
            assert_eq!(snap_to_grid(once, g), once, "v={v} g={g}");
        }
    }
}

#[test]
fn snap_with_non_positive_grid_is_identity() {
    assert_eq!(snap_to_grid(13.3, 0.0), 13.3);
    assert_eq!(snap_to_grid(13.3, -4.0), 13.3);
}

// --- cell_index ---

#[test]
fn cell_index_floors() {
    assert_eq!(cell_index(0.0, 32.0), 0);
    assert_eq!(cell_index(31.99, 32.0), 0);
    assert_eq!(cell_index(32.0, 32.0), 1);
    assert_eq!(cell_index(-0.01, 32.0), -1);
    assert_eq!(cell_at(Point::new(70.0, -40.0), 32.0), (2, -2));
}

// --- distance ---

#[test]
fn distance_converts_cells_to_meters() {
    assert_eq!(distance_in_units(64.0, 32.0, 1.5), 3.0);
    assert_eq!(distance_label(32.0), "1.5 m");
    assert_eq!(distance_label(0.0), "0.0 m");
}

// --- Rect ---

#[test]
fn from_corners_normalizes() {
    let r = Rect::from_corners(Point::new(150.0, 10.0), Point::new(50.0, 110.0));
    assert_eq!(r, Rect::new(50.0, 10.0, 100.0, 100.0));
}

#[test]
fn rects_intersect_overlap_and_touch() {
    let a = Rect::new(0.0, 0.0, 10.0, 10.0);
    assert!(rects_intersect(&a, &Rect::new(5.0, 5.0, 10.0, 10.0)));
    assert!(rects_intersect(&a, &Rect::new(10.0, 0.0, 5.0, 5.0)));
    assert!(rects_intersect(&a, &Rect::new(2.0, 2.0, 1.0, 1.0)));
    assert!(!rects_intersect(&a, &Rect::new(10.1, 0.0, 5.0, 5.0)));
    assert!(!rects_intersect(&a, &Rect::new(0.0, -6.0, 5.0, 5.0)));
}

#[test]
fn contains_includes_boundary() {
    let r = Rect::new(0.0, 0.0, 10.0, 10.0);
    assert!(r.contains(Point::new(10.0, 10.0)));
    assert!(!r.contains(Point::new(10.5, 5.0)));
}

#[test]
fn rotated_bounds_quarter_turn() {
    let r = Rect::new(0.0, 0.0, 20.0, 10.0).rotated_bounds(90.0);
    assert!((r.x - -10.0).abs() < 1e-9);
    assert!((r.y - 0.0).abs() < 1e-9);
    assert!((r.width - 10.0).abs() < 1e-9);
    assert!((r.height - 20.0).abs() < 1e-9);
}

// --- Segments and polygons ---

#[test]
fn distance_to_segment_projects_and_clamps() {
    let a = Point::new(0.0, 0.0);
    let b = Point::new(10.0, 0.0);
    assert_eq!(distance_to_segment(Point::new(5.0, 3.0), a, b), 3.0);
    assert_eq!(distance_to_segment(Point::new(13.0, 4.0), a, b), 5.0);
    assert_eq!(distance_to_segment(Point::new(3.0, 4.0), a, a), 5.0);
}

#[test]
fn points_of_ignores_trailing_value() {
    let pts: Vec<Point> = points_of(&[1.0, 2.0, 3.0, 4.0, 5.0]).collect();
    assert_eq!(pts, vec![Point::new(1.0, 2.0), Point::new(3.0, 4.0)]);
}
