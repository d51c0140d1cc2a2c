#![allow(clippy::float_cmp)]

use super::*;
use crate::scene::{Extra, Layer, Line, LineMode, Token};

const EPSILON: f64 = 1e-9;

fn token(id: &str, x: f64, y: f64, radius: f64) -> Token {
    Token {
        id: id.to_owned(),
        x,
        y,
        radius,
        fill: "#d94b4b".to_owned(),
        name: String::new(),
        image: None,
        aura: None,
        extra: Extra::new(),
    }
}

fn asset(id: &str, x: f64, y: f64, w: f64, h: f64, rotation: f64) -> Asset {
    Asset { id: id.to_owned(), name: String::new(), src: "a.png".to_owned(), x, y, width: w, height: h, rotation, extra: Extra::new() }
}

fn scene_with(layer: Layer) -> Scene {
    Scene { layers: vec![layer], ..Scene::default() }
}

// =============================================================
// ResizeAnchor
// =============================================================

#[test]
fn resize_anchor_edges_are_consistent() {
    assert_eq!(ResizeAnchor::Nw.edges(), (true, true, false, false));
    assert_eq!(ResizeAnchor::Se.edges(), (false, false, true, true));
    assert_eq!(ResizeAnchor::N.edges(), (false, true, false, false));
    assert_eq!(ResizeAnchor::ALL.len(), 8);
}

// =============================================================
// Handle geometry
// =============================================================

#[test]
fn handle_positions_unrotated() {
    let a = asset("a", 10.0, 20.0, 100.0, 50.0, 0.0);
    let h = resize_handle_positions(&a);
    assert_eq!(h[0], Point::new(60.0, 20.0));
    assert_eq!(h[3], Point::new(110.0, 70.0));
    assert_eq!(h[7], Point::new(10.0, 20.0));
    let r = rotate_handle_position(&a, 2.0);
    assert_eq!(r, Point::new(60.0, 20.0 - ROTATE_HANDLE_OFFSET_PX / 2.0));
}

#[test]
fn local_world_round_trip_rotated() {
    let a = asset("a", 50.0, 50.0, 80.0, 40.0, 33.0);
    let local = Point::new(12.0, 7.0);
    let back = to_local(&a, to_world(&a, local));
    assert!((back.x - local.x).abs() < EPSILON);
    assert!((back.y - local.y).abs() < EPSILON);
}

#[test]
fn asset_center_rotated_half_turn() {
    let a = asset("a", 0.0, 0.0, 20.0, 10.0, 180.0);
    let c = asset_center(&a);
    assert!((c.x - -10.0).abs() < EPSILON);
    assert!((c.y - -5.0).abs() < EPSILON);
}

// =============================================================
// hit_test
// =============================================================

#[test]
fn hit_token_inside_radius() {
    let mut layer = Layer::new("L");
    layer.tokens.push(token("t", 100.0, 100.0, 20.0));
    let scene = scene_with(layer);
    let hit = hit_test(Point::new(110.0, 110.0), &scene, &Camera::default(), &[]).unwrap();
    assert_eq!(hit.id, "t");
    assert_eq!(hit.kind, EntityKind::Token);
    assert_eq!(hit.part, HitPart::Body);
    assert!(hit_test(Point::new(120.0, 120.0), &scene, &Camera::default(), &[]).is_none());
}

#[test]
fn hit_prefers_topmost_layer_and_tokens_over_assets() {
    let mut lower = Layer::new("lower");
    lower.tokens.push(token("low", 50.0, 50.0, 30.0));
    let mut upper = Layer::new("upper");
    upper.assets.push(asset("a", 0.0, 0.0, 100.0, 100.0, 0.0));
    upper.tokens.push(token("up", 50.0, 50.0, 10.0));
    let scene = Scene { layers: vec![lower, upper], ..Scene::default() };

    let hit = hit_test(Point::new(50.0, 50.0), &scene, &Camera::default(), &[]).unwrap();
    assert_eq!(hit.id, "up");
    let hit = hit_test(Point::new(75.0, 50.0), &scene, &Camera::default(), &[]).unwrap();
    assert_eq!(hit.id, "a");
}

#[test]
fn hidden_layers_are_not_hit() {
    let mut layer = Layer::new("L");
    layer.is_visible = false;
    layer.tokens.push(token("t", 0.0, 0.0, 20.0));
    let scene = scene_with(layer);
    assert!(hit_test(Point::new(0.0, 0.0), &scene, &Camera::default(), &[]).is_none());
}

#[test]
fn hit_rotated_asset_uses_local_frame() {
    let mut layer = Layer::new("L");
    layer.assets.push(asset("a", 0.0, 0.0, 100.0, 10.0, 90.0));
    let scene = scene_with(layer);
    // Rotated 90° about its top-left corner, the asset now covers x in [-10, 0], y in [0, 100].
    assert!(hit_test(Point::new(-5.0, 50.0), &scene, &Camera::default(), &[]).is_some());
    assert!(hit_test(Point::new(50.0, 5.0), &scene, &Camera::default(), &[]).is_none());
}

#[test]
fn hit_line_within_slop() {
    let mut layer = Layer::new("L");
    layer.lines.push(Line { id: "l".to_owned(), points: vec![0.0, 0.0, 100.0, 0.0], color: "#000".to_owned(), mode: LineMode::Line, extra: Extra::new() });
    let scene = scene_with(layer);
    assert!(hit_test(Point::new(50.0, 5.0), &scene, &Camera::default(), &[]).is_some());
    assert!(hit_test(Point::new(50.0, 20.0), &scene, &Camera::default(), &[]).is_none());
    // At zoom 4 the slop shrinks to 2 world units.
    let zoomed = Camera { pan_x: 0.0, pan_y: 0.0, zoom: 4.0 };
    assert!(hit_test(Point::new(50.0, 5.0), &scene, &zoomed, &[]).is_none());
}

#[test]
fn hit_square_with_negative_extent() {
    let mut layer = Layer::new("L");
    layer.shapes.push(Shape {
        id: "s".to_owned(),
        kind: ShapeKind::Square,
        x: 100.0,
        y: 100.0,
        width: -50.0,
        height: -50.0,
        radius: 0.0,
        color: "#000".to_owned(),
        extra: Extra::new(),
    });
    let scene = scene_with(layer);
    assert!(hit_test(Point::new(75.0, 75.0), &scene, &Camera::default(), &[]).is_some());
}

#[test]
fn selected_asset_handles_take_priority() {
    let mut layer = Layer::new("L");
    layer.assets.push(asset("a", 0.0, 0.0, 100.0, 100.0, 0.0));
    let scene = scene_with(layer);
    let selected = vec!["a".to_owned()];
    let cam = Camera::default();

    let hit = hit_test(Point::new(100.0, 100.0), &scene, &cam, &selected).unwrap();
    assert_eq!(hit.part, HitPart::ResizeHandle(ResizeAnchor::Se));
    let hit = hit_test(Point::new(50.0, -ROTATE_HANDLE_OFFSET_PX), &scene, &cam, &selected).unwrap();
    assert_eq!(hit.part, HitPart::RotateHandle);
    // Without a selection the same corner is just the body.
    let hit = hit_test(Point::new(100.0, 100.0), &scene, &cam, &[]).unwrap();
    assert_eq!(hit.part, HitPart::Body);
}

// =============================================================
// select_in_rect
// =============================================================

#[test]
fn marquee_selects_intersecting_tokens_only() {
    let mut layer = Layer::new("L");
    layer.tokens.push(token("a", 0.0, 0.0, 20.0));
    layer.tokens.push(token("b", 100.0, 100.0, 20.0));
    layer.tokens.push(token("c", 500.0, 500.0, 20.0));
    let scene = scene_with(layer);
    let ids = select_in_rect(&scene, &Rect::from_corners(Point::new(0.0, 0.0), Point::new(150.0, 150.0)));
    assert_eq!(ids, vec!["a".to_owned(), "b".to_owned()]);
}

#[test]
fn marquee_includes_assets_and_skips_hidden_layers() {
    let mut visible = Layer::new("V");
    visible.assets.push(asset("asset", 140.0, 140.0, 50.0, 50.0, 0.0));
    let mut hidden = Layer::new("H");
    hidden.is_visible = false;
    hidden.tokens.push(token("hidden", 10.0, 10.0, 20.0));
    let scene = Scene { layers: vec![visible, hidden], ..Scene::default() };
    let ids = select_in_rect(&scene, &Rect::new(0.0, 0.0, 150.0, 150.0));
    assert_eq!(ids, vec!["asset".to_owned()]);
}
