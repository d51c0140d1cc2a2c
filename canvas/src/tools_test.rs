#![allow(clippy::float_cmp)]

use super::*;
use crate::scene::{Asset, Extra, Token};

// =============================================================
// Helpers
// =============================================================

struct Rig {
    scene: Scene,
    ui: UiState,
    input: InputState,
    history: History,
    camera: Camera,
    now_ms: u64,
}

impl Rig {
    fn new() -> Self {
        let scene = Scene::default();
        let history = History::new(&scene);
        Self { scene, ui: UiState::default(), input: InputState::Idle, history, camera: Camera::default(), now_ms: 0 }
    }

    fn ctx(&mut self) -> ToolCtx<'_> {
        ToolCtx {
            scene: &mut self.scene,
            ui: &mut self.ui,
            input: &mut self.input,
            history: &mut self.history,
            camera: &self.camera,
            now_ms: self.now_ms,
        }
    }

    fn down(&mut self, mode: Mode, x: f64, y: f64) -> Vec<Action> {
        handler_for(mode).down(&mut self.ctx(), sample(x, y))
    }

    fn drag(&mut self, mode: Mode, x: f64, y: f64) -> Vec<Action> {
        handler_for(mode).drag(&mut self.ctx(), sample(x, y))
    }

    fn up(&mut self, mode: Mode, x: f64, y: f64) -> Vec<Action> {
        handler_for(mode).up(&mut self.ctx(), sample(x, y))
    }

    fn layer(&self) -> &crate::scene::Layer {
        &self.scene.layers[0]
    }
}

fn sample(x: f64, y: f64) -> PointerSample {
    PointerSample { screen: Point::new(x, y), world: Point::new(x, y), modifiers: Modifiers::default() }
}

fn shift_sample(x: f64, y: f64) -> PointerSample {
    PointerSample { modifiers: Modifiers { shift: true, ..Modifiers::default() }, ..sample(x, y) }
}

fn changed(actions: &[Action]) -> bool {
    actions.iter().any(|a| matches!(a, Action::SceneChanged))
}

fn token_at(rig: &mut Rig, id: &str, x: f64, y: f64) {
    let layer = rig.scene.layers[0].id.clone();
    let token = Token {
        id: id.to_owned(),
        x,
        y,
        radius: 20.0,
        fill: "#000".to_owned(),
        name: String::new(),
        image: None,
        aura: None,
        extra: Extra::new(),
    };
    rig.scene.add_token(&layer, token).unwrap();
}

fn asset_at(rig: &mut Rig, id: &str, x: f64, y: f64, w: f64, h: f64) {
    rig.scene.layers[0].assets.push(Asset {
        id: id.to_owned(),
        name: String::new(),
        src: "a.png".to_owned(),
        x,
        y,
        width: w,
        height: h,
        rotation: 0.0,
        extra: Extra::new(),
    });
}

// =============================================================
// Dispatch table
// =============================================================

#[test]
fn every_mode_has_a_handler_with_a_cursor() {
    for mode in Mode::ALL {
        let cursor = handler_for(mode).cursor();
        assert!(!cursor.is_empty());
    }
    assert_eq!(handler_for(Mode::Select).cursor(), "default");
    assert_eq!(handler_for(Mode::Paint).cursor(), "crosshair");
}

#[test]
fn active_layer_falls_back_to_first() {
    let mut rig = Rig::new();
    let first = rig.scene.layers[0].id.clone();
    assert_eq!(active_layer_id(&rig.scene, &rig.ui), Some(first.clone()));

    rig.ui.active_layer = Some("gone".to_owned());
    assert_eq!(active_layer_id(&rig.scene, &rig.ui), Some(first));

    let second = rig.scene.add_layer("Second");
    rig.ui.active_layer = Some(second.clone());
    assert_eq!(active_layer_id(&rig.scene, &rig.ui), Some(second));
}

// =============================================================
// Line / free
// =============================================================

#[test]
fn line_rubber_bands_second_point_only() {
    let mut rig = Rig::new();
    rig.down(Mode::Line, 10.0, 10.0);
    assert_eq!(rig.layer().lines[0].points, vec![10.0, 10.0, 10.0, 10.0]);
    rig.drag(Mode::Line, 30.0, 30.0);
    rig.drag(Mode::Line, 40.0, 20.0);
    assert_eq!(rig.layer().lines[0].points, vec![10.0, 10.0, 40.0, 20.0]);
    let actions = rig.up(Mode::Line, 50.0, 10.0);
    assert!(changed(&actions));
    assert_eq!(rig.layer().lines[0].points, vec![10.0, 10.0, 50.0, 10.0]);
    assert_eq!(rig.layer().lines[0].mode, LineMode::Line);
    assert_eq!(rig.history.len(), 2);
    assert!(matches!(rig.input, InputState::Idle));
}

#[test]
fn line_uses_current_color() {
    let mut rig = Rig::new();
    rig.ui.color = "#00ff00".to_owned();
    rig.down(Mode::Line, 0.0, 0.0);
    rig.up(Mode::Line, 5.0, 5.0);
    assert_eq!(rig.layer().lines[0].color, "#00ff00");
}

#[test]
fn free_appends_points_while_dragging() {
    let mut rig = Rig::new();
    rig.down(Mode::Free, 0.0, 0.0);
    rig.drag(Mode::Free, 1.0, 1.0);
    rig.drag(Mode::Free, 2.0, 3.0);
    rig.up(Mode::Free, 2.0, 3.0);
    let line = &rig.layer().lines[0];
    assert_eq!(line.mode, LineMode::Free);
    assert_eq!(line.points, vec![0.0, 0.0, 1.0, 1.0, 2.0, 3.0]);
    assert_eq!(rig.history.len(), 2);
}

#[test]
fn stroke_goes_to_active_layer() {
    let mut rig = Rig::new();
    let second = rig.scene.add_layer("Second");
    rig.ui.active_layer = Some(second.clone());
    rig.down(Mode::Free, 0.0, 0.0);
    rig.up(Mode::Free, 0.0, 0.0);
    assert!(rig.scene.layers[0].lines.is_empty());
    assert_eq!(rig.scene.layer(&second).unwrap().lines.len(), 1);
}

#[test]
fn drag_without_down_does_nothing() {
    let mut rig = Rig::new();
    assert!(rig.drag(Mode::Line, 5.0, 5.0).is_empty());
    assert!(rig.up(Mode::Free, 5.0, 5.0).is_empty());
    assert_eq!(rig.scene.entity_count(), 0);
    assert_eq!(rig.history.len(), 1);
}

#[test]
fn cancel_commits_partial_stroke() {
    let mut rig = Rig::new();
    rig.down(Mode::Free, 0.0, 0.0);
    rig.drag(Mode::Free, 4.0, 4.0);
    let actions = handler_for(Mode::Free).cancel(&mut rig.ctx());
    assert!(changed(&actions));
    assert_eq!(rig.layer().lines.len(), 1);
    assert_eq!(rig.history.len(), 2);
    assert!(matches!(rig.input, InputState::Idle));
}

// =============================================================
// Paint
// =============================================================

#[test]
fn paint_drag_upserts_cells_and_snapshots_once() {
    let mut rig = Rig::new();
    rig.ui.color = "#ff0000".to_owned();
    rig.down(Mode::Paint, 5.0, 5.0);
    rig.drag(Mode::Paint, 10.0, 10.0);
    rig.drag(Mode::Paint, 40.0, 5.0);
    let actions = rig.up(Mode::Paint, 40.0, 5.0);
    assert!(changed(&actions));
    assert_eq!(rig.scene.painted_cells.len(), 2);
    assert_eq!(rig.scene.cell_color(0, 0), Some("#ff0000"));
    assert_eq!(rig.scene.cell_color(1, 0), Some("#ff0000"));
    assert_eq!(rig.history.len(), 2);
}

#[test]
fn alt_drag_in_paint_mode_erases_cells() {
    let mut rig = Rig::new();
    rig.scene.paint_cell(0, 0, "#ff0000");
    rig.scene.paint_cell(1, 0, "#ff0000");
    rig.scene.paint_cell(5, 5, "#00ff00");
    let alt = |x, y| PointerSample { modifiers: Modifiers { alt: true, ..Modifiers::default() }, ..sample(x, y) };

    let handler = handler_for(Mode::Paint);
    handler.down(&mut rig.ctx(), alt(5.0, 5.0));
    handler.drag(&mut rig.ctx(), alt(40.0, 5.0));
    let actions = handler.up(&mut rig.ctx(), alt(40.0, 5.0));

    assert!(changed(&actions));
    assert_eq!(rig.scene.cell_color(0, 0), None);
    assert_eq!(rig.scene.cell_color(1, 0), None);
    assert_eq!(rig.scene.cell_color(5, 5), Some("#00ff00"));
    assert_eq!(rig.history.len(), 2);
}

#[test]
fn erasing_bare_cells_is_not_a_change() {
    let mut rig = Rig::new();
    let alt = PointerSample { modifiers: Modifiers { alt: true, ..Modifiers::default() }, ..sample(5.0, 5.0) };
    let handler = handler_for(Mode::Paint);
    handler.down(&mut rig.ctx(), alt);
    let actions = handler.up(&mut rig.ctx(), alt);
    assert!(!changed(&actions));
    assert_eq!(rig.history.len(), 1);
}

#[test]
fn paint_negative_coordinates_use_floor() {
    let mut rig = Rig::new();
    rig.down(Mode::Paint, -1.0, -33.0);
    rig.up(Mode::Paint, -1.0, -33.0);
    assert_eq!(rig.scene.painted_cells[0].x, -1);
    assert_eq!(rig.scene.painted_cells[0].y, -2);
}

#[test]
fn repainting_same_color_is_not_a_change() {
    let mut rig = Rig::new();
    rig.down(Mode::Paint, 5.0, 5.0);
    rig.up(Mode::Paint, 5.0, 5.0);
    rig.down(Mode::Paint, 6.0, 6.0);
    let actions = rig.up(Mode::Paint, 6.0, 6.0);
    assert!(!changed(&actions));
    assert_eq!(rig.history.len(), 2);
}

// =============================================================
// Measure
// =============================================================

#[test]
fn measure_sets_expiry_and_schedules_tick() {
    let mut rig = Rig::new();
    rig.now_ms = 1_000;
    rig.down(Mode::Measure, 0.0, 0.0);
    assert_eq!(rig.ui.measurement.as_ref().unwrap().length(), 0.0);
    rig.drag(Mode::Measure, 32.0, 0.0);
    let actions = rig.up(Mode::Measure, 64.0, 0.0);
    let m = rig.ui.measurement.as_ref().unwrap();
    assert_eq!(m.length(), 64.0);
    assert_eq!(m.expires_at_ms, Some(1_000 + MEASURE_DISPLAY_MS));
    assert!(actions.iter().any(|a| matches!(a, Action::ScheduleTick { delay_ms } if *delay_ms == MEASURE_DISPLAY_MS)));
    assert!(!changed(&actions));
}

// =============================================================
// Fog
// =============================================================

#[test]
fn fog_path_commits_on_up() {
    let mut rig = Rig::new();
    rig.down(Mode::Fog, 0.0, 0.0);
    rig.drag(Mode::Fog, 100.0, 0.0);
    rig.drag(Mode::Fog, 100.0, 100.0);
    assert_eq!(rig.ui.fog_draft.len(), 6);
    let actions = rig.up(Mode::Fog, 100.0, 100.0);
    assert!(changed(&actions));
    assert_eq!(rig.scene.fog_paths, vec![vec![0.0, 0.0, 100.0, 0.0, 100.0, 100.0]]);
    assert!(rig.ui.fog_draft.is_empty());
    // Fog is not part of the undoable state.
    assert_eq!(rig.history.len(), 1);
}

// =============================================================
// Shapes
// =============================================================

#[test]
fn circle_radius_is_distance_from_anchor() {
    let mut rig = Rig::new();
    rig.down(Mode::Circle, 10.0, 10.0);
    rig.drag(Mode::Circle, 13.0, 14.0);
    assert_eq!(rig.ui.draft_shape.as_ref().unwrap().radius, 5.0);
    assert!(rig.layer().shapes.is_empty());
    rig.up(Mode::Circle, 13.0, 14.0);
    let shape = &rig.layer().shapes[0];
    assert_eq!(shape.kind, ShapeKind::Circle);
    assert_eq!(shape.radius, 5.0);
    assert!(!shape.id.is_empty());
    assert!(rig.ui.draft_shape.is_none());
    assert_eq!(rig.history.len(), 2);
}

#[test]
fn square_grows_in_any_direction() {
    let mut rig = Rig::new();
    rig.down(Mode::Square, 100.0, 100.0);
    rig.up(Mode::Square, 60.0, 130.0);
    let shape = &rig.layer().shapes[0];
    assert_eq!(shape.kind, ShapeKind::Square);
    assert_eq!((shape.x, shape.y), (100.0, 100.0));
    assert_eq!((shape.width, shape.height), (-40.0, 30.0));
}

#[test]
fn shape_cancel_discards_draft() {
    let mut rig = Rig::new();
    rig.down(Mode::Square, 0.0, 0.0);
    rig.drag(Mode::Square, 10.0, 10.0);
    handler_for(Mode::Square).cancel(&mut rig.ctx());
    assert!(rig.ui.draft_shape.is_none());
    assert!(rig.layer().shapes.is_empty());
    assert_eq!(rig.history.len(), 1);
}

// =============================================================
// Select
// =============================================================

#[test]
fn click_selects_exclusively() {
    let mut rig = Rig::new();
    token_at(&mut rig, "a", 0.0, 0.0);
    token_at(&mut rig, "b", 100.0, 0.0);
    rig.ui.selected_ids = vec!["a".to_owned()];
    rig.down(Mode::Select, 100.0, 0.0);
    rig.up(Mode::Select, 100.0, 0.0);
    assert_eq!(rig.ui.selected_ids, vec!["b".to_owned()]);
}

#[test]
fn click_on_selected_member_keeps_group() {
    let mut rig = Rig::new();
    token_at(&mut rig, "a", 0.0, 0.0);
    token_at(&mut rig, "b", 100.0, 0.0);
    rig.ui.selected_ids = vec!["a".to_owned(), "b".to_owned()];
    rig.down(Mode::Select, 0.0, 0.0);
    assert_eq!(rig.ui.selected_ids.len(), 2);
    assert!(matches!(rig.input, InputState::MovingEntities { ref ids, .. } if ids.len() == 2));
}

#[test]
fn shift_click_toggles_membership() {
    let mut rig = Rig::new();
    token_at(&mut rig, "a", 0.0, 0.0);
    token_at(&mut rig, "b", 100.0, 0.0);
    rig.ui.selected_ids = vec!["a".to_owned()];
    handler_for(Mode::Select).down(&mut rig.ctx(), shift_sample(100.0, 0.0));
    handler_for(Mode::Select).up(&mut rig.ctx(), shift_sample(100.0, 0.0));
    assert_eq!(rig.ui.selected_ids, vec!["a".to_owned(), "b".to_owned()]);
    handler_for(Mode::Select).down(&mut rig.ctx(), shift_sample(0.0, 0.0));
    handler_for(Mode::Select).up(&mut rig.ctx(), shift_sample(0.0, 0.0));
    assert_eq!(rig.ui.selected_ids, vec!["b".to_owned()]);
}

#[test]
fn click_on_empty_canvas_clears_selection() {
    let mut rig = Rig::new();
    token_at(&mut rig, "a", 0.0, 0.0);
    rig.ui.selected_ids = vec!["a".to_owned()];
    rig.down(Mode::Select, 300.0, 300.0);
    rig.up(Mode::Select, 301.0, 300.0);
    assert!(rig.ui.selected_ids.is_empty());
    assert!(rig.ui.marquee.is_none());
}

#[test]
fn marquee_selects_by_bounds() {
    let mut rig = Rig::new();
    token_at(&mut rig, "a", 0.0, 0.0);
    token_at(&mut rig, "b", 100.0, 100.0);
    token_at(&mut rig, "c", 500.0, 500.0);
    rig.down(Mode::Select, 150.0, 150.0);
    rig.drag(Mode::Select, 60.0, 60.0);
    assert!(rig.ui.marquee.is_some());
    rig.up(Mode::Select, 0.0, 0.0);
    assert_eq!(rig.ui.selected_ids, vec!["a".to_owned(), "b".to_owned()]);
}

#[test]
fn marquee_is_converted_through_camera() {
    let mut rig = Rig::new();
    token_at(&mut rig, "far", 500.0, 500.0);
    rig.camera = Camera { pan_x: -400.0, pan_y: -400.0, zoom: 1.0 };
    rig.down(Mode::Select, 50.0, 50.0);
    rig.up(Mode::Select, 150.0, 150.0);
    assert_eq!(rig.ui.selected_ids, vec!["far".to_owned()]);
}

#[test]
fn move_snaps_on_release_and_snapshots() {
    let mut rig = Rig::new();
    token_at(&mut rig, "a", 0.0, 0.0);
    rig.down(Mode::Select, 0.0, 0.0);
    rig.drag(Mode::Select, 10.0, 5.0);
    assert_eq!((rig.layer().tokens[0].x, rig.layer().tokens[0].y), (10.0, 5.0));
    rig.drag(Mode::Select, 20.0, 50.0);
    assert_eq!((rig.layer().tokens[0].x, rig.layer().tokens[0].y), (20.0, 50.0));
    let actions = rig.up(Mode::Select, 20.0, 50.0);
    assert!(changed(&actions));
    assert_eq!((rig.layer().tokens[0].x, rig.layer().tokens[0].y), (32.0, 64.0));
    assert_eq!(rig.history.len(), 2);
}

#[test]
fn click_without_move_is_not_a_change() {
    let mut rig = Rig::new();
    token_at(&mut rig, "a", 3.0, 3.0);
    rig.down(Mode::Select, 3.0, 3.0);
    let actions = rig.up(Mode::Select, 3.0, 3.0);
    assert!(!changed(&actions));
    assert_eq!(rig.layer().tokens[0].x, 3.0);
}

#[test]
fn resize_se_handle_grows_asset() {
    let mut rig = Rig::new();
    asset_at(&mut rig, "a", 0.0, 0.0, 64.0, 64.0);
    rig.ui.selected_ids = vec!["a".to_owned()];
    rig.down(Mode::Select, 64.0, 64.0);
    assert!(matches!(rig.input, InputState::ResizingAsset { .. }));
    rig.drag(Mode::Select, 96.0, 80.0);
    let a = &rig.layer().assets[0];
    assert_eq!((a.width, a.height), (96.0, 80.0));
    let actions = rig.up(Mode::Select, 96.0, 80.0);
    assert!(changed(&actions));
    assert_eq!(rig.history.len(), 2);
}

#[test]
fn resize_nw_handle_keeps_opposite_corner() {
    let mut rig = Rig::new();
    asset_at(&mut rig, "a", 0.0, 0.0, 64.0, 64.0);
    rig.ui.selected_ids = vec!["a".to_owned()];
    rig.down(Mode::Select, 0.0, 0.0);
    rig.drag(Mode::Select, 32.0, 16.0);
    let a = &rig.layer().assets[0];
    assert_eq!((a.x, a.y, a.width, a.height), (32.0, 16.0, 32.0, 48.0));
}

#[test]
fn resize_clamps_to_minimum_size() {
    let mut rig = Rig::new();
    asset_at(&mut rig, "a", 0.0, 0.0, 64.0, 64.0);
    rig.ui.selected_ids = vec!["a".to_owned()];
    rig.down(Mode::Select, 64.0, 32.0);
    rig.drag(Mode::Select, -200.0, 32.0);
    assert_eq!(rig.layer().assets[0].width, MIN_ASSET_SIZE);
}

#[test]
fn rotate_handle_turns_about_center() {
    let mut rig = Rig::new();
    asset_at(&mut rig, "a", 0.0, 0.0, 64.0, 64.0);
    rig.ui.selected_ids = vec!["a".to_owned()];
    // Rotate handle sits above the top edge's midpoint.
    rig.down(Mode::Select, 32.0, -24.0);
    assert!(matches!(rig.input, InputState::RotatingAsset { .. }));
    // Quarter turn clockwise: pointer moves to the right of the center.
    rig.drag(Mode::Select, 120.0, 32.0);
    let a = rig.layer().assets[0].clone();
    assert!((a.rotation - 90.0).abs() < 1e-9);
    let c = hit::asset_center(&a);
    assert!((c.x - 32.0).abs() < 1e-9);
    assert!((c.y - 32.0).abs() < 1e-9);
}
