use super::*;
use crate::scene::{Extra, Line, LineMode};

fn stroke(scene: &mut Scene, n: usize) {
    #[allow(clippy::cast_precision_loss)]
    let x = n as f64;
    scene.layers[0].lines.push(Line {
        id: format!("line-{n}"),
        points: vec![x, 0.0, x, 10.0],
        color: "#000".to_owned(),
        mode: LineMode::Free,
        extra: Extra::new(),
    });
}

#[test]
fn new_history_holds_initial_state() {
    let scene = Scene::default();
    let history = History::new(&scene);
    assert_eq!(history.len(), 1);
    assert_eq!(history.step(), 0);
    assert!(!history.can_undo());
    assert!(!history.can_redo());
    assert!(!history.is_empty());
}

#[test]
fn undo_n_strokes_returns_to_start_and_redo_returns_to_end() {
    let mut scene = Scene::default();
    let s0 = scene.clone();
    let mut history = History::new(&scene);

    for n in 0..5 {
        stroke(&mut scene, n);
        history.snapshot(&scene);
    }
    let after = scene.clone();
    assert_eq!(history.len(), 6);

    for _ in 0..5 {
        assert!(history.undo(&mut scene));
    }
    assert_eq!(scene, s0);
    assert_eq!(history.step(), 0);

    for _ in 0..5 {
        assert!(history.redo(&mut scene));
    }
    assert_eq!(scene, after);
    assert_eq!(history.step(), 5);
}

#[test]
fn undo_at_start_is_noop() {
    let mut scene = Scene::default();
    let mut history = History::new(&scene);
    let before = scene.clone();
    assert!(!history.undo(&mut scene));
    assert_eq!(scene, before);
    assert_eq!(history.step(), 0);
}

#[test]
fn redo_at_tail_is_noop() {
    let mut scene = Scene::default();
    let mut history = History::new(&scene);
    stroke(&mut scene, 1);
    history.snapshot(&scene);
    let before = scene.clone();
    assert!(!history.redo(&mut scene));
    assert_eq!(scene, before);
    assert_eq!(history.step(), 1);
}

#[test]
fn snapshot_after_undo_discards_future() {
    let mut scene = Scene::default();
    let mut history = History::new(&scene);
    stroke(&mut scene, 1);
    history.snapshot(&scene);
    stroke(&mut scene, 2);
    history.snapshot(&scene);

    history.undo(&mut scene);
    stroke(&mut scene, 3);
    history.snapshot(&scene);

    assert_eq!(history.len(), 3);
    assert!(!history.can_redo());
    assert!(scene.find("line-2").is_none());
    assert!(scene.find("line-3").is_some());
}

#[test]
fn undo_leaves_fog_and_background_alone() {
    let mut scene = Scene::default();
    let mut history = History::new(&scene);
    stroke(&mut scene, 1);
    history.snapshot(&scene);
    scene.set_fog_enabled(true);
    scene.set_background("#000000");

    history.undo(&mut scene);
    assert_eq!(scene.entity_count(), 0);
    assert!(scene.is_fog_enabled);
    assert_eq!(scene.background_color, "#000000");
}

#[test]
fn capacity_drops_oldest_entries() {
    let mut scene = Scene::default();
    let mut history = History::with_capacity(&scene, 3);
    for n in 0..5 {
        stroke(&mut scene, n);
        history.snapshot(&scene);
    }
    assert_eq!(history.len(), 3);
    assert_eq!(history.step(), 2);
    history.undo(&mut scene);
    history.undo(&mut scene);
    assert!(!history.undo(&mut scene));
    assert_eq!(scene.entity_count(), 3);
}

#[test]
fn reset_starts_over() {
    let mut scene = Scene::default();
    let mut history = History::new(&scene);
    stroke(&mut scene, 1);
    history.snapshot(&scene);
    history.reset(&scene);
    assert_eq!(history.len(), 1);
    assert!(!history.undo(&mut scene));
    assert_eq!(scene.entity_count(), 1);
}
