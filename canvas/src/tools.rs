//! Per-mode pointer handlers.
//!
//! DESIGN
//! ======
//! Every drawing mode gets its own [`ToolHandler`] that reacts to
//! pointer-down, drag, and pointer-up. [`handler_for`] is the dispatch table,
//! so the engine never branches on the mode itself. Handlers receive a
//! [`ToolCtx`] that borrows everything they are allowed to touch. Most
//! handlers return [`Action::RenderNeeded`] for visual changes and
//! [`Action::SceneChanged`] when the persisted scene changed.
//!
//! History is recorded on commit (pointer-up or cancel), never on each
//! intermediate move, so one gesture is one undo step.

#[cfg(test)]
#[path = "tools_test.rs"]
mod tools_test;

use crate::camera::{Camera, Point};
use crate::consts::{GRID_SIZE, MARQUEE_MIN_PX, MEASURE_DISPLAY_MS, MIN_ASSET_SIZE};
use crate::engine::Action;
use crate::grid::{Rect, cell_at, rotate_about};
use crate::history::History;
use crate::hit::{self, HitPart};
use crate::input::{InputState, Marquee, Measurement, Mode, Modifiers, UiState};
use crate::scene::{EntityId, EntityKind, Extra, Line, LineMode, Scene, Shape, ShapeKind, TransformEnd, new_id};

/// Rotation snap increment while shift is held.
const ROTATE_SNAP_DEG: f64 = 15.0;

/// One pointer sample, already converted to world space.
#[derive(Debug, Clone, Copy)]
pub struct PointerSample {
    pub screen: Point,
    pub world: Point,
    pub modifiers: Modifiers,
}

/// Everything a tool may read or mutate while handling an event.
pub struct ToolCtx<'a> {
    pub scene: &'a mut Scene,
    pub ui: &'a mut UiState,
    pub input: &'a mut InputState,
    pub history: &'a mut History,
    pub camera: &'a Camera,
    /// Host-supplied clock, milliseconds.
    pub now_ms: u64,
}

impl ToolCtx<'_> {
    /// Layer that receives new drawings: the chosen active layer if it still
    /// exists, otherwise the first layer.
    #[must_use]
    pub fn active_layer_id(&self) -> Option<EntityId> {
        active_layer_id(self.scene, self.ui)
    }

    fn commit(&mut self) -> Vec<Action> {
        self.history.snapshot(self.scene);
        vec![Action::RenderNeeded, Action::SceneChanged]
    }
}

/// See [`ToolCtx::active_layer_id`].
#[must_use]
pub fn active_layer_id(scene: &Scene, ui: &UiState) -> Option<EntityId> {
    ui.active_layer
        .as_deref()
        .and_then(|id| scene.layer(id))
        .or_else(|| scene.layers.first())
        .map(|l| l.id.clone())
}

/// Pointer handling for one mode.
pub trait ToolHandler {
    fn down(&self, ctx: &mut ToolCtx<'_>, at: PointerSample) -> Vec<Action>;
    fn drag(&self, ctx: &mut ToolCtx<'_>, at: PointerSample) -> Vec<Action>;
    fn up(&self, ctx: &mut ToolCtx<'_>, at: PointerSample) -> Vec<Action>;

    /// Abandon the current gesture. Partial strokes and moves are committed
    /// as they stand; drafts are discarded by the caller.
    fn cancel(&self, _ctx: &mut ToolCtx<'_>) -> Vec<Action> {
        Vec::new()
    }

    /// CSS cursor shown while this mode is active.
    fn cursor(&self) -> &'static str {
        "crosshair"
    }
}

pub struct SelectTool;
pub struct LineTool;
pub struct FreeTool;
pub struct PaintTool;
pub struct MeasureTool;
pub struct FogTool;
pub struct ShapeTool(pub ShapeKind);

/// The mode -> handler table.
#[must_use]
pub fn handler_for(mode: Mode) -> &'static dyn ToolHandler {
    match mode {
        Mode::Select => &SelectTool,
        Mode::Line => &LineTool,
        Mode::Free => &FreeTool,
        Mode::Paint => &PaintTool,
        Mode::Measure => &MeasureTool,
        Mode::Fog => &FogTool,
        Mode::Circle => &ShapeTool(ShapeKind::Circle),
        Mode::Square => &ShapeTool(ShapeKind::Square),
    }
}

// =============================================================
// Select: click, marquee, move, resize, rotate
// =============================================================

impl ToolHandler for SelectTool {
    fn down(&self, ctx: &mut ToolCtx<'_>, at: PointerSample) -> Vec<Action> {
        let Some(hit) = hit::hit_test(at.world, ctx.scene, ctx.camera, &ctx.ui.selected_ids) else {
            if !at.modifiers.shift {
                ctx.ui.clear_selection();
            }
            ctx.ui.marquee = Some(Marquee { start: at.screen, end: at.screen });
            *ctx.input = InputState::SelectingArea;
            return vec![Action::RenderNeeded];
        };

        match hit.part {
            HitPart::RotateHandle => {
                if let Some(asset) = ctx.scene.asset_mut(&hit.id) {
                    let center = hit::asset_center(asset);
                    *ctx.input = InputState::RotatingAsset {
                        id: hit.id,
                        center,
                        start_angle: angle_deg(center, at.world),
                        orig_rotation: asset.rotation,
                    };
                }
            }
            HitPart::ResizeHandle(anchor) => {
                if let Some(asset) = ctx.scene.asset_mut(&hit.id) {
                    *ctx.input = InputState::ResizingAsset {
                        id: hit.id,
                        anchor,
                        start_world: at.world,
                        orig: (asset.x, asset.y, asset.width, asset.height),
                        rotation: asset.rotation,
                    };
                }
            }
            HitPart::Body => {
                if at.modifiers.shift {
                    ctx.ui.toggle_selected(&hit.id);
                    if !ctx.ui.is_selected(&hit.id) {
                        return vec![Action::RenderNeeded];
                    }
                } else if !ctx.ui.is_selected(&hit.id) {
                    ctx.ui.select_only(&hit.id);
                }
                let ids = movable_ids(ctx.scene, &ctx.ui.selected_ids);
                if !ids.is_empty() {
                    *ctx.input = InputState::MovingEntities { ids, last_world: at.world, moved: false };
                }
            }
        }
        vec![Action::RenderNeeded]
    }

    fn drag(&self, ctx: &mut ToolCtx<'_>, at: PointerSample) -> Vec<Action> {
        match &mut *ctx.input {
            InputState::SelectingArea => {
                if let Some(m) = ctx.ui.marquee.as_mut() {
                    m.end = at.screen;
                }
            }
            InputState::MovingEntities { ids, last_world, moved } => {
                let (dx, dy) = (at.world.x - last_world.x, at.world.y - last_world.y);
                for id in ids.iter() {
                    ctx.scene.translate_entity(id, dx, dy);
                }
                *last_world = at.world;
                *moved = true;
            }
            InputState::ResizingAsset { id, anchor, start_world, orig, rotation } => {
                let Some(asset) = ctx.scene.asset_mut(id) else {
                    return Vec::new();
                };
                let (x, y, w, h) = *orig;
                let pivot = Point::new(x, y);
                // Pointer delta in the asset's unrotated frame.
                let d = rotate_about(
                    Point::new(pivot.x + at.world.x - start_world.x, pivot.y + at.world.y - start_world.y),
                    pivot,
                    -*rotation,
                );
                let (ldx, ldy) = (d.x - pivot.x, d.y - pivot.y);
                let (left_edge, top_edge, right_edge, bottom_edge) = anchor.edges();

                let mut left = if left_edge { ldx } else { 0.0 };
                let mut top = if top_edge { ldy } else { 0.0 };
                let right = if right_edge { w + ldx } else { w };
                let bottom = if bottom_edge { h + ldy } else { h };
                let width = (right - left).max(MIN_ASSET_SIZE);
                let height = (bottom - top).max(MIN_ASSET_SIZE);
                if left_edge {
                    left = right - width;
                }
                if top_edge {
                    top = bottom - height;
                }

                let origin = rotate_about(Point::new(x + left, y + top), pivot, *rotation);
                asset.x = origin.x;
                asset.y = origin.y;
                asset.width = width;
                asset.height = height;
            }
            InputState::RotatingAsset { id, center, start_angle, orig_rotation } => {
                let Some(asset) = ctx.scene.asset_mut(id) else {
                    return Vec::new();
                };
                let mut rotation = *orig_rotation + angle_deg(*center, at.world) - *start_angle;
                if at.modifiers.shift {
                    rotation = (rotation / ROTATE_SNAP_DEG).round() * ROTATE_SNAP_DEG;
                }
                let rotation = normalize_deg(rotation);
                // Keep the center where it was.
                let half = rotate_about(
                    Point::new(asset.width / 2.0, asset.height / 2.0),
                    Point::new(0.0, 0.0),
                    rotation,
                );
                asset.x = center.x - half.x;
                asset.y = center.y - half.y;
                asset.rotation = rotation;
            }
            _ => return Vec::new(),
        }
        vec![Action::RenderNeeded]
    }

    fn up(&self, ctx: &mut ToolCtx<'_>, at: PointerSample) -> Vec<Action> {
        if let Some(m) = ctx.ui.marquee.as_mut() {
            m.end = at.screen;
        }
        finish_select(ctx, at.modifiers.shift)
    }

    fn cancel(&self, ctx: &mut ToolCtx<'_>) -> Vec<Action> {
        ctx.ui.marquee = None;
        finish_select(ctx, false)
    }

    fn cursor(&self) -> &'static str {
        "default"
    }
}

fn finish_select(ctx: &mut ToolCtx<'_>, additive: bool) -> Vec<Action> {
    match std::mem::take(ctx.input) {
        InputState::SelectingArea => {
            let Some(m) = ctx.ui.marquee.take() else {
                return vec![Action::RenderNeeded];
            };
            if m.start.distance(m.end) < MARQUEE_MIN_PX {
                return vec![Action::RenderNeeded];
            }
            let rect = Rect::from_corners(ctx.camera.screen_to_world(m.start), ctx.camera.screen_to_world(m.end));
            let ids = hit::select_in_rect(ctx.scene, &rect);
            if !additive {
                ctx.ui.clear_selection();
            }
            for id in ids {
                if !ctx.ui.is_selected(&id) {
                    ctx.ui.selected_ids.push(id);
                }
            }
            vec![Action::RenderNeeded]
        }
        InputState::MovingEntities { ids, moved: true, .. } => {
            for id in &ids {
                if let Some(pos) = ctx.scene.entity_position(id) {
                    let end = TransformEnd { x: pos.x, y: pos.y, width: None, height: None, rotation: None };
                    if let Err(e) = ctx.scene.apply_transform(id, &end) {
                        tracing::debug!(error = %e, "moved entity vanished before commit");
                    }
                }
            }
            ctx.commit()
        }
        InputState::ResizingAsset { id, .. } | InputState::RotatingAsset { id, .. } => {
            let Some(end) = ctx.scene.asset_mut(&id).map(|a| TransformEnd {
                x: a.x,
                y: a.y,
                width: Some(a.width),
                height: Some(a.height),
                rotation: Some(a.rotation),
            }) else {
                return vec![Action::RenderNeeded];
            };
            match ctx.scene.apply_transform(&id, &end) {
                Ok(()) => ctx.commit(),
                Err(e) => {
                    tracing::debug!(error = %e, "transformed asset vanished before commit");
                    vec![Action::RenderNeeded]
                }
            }
        }
        _ => vec![Action::RenderNeeded],
    }
}

/// Tokens and assets among `ids`; lines and shapes don't move.
fn movable_ids(scene: &Scene, ids: &[EntityId]) -> Vec<EntityId> {
    ids.iter()
        .filter(|id| {
            scene
                .find(id)
                .is_some_and(|(_, e)| matches!(e.kind(), EntityKind::Token | EntityKind::Asset))
        })
        .cloned()
        .collect()
}

fn angle_deg(center: Point, p: Point) -> f64 {
    (p.y - center.y).atan2(p.x - center.x).to_degrees()
}

fn normalize_deg(deg: f64) -> f64 {
    let d = deg.rem_euclid(360.0);
    if d > 180.0 { d - 360.0 } else { d }
}

// =============================================================
// Strokes: straight line and freehand
// =============================================================

fn line_mut<'s>(scene: &'s mut Scene, layer_id: &str, line_id: &str) -> Option<&'s mut Line> {
    scene.layer_mut(layer_id)?.lines.iter_mut().find(|l| l.id == line_id)
}

fn start_stroke(ctx: &mut ToolCtx<'_>, at: Point, mode: LineMode) -> Option<(EntityId, EntityId)> {
    let layer_id = ctx.active_layer_id()?;
    let points = match mode {
        LineMode::Line => vec![at.x, at.y, at.x, at.y],
        LineMode::Free => vec![at.x, at.y],
    };
    let line = Line { id: new_id(), points, color: ctx.ui.color.clone(), mode, extra: Extra::new() };
    let line_id = line.id.clone();
    ctx.scene.layer_mut(&layer_id)?.lines.push(line);
    Some((layer_id, line_id))
}

impl ToolHandler for LineTool {
    fn down(&self, ctx: &mut ToolCtx<'_>, at: PointerSample) -> Vec<Action> {
        match start_stroke(ctx, at.world, LineMode::Line) {
            Some((layer_id, line_id)) => {
                *ctx.input = InputState::DrawingLine { layer_id, line_id };
                vec![Action::RenderNeeded]
            }
            None => Vec::new(),
        }
    }

    fn drag(&self, ctx: &mut ToolCtx<'_>, at: PointerSample) -> Vec<Action> {
        let InputState::DrawingLine { layer_id, line_id } = &*ctx.input else {
            return Vec::new();
        };
        match line_mut(ctx.scene, layer_id, line_id) {
            Some(line) => {
                line.points.truncate(2);
                line.points.extend([at.world.x, at.world.y]);
                vec![Action::RenderNeeded]
            }
            None => Vec::new(),
        }
    }

    fn up(&self, ctx: &mut ToolCtx<'_>, at: PointerSample) -> Vec<Action> {
        if !matches!(ctx.input, InputState::DrawingLine { .. }) {
            return Vec::new();
        }
        self.drag(ctx, at);
        self.cancel(ctx)
    }

    fn cancel(&self, ctx: &mut ToolCtx<'_>) -> Vec<Action> {
        match std::mem::take(ctx.input) {
            InputState::DrawingLine { .. } => ctx.commit(),
            _ => Vec::new(),
        }
    }
}

impl ToolHandler for FreeTool {
    fn down(&self, ctx: &mut ToolCtx<'_>, at: PointerSample) -> Vec<Action> {
        match start_stroke(ctx, at.world, LineMode::Free) {
            Some((layer_id, line_id)) => {
                *ctx.input = InputState::DrawingFree { layer_id, line_id };
                vec![Action::RenderNeeded]
            }
            None => Vec::new(),
        }
    }

    fn drag(&self, ctx: &mut ToolCtx<'_>, at: PointerSample) -> Vec<Action> {
        let InputState::DrawingFree { layer_id, line_id } = &*ctx.input else {
            return Vec::new();
        };
        match line_mut(ctx.scene, layer_id, line_id) {
            Some(line) => {
                line.points.extend([at.world.x, at.world.y]);
                vec![Action::RenderNeeded]
            }
            None => Vec::new(),
        }
    }

    fn up(&self, ctx: &mut ToolCtx<'_>, _at: PointerSample) -> Vec<Action> {
        self.cancel(ctx)
    }

    fn cancel(&self, ctx: &mut ToolCtx<'_>) -> Vec<Action> {
        match std::mem::take(ctx.input) {
            InputState::DrawingFree { .. } => ctx.commit(),
            _ => Vec::new(),
        }
    }
}

// =============================================================
// Paint
// =============================================================

impl PaintTool {
    fn paint_under(ctx: &mut ToolCtx<'_>, world: Point, erasing: bool) -> bool {
        let (cx, cy) = cell_at(world, GRID_SIZE);
        if erasing {
            return ctx.scene.erase_cell(cx, cy);
        }
        if ctx.scene.cell_color(cx, cy) == Some(ctx.ui.color.as_str()) {
            return false;
        }
        ctx.scene.paint_cell(cx, cy, &ctx.ui.color);
        true
    }
}

impl ToolHandler for PaintTool {
    fn down(&self, ctx: &mut ToolCtx<'_>, at: PointerSample) -> Vec<Action> {
        let erasing = at.modifiers.alt;
        let changed = Self::paint_under(ctx, at.world, erasing);
        *ctx.input = InputState::Painting { changed, erasing };
        if changed { vec![Action::RenderNeeded] } else { Vec::new() }
    }

    fn drag(&self, ctx: &mut ToolCtx<'_>, at: PointerSample) -> Vec<Action> {
        let InputState::Painting { erasing, .. } = *ctx.input else {
            return Vec::new();
        };
        let touched = Self::paint_under(ctx, at.world, erasing);
        if let InputState::Painting { changed, .. } = &mut *ctx.input {
            *changed |= touched;
        }
        if touched { vec![Action::RenderNeeded] } else { Vec::new() }
    }

    fn up(&self, ctx: &mut ToolCtx<'_>, _at: PointerSample) -> Vec<Action> {
        self.cancel(ctx)
    }

    fn cancel(&self, ctx: &mut ToolCtx<'_>) -> Vec<Action> {
        match std::mem::take(ctx.input) {
            InputState::Painting { changed: true, .. } => ctx.commit(),
            _ => Vec::new(),
        }
    }
}

// =============================================================
// Measure
// =============================================================

impl ToolHandler for MeasureTool {
    fn down(&self, ctx: &mut ToolCtx<'_>, at: PointerSample) -> Vec<Action> {
        ctx.ui.measurement = Some(Measurement { start: at.world, end: at.world, expires_at_ms: None });
        *ctx.input = InputState::Measuring;
        vec![Action::RenderNeeded]
    }

    fn drag(&self, ctx: &mut ToolCtx<'_>, at: PointerSample) -> Vec<Action> {
        if !matches!(ctx.input, InputState::Measuring) {
            return Vec::new();
        }
        match ctx.ui.measurement.as_mut() {
            Some(m) => {
                m.end = at.world;
                vec![Action::RenderNeeded]
            }
            None => Vec::new(),
        }
    }

    fn up(&self, ctx: &mut ToolCtx<'_>, at: PointerSample) -> Vec<Action> {
        if !matches!(std::mem::take(ctx.input), InputState::Measuring) {
            return Vec::new();
        }
        let Some(m) = ctx.ui.measurement.as_mut() else {
            return Vec::new();
        };
        m.end = at.world;
        m.expires_at_ms = Some(ctx.now_ms + MEASURE_DISPLAY_MS);
        vec![Action::RenderNeeded, Action::ScheduleTick { delay_ms: MEASURE_DISPLAY_MS }]
    }

    fn cancel(&self, ctx: &mut ToolCtx<'_>) -> Vec<Action> {
        if matches!(std::mem::take(ctx.input), InputState::Measuring) {
            ctx.ui.measurement = None;
            return vec![Action::RenderNeeded];
        }
        Vec::new()
    }
}

// =============================================================
// Fog reveal
// =============================================================

impl ToolHandler for FogTool {
    fn down(&self, ctx: &mut ToolCtx<'_>, at: PointerSample) -> Vec<Action> {
        ctx.ui.fog_draft = vec![at.world.x, at.world.y];
        *ctx.input = InputState::RevealingFog;
        vec![Action::RenderNeeded]
    }

    fn drag(&self, ctx: &mut ToolCtx<'_>, at: PointerSample) -> Vec<Action> {
        if !matches!(ctx.input, InputState::RevealingFog) {
            return Vec::new();
        }
        ctx.ui.fog_draft.extend([at.world.x, at.world.y]);
        vec![Action::RenderNeeded]
    }

    fn up(&self, ctx: &mut ToolCtx<'_>, _at: PointerSample) -> Vec<Action> {
        if !matches!(std::mem::take(ctx.input), InputState::RevealingFog) {
            return Vec::new();
        }
        let path = std::mem::take(&mut ctx.ui.fog_draft);
        if ctx.scene.add_fog_path(path) {
            vec![Action::RenderNeeded, Action::SceneChanged]
        } else {
            vec![Action::RenderNeeded]
        }
    }
}

// =============================================================
// Circle / square
// =============================================================

impl ShapeTool {
    fn resize_draft(&self, draft: &mut Shape, anchor: Point, to: Point) {
        match self.0 {
            ShapeKind::Circle => draft.radius = anchor.distance(to),
            ShapeKind::Square => {
                draft.width = to.x - anchor.x;
                draft.height = to.y - anchor.y;
            }
        }
    }
}

impl ToolHandler for ShapeTool {
    fn down(&self, ctx: &mut ToolCtx<'_>, at: PointerSample) -> Vec<Action> {
        ctx.ui.draft_shape = Some(Shape {
            id: String::new(),
            kind: self.0,
            x: at.world.x,
            y: at.world.y,
            width: 0.0,
            height: 0.0,
            radius: 0.0,
            color: ctx.ui.color.clone(),
            extra: Extra::new(),
        });
        *ctx.input = InputState::DrawingShape { anchor: at.world };
        vec![Action::RenderNeeded]
    }

    fn drag(&self, ctx: &mut ToolCtx<'_>, at: PointerSample) -> Vec<Action> {
        let InputState::DrawingShape { anchor } = *ctx.input else {
            return Vec::new();
        };
        match ctx.ui.draft_shape.as_mut() {
            Some(draft) => {
                self.resize_draft(draft, anchor, at.world);
                vec![Action::RenderNeeded]
            }
            None => Vec::new(),
        }
    }

    fn up(&self, ctx: &mut ToolCtx<'_>, at: PointerSample) -> Vec<Action> {
        let InputState::DrawingShape { anchor } = std::mem::take(ctx.input) else {
            return Vec::new();
        };
        let Some(mut shape) = ctx.ui.draft_shape.take() else {
            return Vec::new();
        };
        self.resize_draft(&mut shape, anchor, at.world);
        let Some(layer_id) = ctx.active_layer_id() else {
            return vec![Action::RenderNeeded];
        };
        let Some(layer) = ctx.scene.layer_mut(&layer_id) else {
            return vec![Action::RenderNeeded];
        };
        shape.id = new_id();
        layer.shapes.push(shape);
        ctx.commit()
    }

    fn cancel(&self, ctx: &mut ToolCtx<'_>) -> Vec<Action> {
        *ctx.input = InputState::Idle;
        ctx.ui.draft_shape = None;
        vec![Action::RenderNeeded]
    }
}
