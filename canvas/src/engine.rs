//! Engine facade: routes host events into the tools, owns the camera and
//! history, and exposes every scene operation the toolbar and dialogs need.
//!
//! [`EngineCore`] is plain Rust and holds all state and logic. [`Engine`]
//! wraps it with a browser canvas: it feeds the host clock in before each
//! event and blits rasterized frames.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use wasm_bindgen::{Clamped, JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, ImageData};

use crate::camera::{Camera, Point, ZoomDirection};
use crate::color::normalize_hex_color;
use crate::consts::{DEFAULT_BACKGROUND, ZOOM_STEP};
use crate::history::History;
use crate::hit::{self, HitPart, ResizeAnchor};
use crate::input::{Button, InputState, Key, Mode, Modifiers, UiState, WheelDelta};
use crate::raster::{self, ImageSource};
use crate::render::{self, Frame, Viewport};
use crate::scene::{
    EntityId, EntityKind, LayerMove, Scene, SceneError, TokenPatch, TokenSource, TransformEnd,
};
use crate::tools::{self, PointerSample, ToolCtx, handler_for};

/// Actions returned from input handlers for the host to process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Redraw on the next animation frame.
    RenderNeeded,
    /// The persisted part of the scene changed; schedule a save.
    SceneChanged,
    SetCursor(String),
    /// Call [`EngineCore::tick`] after this delay.
    ScheduleTick { delay_ms: u64 },
    /// Non-fatal message for the user.
    Notify(String),
}

/// Core engine state: all logic that doesn't depend on the canvas element.
///
/// Separated from `Engine` so it can be tested without WASM/browser dependencies.
pub struct EngineCore {
    pub scene: Scene,
    pub camera: Camera,
    pub ui: UiState,
    pub input: InputState,
    pub history: History,
    pub viewport_width: f64,
    pub viewport_height: f64,
    pub dpr: f64,
    /// Last host clock reading, milliseconds.
    pub clock_ms: u64,
    cursor: String,
}

impl Default for EngineCore {
    fn default() -> Self {
        let scene = Scene::default();
        let history = History::new(&scene);
        Self {
            scene,
            camera: Camera::default(),
            ui: UiState::default(),
            input: InputState::default(),
            history,
            viewport_width: 0.0,
            viewport_height: 0.0,
            dpr: 1.0,
            clock_ms: 0,
            cursor: handler_for(Mode::default()).cursor().to_owned(),
        }
    }
}

impl EngineCore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing scene with a fresh history.
    #[must_use]
    pub fn with_scene(scene: Scene) -> Self {
        let mut core = Self::default();
        core.replace_scene(scene);
        core
    }

    fn tool_ctx(&mut self) -> ToolCtx<'_> {
        ToolCtx {
            scene: &mut self.scene,
            ui: &mut self.ui,
            input: &mut self.input,
            history: &mut self.history,
            camera: &self.camera,
            now_ms: self.clock_ms,
        }
    }

    fn sample(&self, screen: Point, modifiers: Modifiers) -> PointerSample {
        PointerSample { screen, world: self.camera.screen_to_world(screen), modifiers }
    }

    /// Snapshot and report a committed scene mutation.
    fn committed(&mut self) -> Vec<Action> {
        self.history.snapshot(&self.scene);
        vec![Action::RenderNeeded, Action::SceneChanged]
    }

    fn set_cursor(&mut self, cursor: &str) -> Option<Action> {
        if self.cursor == cursor {
            return None;
        }
        cursor.clone_into(&mut self.cursor);
        Some(Action::SetCursor(cursor.to_owned()))
    }

    // --- Clock ---

    /// Record the host clock. Called before each event by [`Engine`].
    pub fn set_clock(&mut self, now_ms: u64) {
        self.clock_ms = now_ms;
    }

    /// Advance the clock and expire a finished measurement.
    pub fn tick(&mut self, now_ms: u64) -> Vec<Action> {
        self.clock_ms = now_ms;
        let expired = self
            .ui
            .measurement
            .as_ref()
            .and_then(|m| m.expires_at_ms)
            .is_some_and(|at| now_ms >= at);
        if expired {
            self.ui.measurement = None;
            return vec![Action::RenderNeeded];
        }
        Vec::new()
    }

    // --- Pointer input ---

    pub fn on_pointer_down(&mut self, screen: Point, button: Button, modifiers: Modifiers) -> Vec<Action> {
        match button {
            Button::Middle => {
                let mut actions = self.cancel_gesture();
                self.input = InputState::Panning { last_screen: screen };
                actions.extend(self.set_cursor("grabbing"));
                actions
            }
            Button::Primary => {
                if !matches!(self.input, InputState::Idle) {
                    return Vec::new();
                }
                let at = self.sample(screen, modifiers);
                let handler = handler_for(self.ui.mode);
                handler.down(&mut self.tool_ctx(), at)
            }
            Button::Secondary => Vec::new(),
        }
    }

    pub fn on_pointer_move(&mut self, screen: Point, modifiers: Modifiers) -> Vec<Action> {
        match &mut self.input {
            InputState::Panning { last_screen } => {
                let (dx, dy) = (screen.x - last_screen.x, screen.y - last_screen.y);
                *last_screen = screen;
                self.camera.pan_by(dx, dy);
                vec![Action::RenderNeeded]
            }
            InputState::Idle => self.hover(screen).into_iter().collect(),
            _ => {
                let at = self.sample(screen, modifiers);
                let handler = handler_for(self.ui.mode);
                handler.drag(&mut self.tool_ctx(), at)
            }
        }
    }

    pub fn on_pointer_up(&mut self, screen: Point, button: Button, modifiers: Modifiers) -> Vec<Action> {
        match (&self.input, button) {
            (InputState::Panning { .. }, Button::Middle) => {
                self.input = InputState::Idle;
                let cursor = handler_for(self.ui.mode).cursor();
                let mut actions = vec![Action::RenderNeeded];
                actions.extend(self.set_cursor(cursor));
                actions
            }
            (InputState::Panning { .. } | InputState::Idle, _) | (_, Button::Middle | Button::Secondary) => Vec::new(),
            (_, Button::Primary) => {
                let at = self.sample(screen, modifiers);
                let handler = handler_for(self.ui.mode);
                handler.up(&mut self.tool_ctx(), at)
            }
        }
    }

    /// Zoom by one step at the cursor. Scrolling down zooms out.
    pub fn on_wheel(&mut self, screen: Point, delta: WheelDelta, _modifiers: Modifiers) -> Vec<Action> {
        if delta.dy == 0.0 {
            return Vec::new();
        }
        let direction = if delta.dy < 0.0 { ZoomDirection::In } else { ZoomDirection::Out };
        self.camera.step_zoom(screen, direction);
        vec![Action::RenderNeeded]
    }

    /// Cursor while hovering in select mode: handles and movable bodies.
    fn hover(&mut self, screen: Point) -> Option<Action> {
        let mode_cursor = handler_for(self.ui.mode).cursor();
        let cursor = if self.ui.mode == Mode::Select {
            let world = self.camera.screen_to_world(screen);
            match hit::hit_test(world, &self.scene, &self.camera, &self.ui.selected_ids) {
                Some(h) => match h.part {
                    HitPart::RotateHandle => "grab",
                    HitPart::ResizeHandle(anchor) => resize_cursor(anchor),
                    HitPart::Body if matches!(h.kind, EntityKind::Token | EntityKind::Asset) => "move",
                    HitPart::Body => "pointer",
                },
                None => mode_cursor,
            }
        } else {
            mode_cursor
        };
        self.set_cursor(cursor)
    }

    // --- Keyboard ---

    pub fn on_key_down(&mut self, key: Key, modifiers: Modifiers) -> Vec<Action> {
        if key.is("Escape") {
            let mut actions = self.cancel_gesture();
            self.ui.clear_selection();
            actions.push(Action::RenderNeeded);
            return actions;
        }
        if key.is("Delete") || key.is("Backspace") {
            return self.delete_selection();
        }
        if modifiers.command() {
            if (key.is("z") && modifiers.shift) || key.is("y") {
                return self.redo();
            }
            if key.is("z") {
                return self.undo();
            }
        }
        Vec::new()
    }

    pub fn on_key_up(&mut self, _key: Key, _modifiers: Modifiers) -> Vec<Action> {
        Vec::new()
    }

    // --- Mode / drawing options ---

    /// Switch modes, finishing or discarding whatever gesture is in flight.
    pub fn set_mode(&mut self, mode: Mode) -> Vec<Action> {
        let mut actions = self.cancel_gesture();
        self.ui.mode = mode;
        actions.push(Action::RenderNeeded);
        actions.extend(self.set_cursor(handler_for(mode).cursor()));
        actions
    }

    /// Stroke and paint color for new drawings.
    pub fn set_color(&mut self, color: &str) {
        self.ui.color = normalize_hex_color(color, &self.ui.color);
    }

    /// End the current gesture: strokes, moves, and paint drags are committed
    /// as they stand, drafts are dropped.
    fn cancel_gesture(&mut self) -> Vec<Action> {
        let actions = match self.input {
            InputState::Idle | InputState::Panning { .. } => Vec::new(),
            _ => {
                let handler = handler_for(self.ui.mode);
                handler.cancel(&mut self.tool_ctx())
            }
        };
        self.input = InputState::Idle;
        self.ui.clear_drafts();
        actions
    }

    // --- Viewport / camera ---

    /// Update viewport dimensions (CSS pixels) and device pixel ratio.
    pub fn set_viewport(&mut self, width_css: f64, height_css: f64, dpr: f64) {
        self.viewport_width = width_css;
        self.viewport_height = height_css;
        self.dpr = if dpr > 0.0 { dpr } else { 1.0 };
    }

    fn viewport_center(&self) -> Point {
        Point::new(self.viewport_width / 2.0, self.viewport_height / 2.0)
    }

    /// World point at the center of the viewport, where toolbar placements land.
    #[must_use]
    pub fn view_center_world(&self) -> Point {
        self.camera.screen_to_world(self.viewport_center())
    }

    pub fn zoom_in(&mut self) -> Vec<Action> {
        self.camera.zoom_at(self.viewport_center(), ZOOM_STEP);
        vec![Action::RenderNeeded]
    }

    pub fn zoom_out(&mut self) -> Vec<Action> {
        self.camera.zoom_at(self.viewport_center(), 1.0 / ZOOM_STEP);
        vec![Action::RenderNeeded]
    }

    // --- Whole-scene operations ---

    /// Replace the scene wholesale (initial load or a remote update). The
    /// history restarts here and selections of vanished entities are dropped.
    pub fn replace_scene(&mut self, scene: Scene) -> Vec<Action> {
        self.input = InputState::Idle;
        self.ui.clear_drafts();
        self.scene = scene;
        self.history.reset(&self.scene);
        let scene = &self.scene;
        self.ui.selected_ids.retain(|id| scene.find(id).is_some());
        if self.ui.active_layer.as_deref().is_some_and(|id| scene.layer(id).is_none()) {
            self.ui.active_layer = None;
        }
        vec![Action::RenderNeeded]
    }

    /// Parse and load a serialized scene. Malformed data loads the default scene.
    pub fn load_json(&mut self, raw: &str) -> Vec<Action> {
        self.replace_scene(Scene::from_json_or_default(raw))
    }

    /// Serialize the persisted part of the scene.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if a value cannot be represented.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        self.scene.to_json()
    }

    pub fn undo(&mut self) -> Vec<Action> {
        let mut actions = self.cancel_gesture();
        if self.history.undo(&mut self.scene) {
            self.prune_selection();
            actions.extend([Action::RenderNeeded, Action::SceneChanged]);
        }
        actions
    }

    pub fn redo(&mut self) -> Vec<Action> {
        let mut actions = self.cancel_gesture();
        if self.history.redo(&mut self.scene) {
            self.prune_selection();
            actions.extend([Action::RenderNeeded, Action::SceneChanged]);
        }
        actions
    }

    fn prune_selection(&mut self) {
        let scene = &self.scene;
        self.ui.selected_ids.retain(|id| scene.find(id).is_some());
    }

    /// Delete every selected entity and clear the selection.
    pub fn delete_selection(&mut self) -> Vec<Action> {
        let mut actions = self.cancel_gesture();
        let ids = std::mem::take(&mut self.ui.selected_ids);
        if self.scene.delete_ids(&ids) == 0 {
            if !ids.is_empty() {
                actions.push(Action::RenderNeeded);
            }
            return actions;
        }
        actions.extend(self.committed());
        actions
    }

    /// Remove all layer content and paint; layers and fog stay.
    pub fn clear_map(&mut self) -> Vec<Action> {
        let mut actions = self.cancel_gesture();
        self.ui.clear_selection();
        self.scene.clear_map();
        actions.extend(self.committed());
        actions
    }

    // --- Layers ---

    /// Add a layer and make it the active one.
    pub fn add_layer(&mut self, name: &str) -> Vec<Action> {
        let id = self.scene.add_layer(name);
        self.ui.active_layer = Some(id);
        self.committed()
    }

    /// Remove a layer. The last layer is refused with a notification.
    pub fn remove_layer(&mut self, id: &str) -> Vec<Action> {
        let mut actions = self.cancel_gesture();
        match self.scene.remove_layer(id) {
            Ok(_) => {
                if self.ui.active_layer.as_deref() == Some(id) {
                    self.ui.active_layer = None;
                }
                self.prune_selection();
                actions.extend(self.committed());
            }
            Err(e) => actions.push(notify(&e)),
        }
        actions
    }

    pub fn rename_layer(&mut self, id: &str, name: &str) -> Vec<Action> {
        match self.scene.rename_layer(id, name) {
            Ok(()) => self.committed(),
            Err(e) => vec![notify(&e)],
        }
    }

    pub fn set_layer_visible(&mut self, id: &str, visible: bool) -> Vec<Action> {
        match self.scene.set_layer_visible(id, visible) {
            Ok(()) => self.committed(),
            Err(e) => vec![notify(&e)],
        }
    }

    pub fn move_layer(&mut self, id: &str, direction: LayerMove) -> Vec<Action> {
        match self.scene.move_layer(id, direction) {
            Ok(true) => self.committed(),
            Ok(false) => Vec::new(),
            Err(e) => vec![notify(&e)],
        }
    }

    /// Choose the layer that receives new drawings.
    pub fn set_active_layer(&mut self, id: &str) -> Vec<Action> {
        if self.scene.layer(id).is_none() {
            return vec![notify(&SceneError::LayerNotFound(id.to_owned()))];
        }
        self.ui.active_layer = Some(id.to_owned());
        Vec::new()
    }

    #[must_use]
    pub fn active_layer_id(&self) -> Option<EntityId> {
        tools::active_layer_id(&self.scene, &self.ui)
    }

    // --- Placement ---

    fn place(&mut self, place: impl FnOnce(&mut Scene, &str, Point) -> Result<EntityId, SceneError>) -> Vec<Action> {
        let Some(layer_id) = self.active_layer_id() else {
            return Vec::new();
        };
        let at = self.view_center_world();
        match place(&mut self.scene, &layer_id, at) {
            Ok(id) => {
                self.ui.select_only(&id);
                self.committed()
            }
            Err(e) => vec![notify(&e)],
        }
    }

    /// Drop a plain token at the view center.
    pub fn add_generic_token(&mut self) -> Vec<Action> {
        self.place(|scene, layer, at| scene.add_generic_token(layer, at))
    }

    pub fn add_creature_token(&mut self, source: &TokenSource) -> Vec<Action> {
        self.place(|scene, layer, at| scene.add_creature_token(layer, source, at))
    }

    pub fn add_player_token(&mut self, source: &TokenSource) -> Vec<Action> {
        self.place(|scene, layer, at| scene.add_player_token(layer, source, at))
    }

    /// Place an image from the asset library, centered in the view.
    pub fn add_asset(&mut self, name: &str, src: &str, width: f64, height: f64) -> Vec<Action> {
        self.place(|scene, layer, at| {
            let top_left = Point::new(at.x - width / 2.0, at.y - height / 2.0);
            scene.add_asset(layer, name, src, top_left, (width, height))
        })
    }

    /// Clear one painted grid cell. Bare cells are not a change.
    pub fn erase_cell(&mut self, x: i64, y: i64) -> Vec<Action> {
        if self.scene.erase_cell(x, y) { self.committed() } else { Vec::new() }
    }

    // --- Dialog edits ---

    pub fn update_token(&mut self, id: &str, patch: &TokenPatch) -> Vec<Action> {
        match self.scene.update_token(id, patch) {
            Ok(()) => self.committed(),
            Err(e) => vec![notify(&e)],
        }
    }

    pub fn resize_asset(&mut self, id: &str, width: f64, height: f64) -> Vec<Action> {
        match self.scene.resize_asset(id, width, height) {
            Ok(()) => self.committed(),
            Err(e) => vec![notify(&e)],
        }
    }

    /// Write back a transform produced outside the pointer handlers.
    pub fn apply_transform(&mut self, id: &str, transform: &TransformEnd) -> Vec<Action> {
        match self.scene.apply_transform(id, transform) {
            Ok(()) => self.committed(),
            Err(e) => vec![notify(&e)],
        }
    }

    // --- Fog / background (persisted, not undoable) ---

    pub fn set_fog_enabled(&mut self, enabled: bool) -> Vec<Action> {
        if self.scene.is_fog_enabled == enabled {
            return Vec::new();
        }
        self.scene.set_fog_enabled(enabled);
        vec![Action::RenderNeeded, Action::SceneChanged]
    }

    pub fn toggle_fog(&mut self) -> Vec<Action> {
        self.scene.toggle_fog();
        vec![Action::RenderNeeded, Action::SceneChanged]
    }

    pub fn reset_fog(&mut self) -> Vec<Action> {
        self.scene.reset_fog();
        vec![Action::RenderNeeded, Action::SceneChanged]
    }

    pub fn set_background(&mut self, color: &str) -> Vec<Action> {
        let current = self.scene.background_color.clone();
        let fallback = if current.is_empty() { DEFAULT_BACKGROUND } else { current.as_str() };
        let color = normalize_hex_color(color, fallback);
        if color == current {
            return Vec::new();
        }
        self.scene.set_background(color);
        vec![Action::RenderNeeded, Action::SceneChanged]
    }

    // --- Output ---

    /// Display list for the current state.
    #[must_use]
    pub fn frame(&self) -> Frame {
        render::build_frame(
            &self.scene,
            &self.camera,
            &self.ui,
            Viewport { width: self.viewport_width, height: self.viewport_height },
        )
    }

    /// The currently selected entity ids.
    #[must_use]
    pub fn selection(&self) -> &[EntityId] {
        &self.ui.selected_ids
    }

    #[must_use]
    pub fn camera(&self) -> Camera {
        self.camera
    }

    /// CSS cursor the host should show.
    #[must_use]
    pub fn cursor(&self) -> &str {
        &self.cursor
    }
}

fn notify(e: &SceneError) -> Action {
    Action::Notify(e.to_string())
}

fn resize_cursor(anchor: ResizeAnchor) -> &'static str {
    match anchor {
        ResizeAnchor::N | ResizeAnchor::S => "ns-resize",
        ResizeAnchor::E | ResizeAnchor::W => "ew-resize",
        ResizeAnchor::Ne | ResizeAnchor::Sw => "nesw-resize",
        ResizeAnchor::Nw | ResizeAnchor::Se => "nwse-resize",
    }
}

/// The full canvas engine. Wraps `EngineCore` and owns the browser canvas element.
pub struct Engine {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    images: ImageSource,
    pub core: EngineCore,
}

impl Engine {
    /// Create a new engine bound to the given canvas element.
    ///
    /// # Errors
    ///
    /// Fails if the canvas has no 2D context.
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self, JsValue> {
        let ctx = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("canvas has no 2d context"))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(JsValue::from)?;
        Ok(Self { canvas, ctx, images: ImageSource::new(), core: EngineCore::new() })
    }

    fn now(&mut self) {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let now = js_sys::Date::now() as u64;
        self.core.set_clock(now);
    }

    /// Register fetched image bytes under the URL tokens and assets refer to.
    ///
    /// # Errors
    ///
    /// Fails if the bytes are not a PNG or JPEG.
    pub fn load_image(&mut self, url: &str, bytes: &[u8]) -> Result<(), JsValue> {
        let pixmap = raster::decode_image(bytes).map_err(|e| JsValue::from_str(&e.to_string()))?;
        self.images.insert(url.to_owned(), pixmap);
        Ok(())
    }

    // --- Delegated data inputs ---

    pub fn load_json(&mut self, raw: &str) -> Vec<Action> {
        self.core.load_json(raw)
    }

    pub fn set_mode(&mut self, mode: Mode) -> Vec<Action> {
        self.now();
        self.core.set_mode(mode)
    }

    pub fn tick(&mut self) -> Vec<Action> {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let now = js_sys::Date::now() as u64;
        self.core.tick(now)
    }

    // --- Viewport ---

    pub fn set_viewport(&mut self, width_css: f64, height_css: f64, dpr: f64) {
        self.core.set_viewport(width_css, height_css, dpr);
    }

    // --- Input events ---

    pub fn on_pointer_down(&mut self, screen_pt: Point, button: Button, modifiers: Modifiers) -> Vec<Action> {
        self.now();
        self.core.on_pointer_down(screen_pt, button, modifiers)
    }

    pub fn on_pointer_move(&mut self, screen_pt: Point, modifiers: Modifiers) -> Vec<Action> {
        self.now();
        self.core.on_pointer_move(screen_pt, modifiers)
    }

    pub fn on_pointer_up(&mut self, screen_pt: Point, button: Button, modifiers: Modifiers) -> Vec<Action> {
        self.now();
        self.core.on_pointer_up(screen_pt, button, modifiers)
    }

    pub fn on_wheel(&mut self, screen_pt: Point, delta: WheelDelta, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_wheel(screen_pt, delta, modifiers)
    }

    pub fn on_key_down(&mut self, key: Key, modifiers: Modifiers) -> Vec<Action> {
        self.now();
        self.core.on_key_down(key, modifiers)
    }

    pub fn on_key_up(&mut self, key: Key, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_key_up(key, modifiers)
    }

    // --- Render ---

    /// Draw the current state to the canvas.
    ///
    /// # Errors
    ///
    /// Fails if the frame cannot be rasterized or the 2D context rejects it.
    pub fn render(&self) -> Result<(), JsValue> {
        let frame = self.core.frame();
        let out = raster::paint(&frame, &self.images, self.core.dpr).map_err(|e| JsValue::from_str(&e.to_string()))?;
        let (width, height) = (out.pixmap.width(), out.pixmap.height());
        if self.canvas.width() != width || self.canvas.height() != height {
            self.canvas.set_width(width);
            self.canvas.set_height(height);
        }

        let bytes = out.to_rgba8();
        let image = ImageData::new_with_u8_clamped_array_and_sh(Clamped(&bytes), width, height)?;
        self.ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)?;
        self.ctx.put_image_data(&image, 0.0, 0.0)?;

        let dpr = self.core.dpr;
        self.ctx.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0)?;
        for run in &out.texts {
            self.ctx.set_font(&format!("{}px sans-serif", run.size));
            self.ctx.set_fill_style_str(&run.color.to_hex());
            self.ctx.fill_text(&run.text, run.at.x, run.at.y)?;
        }
        Ok(())
    }

    // --- Delegated queries ---

    #[must_use]
    pub fn selection(&self) -> &[EntityId] {
        self.core.selection()
    }

    #[must_use]
    pub fn camera(&self) -> Camera {
        self.core.camera()
    }
}
