//! Scene model: layers, the entities they hold, painted cells, and fog.
//!
//! This module defines the data that makes up one interactive map
//! ([`Scene`]) and every mutation the map UI performs on it. The scene is
//! the sole owner of its layers and entities; tokens and assets refer to
//! images only by URL.
//!
//! The serialized form is camelCase JSON and is what the host persists as an
//! opaque blob. Deserialization is the validation boundary: typed structs
//! reject malformed entities, and [`Scene::normalize`] restores invariants
//! (at least one layer, one painted cell per grid coordinate) that JSON alone
//! cannot express.

#[cfg(test)]
#[path = "scene_test.rs"]
mod scene_test;

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::camera::Point;
use crate::consts::{DEFAULT_BACKGROUND, DEFAULT_TOKEN_FILL, DEFAULT_TOKEN_RADIUS, GRID_SIZE, MIN_ASSET_SIZE};
use crate::grid::{Rect, snap_to_grid};

/// Identifier for layers and entities.
pub type EntityId = String;

/// Keys of a serialized object that this version doesn't model. They are
/// kept so a save from here never strips data written by a newer client.
pub type Extra = serde_json::Map<String, serde_json::Value>;

/// A closed reveal polygon as a flattened `[x0, y0, x1, y1, ..]` loop.
pub type FogPath = Vec<f64>;

/// Fill used for tokens placed from a player character.
const PLAYER_TOKEN_FILL: &str = "#4b7bd9";

/// Fresh random id for layers and entities.
#[must_use]
pub fn new_id() -> EntityId {
    Uuid::new_v4().to_string()
}

/// Id for a token placed from an external creature or player record.
///
/// The random suffix keeps repeated placements of the same source distinct.
#[must_use]
pub fn synthetic_id(source_id: &str) -> EntityId {
    format!("{source_id}-{}", Uuid::new_v4().simple())
}

// =============================================================
// Errors
// =============================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SceneError {
    #[error("cannot delete the last remaining layer")]
    LastLayer,
    #[error("layer not found: {0}")]
    LayerNotFound(EntityId),
    #[error("entity not found: {0}")]
    EntityNotFound(EntityId),
}

// =============================================================
// Entities
// =============================================================

/// Colored halo drawn behind a token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aura {
    pub color: String,
    /// Halo radius in world units, measured from the token center.
    pub radius: f64,
}

/// A circular creature or player marker. `x`/`y` is the center.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub id: EntityId,
    pub x: f64,
    pub y: f64,
    #[serde(default = "default_token_radius")]
    pub radius: f64,
    /// Solid color used when there is no image (or it hasn't loaded).
    #[serde(default = "default_token_fill")]
    pub fill: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aura: Option<Aura>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Token {
    /// Bounding box used for marquee selection.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::around_circle(Point::new(self.x, self.y), self.radius)
    }
}

/// A freely resizable, rotatable decorative image. `x`/`y` is the top-left
/// corner before rotation; rotation pivots about that corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    pub src: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Clockwise rotation in degrees.
    #[serde(default)]
    pub rotation: f64,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Asset {
    /// Axis-aligned bounds of the rotated image.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height).rotated_bounds(self.rotation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineMode {
    /// Two-point straight segment.
    Line,
    /// Unconstrained polyline.
    Free,
}

/// A stroke. `points` is a flattened `[x0, y0, x1, y1, ..]` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub id: EntityId,
    pub points: Vec<f64>,
    pub color: String,
    pub mode: LineMode,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Circle,
    Square,
}

/// A primitive outline. Circles use `x`/`y` as center and `radius`;
/// squares use `x`/`y` as anchor with signed `width`/`height`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub id: EntityId,
    #[serde(rename = "type")]
    pub kind: ShapeKind,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub radius: f64,
    pub color: String,
    #[serde(flatten)]
    pub extra: Extra,
}

/// A filled grid cell. `x`/`y` are cell indices, not pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaintedCell {
    pub x: i64,
    pub y: i64,
    pub color: String,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Discriminant of the entity kinds a layer holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Token,
    Asset,
    Line,
    Shape,
}

/// Borrowed view of one entity, whatever its kind.
#[derive(Debug, Clone, Copy)]
pub enum EntityRef<'a> {
    Token(&'a Token),
    Asset(&'a Asset),
    Line(&'a Line),
    Shape(&'a Shape),
}

impl<'a> EntityRef<'a> {
    #[must_use]
    pub fn id(&self) -> &'a str {
        match self {
            Self::Token(t) => &t.id,
            Self::Asset(a) => &a.id,
            Self::Line(l) => &l.id,
            Self::Shape(s) => &s.id,
        }
    }

    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Token(_) => EntityKind::Token,
            Self::Asset(_) => EntityKind::Asset,
            Self::Line(_) => EntityKind::Line,
            Self::Shape(_) => EntityKind::Shape,
        }
    }
}

// =============================================================
// Layers
// =============================================================

/// An independently toggleable group of entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    pub id: EntityId,
    pub name: String,
    #[serde(default = "default_true")]
    pub is_visible: bool,
    #[serde(default)]
    pub tokens: Vec<Token>,
    #[serde(default)]
    pub assets: Vec<Asset>,
    #[serde(default)]
    pub lines: Vec<Line>,
    #[serde(default)]
    pub shapes: Vec<Shape>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Layer {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            is_visible: true,
            tokens: Vec::new(),
            assets: Vec::new(),
            lines: Vec::new(),
            shapes: Vec::new(),
            extra: Extra::new(),
        }
    }

    /// All entities in draw order: shapes, lines, assets, tokens.
    pub fn entities(&self) -> impl Iterator<Item = EntityRef<'_>> {
        self.shapes
            .iter()
            .map(EntityRef::Shape)
            .chain(self.lines.iter().map(EntityRef::Line))
            .chain(self.assets.iter().map(EntityRef::Asset))
            .chain(self.tokens.iter().map(EntityRef::Token))
    }

    /// Whether the layer holds no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty() && self.assets.is_empty() && self.lines.is_empty() && self.shapes.is_empty()
    }

    fn clear(&mut self) {
        self.tokens.clear();
        self.assets.clear();
        self.lines.clear();
        self.shapes.clear();
    }

    fn retain_not_in(&mut self, ids: &HashSet<&str>) -> usize {
        let before = self.tokens.len() + self.assets.len() + self.lines.len() + self.shapes.len();
        self.tokens.retain(|t| !ids.contains(t.id.as_str()));
        self.assets.retain(|a| !ids.contains(a.id.as_str()));
        self.lines.retain(|l| !ids.contains(l.id.as_str()));
        self.shapes.retain(|s| !ids.contains(s.id.as_str()));
        before - (self.tokens.len() + self.assets.len() + self.lines.len() + self.shapes.len())
    }
}

/// Direction for reordering a layer within the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerMove {
    /// Toward the end of the list (drawn later, visually on top).
    Up,
    /// Toward the start of the list.
    Down,
}

// =============================================================
// Edits
// =============================================================

/// External record a token can be placed from (creature or player).
#[derive(Debug, Clone, PartialEq)]
pub struct TokenSource {
    pub id: String,
    pub name: String,
    pub image: Option<String>,
}

/// Fields changed by the token edit dialog. `None` leaves a field alone;
/// `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenPatch {
    pub name: Option<String>,
    pub radius: Option<f64>,
    pub image: Option<Option<String>>,
    pub aura: Option<Option<Aura>>,
}

/// Result of a transform gesture, written back on transform-end.
///
/// `x`/`y` are snapped to the grid when applied. Size and rotation only
/// apply to assets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformEnd {
    pub x: f64,
    pub y: f64,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub rotation: Option<f64>,
}

// =============================================================
// Scene
// =============================================================

/// Full state of one interactive map. This is the aggregate that is
/// persisted and replaced wholesale by remote updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    #[serde(default)]
    pub layers: Vec<Layer>,
    #[serde(default)]
    pub painted_cells: Vec<PaintedCell>,
    #[serde(default)]
    pub fog_paths: Vec<FogPath>,
    #[serde(default)]
    pub is_fog_enabled: bool,
    #[serde(default = "default_background")]
    pub background_color: String,
    /// Keys this version doesn't know about, carried through to the next save.
    #[serde(flatten)]
    pub extra: Extra,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            layers: vec![Layer::new("Layer 1")],
            painted_cells: Vec::new(),
            fog_paths: Vec::new(),
            is_fog_enabled: false,
            background_color: DEFAULT_BACKGROUND.to_owned(),
            extra: Extra::new(),
        }
    }
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // --- Serialization ---

    /// Parse a serialized scene and restore its invariants.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if `raw` is not a valid scene.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let mut scene: Scene = serde_json::from_str(raw)?;
        scene.normalize();
        Ok(scene)
    }

    /// Parse a serialized scene, falling back to the default scene (and
    /// logging the failure) if it is malformed.
    #[must_use]
    pub fn from_json_or_default(raw: &str) -> Self {
        match Self::from_json(raw) {
            Ok(scene) => scene,
            Err(e) => {
                tracing::warn!(error = %e, "malformed scene data; starting from an empty scene");
                Self::default()
            }
        }
    }

    /// Serialize to the persisted JSON form.
    ///
    /// # Errors
    ///
    /// Returns an error only if a value cannot be represented in JSON
    /// (e.g. a non-finite number in `extra`).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Restore invariants: at least one layer exists and no grid coordinate
    /// has more than one painted cell (the later entry's color wins).
    /// Returns `true` if anything changed.
    pub fn normalize(&mut self) -> bool {
        let mut changed = false;
        if self.layers.is_empty() {
            self.layers.push(Layer::new("Layer 1"));
            changed = true;
        }

        let mut seen: HashMap<(i64, i64), usize> = HashMap::new();
        let mut deduped: Vec<PaintedCell> = Vec::with_capacity(self.painted_cells.len());
        for cell in self.painted_cells.drain(..) {
            if let Some(&idx) = seen.get(&(cell.x, cell.y)) {
                deduped[idx].color = cell.color;
                changed = true;
            } else {
                seen.insert((cell.x, cell.y), deduped.len());
                deduped.push(cell);
            }
        }
        self.painted_cells = deduped;
        changed
    }

    // --- Lookup ---

    #[must_use]
    pub fn layer(&self, id: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn layer_mut(&mut self, id: &str) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| l.id == id)
    }

    fn layer_mut_or_err(&mut self, id: &str) -> Result<&mut Layer, SceneError> {
        self.layer_mut(id)
            .ok_or_else(|| SceneError::LayerNotFound(id.to_owned()))
    }

    /// Find an entity by id across all layers, with the index of its layer.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<(usize, EntityRef<'_>)> {
        self.layers
            .iter()
            .enumerate()
            .find_map(|(idx, layer)| layer.entities().find(|e| e.id() == id).map(|e| (idx, e)))
    }

    pub fn token_mut(&mut self, id: &str) -> Option<&mut Token> {
        self.layers
            .iter_mut()
            .flat_map(|l| l.tokens.iter_mut())
            .find(|t| t.id == id)
    }

    pub fn asset_mut(&mut self, id: &str) -> Option<&mut Asset> {
        self.layers
            .iter_mut()
            .flat_map(|l| l.assets.iter_mut())
            .find(|a| a.id == id)
    }

    /// Number of entities across all layers.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.layers.iter().map(|l| l.entities().count()).sum()
    }

    // --- Layers ---

    /// Append a new empty, visible layer and return its id.
    pub fn add_layer(&mut self, name: impl Into<String>) -> EntityId {
        let layer = Layer::new(name);
        let id = layer.id.clone();
        self.layers.push(layer);
        id
    }

    /// Remove a layer and everything on it.
    ///
    /// # Errors
    ///
    /// [`SceneError::LastLayer`] if it is the only layer,
    /// [`SceneError::LayerNotFound`] if no layer has this id.
    pub fn remove_layer(&mut self, id: &str) -> Result<Layer, SceneError> {
        let idx = self
            .layers
            .iter()
            .position(|l| l.id == id)
            .ok_or_else(|| SceneError::LayerNotFound(id.to_owned()))?;
        if self.layers.len() == 1 {
            return Err(SceneError::LastLayer);
        }
        Ok(self.layers.remove(idx))
    }

    /// # Errors
    ///
    /// [`SceneError::LayerNotFound`] if no layer has this id.
    pub fn rename_layer(&mut self, id: &str, name: impl Into<String>) -> Result<(), SceneError> {
        self.layer_mut_or_err(id)?.name = name.into();
        Ok(())
    }

    /// # Errors
    ///
    /// [`SceneError::LayerNotFound`] if no layer has this id.
    pub fn set_layer_visible(&mut self, id: &str, visible: bool) -> Result<(), SceneError> {
        self.layer_mut_or_err(id)?.is_visible = visible;
        Ok(())
    }

    /// Swap a layer with its neighbour. Returns `false` if it is already at
    /// that end of the stack.
    ///
    /// # Errors
    ///
    /// [`SceneError::LayerNotFound`] if no layer has this id.
    pub fn move_layer(&mut self, id: &str, direction: LayerMove) -> Result<bool, SceneError> {
        let idx = self
            .layers
            .iter()
            .position(|l| l.id == id)
            .ok_or_else(|| SceneError::LayerNotFound(id.to_owned()))?;
        let target = match direction {
            LayerMove::Up if idx + 1 < self.layers.len() => idx + 1,
            LayerMove::Down if idx > 0 => idx - 1,
            _ => return Ok(false),
        };
        self.layers.swap(idx, target);
        Ok(true)
    }

    // --- Placement ---

    /// # Errors
    ///
    /// [`SceneError::LayerNotFound`] if no layer has this id.
    pub fn add_token(&mut self, layer_id: &str, token: Token) -> Result<EntityId, SceneError> {
        let id = token.id.clone();
        self.layer_mut_or_err(layer_id)?.tokens.push(token);
        Ok(id)
    }

    /// Place a plain colored token.
    ///
    /// # Errors
    ///
    /// [`SceneError::LayerNotFound`] if no layer has this id.
    pub fn add_generic_token(&mut self, layer_id: &str, at: Point) -> Result<EntityId, SceneError> {
        let token = Token {
            id: new_id(),
            x: at.x,
            y: at.y,
            radius: DEFAULT_TOKEN_RADIUS,
            fill: DEFAULT_TOKEN_FILL.to_owned(),
            name: "Token".to_owned(),
            image: None,
            aura: None,
            extra: Extra::new(),
        };
        self.add_token(layer_id, token)
    }

    /// Place a token for a bestiary creature.
    ///
    /// # Errors
    ///
    /// [`SceneError::LayerNotFound`] if no layer has this id.
    pub fn add_creature_token(&mut self, layer_id: &str, source: &TokenSource, at: Point) -> Result<EntityId, SceneError> {
        self.add_sourced_token(layer_id, source, at, DEFAULT_TOKEN_FILL)
    }

    /// Place a token for a player character.
    ///
    /// # Errors
    ///
    /// [`SceneError::LayerNotFound`] if no layer has this id.
    pub fn add_player_token(&mut self, layer_id: &str, source: &TokenSource, at: Point) -> Result<EntityId, SceneError> {
        self.add_sourced_token(layer_id, source, at, PLAYER_TOKEN_FILL)
    }

    fn add_sourced_token(&mut self, layer_id: &str, source: &TokenSource, at: Point, fill: &str) -> Result<EntityId, SceneError> {
        let token = Token {
            id: synthetic_id(&source.id),
            x: at.x,
            y: at.y,
            radius: DEFAULT_TOKEN_RADIUS,
            fill: fill.to_owned(),
            name: source.name.clone(),
            image: source.image.clone(),
            aura: None,
            extra: Extra::new(),
        };
        self.add_token(layer_id, token)
    }

    /// Place an image asset with its top-left corner at `at`.
    ///
    /// # Errors
    ///
    /// [`SceneError::LayerNotFound`] if no layer has this id.
    pub fn add_asset(
        &mut self,
        layer_id: &str,
        name: impl Into<String>,
        src: impl Into<String>,
        at: Point,
        size: (f64, f64),
    ) -> Result<EntityId, SceneError> {
        let asset = Asset {
            id: new_id(),
            name: name.into(),
            src: src.into(),
            x: at.x,
            y: at.y,
            width: size.0.max(MIN_ASSET_SIZE),
            height: size.1.max(MIN_ASSET_SIZE),
            rotation: 0.0,
            extra: Extra::new(),
        };
        let id = asset.id.clone();
        self.layer_mut_or_err(layer_id)?.assets.push(asset);
        Ok(id)
    }

    // --- Paint ---

    /// Paint a grid cell, replacing its color if it is already painted.
    pub fn paint_cell(&mut self, x: i64, y: i64, color: &str) {
        if let Some(cell) = self.painted_cells.iter_mut().find(|c| c.x == x && c.y == y) {
            if cell.color != color {
                color.clone_into(&mut cell.color);
            }
            return;
        }
        self.painted_cells.push(PaintedCell { x, y, color: color.to_owned(), extra: Extra::new() });
    }

    /// Remove paint from a cell. Returns `true` if it was painted.
    pub fn erase_cell(&mut self, x: i64, y: i64) -> bool {
        let before = self.painted_cells.len();
        self.painted_cells.retain(|c| c.x != x || c.y != y);
        self.painted_cells.len() != before
    }

    #[must_use]
    pub fn cell_color(&self, x: i64, y: i64) -> Option<&str> {
        self.painted_cells
            .iter()
            .find(|c| c.x == x && c.y == y)
            .map(|c| c.color.as_str())
    }

    // --- Edits ---

    /// Delete every token, asset, line, and shape whose id is in `ids`.
    /// Returns how many entities were removed.
    pub fn delete_ids<S: AsRef<str>>(&mut self, ids: &[S]) -> usize {
        let set: HashSet<&str> = ids.iter().map(AsRef::as_ref).collect();
        if set.is_empty() {
            return 0;
        }
        self.layers.iter_mut().map(|l| l.retain_not_in(&set)).sum()
    }

    /// Remove all layer content and painted cells. Layer identities and names
    /// and the fog state are kept.
    pub fn clear_map(&mut self) {
        for layer in &mut self.layers {
            layer.clear();
        }
        self.painted_cells.clear();
    }

    /// Apply the token edit dialog.
    ///
    /// # Errors
    ///
    /// [`SceneError::EntityNotFound`] if no token has this id.
    pub fn update_token(&mut self, id: &str, patch: &TokenPatch) -> Result<(), SceneError> {
        let token = self
            .token_mut(id)
            .ok_or_else(|| SceneError::EntityNotFound(id.to_owned()))?;
        if let Some(name) = &patch.name {
            name.clone_into(&mut token.name);
        }
        if let Some(radius) = patch.radius {
            token.radius = radius.max(1.0);
        }
        if let Some(image) = &patch.image {
            token.image.clone_from(image);
        }
        if let Some(aura) = &patch.aura {
            token.aura.clone_from(aura);
        }
        Ok(())
    }

    /// Apply the asset size dialog.
    ///
    /// # Errors
    ///
    /// [`SceneError::EntityNotFound`] if no asset has this id.
    pub fn resize_asset(&mut self, id: &str, width: f64, height: f64) -> Result<(), SceneError> {
        let asset = self
            .asset_mut(id)
            .ok_or_else(|| SceneError::EntityNotFound(id.to_owned()))?;
        asset.width = width.max(MIN_ASSET_SIZE);
        asset.height = height.max(MIN_ASSET_SIZE);
        Ok(())
    }

    /// Write a finished transform back to the token or asset with this id.
    /// The position is snapped to the grid.
    ///
    /// # Errors
    ///
    /// [`SceneError::EntityNotFound`] if no token or asset has this id.
    pub fn apply_transform(&mut self, id: &str, t: &TransformEnd) -> Result<(), SceneError> {
        let x = snap_to_grid(t.x, GRID_SIZE);
        let y = snap_to_grid(t.y, GRID_SIZE);
        if let Some(asset) = self.asset_mut(id) {
            asset.x = x;
            asset.y = y;
            if let Some(w) = t.width {
                asset.width = w.max(MIN_ASSET_SIZE);
            }
            if let Some(h) = t.height {
                asset.height = h.max(MIN_ASSET_SIZE);
            }
            if let Some(r) = t.rotation {
                asset.rotation = r;
            }
            return Ok(());
        }
        if let Some(token) = self.token_mut(id) {
            token.x = x;
            token.y = y;
            return Ok(());
        }
        Err(SceneError::EntityNotFound(id.to_owned()))
    }

    /// Translate a token or asset without snapping. Returns `false` if the id
    /// is not a token or asset.
    pub fn translate_entity(&mut self, id: &str, dx: f64, dy: f64) -> bool {
        if let Some(token) = self.token_mut(id) {
            token.x += dx;
            token.y += dy;
            return true;
        }
        if let Some(asset) = self.asset_mut(id) {
            asset.x += dx;
            asset.y += dy;
            return true;
        }
        false
    }

    /// Current position of a token (center) or asset (top-left corner).
    #[must_use]
    pub fn entity_position(&self, id: &str) -> Option<Point> {
        match self.find(id)?.1 {
            EntityRef::Token(t) => Some(Point::new(t.x, t.y)),
            EntityRef::Asset(a) => Some(Point::new(a.x, a.y)),
            EntityRef::Line(_) | EntityRef::Shape(_) => None,
        }
    }

    // --- Fog ---

    pub fn set_fog_enabled(&mut self, enabled: bool) {
        self.is_fog_enabled = enabled;
    }

    /// Flip fog on or off. Reveal paths are kept either way.
    pub fn toggle_fog(&mut self) -> bool {
        self.is_fog_enabled = !self.is_fog_enabled;
        self.is_fog_enabled
    }

    /// Commit a reveal polygon. A flat list without a single full point is ignored.
    pub fn add_fog_path(&mut self, path: FogPath) -> bool {
        if path.len() < 2 {
            return false;
        }
        self.fog_paths.push(path);
        true
    }

    /// Forget all reveals. The enabled flag is untouched.
    pub fn reset_fog(&mut self) {
        self.fog_paths.clear();
    }

    // --- Background ---

    pub fn set_background(&mut self, color: impl Into<String>) {
        self.background_color = color.into();
    }
}

fn default_true() -> bool {
    true
}

fn default_token_radius() -> f64 {
    DEFAULT_TOKEN_RADIUS
}

fn default_token_fill() -> String {
    DEFAULT_TOKEN_FILL.to_owned()
}

fn default_background() -> String {
    DEFAULT_BACKGROUND.to_owned()
}
