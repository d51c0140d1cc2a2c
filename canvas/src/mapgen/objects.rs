//! Placeable map objects: footprints, placement, and their vector art.
//!
//! Each kind is drawn from a short list of filled primitives in footprint
//! units (one unit is one tile). Rotation turns the whole drawing in
//! quarter steps; odd turns swap the footprint.

#[cfg(test)]
#[path = "objects_test.rs"]
mod objects_test;

use rand::Rng;
use rand::rngs::StdRng;
use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Transform};

use super::tiles::{Terrain, TileGrid};
use crate::color::Rgba;
use crate::raster::solid;

/// Placement attempts per object before it is skipped.
pub const MAX_ATTEMPTS: usize = 20;

const SHADOW: Rgba = Rgba { r: 0, g: 0, b: 0, a: 80 };
/// Horizontal shear of shadows.
const SHADOW_SKEW: f32 = -0.45;
/// Shadow offset, in pixels.
const SHADOW_OFFSET: (f32, f32) = (5.0, 3.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Tree,
    Bush,
    Rock,
    Log,
    Table,
    Chair,
    Bookshelf,
    Bed,
    Rug,
    Sarcophagus,
    Pillar,
    Bones,
    Urn,
    Barrel,
    BarCounter,
    Chest,
}

/// A filled primitive in footprint units.
enum Part {
    Circle { cx: f32, cy: f32, r: f32, color: Rgba },
    Rect { x: f32, y: f32, w: f32, h: f32, color: Rgba },
}

impl ObjectKind {
    /// Unrotated `(width, height)` in tiles.
    #[must_use]
    pub fn footprint(self) -> (u32, u32) {
        match self {
            Self::Tree | Self::Sarcophagus | Self::Bed => (2, 2),
            Self::Log | Self::Table | Self::Bookshelf => (2, 1),
            Self::Rug => (3, 2),
            Self::BarCounter => (3, 1),
            Self::Bush | Self::Rock | Self::Chair | Self::Pillar | Self::Bones | Self::Urn | Self::Barrel | Self::Chest => {
                (1, 1)
            }
        }
    }

    /// Round things look the same in every orientation.
    #[must_use]
    pub fn rotates(self) -> bool {
        !matches!(self, Self::Tree | Self::Bush | Self::Rock | Self::Pillar | Self::Urn | Self::Barrel)
    }

    #[must_use]
    pub fn casts_shadow(self) -> bool {
        !matches!(self, Self::Rug | Self::Bones)
    }

    fn parts(self) -> Vec<Part> {
        use Part::{Circle, Rect};
        let wood = Rgba::opaque(120, 82, 48);
        let dark_wood = Rgba::opaque(82, 54, 30);
        let stone = Rgba::opaque(150, 146, 138);
        match self {
            Self::Tree => vec![
                Circle { cx: 1.0, cy: 1.0, r: 0.95, color: Rgba::opaque(38, 92, 44) },
                Circle { cx: 0.8, cy: 0.8, r: 0.55, color: Rgba::opaque(58, 122, 60) },
            ],
            Self::Bush => vec![
                Circle { cx: 0.5, cy: 0.5, r: 0.4, color: Rgba::opaque(64, 118, 58) },
                Circle { cx: 0.4, cy: 0.4, r: 0.2, color: Rgba::opaque(92, 146, 80) },
            ],
            Self::Rock => vec![Circle { cx: 0.5, cy: 0.55, r: 0.35, color: Rgba::opaque(128, 126, 120) }],
            Self::Log => vec![
                Rect { x: 0.1, y: 0.3, w: 1.8, h: 0.4, color: Rgba::opaque(104, 72, 44) },
                Circle { cx: 1.9, cy: 0.5, r: 0.2, color: Rgba::opaque(176, 140, 96) },
            ],
            Self::Table => vec![Rect { x: 0.1, y: 0.15, w: 1.8, h: 0.7, color: wood }],
            Self::Chair => vec![
                Rect { x: 0.25, y: 0.25, w: 0.5, h: 0.5, color: wood },
                Rect { x: 0.25, y: 0.15, w: 0.5, h: 0.12, color: dark_wood },
            ],
            Self::Bookshelf => vec![
                Rect { x: 0.05, y: 0.1, w: 1.9, h: 0.5, color: dark_wood },
                Rect { x: 0.15, y: 0.2, w: 0.5, h: 0.3, color: Rgba::opaque(140, 40, 40) },
                Rect { x: 0.75, y: 0.2, w: 0.5, h: 0.3, color: Rgba::opaque(40, 70, 130) },
                Rect { x: 1.35, y: 0.2, w: 0.5, h: 0.3, color: Rgba::opaque(50, 110, 60) },
            ],
            Self::Bed => vec![
                Rect { x: 0.2, y: 0.1, w: 1.6, h: 1.8, color: dark_wood },
                Rect { x: 0.3, y: 0.5, w: 1.4, h: 1.3, color: Rgba::opaque(170, 60, 60) },
                Rect { x: 0.4, y: 0.2, w: 1.2, h: 0.25, color: Rgba::opaque(230, 226, 214) },
            ],
            Self::Rug => vec![
                Rect { x: 0.2, y: 0.2, w: 2.6, h: 1.6, color: Rgba::opaque(128, 36, 44) },
                Rect { x: 0.5, y: 0.5, w: 2.0, h: 1.0, color: Rgba::opaque(196, 150, 60) },
            ],
            Self::Sarcophagus => vec![
                Rect { x: 0.55, y: 0.1, w: 0.9, h: 1.8, color: stone },
                Rect { x: 0.7, y: 0.3, w: 0.6, h: 1.4, color: Rgba::opaque(176, 172, 162) },
            ],
            Self::Pillar => vec![
                Circle { cx: 0.5, cy: 0.5, r: 0.42, color: stone },
                Circle { cx: 0.5, cy: 0.5, r: 0.3, color: Rgba::opaque(178, 174, 166) },
            ],
            Self::Bones => vec![
                Rect { x: 0.2, y: 0.45, w: 0.6, h: 0.1, color: Rgba::opaque(226, 220, 200) },
                Circle { cx: 0.3, cy: 0.3, r: 0.12, color: Rgba::opaque(226, 220, 200) },
            ],
            Self::Urn => vec![Circle { cx: 0.5, cy: 0.5, r: 0.3, color: Rgba::opaque(150, 96, 60) }],
            Self::Barrel => vec![
                Circle { cx: 0.5, cy: 0.5, r: 0.4, color: Rgba::opaque(112, 76, 44) },
                Circle { cx: 0.5, cy: 0.5, r: 0.3, color: Rgba::opaque(140, 100, 60) },
            ],
            Self::BarCounter => vec![
                Rect { x: 0.0, y: 0.2, w: 3.0, h: 0.6, color: dark_wood },
                Rect { x: 0.0, y: 0.2, w: 3.0, h: 0.15, color: wood },
            ],
            Self::Chest => vec![
                Rect { x: 0.15, y: 0.25, w: 0.7, h: 0.5, color: wood },
                Rect { x: 0.45, y: 0.45, w: 0.1, h: 0.1, color: Rgba::opaque(212, 176, 64) },
            ],
        }
    }
}

/// An object placed on the tile grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacedObject {
    pub kind: ObjectKind,
    /// Top-left tile of the (rotated) footprint.
    pub x: u32,
    pub y: u32,
    /// Quarter turns clockwise, 0..=3.
    pub rotation: u8,
}

impl PlacedObject {
    /// Footprint after rotation, in tiles.
    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        let (w, h) = self.kind.footprint();
        if self.rotation % 2 == 1 { (h, w) } else { (w, h) }
    }

    /// Sort key for back-to-front drawing.
    #[must_use]
    pub fn depth(&self) -> u32 {
        self.y + self.size().1
    }

    /// Every tile the object covers.
    pub fn cells(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let (w, h) = self.size();
        (self.y..self.y + h).flat_map(move |y| (self.x..self.x + w).map(move |x| (x, y)))
    }
}

/// Try to place `count` objects drawn from `kinds`. With `floor` set, every
/// covered tile must be that terrain. Objects never overlap; an object that
/// finds no spot in [`MAX_ATTEMPTS`] tries is skipped.
pub fn place_objects(
    grid: &TileGrid,
    kinds: &[ObjectKind],
    count: usize,
    floor: Option<Terrain>,
    rng: &mut StdRng,
) -> Vec<PlacedObject> {
    let mut placed = Vec::new();
    if kinds.is_empty() || grid.is_empty() {
        return placed;
    }
    let mut occupied = vec![false; grid.len()];
    let index = |x: u32, y: u32| y as usize * grid.width as usize + x as usize;

    for _ in 0..count {
        let kind = kinds[rng.random_range(0..kinds.len())];
        for _ in 0..MAX_ATTEMPTS {
            let rotation = if kind.rotates() { rng.random_range(0..4u8) } else { 0 };
            let template = PlacedObject { kind, x: 0, y: 0, rotation };
            let (w, h) = template.size();
            if w > grid.width || h > grid.height {
                continue;
            }
            let candidate = PlacedObject {
                x: rng.random_range(0..=grid.width - w),
                y: rng.random_range(0..=grid.height - h),
                ..template
            };
            let fits = candidate.cells().all(|(x, y)| {
                !occupied[index(x, y)] && floor.is_none_or(|f| grid.get(x, y) == Some(f))
            });
            if fits {
                for (x, y) in candidate.cells() {
                    occupied[index(x, y)] = true;
                }
                placed.push(candidate);
                break;
            }
        }
    }
    placed
}

/// Draw `objects` back to front, each shadow before its object.
pub fn draw_objects(pixmap: &mut Pixmap, objects: &[PlacedObject], tile_px: f32) {
    let mut sorted = objects.to_vec();
    sorted.sort_by_key(PlacedObject::depth);
    for obj in &sorted {
        let ts = object_transform(obj, tile_px);
        if obj.kind.casts_shadow() {
            #[allow(clippy::cast_precision_loss)]
            let base_y = obj.depth() as f32 * tile_px;
            let shadow_ts = Transform::from_translate(SHADOW_OFFSET.0, SHADOW_OFFSET.1 + base_y)
                .pre_concat(Transform::from_skew(SHADOW_SKEW, 0.0))
                .pre_concat(Transform::from_translate(0.0, -base_y))
                .pre_concat(ts);
            draw_parts(pixmap, obj.kind, shadow_ts, Some(SHADOW));
        }
        draw_parts(pixmap, obj.kind, ts, None);
    }
}

/// Footprint units to pixels, including the quarter-turn rotation.
fn object_transform(obj: &PlacedObject, tile_px: f32) -> Transform {
    let (w, h) = obj.kind.footprint();
    let (rw, rh) = obj.size();
    #[allow(clippy::cast_precision_loss)]
    let (w, h, rw, rh, x, y) = (w as f32, h as f32, rw as f32, rh as f32, obj.x as f32, obj.y as f32);
    Transform::from_translate((x + rw / 2.0) * tile_px, (y + rh / 2.0) * tile_px)
        .pre_concat(Transform::from_rotate(f32::from(obj.rotation) * 90.0))
        .pre_concat(Transform::from_scale(tile_px, tile_px))
        .pre_concat(Transform::from_translate(-w / 2.0, -h / 2.0))
}

fn draw_parts(pixmap: &mut Pixmap, kind: ObjectKind, ts: Transform, tint: Option<Rgba>) {
    for part in kind.parts() {
        let (path, color) = match part {
            Part::Circle { cx, cy, r, color } => (PathBuilder::from_circle(cx, cy, r), color),
            Part::Rect { x, y, w, h, color } => {
                (tiny_skia::Rect::from_xywh(x, y, w, h).map(PathBuilder::from_rect), color)
            }
        };
        let Some(path) = path else {
            continue;
        };
        let paint: Paint<'static> = solid(tint.unwrap_or(color));
        pixmap.fill_path(&path, &paint, FillRule::Winding, ts, None);
    }
}
