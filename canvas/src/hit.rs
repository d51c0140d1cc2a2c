//! Hit-testing: which entity (or handle) is under a world point, and which
//! tokens/assets a marquee touches.

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::camera::{Camera, Point};
use crate::consts::{HANDLE_RADIUS_PX, ROTATE_HANDLE_OFFSET_PX};
use crate::grid::{Rect, distance_to_segment, points_of, rotate_about};
use crate::scene::{Asset, EntityId, EntityKind, EntityRef, Scene, Shape, ShapeKind};

/// Which part of an entity was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitPart {
    Body,
    ResizeHandle(ResizeAnchor),
    RotateHandle,
}

/// Anchor position for resize handles, in the asset's local frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeAnchor {
    N,
    Ne,
    E,
    Se,
    S,
    Sw,
    W,
    Nw,
}

impl ResizeAnchor {
    /// Handles in the order returned by [`resize_handle_positions`].
    pub const ALL: [ResizeAnchor; 8] = [Self::N, Self::Ne, Self::E, Self::Se, Self::S, Self::Sw, Self::W, Self::Nw];

    /// Which edges this handle drags: `(left, top, right, bottom)`.
    #[must_use]
    pub fn edges(self) -> (bool, bool, bool, bool) {
        match self {
            Self::N => (false, true, false, false),
            Self::Ne => (false, true, true, false),
            Self::E => (false, false, true, false),
            Self::Se => (false, false, true, true),
            Self::S => (false, false, false, true),
            Self::Sw => (true, false, false, true),
            Self::W => (true, false, false, false),
            Self::Nw => (true, true, false, false),
        }
    }
}

/// Result of a hit test.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub id: EntityId,
    pub kind: EntityKind,
    pub part: HitPart,
}

/// World positions of an asset's eight resize handles, N first then clockwise.
#[must_use]
pub fn resize_handle_positions(asset: &Asset) -> [Point; 8] {
    let (w, h) = (asset.width, asset.height);
    let local = [
        (w / 2.0, 0.0),
        (w, 0.0),
        (w, h / 2.0),
        (w, h),
        (w / 2.0, h),
        (0.0, h),
        (0.0, h / 2.0),
        (0.0, 0.0),
    ];
    local.map(|(lx, ly)| to_world(asset, Point::new(lx, ly)))
}

/// World position of an asset's rotate handle, a fixed screen distance above its top edge.
#[must_use]
pub fn rotate_handle_position(asset: &Asset, zoom: f64) -> Point {
    let offset = ROTATE_HANDLE_OFFSET_PX / zoom;
    to_world(asset, Point::new(asset.width / 2.0, -offset))
}

/// World-space center of an asset.
#[must_use]
pub fn asset_center(asset: &Asset) -> Point {
    to_world(asset, Point::new(asset.width / 2.0, asset.height / 2.0))
}

/// Map a point in the asset's local (unrotated, origin at top-left) frame to world space.
#[must_use]
pub fn to_world(asset: &Asset, local: Point) -> Point {
    let origin = Point::new(asset.x, asset.y);
    rotate_about(Point::new(origin.x + local.x, origin.y + local.y), origin, asset.rotation)
}

/// Map a world point into the asset's local frame.
#[must_use]
pub fn to_local(asset: &Asset, world: Point) -> Point {
    let origin = Point::new(asset.x, asset.y);
    let p = rotate_about(world, origin, -asset.rotation);
    Point::new(p.x - origin.x, p.y - origin.y)
}

/// Find the topmost entity under `world_pt`.
///
/// Handles of a single selected asset are checked first. After that, visible
/// layers are searched from last to first, and within a layer from the
/// last-drawn kind (tokens) back to the first (shapes).
#[must_use]
pub fn hit_test(world_pt: Point, scene: &Scene, camera: &Camera, selected: &[EntityId]) -> Option<Hit> {
    let slop = camera.screen_dist_to_world(HANDLE_RADIUS_PX);

    if let [only] = selected {
        if let Some((_, EntityRef::Asset(asset))) = scene.find(only) {
            if let Some(part) = handle_at(world_pt, asset, camera.zoom, slop) {
                return Some(Hit { id: asset.id.clone(), kind: EntityKind::Asset, part });
            }
        }
    }

    for layer in scene.layers.iter().rev().filter(|l| l.is_visible) {
        let entities: Vec<EntityRef<'_>> = layer.entities().collect();
        for entity in entities.into_iter().rev() {
            if entity_contains(entity, world_pt, slop) {
                return Some(Hit { id: entity.id().to_owned(), kind: entity.kind(), part: HitPart::Body });
            }
        }
    }
    None
}

fn handle_at(world_pt: Point, asset: &Asset, zoom: f64, slop: f64) -> Option<HitPart> {
    if world_pt.distance(rotate_handle_position(asset, zoom)) <= slop {
        return Some(HitPart::RotateHandle);
    }
    resize_handle_positions(asset)
        .iter()
        .zip(ResizeAnchor::ALL)
        .find(|(pos, _)| world_pt.distance(**pos) <= slop)
        .map(|(_, anchor)| HitPart::ResizeHandle(anchor))
}

fn entity_contains(entity: EntityRef<'_>, p: Point, slop: f64) -> bool {
    match entity {
        EntityRef::Token(t) => p.distance(Point::new(t.x, t.y)) <= t.radius,
        EntityRef::Asset(a) => {
            let local = to_local(a, p);
            local.x >= 0.0 && local.x <= a.width && local.y >= 0.0 && local.y <= a.height
        }
        EntityRef::Line(l) => {
            let pts: Vec<Point> = points_of(&l.points).collect();
            match pts.as_slice() {
                [] => false,
                [only] => p.distance(*only) <= slop,
                _ => pts.windows(2).any(|w| distance_to_segment(p, w[0], w[1]) <= slop),
            }
        }
        EntityRef::Shape(s) => shape_bounds(s).contains(p),
    }
}

/// Axis-aligned bounds of a shape (circle: around its center; square: signed
/// extents normalized).
#[must_use]
pub fn shape_bounds(shape: &Shape) -> Rect {
    match shape.kind {
        ShapeKind::Circle => Rect::around_circle(Point::new(shape.x, shape.y), shape.radius),
        ShapeKind::Square => Rect::from_corners(
            Point::new(shape.x, shape.y),
            Point::new(shape.x + shape.width, shape.y + shape.height),
        ),
    }
}

/// Ids of every token and asset on a visible layer whose bounding box
/// intersects `rect` (world space).
#[must_use]
pub fn select_in_rect(scene: &Scene, rect: &Rect) -> Vec<EntityId> {
    let mut ids = Vec::new();
    for layer in scene.layers.iter().filter(|l| l.is_visible) {
        for asset in &layer.assets {
            if asset.bounds().intersects(rect) {
                ids.push(asset.id.clone());
            }
        }
        for token in &layer.tokens {
            if token.bounds().intersects(rect) {
                ids.push(token.id.clone());
            }
        }
    }
    ids
}
