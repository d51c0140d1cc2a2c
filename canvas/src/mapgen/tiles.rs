//! Terrain tiles: the grid, the floor-carving walk, and noise textures.

#[cfg(test)]
#[path = "tiles_test.rs"]
mod tiles_test;

use rand::Rng;
use rand::rngs::StdRng;
use tiny_skia::{Pixmap, Transform};

use crate::color::Rgba;
use crate::raster::solid;

/// Speckles per texture.
const SPECKLES: usize = 48;
/// Largest speckle edge, in pixels.
const SPECKLE_MAX_PX: u32 = 3;
/// Largest brightness shift of a speckle, either direction.
const SPECKLE_SHIFT: i16 = 22;
/// Chance that a walk step keeps the previous direction.
const WALK_INERTIA: f64 = 0.4;
const DIRS: [(i64, i64); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Terrain {
    Grass,
    WoodFloor,
    StoneWall,
    Flagstone,
    DarkStoneWall,
    PlankFloor,
    TimberWall,
    Cobble,
    RockWall,
}

impl Terrain {
    pub const ALL: [Terrain; 9] = [
        Self::Grass,
        Self::WoodFloor,
        Self::StoneWall,
        Self::Flagstone,
        Self::DarkStoneWall,
        Self::PlankFloor,
        Self::TimberWall,
        Self::Cobble,
        Self::RockWall,
    ];

    #[must_use]
    pub fn base_color(self) -> Rgba {
        match self {
            Self::Grass => Rgba::opaque(86, 125, 70),
            Self::WoodFloor => Rgba::opaque(139, 99, 62),
            Self::StoneWall => Rgba::opaque(96, 96, 104),
            Self::Flagstone => Rgba::opaque(122, 118, 110),
            Self::DarkStoneWall => Rgba::opaque(46, 44, 52),
            Self::PlankFloor => Rgba::opaque(160, 118, 72),
            Self::TimberWall => Rgba::opaque(84, 56, 36),
            Self::Cobble => Rgba::opaque(110, 106, 98),
            Self::RockWall => Rgba::opaque(58, 52, 48),
        }
    }
}

/// Row-major terrain grid, one entry per tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileGrid {
    pub width: u32,
    pub height: u32,
    cells: Vec<Terrain>,
}

impl TileGrid {
    /// A grid with every cell set to `terrain`.
    #[must_use]
    pub fn filled(width: u32, height: u32, terrain: Terrain) -> Self {
        Self { width, height, cells: vec![terrain; width as usize * height as usize] }
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y as usize * self.width as usize + x as usize)
    }

    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<Terrain> {
        self.index(x, y).map(|i| self.cells[i])
    }

    pub fn set(&mut self, x: u32, y: u32, terrain: Terrain) {
        if let Some(i) = self.index(x, y) {
            self.cells[i] = terrain;
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// `(x, y, terrain)` for every cell, row by row.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32, Terrain)> + '_ {
        let width = self.width.max(1);
        (0u32..).zip(&self.cells).map(move |(i, &t)| (i % width, i / width, t))
    }

    #[must_use]
    pub fn count(&self, terrain: Terrain) -> usize {
        self.cells.iter().filter(|&&t| t == terrain).count()
    }

    /// The cell the carving walk starts from.
    #[must_use]
    pub fn center(&self) -> (u32, u32) {
        let (lo_x, hi_x) = inner_range(self.width);
        let (lo_y, hi_y) = inner_range(self.height);
        ((self.width / 2).clamp(lo_x, hi_x), (self.height / 2).clamp(lo_y, hi_y))
    }
}

/// Cells a walk may visit on one axis: one in from each border when the
/// axis is wide enough to have an inside.
fn inner_range(len: u32) -> (u32, u32) {
    if len > 2 { (1, len - 2) } else { (0, len.saturating_sub(1)) }
}

/// Carve `floor` into `grid` with a four-directional random walk of `steps`
/// steps from the center. Steps that would leave the inner area stay put,
/// so every carved cell is connected to the center.
pub fn carve_walk(grid: &mut TileGrid, floor: Terrain, steps: usize, rng: &mut StdRng) {
    if grid.is_empty() {
        return;
    }
    let (lo_x, hi_x) = inner_range(grid.width);
    let (lo_y, hi_y) = inner_range(grid.height);
    let (mut x, mut y) = grid.center();
    grid.set(x, y, floor);

    let mut dir = DIRS[rng.random_range(0..DIRS.len())];
    for _ in 0..steps {
        if !rng.random_bool(WALK_INERTIA) {
            dir = DIRS[rng.random_range(0..DIRS.len())];
        }
        x = step(x, dir.0, lo_x, hi_x);
        y = step(y, dir.1, lo_y, hi_y);
        grid.set(x, y, floor);
    }
}

fn step(at: u32, delta: i64, lo: u32, hi: u32) -> u32 {
    let next = (i64::from(at) + delta).clamp(i64::from(lo), i64::from(hi));
    u32::try_from(next).unwrap_or(at)
}

/// A `size`-pixel square of `terrain`'s color with random light and dark
/// speckles. `None` if the pixmap cannot be allocated.
#[must_use]
pub fn noise_texture(terrain: Terrain, size: u32, rng: &mut StdRng) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(size, size)?;
    let base = terrain.base_color();
    pixmap.fill(crate::raster::color(base));
    for _ in 0..SPECKLES {
        let shift = rng.random_range(-SPECKLE_SHIFT..=SPECKLE_SHIFT);
        let speckle = Rgba::opaque(shade(base.r, shift), shade(base.g, shift), shade(base.b, shift));
        let edge = rng.random_range(1..=SPECKLE_MAX_PX);
        let x = rng.random_range(0..size);
        let y = rng.random_range(0..size);
        #[allow(clippy::cast_precision_loss)]
        let rect = tiny_skia::Rect::from_xywh(x as f32, y as f32, edge as f32, edge as f32);
        if let Some(rect) = rect {
            pixmap.fill_rect(rect, &solid(speckle), Transform::identity(), None);
        }
    }
    Some(pixmap)
}

fn shade(channel: u8, shift: i16) -> u8 {
    u8::try_from((i16::from(channel) + shift).clamp(0, 255)).unwrap_or(channel)
}
