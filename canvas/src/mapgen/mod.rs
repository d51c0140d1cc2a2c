//! Procedural map images.
//!
//! A [`Generator`] turns a [`MapConfig`] into a tile grid, a set of placed
//! objects, and a PNG of the result. Outdoor maps cover every tile with one
//! terrain and scatter objects anywhere. Indoor maps start as solid wall,
//! carve a connected floor with a random walk from the center, and only put
//! objects on floor.
//!
//! Generation is deterministic for a given seed. Tile textures are built once
//! per generator from a fixed seed, so they do not depend on the map seed.
//!
//! An unknown archetype key yields a canvas filled with [`EMPTY_FILL`] and no
//! tiles or objects. It is logged, not an error.


pub mod objects;
pub mod tiles;

use std::collections::HashMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use tiny_skia::{Pixmap, PixmapPaint, Transform};

use crate::color::Rgba;
use crate::raster;
use objects::{ObjectKind, PlacedObject, draw_objects, place_objects};
use tiles::{Terrain, TileGrid, carve_walk, noise_texture};

/// Edge of one tile in the output image, in pixels.
pub const TILE_PX: u32 = 32;

pub const MIN_COMPLEXITY: u32 = 10;
pub const MAX_COMPLEXITY: u32 = 100;
/// Largest width or height, in tiles.
pub const MAX_TILES: u32 = 256;

/// Background of the empty canvas produced for unknown archetypes.
pub const EMPTY_FILL: Rgba = Rgba::opaque(34, 34, 38);

/// Seed for the shared tile textures.
const TEXTURE_SEED: u64 = 0x7a11_e5ee_d000_0001;
/// Forest objects per tile at full complexity.
const FOREST_DENSITY: f64 = 0.15;
/// Walk steps per tile at full complexity.
const WALK_STEPS_PER_TILE: f64 = 2.0;
/// Indoor objects per floor tile at full complexity.
const INDOOR_DENSITY: f64 = 0.1;

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("cannot allocate a {width}x{height} map image")]
    Alloc { width: u32, height: u32 },
    #[error("png encode failed: {0}")]
    Encode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Archetype {
    Forest,
    Manor,
    Crypt,
    Tavern,
    Dungeon,
}

/// Terrain and objects an archetype draws from.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    /// Outdoor ground, or indoor floor.
    pub floor: Terrain,
    /// Indoor walls. `None` for outdoor maps.
    pub wall: Option<Terrain>,
    pub objects: &'static [ObjectKind],
}

impl Archetype {
    pub const ALL: [Archetype; 5] = [Self::Forest, Self::Manor, Self::Crypt, Self::Tavern, Self::Dungeon];

    /// Parse an archetype key, case-insensitively.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| key.trim().eq_ignore_ascii_case(a.key()))
    }

    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Forest => "forest",
            Self::Manor => "manor",
            Self::Crypt => "crypt",
            Self::Tavern => "tavern",
            Self::Dungeon => "dungeon",
        }
    }

    #[must_use]
    pub fn is_indoor(self) -> bool {
        self.palette().wall.is_some()
    }

    #[must_use]
    pub fn palette(self) -> Palette {
        use ObjectKind::{BarCounter, Barrel, Bed, Bones, Bookshelf, Bush, Chair, Chest, Log, Pillar, Rock, Rug, Sarcophagus, Table, Tree, Urn};
        match self {
            Self::Forest => Palette { floor: Terrain::Grass, wall: None, objects: &[Tree, Bush, Rock, Log] },
            Self::Manor => Palette {
                floor: Terrain::WoodFloor,
                wall: Some(Terrain::StoneWall),
                objects: &[Table, Chair, Bookshelf, Bed, Rug],
            },
            Self::Crypt => Palette {
                floor: Terrain::Flagstone,
                wall: Some(Terrain::DarkStoneWall),
                objects: &[Sarcophagus, Pillar, Bones, Urn],
            },
            Self::Tavern => Palette {
                floor: Terrain::PlankFloor,
                wall: Some(Terrain::TimberWall),
                objects: &[Table, Chair, Barrel, BarCounter],
            },
            Self::Dungeon => Palette {
                floor: Terrain::Cobble,
                wall: Some(Terrain::RockWall),
                objects: &[Pillar, Chest, Bones, Barrel],
            },
        }
    }
}

/// What to generate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapConfig {
    /// Archetype key such as `"forest"` or `"crypt"`.
    pub archetype: String,
    /// Density knob, clamped to `10..=100`.
    pub complexity: u32,
    /// Width in tiles, clamped to `1..=256`.
    pub width: u32,
    /// Height in tiles, clamped to `1..=256`.
    pub height: u32,
    /// Fixed seed for reproducible maps. A random one is drawn when unset.
    pub seed: Option<u64>,
}

impl MapConfig {
    #[must_use]
    pub fn new(archetype: impl Into<String>, complexity: u32, width: u32, height: u32) -> Self {
        Self { archetype: archetype.into(), complexity, width, height, seed: None }
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Copy with every numeric field in range.
    #[must_use]
    pub fn clamped(&self) -> Self {
        Self {
            archetype: self.archetype.clone(),
            complexity: self.complexity.clamp(MIN_COMPLEXITY, MAX_COMPLEXITY),
            width: self.width.clamp(1, MAX_TILES),
            height: self.height.clamp(1, MAX_TILES),
            seed: self.seed,
        }
    }
}

/// A generated map.
#[derive(Debug, Clone)]
pub struct GeneratedMap {
    pub width: u32,
    pub height: u32,
    /// Seed the map was generated from.
    pub seed: u64,
    /// `None` for an unknown archetype.
    pub tiles: Option<TileGrid>,
    /// Placed objects, in placement order.
    pub objects: Vec<PlacedObject>,
    /// The rendered map, PNG-encoded.
    pub png: Vec<u8>,
}

impl GeneratedMap {
    /// The PNG as a `data:` URL.
    #[must_use]
    pub fn to_data_url(&self) -> String {
        format!("data:image/png;base64,{}", STANDARD.encode(&self.png))
    }

    /// Size of the image in pixels.
    #[must_use]
    pub fn pixel_size(&self) -> (u32, u32) {
        (self.width * TILE_PX, self.height * TILE_PX)
    }
}

/// Map generator holding the prebuilt tile textures.
pub struct Generator {
    textures: HashMap<Terrain, Pixmap>,
}

impl Default for Generator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator {
    #[must_use]
    pub fn new() -> Self {
        let mut rng = StdRng::seed_from_u64(TEXTURE_SEED);
        let textures = Terrain::ALL
            .into_iter()
            .filter_map(|t| noise_texture(t, TILE_PX, &mut rng).map(|p| (t, p)))
            .collect();
        Self { textures }
    }

    /// Generate a map.
    ///
    /// # Errors
    ///
    /// [`GenerateError`] if the image cannot be allocated or encoded.
    pub fn generate(&self, config: &MapConfig) -> Result<GeneratedMap, GenerateError> {
        let config = config.clamped();
        let seed = config.seed.unwrap_or_else(|| rand::rng().random());
        let mut rng = StdRng::seed_from_u64(seed);
        let (width_px, height_px) = (config.width * TILE_PX, config.height * TILE_PX);
        let mut pixmap = Pixmap::new(width_px, height_px)
            .ok_or(GenerateError::Alloc { width: width_px, height: height_px })?;

        let Some(archetype) = Archetype::from_key(&config.archetype) else {
            tracing::warn!(archetype = %config.archetype, "unknown map archetype; producing an empty canvas");
            pixmap.fill(raster::color(EMPTY_FILL));
            return Self::finish(&config, seed, None, Vec::new(), &pixmap);
        };

        let palette = archetype.palette();
        let complexity = f64::from(config.complexity) / 100.0;
        let area = f64::from(config.width) * f64::from(config.height);
        let (tiles, objects) = match palette.wall {
            None => {
                let tiles = TileGrid::filled(config.width, config.height, palette.floor);
                let count = scaled(complexity * area * FOREST_DENSITY);
                let objects = place_objects(&tiles, palette.objects, count, None, &mut rng);
                (tiles, objects)
            }
            Some(wall) => {
                let mut tiles = TileGrid::filled(config.width, config.height, wall);
                carve_walk(&mut tiles, palette.floor, scaled(complexity * area * WALK_STEPS_PER_TILE), &mut rng);
                #[allow(clippy::cast_precision_loss)]
                let floor_cells = tiles.count(palette.floor) as f64;
                let count = scaled(complexity * floor_cells * INDOOR_DENSITY);
                let objects = place_objects(&tiles, palette.objects, count, Some(palette.floor), &mut rng);
                (tiles, objects)
            }
        };
        tracing::debug!(
            archetype = archetype.key(),
            seed,
            objects = objects.len(),
            floor = tiles.count(palette.floor),
            "generated map"
        );

        self.draw_tiles(&mut pixmap, &tiles);
        #[allow(clippy::cast_precision_loss)]
        draw_objects(&mut pixmap, &objects, TILE_PX as f32);
        Self::finish(&config, seed, Some(tiles), objects, &pixmap)
    }

    fn draw_tiles(&self, pixmap: &mut Pixmap, tiles: &TileGrid) {
        let paint = PixmapPaint::default();
        for (x, y, terrain) in tiles.iter() {
            let (px, py) = (x * TILE_PX, y * TILE_PX);
            match self.textures.get(&terrain) {
                Some(texture) => {
                    let (Ok(px), Ok(py)) = (i32::try_from(px), i32::try_from(py)) else {
                        continue;
                    };
                    pixmap.draw_pixmap(px, py, texture.as_ref(), &paint, Transform::identity(), None);
                }
                None => {
                    #[allow(clippy::cast_precision_loss)]
                    let rect = tiny_skia::Rect::from_xywh(px as f32, py as f32, TILE_PX as f32, TILE_PX as f32);
                    if let Some(rect) = rect {
                        pixmap.fill_rect(rect, &raster::solid(terrain.base_color()), Transform::identity(), None);
                    }
                }
            }
        }
    }

    fn finish(
        config: &MapConfig,
        seed: u64,
        tiles: Option<TileGrid>,
        objects: Vec<PlacedObject>,
        pixmap: &Pixmap,
    ) -> Result<GeneratedMap, GenerateError> {
        let png = pixmap.encode_png().map_err(|e| GenerateError::Encode(e.to_string()))?;
        Ok(GeneratedMap { width: config.width, height: config.height, seed, tiles, objects, png })
    }
}

/// Round a non-negative count.
fn scaled(value: f64) -> usize {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let n = value.round().max(0.0) as usize;
    n
}
