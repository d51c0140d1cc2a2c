//! Rendering: turns the scene, camera, and UI state into an ordered display list.
//!
//! This module decides *what* is drawn and in which order; it never touches
//! pixels. [`build_frame`] walks the passes back to front:
//!
//! 1. background fill and contrast grid
//! 2. painted cells
//! 3. visible layers in order (shapes, lines, assets, tokens)
//! 4. in-progress circle/square
//! 5. selection rectangle
//! 6. fog of war (base plus subtractive reveals)
//! 7. measurement readout
//!
//! The resulting [`Frame`] is executed by [`crate::raster`] on a pixmap, so
//! the same list drives the browser canvas and headless PNG export.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use crate::camera::{Camera, Point};
use crate::color::{Rgba, grid_line_color};
use crate::consts::{GRID_SIZE, HANDLE_RADIUS_PX};
use crate::grid::{Rect, distance_label};
use crate::hit::{self, resize_handle_positions, rotate_handle_position};
use crate::input::UiState;
use crate::scene::{Asset, Layer, Line, Scene, Shape, ShapeKind, Token};

/// Accent used for selection rings, outlines, handles, and the marquee.
pub const SELECTION_COLOR: Rgba = Rgba::opaque(59, 130, 246);

const MARQUEE_FILL: Rgba = Rgba { r: 59, g: 130, b: 246, a: 38 };
const SHADOW_COLOR: Rgba = Rgba { r: 0, g: 0, b: 0, a: 90 };
const LABEL_BOX_COLOR: Rgba = Rgba { r: 0, g: 0, b: 0, a: 180 };
const MEASURE_COLOR: Rgba = Rgba::opaque(245, 158, 11);
const TOKEN_NAME_COLOR: Rgba = Rgba::opaque(31, 26, 23);

/// Stroke width of lines, in world units.
const LINE_WIDTH: f64 = 3.0;
/// Outline width of shapes, in world units.
const SHAPE_STROKE_WIDTH: f64 = 2.0;
/// Token ring width, in world units.
const RING_WIDTH: f64 = 3.0;
/// Token drop-shadow offset, in world units.
const SHADOW_OFFSET: f64 = 3.0;
/// Aura halo opacity.
const AURA_ALPHA: f64 = 0.3;

/// Dash pattern (on, off) for drafts and the measurement line, in screen pixels.
const DASH_PX: [f64; 2] = [6.0, 4.0];
/// Selection outline width, in screen pixels.
const OUTLINE_PX: f64 = 1.5;

const LABEL_FONT_PX: f64 = 12.0;
const NAME_FONT_PX: f64 = 11.0;
/// Average glyph advance as a fraction of the font size.
const GLYPH_ADVANCE: f64 = 0.6;
const LABEL_PAD_PX: f64 = 4.0;
/// Offset of the measurement label from the second endpoint, in screen pixels.
const LABEL_OFFSET_PX: f64 = 10.0;

/// Draw pass a command belongs to, in back-to-front order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Pass {
    Background,
    Grid,
    Paint,
    Layer,
    Draft,
    Marquee,
    Fog,
    Overlay,
}

/// Coordinate space of a command's geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Space {
    /// Map coordinates; the camera transform applies.
    World,
    /// CSS pixels relative to the viewport's top-left corner.
    Screen,
}

/// Viewport size in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

/// Outline style. `width` and `dash` are in the units of the command's space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle {
    pub color: Rgba,
    pub width: f64,
    pub dash: Option<[f64; 2]>,
}

impl StrokeStyle {
    #[must_use]
    pub fn solid(color: Rgba, width: f64) -> Self {
        Self { color, width, dash: None }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    /// Fill the whole viewport.
    Fill { color: Rgba },
    /// Grid lines every `spacing` world units across `area`, one screen pixel wide.
    Grid { area: Rect, spacing: f64, color: Rgba },
    Rect { rect: Rect, fill: Option<Rgba>, stroke: Option<StrokeStyle>, space: Space },
    Circle { center: Point, radius: f64, fill: Option<Rgba>, stroke: Option<StrokeStyle> },
    Polyline { points: Vec<f64>, stroke: StrokeStyle, closed: bool, space: Space },
    /// Image with its top-left at `rect.x/y`, rotated about that corner.
    Image { src: String, rect: Rect, rotation: f64 },
    /// Image clipped to a circle; `fallback` fills the circle until it loads.
    TokenImage { src: String, center: Point, radius: f64, fallback: Rgba },
    /// Opaque black fog over the whole viewport.
    FogBase,
    /// Punch a reveal hole (world-space closed polygon) through the fog.
    FogReveal { points: Vec<f64> },
    /// Text anchored at its left baseline, screen space.
    Text { text: String, at: Point, color: Rgba, size: f64 },
}

/// One display-list entry.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCmd {
    pub pass: Pass,
    pub op: DrawOp,
}

/// A complete frame, ready to rasterize.
#[derive(Debug, Clone)]
pub struct Frame {
    pub camera: Camera,
    pub viewport: Viewport,
    pub commands: Vec<DrawCmd>,
}

impl Frame {
    /// Commands of a single pass, in order.
    pub fn pass(&self, pass: Pass) -> impl Iterator<Item = &DrawOp> + '_ {
        self.commands.iter().filter(move |c| c.pass == pass).map(|c| &c.op)
    }
}

/// Build the display list for one frame.
#[must_use]
pub fn build_frame(scene: &Scene, camera: &Camera, ui: &UiState, viewport: Viewport) -> Frame {
    let mut out = FrameBuilder { camera: *camera, commands: Vec::new() };

    // Pass 1: background and grid.
    let background = Rgba::parse(&scene.background_color).unwrap_or(Rgba::WHITE);
    out.push(Pass::Background, DrawOp::Fill { color: background });
    let top_left = camera.screen_to_world(Point::new(0.0, 0.0));
    let bottom_right = camera.screen_to_world(Point::new(viewport.width, viewport.height));
    let grid_color = Rgba::parse(grid_line_color(&scene.background_color)).unwrap_or(Rgba::BLACK);
    out.push(
        Pass::Grid,
        DrawOp::Grid { area: Rect::from_corners(top_left, bottom_right), spacing: GRID_SIZE, color: grid_color },
    );

    // Pass 2: painted cells.
    for cell in &scene.painted_cells {
        #[allow(clippy::cast_precision_loss)]
        let rect = Rect::new(cell.x as f64 * GRID_SIZE, cell.y as f64 * GRID_SIZE, GRID_SIZE, GRID_SIZE);
        out.push(
            Pass::Paint,
            DrawOp::Rect { rect, fill: Some(parse_or(&cell.color, Rgba::BLACK)), stroke: None, space: Space::World },
        );
    }

    // Pass 3: layer content.
    let single_selected = match ui.selected_ids.as_slice() {
        [only] => Some(only.as_str()),
        _ => None,
    };
    for layer in scene.layers.iter().filter(|l| l.is_visible) {
        out.layer(layer, ui, single_selected);
    }

    // Pass 4: in-progress shape.
    if let Some(draft) = &ui.draft_shape {
        let stroke = StrokeStyle {
            color: parse_or(&draft.color, Rgba::BLACK),
            width: out.px(SHAPE_STROKE_WIDTH),
            dash: Some(out.dash()),
        };
        out.shape_outline(Pass::Draft, draft, stroke);
    }

    // Pass 5: selection rectangle.
    if let Some(m) = ui.marquee {
        out.push(
            Pass::Marquee,
            DrawOp::Rect {
                rect: Rect::from_corners(m.start, m.end),
                fill: Some(MARQUEE_FILL),
                stroke: Some(StrokeStyle::solid(SELECTION_COLOR, 1.0)),
                space: Space::Screen,
            },
        );
    }

    // Pass 6: fog of war.
    if scene.is_fog_enabled {
        out.push(Pass::Fog, DrawOp::FogBase);
        for path in &scene.fog_paths {
            out.push(Pass::Fog, DrawOp::FogReveal { points: path.clone() });
        }
        if ui.fog_draft.len() >= 2 {
            out.push(Pass::Fog, DrawOp::FogReveal { points: ui.fog_draft.clone() });
        }
    }

    // Pass 7: measurement readout.
    if let Some(m) = &ui.measurement {
        out.push(
            Pass::Overlay,
            DrawOp::Polyline {
                points: vec![m.start.x, m.start.y, m.end.x, m.end.y],
                stroke: StrokeStyle { color: MEASURE_COLOR, width: out.px(2.0), dash: Some(out.dash()) },
                closed: false,
                space: Space::World,
            },
        );
        let text = distance_label(m.length());
        let anchor = camera.world_to_screen(m.end);
        let text_w = text_width(&text, LABEL_FONT_PX);
        let box_rect = Rect::new(
            anchor.x + LABEL_OFFSET_PX,
            anchor.y - LABEL_OFFSET_PX - LABEL_FONT_PX - LABEL_PAD_PX * 2.0,
            text_w + LABEL_PAD_PX * 2.0,
            LABEL_FONT_PX + LABEL_PAD_PX * 2.0,
        );
        out.push(
            Pass::Overlay,
            DrawOp::Rect { rect: box_rect, fill: Some(LABEL_BOX_COLOR), stroke: None, space: Space::Screen },
        );
        out.push(
            Pass::Overlay,
            DrawOp::Text {
                text,
                at: Point::new(box_rect.x + LABEL_PAD_PX, box_rect.bottom() - LABEL_PAD_PX),
                color: Rgba::WHITE,
                size: LABEL_FONT_PX,
            },
        );
    }

    Frame { camera: *camera, viewport, commands: out.commands }
}

/// Approximate rendered width of `text` in pixels.
#[must_use]
pub fn text_width(text: &str, font_px: f64) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let chars = text.chars().count() as f64;
    chars * font_px * GLYPH_ADVANCE
}

fn parse_or(css: &str, fallback: Rgba) -> Rgba {
    Rgba::parse(css).unwrap_or(fallback)
}

struct FrameBuilder {
    camera: Camera,
    commands: Vec<DrawCmd>,
}

impl FrameBuilder {
    fn push(&mut self, pass: Pass, op: DrawOp) {
        self.commands.push(DrawCmd { pass, op });
    }

    /// Screen pixels as world units at the current zoom.
    fn px(&self, screen: f64) -> f64 {
        self.camera.screen_dist_to_world(screen)
    }

    fn dash(&self) -> [f64; 2] {
        [self.px(DASH_PX[0]), self.px(DASH_PX[1])]
    }

    fn layer(&mut self, layer: &Layer, ui: &UiState, single_selected: Option<&str>) {
        for shape in &layer.shapes {
            let color = if ui.is_selected(&shape.id) { SELECTION_COLOR } else { parse_or(&shape.color, Rgba::BLACK) };
            self.shape_outline(Pass::Layer, shape, StrokeStyle::solid(color, SHAPE_STROKE_WIDTH));
        }
        for line in &layer.lines {
            self.line(line, ui.is_selected(&line.id));
        }
        for asset in &layer.assets {
            self.asset(asset, ui.is_selected(&asset.id), single_selected == Some(asset.id.as_str()));
        }
        for token in &layer.tokens {
            self.token(token, ui.is_selected(&token.id));
        }
    }

    fn shape_outline(&mut self, pass: Pass, shape: &Shape, stroke: StrokeStyle) {
        let op = match shape.kind {
            ShapeKind::Circle => {
                DrawOp::Circle { center: Point::new(shape.x, shape.y), radius: shape.radius, fill: None, stroke: Some(stroke) }
            }
            ShapeKind::Square => {
                DrawOp::Rect { rect: hit::shape_bounds(shape), fill: None, stroke: Some(stroke), space: Space::World }
            }
        };
        self.push(pass, op);
    }

    fn line(&mut self, line: &Line, selected: bool) {
        let color = if selected { SELECTION_COLOR } else { parse_or(&line.color, Rgba::BLACK) };
        self.push(
            Pass::Layer,
            DrawOp::Polyline {
                points: line.points.clone(),
                stroke: StrokeStyle::solid(color, LINE_WIDTH),
                closed: false,
                space: Space::World,
            },
        );
    }

    fn asset(&mut self, asset: &Asset, selected: bool, show_handles: bool) {
        self.push(
            Pass::Layer,
            DrawOp::Image {
                src: asset.src.clone(),
                rect: Rect::new(asset.x, asset.y, asset.width, asset.height),
                rotation: asset.rotation,
            },
        );
        if !selected {
            return;
        }

        let corners = [
            hit::to_world(asset, Point::new(0.0, 0.0)),
            hit::to_world(asset, Point::new(asset.width, 0.0)),
            hit::to_world(asset, Point::new(asset.width, asset.height)),
            hit::to_world(asset, Point::new(0.0, asset.height)),
        ];
        let outline = StrokeStyle::solid(SELECTION_COLOR, self.px(OUTLINE_PX));
        self.push(
            Pass::Layer,
            DrawOp::Polyline {
                points: corners.iter().flat_map(|p| [p.x, p.y]).collect(),
                stroke: outline,
                closed: true,
                space: Space::World,
            },
        );
        if !show_handles {
            return;
        }

        let half = self.px(HANDLE_RADIUS_PX) / 2.0;
        let top_mid = hit::to_world(asset, Point::new(asset.width / 2.0, 0.0));
        let rotate = rotate_handle_position(asset, self.camera.zoom);
        self.push(
            Pass::Layer,
            DrawOp::Polyline { points: vec![top_mid.x, top_mid.y, rotate.x, rotate.y], stroke: outline, closed: false, space: Space::World },
        );
        self.push(
            Pass::Layer,
            DrawOp::Circle { center: rotate, radius: half, fill: Some(Rgba::WHITE), stroke: Some(outline) },
        );
        for p in resize_handle_positions(asset) {
            self.push(
                Pass::Layer,
                DrawOp::Rect {
                    rect: Rect::new(p.x - half, p.y - half, half * 2.0, half * 2.0),
                    fill: Some(Rgba::WHITE),
                    stroke: Some(outline),
                    space: Space::World,
                },
            );
        }
    }

    fn token(&mut self, token: &Token, selected: bool) {
        let center = Point::new(token.x, token.y);
        let fill = parse_or(&token.fill, Rgba::BLACK);

        if let Some(aura) = &token.aura {
            let color = parse_or(&aura.color, fill).with_alpha_scaled(AURA_ALPHA);
            self.push(Pass::Layer, DrawOp::Circle { center, radius: aura.radius, fill: Some(color), stroke: None });
        }
        self.push(
            Pass::Layer,
            DrawOp::Circle {
                center: Point::new(center.x + SHADOW_OFFSET, center.y + SHADOW_OFFSET),
                radius: token.radius,
                fill: Some(SHADOW_COLOR),
                stroke: None,
            },
        );

        let ring = if selected {
            Some(StrokeStyle::solid(SELECTION_COLOR, RING_WIDTH))
        } else if token.image.is_some() {
            Some(StrokeStyle::solid(Rgba::WHITE, RING_WIDTH))
        } else {
            None
        };
        match &token.image {
            Some(src) => {
                self.push(
                    Pass::Layer,
                    DrawOp::TokenImage { src: src.clone(), center, radius: token.radius, fallback: fill },
                );
                if let Some(stroke) = ring {
                    self.push(Pass::Layer, DrawOp::Circle { center, radius: token.radius, fill: None, stroke: Some(stroke) });
                }
            }
            None => {
                self.push(Pass::Layer, DrawOp::Circle { center, radius: token.radius, fill: Some(fill), stroke: ring });
            }
        }

        if !token.name.is_empty() {
            let below = self.camera.world_to_screen(Point::new(token.x, token.y + token.radius));
            let width = text_width(&token.name, NAME_FONT_PX);
            self.push(
                Pass::Layer,
                DrawOp::Text {
                    text: token.name.clone(),
                    at: Point::new(below.x - width / 2.0, below.y + NAME_FONT_PX + 2.0),
                    color: TOKEN_NAME_COLOR,
                    size: NAME_FONT_PX,
                },
            );
        }
    }
}
