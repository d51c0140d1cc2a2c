//! Raster backend: executes a [`Frame`] on a `tiny-skia` pixmap.
//!
//! Geometry is drawn through two transforms: world commands through the
//! camera (scaled by the device pixel ratio), screen commands through the
//! pixel ratio alone. Fog is painted on its own pixmap (opaque black, reveal
//! polygons cleared with [`BlendMode::Clear`]) and composited on top, so
//! reveals punch holes in the fog only and never in the map below.
//!
//! ERROR HANDLING
//! ==============
//! Allocation and encoding failures are returned as [`RasterError`]. Bad
//! geometry (empty paths, zero-size rects, missing images) draws nothing.

#[cfg(test)]
#[path = "raster_test.rs"]
mod raster_test;

use std::collections::HashMap;

use tiny_skia::{
    BlendMode, Color, ColorU8, FillRule, FilterQuality, LineCap, LineJoin, Paint, Path, PathBuilder, Pattern,
    Pixmap, PixmapPaint, SpreadMode, Stroke, StrokeDash, Transform,
};

use crate::camera::{Camera, Point};
use crate::color::Rgba;
use crate::grid::{Rect, points_of};
use crate::render::{DrawOp, Frame, Pass, Space, StrokeStyle, text_width};

/// Decoded images keyed by URL.
pub type ImageSource = HashMap<String, Pixmap>;

#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[error("cannot allocate a {width}x{height} pixmap")]
    Alloc { width: u32, height: u32 },
    #[error("image decode failed: {0}")]
    Decode(#[from] image::ImageError),
    #[error("png encode failed: {0}")]
    Encode(String),
}

/// Text that the pixmap cannot draw itself; the host draws it on top.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    /// Left baseline, CSS pixels.
    pub at: Point,
    pub color: Rgba,
    pub size: f64,
}

/// Result of rasterizing one frame.
pub struct RasterOutput {
    pub pixmap: Pixmap,
    /// The fog pixmap as composited, when fog is on.
    pub fog: Option<Pixmap>,
    /// Text runs still visible after fog, in draw order.
    pub texts: Vec<TextRun>,
}

impl RasterOutput {
    /// Straight-alpha RGBA bytes, as `ImageData` expects.
    #[must_use]
    pub fn to_rgba8(&self) -> Vec<u8> {
        to_rgba8(&self.pixmap)
    }

    /// PNG-encode the pixmap.
    ///
    /// # Errors
    ///
    /// [`RasterError::Encode`] if the encoder fails.
    pub fn encode_png(&self) -> Result<Vec<u8>, RasterError> {
        self.pixmap.encode_png().map_err(|e| RasterError::Encode(e.to_string()))
    }
}

/// Unpremultiply a pixmap into RGBA bytes.
#[must_use]
pub fn to_rgba8(pixmap: &Pixmap) -> Vec<u8> {
    pixmap
        .pixels()
        .iter()
        .flat_map(|p| {
            let c = p.demultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
        .collect()
}

/// Decode PNG or JPEG bytes into a premultiplied pixmap.
///
/// # Errors
///
/// [`RasterError::Decode`] for unreadable bytes, [`RasterError::Alloc`] for
/// an empty image.
pub fn decode_image(bytes: &[u8]) -> Result<Pixmap, RasterError> {
    let rgba = image::load_from_memory(bytes)?.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut pixmap = Pixmap::new(width, height).ok_or(RasterError::Alloc { width, height })?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(rgba.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Ok(pixmap)
}

/// Rasterize `frame` at `dpr` device pixels per CSS pixel.
///
/// # Errors
///
/// [`RasterError::Alloc`] if the viewport is empty or too large.
pub fn paint(frame: &Frame, images: &ImageSource, dpr: f64) -> Result<RasterOutput, RasterError> {
    let (width, height) = device_size(frame.viewport.width, frame.viewport.height, dpr);
    let mut pixmap = Pixmap::new(width, height).ok_or(RasterError::Alloc { width, height })?;
    let mut fog: Option<FogLayer> = None;
    let mut texts: Vec<TextRun> = Vec::new();

    let canvas = Canvas {
        world: world_transform(&frame.camera, dpr),
        screen: Transform::from_scale(f(dpr), f(dpr)),
        zoom: frame.camera.zoom,
    };

    for cmd in &frame.commands {
        if cmd.pass > Pass::Fog {
            settle_fog(&mut pixmap, fog.as_mut(), &mut texts, dpr);
        }
        match &cmd.op {
            DrawOp::FogBase => {
                let mut layer = Pixmap::new(width, height).ok_or(RasterError::Alloc { width, height })?;
                layer.fill(Color::BLACK);
                fog = Some(FogLayer { pixmap: layer, composited: false });
            }
            DrawOp::FogReveal { points } => {
                if let (Some(layer), Some(path)) = (fog.as_mut(), polygon(points, true)) {
                    let mut clear = Paint::default();
                    clear.blend_mode = BlendMode::Clear;
                    clear.anti_alias = true;
                    layer.pixmap.fill_path(&path, &clear, FillRule::Winding, canvas.world, None);
                }
            }
            DrawOp::Text { text, at, color: c, size } => {
                texts.push(TextRun { text: text.clone(), at: *at, color: *c, size: *size });
            }
            op => canvas.draw(&mut pixmap, op, images),
        }
    }
    settle_fog(&mut pixmap, fog.as_mut(), &mut texts, dpr);

    Ok(RasterOutput { pixmap, fog: fog.map(|l| l.pixmap), texts })
}

struct FogLayer {
    pixmap: Pixmap,
    composited: bool,
}

/// Composite the fog once and drop the text runs it fully covers.
fn settle_fog(target: &mut Pixmap, fog: Option<&mut FogLayer>, texts: &mut Vec<TextRun>, dpr: f64) {
    let Some(layer) = fog else {
        return;
    };
    if layer.composited {
        return;
    }
    target.draw_pixmap(0, 0, layer.pixmap.as_ref(), &PixmapPaint::default(), Transform::identity(), None);
    texts.retain(|run| !is_fogged(&layer.pixmap, run, dpr));
    layer.composited = true;
}

/// Whether the middle of a text run sits under opaque fog.
fn is_fogged(fog: &Pixmap, run: &TextRun, dpr: f64) -> bool {
    let mid_x = (run.at.x + text_width(&run.text, run.size) / 2.0) * dpr;
    let mid_y = (run.at.y - run.size / 2.0) * dpr;
    if mid_x < 0.0 || mid_y < 0.0 {
        return false;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let (x, y) = (mid_x as u32, mid_y as u32);
    fog.pixel(x, y).is_some_and(|p| p.alpha() == u8::MAX)
}

fn device_size(width: f64, height: f64, dpr: f64) -> (u32, u32) {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let px = |v: f64| (v * dpr).ceil().max(0.0) as u32;
    (px(width), px(height))
}

fn world_transform(camera: &Camera, dpr: f64) -> Transform {
    let s = camera.zoom * dpr;
    Transform::from_row(f(s), 0.0, 0.0, f(s), f(camera.pan_x * dpr), f(camera.pan_y * dpr))
}

#[allow(clippy::cast_possible_truncation)]
fn f(v: f64) -> f32 {
    v as f32
}

pub(crate) fn color(c: Rgba) -> Color {
    Color::from_rgba8(c.r, c.g, c.b, c.a)
}

pub(crate) fn solid(c: Rgba) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(color(c));
    paint.anti_alias = true;
    paint
}

fn stroke(style: &StrokeStyle) -> Stroke {
    let mut s = Stroke { width: f(style.width), line_cap: LineCap::Round, line_join: LineJoin::Round, ..Stroke::default() };
    if let Some([on, off]) = style.dash {
        s.dash = StrokeDash::new(vec![f(on), f(off)], 0.0);
    }
    s
}

fn polygon(points: &[f64], closed: bool) -> Option<Path> {
    let mut pb = PathBuilder::new();
    let mut pts = points_of(points);
    let first = pts.next()?;
    pb.move_to(f(first.x), f(first.y));
    for p in pts {
        pb.line_to(f(p.x), f(p.y));
    }
    if closed {
        pb.close();
    }
    pb.finish()
}

fn rect_path(r: &Rect) -> Option<Path> {
    tiny_skia::Rect::from_xywh(f(r.x), f(r.y), f(r.width), f(r.height)).map(PathBuilder::from_rect)
}

struct Canvas {
    world: Transform,
    screen: Transform,
    zoom: f64,
}

impl Canvas {
    fn space(&self, space: Space) -> Transform {
        match space {
            Space::World => self.world,
            Space::Screen => self.screen,
        }
    }

    fn fill_and_stroke(&self, pixmap: &mut Pixmap, path: &Path, fill: Option<Rgba>, outline: Option<&StrokeStyle>, ts: Transform) {
        if let Some(c) = fill {
            pixmap.fill_path(path, &solid(c), FillRule::Winding, ts, None);
        }
        if let Some(style) = outline {
            pixmap.stroke_path(path, &solid(style.color), &stroke(style), ts, None);
        }
    }

    fn draw(&self, pixmap: &mut Pixmap, op: &DrawOp, images: &ImageSource) {
        match op {
            DrawOp::Fill { color: c } => pixmap.fill(color(*c)),
            DrawOp::Grid { area, spacing, color: c } => self.grid(pixmap, area, *spacing, *c),
            DrawOp::Rect { rect, fill, stroke: outline, space } => {
                if let Some(path) = rect_path(rect) {
                    self.fill_and_stroke(pixmap, &path, *fill, outline.as_ref(), self.space(*space));
                }
            }
            DrawOp::Circle { center, radius, fill, stroke: outline } => {
                if let Some(path) = PathBuilder::from_circle(f(center.x), f(center.y), f(*radius)) {
                    self.fill_and_stroke(pixmap, &path, *fill, outline.as_ref(), self.world);
                }
            }
            DrawOp::Polyline { points, stroke: style, closed, space } => {
                if let Some(path) = polygon(points, *closed) {
                    pixmap.stroke_path(&path, &solid(style.color), &stroke(style), self.space(*space), None);
                }
            }
            DrawOp::Image { src, rect, rotation } => {
                let Some(image) = images.get(src) else {
                    return;
                };
                let Some(path) = rect_path(&Rect::new(0.0, 0.0, rect.width, rect.height)) else {
                    return;
                };
                let ts = self.world.pre_concat(
                    Transform::from_translate(f(rect.x), f(rect.y)).pre_concat(Transform::from_rotate(f(*rotation))),
                );
                let fit = Transform::from_scale(
                    f(rect.width) / image_width(image),
                    f(rect.height) / image_height(image),
                );
                let mut paint = Paint::default();
                paint.shader = Pattern::new(image.as_ref(), SpreadMode::Pad, FilterQuality::Bilinear, 1.0, fit);
                paint.anti_alias = true;
                pixmap.fill_path(&path, &paint, FillRule::Winding, ts, None);
            }
            DrawOp::TokenImage { src, center, radius, fallback } => {
                let Some(path) = PathBuilder::from_circle(f(center.x), f(center.y), f(*radius)) else {
                    return;
                };
                let Some(image) = images.get(src) else {
                    pixmap.fill_path(&path, &solid(*fallback), FillRule::Winding, self.world, None);
                    return;
                };
                let side = f(radius * 2.0);
                let fit = Transform::from_row(
                    side / image_width(image),
                    0.0,
                    0.0,
                    side / image_height(image),
                    f(center.x - radius),
                    f(center.y - radius),
                );
                let mut paint = Paint::default();
                paint.shader = Pattern::new(image.as_ref(), SpreadMode::Pad, FilterQuality::Bilinear, 1.0, fit);
                paint.anti_alias = true;
                pixmap.fill_path(&path, &paint, FillRule::Winding, self.world, None);
            }
            DrawOp::FogBase | DrawOp::FogReveal { .. } | DrawOp::Text { .. } => {}
        }
    }

    fn grid(&self, pixmap: &mut Pixmap, area: &Rect, spacing: f64, c: Rgba) {
        if spacing <= 0.0 {
            return;
        }
        let mut pb = PathBuilder::new();
        let mut x = (area.x / spacing).floor() * spacing;
        while x <= area.right() {
            pb.move_to(f(x), f(area.y));
            pb.line_to(f(x), f(area.bottom()));
            x += spacing;
        }
        let mut y = (area.y / spacing).floor() * spacing;
        while y <= area.bottom() {
            pb.move_to(f(area.x), f(y));
            pb.line_to(f(area.right()), f(y));
            y += spacing;
        }
        let Some(path) = pb.finish() else {
            return;
        };
        let line = StrokeStyle::solid(c, 1.0 / self.zoom);
        pixmap.stroke_path(&path, &solid(c), &stroke(&line), self.world, None);
    }
}

#[allow(clippy::cast_precision_loss)]
fn image_width(image: &Pixmap) -> f32 {
    image.width() as f32
}

#[allow(clippy::cast_precision_loss)]
fn image_height(image: &Pixmap) -> f32 {
    image.height() as f32
}
