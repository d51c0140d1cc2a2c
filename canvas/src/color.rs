//! Color parsing and contrast helpers.
//!
//! Scene colors are stored as CSS strings (`#rgb`, `#rrggbb`, `#rrggbbaa`,
//! `rgb(..)`, `rgba(..)`). The raster backend and the grid-contrast rule need
//! them as channels, so everything funnels through [`Rgba::parse`].

#[cfg(test)]
#[path = "color_test.rs"]
mod color_test;

/// Grid line color used on light backgrounds.
pub const GRID_LINE_DARK: &str = "rgba(0, 0, 0, 0.2)";

/// Grid line color used on dark backgrounds.
pub const GRID_LINE_LIGHT: &str = "rgba(255, 255, 255, 0.2)";

/// Brightness above which a background counts as light.
const BRIGHTNESS_THRESHOLD: f64 = 128.0;

/// An 8-bit-per-channel color with straight (non-premultiplied) alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Self = Self::opaque(0, 0, 0);
    pub const WHITE: Self = Self::opaque(255, 255, 255);

    #[must_use]
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse a CSS color string. Returns `None` for anything unrecognized.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if let Some(hex) = trimmed.strip_prefix('#') {
            return parse_hex(hex);
        }
        let lower = trimmed.to_ascii_lowercase();
        if let Some(body) = lower.strip_prefix("rgba(").and_then(|s| s.strip_suffix(')')) {
            return parse_functional(body, true);
        }
        if let Some(body) = lower.strip_prefix("rgb(").and_then(|s| s.strip_suffix(')')) {
            return parse_functional(body, false);
        }
        None
    }

    /// Perceptual brightness on a 0–255 scale: `(299 R + 587 G + 114 B) / 1000`.
    #[must_use]
    pub fn brightness(self) -> f64 {
        (299.0 * f64::from(self.r) + 587.0 * f64::from(self.g) + 114.0 * f64::from(self.b)) / 1000.0
    }

    /// Same color with alpha scaled by `factor` (0.0–1.0).
    #[must_use]
    pub fn with_alpha_scaled(self, factor: f64) -> Self {
        let a = (f64::from(self.a) * factor.clamp(0.0, 1.0)).round();
        Self { a: channel_from_f64(a), ..self }
    }

    /// Canonical lowercase `#rrggbb` (alpha dropped).
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    if !hex.is_ascii() {
        return None;
    }
    let nibble = |i: usize| hex_byte(&hex[i..=i].repeat(2));
    let byte = |i: usize| hex_byte(&hex[i..i + 2]);
    match hex.len() {
        3 => Some(Rgba::opaque(nibble(0)?, nibble(1)?, nibble(2)?)),
        6 => Some(Rgba::opaque(byte(0)?, byte(2)?, byte(4)?)),
        8 => Some(Rgba { r: byte(0)?, g: byte(2)?, b: byte(4)?, a: byte(6)? }),
        _ => None,
    }
}

fn hex_byte(digits: &str) -> Option<u8> {
    match u8::from_str_radix(digits, 16) {
        Ok(v) => Some(v),
        Err(_) => None,
    }
}

fn parse_number(s: &str) -> Option<f64> {
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => None,
    }
}

fn parse_functional(body: &str, with_alpha: bool) -> Option<Rgba> {
    let parts: Vec<&str> = body.split(',').map(str::trim).collect();
    let expected = if with_alpha { 4 } else { 3 };
    if parts.len() != expected {
        return None;
    }
    let channel = |s: &str| parse_number(s).map(|v| channel_from_f64(v.round()));
    let a = if with_alpha {
        let alpha = parse_number(parts[3])?;
        channel_from_f64((alpha.clamp(0.0, 1.0) * 255.0).round())
    } else {
        255
    };
    Some(Rgba { r: channel(parts[0])?, g: channel(parts[1])?, b: channel(parts[2])?, a })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn channel_from_f64(v: f64) -> u8 {
    v.clamp(0.0, 255.0) as u8
}

/// Pick a grid line color that contrasts with `background`.
///
/// Unparseable backgrounds are treated as white.
#[must_use]
pub fn grid_line_color(background: &str) -> &'static str {
    let bg = Rgba::parse(background).unwrap_or(Rgba::WHITE);
    if bg.brightness() > BRIGHTNESS_THRESHOLD {
        GRID_LINE_DARK
    } else {
        GRID_LINE_LIGHT
    }
}

/// Normalize a color to canonical lowercase `#rrggbb`, falling back when unparseable.
#[must_use]
pub fn normalize_hex_color(value: &str, fallback: &str) -> String {
    Rgba::parse(value)
        .or_else(|| Rgba::parse(fallback))
        .unwrap_or(Rgba::WHITE)
        .to_hex()
}
