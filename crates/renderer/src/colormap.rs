//! Colormaps mapping normalized values in [0, 1] to colors.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RenderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    pub const fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }

    pub fn to_rgba(self) -> image::Rgba<u8> {
        image::Rgba([self.r, self.g, self.b, self.a])
    }

    /// Parse `#RRGGBB` or `#RRGGBBAA`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        match hex.len() {
            6 => Some(Self::rgb(channel(0)?, channel(2)?, channel(4)?)),
            8 => Some(Self::new(channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
            _ => None,
        }
    }

    /// Alpha-blend `over` on top of this color, with `over.a` as weight.
    pub fn blend(self, over: Color) -> Color {
        let t = over.a as f32 / 255.0;
        let mix = |a: u8, b: u8| (a as f32 * (1.0 - t) + b as f32 * t).round() as u8;
        Color::new(mix(self.r, over.r), mix(self.g, over.g), mix(self.b, over.b), self.a.max(over.a))
    }
}

/// Linear interpolation between two colors, `t` clamped to [0, 1].
pub fn interpolate_color(from: Color, to: Color, t: f32) -> Color {
    let t = t.clamp(0.0, 1.0);
    let lerp = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
    Color::new(
        lerp(from.r, to.r),
        lerp(from.g, to.g),
        lerp(from.b, to.b),
        lerp(from.a, to.a),
    )
}

// Stops are evenly spaced over [0, 1].
const VIRIDIS: [Color; 9] = [
    Color::rgb(68, 1, 84),
    Color::rgb(71, 45, 123),
    Color::rgb(59, 82, 139),
    Color::rgb(44, 114, 142),
    Color::rgb(33, 145, 140),
    Color::rgb(40, 174, 128),
    Color::rgb(94, 201, 98),
    Color::rgb(173, 220, 48),
    Color::rgb(253, 231, 37),
];

const COOLWARM: [Color; 5] = [
    Color::rgb(59, 76, 192),
    Color::rgb(141, 176, 254),
    Color::rgb(221, 221, 221),
    Color::rgb(244, 154, 123),
    Color::rgb(180, 4, 38),
];

const GRAY: [Color; 2] = [Color::rgb(0, 0, 0), Color::rgb(255, 255, 255)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Colormap {
    #[default]
    Gray,
    Viridis,
    /// Diverging map, suited to residuals centred on zero.
    Coolwarm,
}

impl Colormap {
    pub const ALL: [Colormap; 3] = [Colormap::Gray, Colormap::Viridis, Colormap::Coolwarm];

    fn stops(&self) -> &'static [Color] {
        match self {
            Colormap::Gray => &GRAY,
            Colormap::Viridis => &VIRIDIS,
            Colormap::Coolwarm => &COOLWARM,
        }
    }

    /// Color of a normalized value. Values outside [0, 1] are clamped.
    pub fn color_at(&self, t: f32) -> Color {
        let stops = self.stops();
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let segments = (stops.len() - 1) as f32;
        let pos = t * segments;
        let i = (pos.floor() as usize).min(stops.len() - 2);
        interpolate_color(stops[i], stops[i + 1], pos - i as f32)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Colormap::Gray => "gray",
            Colormap::Viridis => "viridis",
            Colormap::Coolwarm => "coolwarm",
        }
    }
}

impl fmt::Display for Colormap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Colormap {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gray" | "grey" => Ok(Colormap::Gray),
            "viridis" => Ok(Colormap::Viridis),
            "coolwarm" => Ok(Colormap::Coolwarm),
            _ => Err(RenderError::UnknownName {
                kind: "colormap",
                value: s.to_string(),
            }),
        }
    }
}
