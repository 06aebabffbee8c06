//! Color and size styling shared by payloads and groups.

use serde::{Deserialize, Serialize};

/// ARGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub a: u8,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(0xff, 0xff, 0xff);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { a: 0xff, r, g, b }
    }

    /// Parse `#RRGGBB` or `#AARRGGBB`.
    pub fn parse_hex(value: &str) -> Option<Self> {
        let hex = value.trim().strip_prefix('#')?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        match hex.len() {
            6 => Some(Self::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Some(Self {
                a: byte(0)?,
                r: byte(2)?,
                g: byte(4)?,
                b: byte(6)?,
            }),
            _ => None,
        }
    }

    /// Parse a hex color or one of the legacy named colors.
    pub fn parse(value: &str) -> Option<Self> {
        if let Some(color) = Self::parse_hex(value) {
            return Some(color);
        }
        let named = match value.trim().to_ascii_lowercase().as_str() {
            "red" => Self::rgb(0xff, 0x00, 0x00),
            "green" => Self::rgb(0x00, 0xff, 0x00),
            "yellow" => Self::rgb(0xff, 0xff, 0x00),
            "blue" => Self::rgb(0x00, 0x00, 0xff),
            "white" => Self::WHITE,
            "black" => Self::rgb(0x00, 0x00, 0x00),
            "orange" => Self::rgb(0xff, 0xa5, 0x00),
            "grey" | "gray" => Self::rgb(0x80, 0x80, 0x80),
            "cyan" => Self::rgb(0x00, 0xff, 0xff),
            "magenta" => Self::rgb(0xff, 0x00, 0xff),
            _ => return None,
        };
        Some(named)
    }

    /// `#AARRGGBB` form.
    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}{:02X}", self.a, self.r, self.g, self.b)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

/// Legacy text/marker size presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum SizePreset {
    Small,
    #[default]
    Normal,
    Large,
    Huge,
}

/// Font sizes the renderer is allowed to use, in surface pixels.
pub const FONT_LADDER: [f64; 16] = [
    6.0, 8.0, 10.0, 12.0, 14.0, 16.0, 18.0, 20.0, 24.0, 28.0, 32.0, 36.0, 42.0, 48.0, 56.0, 64.0,
];

impl SizePreset {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "small" => Some(Self::Small),
            "normal" | "medium" => Some(Self::Normal),
            "large" => Some(Self::Large),
            "huge" => Some(Self::Huge),
            _ => None,
        }
    }

    /// Nominal font size in canvas pixels.
    pub fn canvas_px(&self) -> f64 {
        match self {
            SizePreset::Small => 10.0,
            SizePreset::Normal => 12.0,
            SizePreset::Large => 16.0,
            SizePreset::Huge => 24.0,
        }
    }

    /// Surface font size at `scale`, snapped to [`FONT_LADDER`].
    pub fn surface_px(&self, scale: f64) -> f64 {
        snap_to_ladder(self.canvas_px() * scale)
    }
}

/// Nearest ladder rung to `px`; ties go to the smaller rung.
pub fn snap_to_ladder(px: f64) -> f64 {
    if !px.is_finite() {
        return SizePreset::Normal.canvas_px();
    }
    let mut best = FONT_LADDER[0];
    for rung in FONT_LADDER {
        if (rung - px).abs() < (best - px).abs() {
            best = rung;
        }
    }
    best
}

/// Marker glyph drawn at a vector point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MarkerShape {
    Circle,
    Cross,
    Triangle,
    Square,
}

impl MarkerShape {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "circle" => Some(Self::Circle),
            "cross" => Some(Self::Cross),
            "triangle" => Some(Self::Triangle),
            "square" => Some(Self::Square),
            _ => None,
        }
    }
}

/// Marker radius in canvas pixels.
pub const MARKER_RADIUS: f64 = 6.0;
