//! Inbound legacy message parsing.
//!
//! ```text
//! { "id": "right-banner-alert", "plugin": "Right Banner", "kind": "text",
//!   "ttl": 4, "text": "Hull 40%", "color": "red", "size": "large", "x": 640, "y": 0 }
//! { "id": "box-1", "shape": "rect", "ttl": 0, "x": 10, "y": 10, "w": 200, "h": 50,
//!   "color": "#80FF0000", "fill": "#40000000" }
//! { "id": "route", "kind": "vect", "vector": [{"x": 0, "y": 0, "marker": "circle", "text": "A"},
//!   {"x": 100, "y": 50}] }
//! { "id": "right-banner-alert", "text": "" }          // clear
//! { "id": "box-1", "ttl": 0 }                         // clear
//! ```

use serde::Deserialize;

use super::types::{Payload, PayloadKind, VectorPoint};
use crate::error::{HudError, HudResult};
use crate::style::{Color, MarkerShape, SizePreset};

/// Minimum number of points a vector payload needs.
pub const MIN_VECTOR_POINTS: usize = 2;

#[derive(Debug, Deserialize)]
struct RawMessage {
    id: Option<String>,
    #[serde(default)]
    plugin: Option<String>,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    shape: Option<String>,
    #[serde(default)]
    ttl: Option<f64>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    fill: Option<String>,
    #[serde(default)]
    size: Option<String>,
    #[serde(default)]
    x: Option<f64>,
    #[serde(default)]
    y: Option<f64>,
    #[serde(default)]
    w: Option<f64>,
    #[serde(default)]
    h: Option<f64>,
    #[serde(default)]
    vector: Option<Vec<RawPoint>>,
}

#[derive(Debug, Deserialize)]
struct RawPoint {
    x: f64,
    y: f64,
    #[serde(default)]
    marker: Option<String>,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

impl RawMessage {
    fn has_content(&self) -> bool {
        self.text.is_some()
            || self.x.is_some()
            || self.y.is_some()
            || self.w.is_some()
            || self.h.is_some()
            || self.vector.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MessageKind {
    Text,
    Rect,
    Vector,
}

impl MessageKind {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" | "message" => Some(Self::Text),
            "rect" | "rectangle" => Some(Self::Rect),
            "vect" | "vector" => Some(Self::Vector),
            _ => None,
        }
    }
}

/// What the registry should do with a message.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageAction {
    Upsert(Payload),
    Clear { id: String },
}

/// A parsed message plus any non-fatal normalizations applied to it.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedMessage {
    pub action: MessageAction,
    pub warnings: Vec<String>,
}

/// Parse one inbound message. `default_ttl` applies when `ttl` is absent.
pub fn parse_message(json: &str, default_ttl: f64) -> HudResult<ParsedMessage> {
    let raw: RawMessage =
        serde_json::from_str(json).map_err(|e| HudError::MalformedPayload(e.to_string()))?;

    let id = raw
        .id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| HudError::MalformedPayload("message has no id".to_string()))?
        .to_string();

    let ttl = raw.ttl.unwrap_or(default_ttl);
    if !ttl.is_finite() {
        return Err(HudError::MalformedPayload(format!("{}: ttl is not finite", id)));
    }

    if ttl <= 0.0 && !raw.has_content() {
        return Ok(ParsedMessage {
            action: MessageAction::Clear { id },
            warnings: Vec::new(),
        });
    }

    let declared = raw.kind.as_deref().or(raw.shape.as_deref());
    let kind = match declared {
        Some(value) => MessageKind::parse(value).ok_or_else(|| {
            HudError::MalformedPayload(format!("{}: unknown kind '{}'", id, value))
        })?,
        None if raw.text.is_some() => MessageKind::Text,
        None => {
            return Err(HudError::MalformedPayload(format!(
                "{}: cannot infer payload kind",
                id
            )))
        }
    };

    let mut warnings = Vec::new();
    let color = parse_color(&id, "color", raw.color.as_deref(), &mut warnings).unwrap_or(Color::WHITE);
    let size = match raw.size.as_deref() {
        None => SizePreset::Normal,
        Some(value) => SizePreset::parse(value).unwrap_or_else(|| {
            warnings.push(format!("{}: unknown size '{}', using normal", id, value));
            SizePreset::Normal
        }),
    };

    let kind = match kind {
        MessageKind::Text => {
            let text = raw.text.unwrap_or_default();
            if text.is_empty() {
                return Ok(ParsedMessage {
                    action: MessageAction::Clear { id },
                    warnings,
                });
            }
            PayloadKind::Text {
                text,
                x: raw.x.unwrap_or(0.0),
                y: raw.y.unwrap_or(0.0),
                color,
                size,
            }
        }
        MessageKind::Rect => {
            let (Some(w), Some(h)) = (raw.w, raw.h) else {
                return Err(HudError::MalformedPayload(format!(
                    "{}: rectangle needs w and h",
                    id
                )));
            };
            let fill = parse_color(&id, "fill", raw.fill.as_deref(), &mut warnings);
            PayloadKind::Rect {
                x: raw.x.unwrap_or(0.0),
                y: raw.y.unwrap_or(0.0),
                w,
                h,
                color,
                fill,
            }
        }
        MessageKind::Vector => {
            let raw_points = raw.vector.unwrap_or_default();
            if raw_points.len() < MIN_VECTOR_POINTS {
                return Err(HudError::InsufficientVectorPoints {
                    id,
                    count: raw_points.len(),
                });
            }
            let points = raw_points
                .into_iter()
                .map(|point| {
                    let marker = point.marker.as_deref().and_then(|value| {
                        let shape = MarkerShape::parse(value);
                        if shape.is_none() {
                            warnings.push(format!("{}: unknown marker '{}' ignored", id, value));
                        }
                        shape
                    });
                    VectorPoint {
                        x: point.x,
                        y: point.y,
                        marker,
                        color: parse_color(&id, "point color", point.color.as_deref(), &mut warnings),
                        text: point.text.filter(|t| !t.is_empty()),
                    }
                })
                .collect();
            PayloadKind::Vector {
                points,
                color,
                size,
            }
        }
    };

    Ok(ParsedMessage {
        action: MessageAction::Upsert(Payload {
            id,
            plugin: raw
                .plugin
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty()),
            ttl,
            kind,
        }),
        warnings,
    })
}

/// Parse an optional color field; unknown values become white with a warning.
fn parse_color(id: &str, field: &str, value: Option<&str>, warnings: &mut Vec<String>) -> Option<Color> {
    let value = value?;
    if value.trim().is_empty() {
        return None;
    }
    Some(Color::parse(value).unwrap_or_else(|| {
        warnings.push(format!("{}: unknown {} '{}', using white", id, field, value));
        Color::WHITE
    }))
}
