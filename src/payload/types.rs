//! Payload model in virtual-canvas units.

use serde::Serialize;

use crate::geometry::{Bounds, CanvasSpace, Coord};
use crate::style::{Color, MarkerShape, SizePreset};

/// One point of a vector payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorPoint {
    pub x: f64,
    pub y: f64,
    pub marker: Option<MarkerShape>,
    /// Falls back to the payload color when absent.
    pub color: Option<Color>,
    /// Optional label drawn next to the marker.
    pub text: Option<String>,
}

impl VectorPoint {
    pub fn position(&self) -> Coord<CanvasSpace> {
        Coord::new(self.x, self.y)
    }
}

/// Kind-specific geometry and style.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PayloadKind {
    /// Text whose top-left corner sits at (`x`, `y`).
    Text {
        text: String,
        x: f64,
        y: f64,
        color: Color,
        size: SizePreset,
    },
    /// Rectangle outline, optionally filled.
    Rect {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        color: Color,
        fill: Option<Color>,
    },
    /// Polyline through `points`, with optional markers and labels.
    Vector {
        points: Vec<VectorPoint>,
        color: Color,
        size: SizePreset,
    },
}

/// A live annotation. Replaced wholesale on every upsert, never merged.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    pub id: String,
    /// Explicit owning-plugin tag, if the producer sent one.
    pub plugin: Option<String>,
    /// Seconds to live; `<= 0` is persistent.
    pub ttl: f64,
    #[serde(flatten)]
    pub kind: PayloadKind,
}

impl Payload {
    pub fn is_persistent(&self) -> bool {
        self.ttl <= 0.0
    }

    pub fn is_vector(&self) -> bool {
        matches!(self.kind, PayloadKind::Vector { .. })
    }

    /// Canvas extent of the raw geometry. Text extent depends on measurement
    /// and is computed by the layout pipeline instead.
    pub fn shape_bounds(&self) -> Option<Bounds<CanvasSpace>> {
        match &self.kind {
            PayloadKind::Text { .. } => None,
            PayloadKind::Rect { x, y, w, h, .. } => Some(Bounds::from_xywh(*x, *y, *w, *h)),
            PayloadKind::Vector { points, .. } => Some(
                points
                    .iter()
                    .fold(Bounds::empty(), |acc, p| acc.include_point(p.position())),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_shape_bounds_normalizes_negative_size() {
        let payload = Payload {
            id: "r".to_string(),
            plugin: None,
            ttl: 4.0,
            kind: PayloadKind::Rect {
                x: 100.0,
                y: 100.0,
                w: -50.0,
                h: 20.0,
                color: Color::WHITE,
                fill: None,
            },
        };
        let bounds = payload.shape_bounds().unwrap();
        assert_eq!(bounds.min_x, 50.0);
        assert_eq!(bounds.max_x, 100.0);
        assert!(!payload.is_persistent());
    }

    #[test]
    fn test_vector_shape_bounds_covers_points() {
        let point = |x, y| VectorPoint {
            x,
            y,
            marker: None,
            color: None,
            text: None,
        };
        let payload = Payload {
            id: "v".to_string(),
            plugin: None,
            ttl: 0.0,
            kind: PayloadKind::Vector {
                points: vec![point(10.0, 40.0), point(30.0, 5.0)],
                color: Color::WHITE,
                size: SizePreset::Normal,
            },
        };
        let bounds = payload.shape_bounds().unwrap();
        assert_eq!((bounds.min_x, bounds.min_y, bounds.max_x, bounds.max_y), (10.0, 5.0, 30.0, 40.0));
        assert!(payload.is_persistent());
        assert!(payload.is_vector());
    }

    #[test]
    fn test_payload_serializes_flat_kind() {
        let payload = Payload {
            id: "t".to_string(),
            plugin: Some("Right Banner".to_string()),
            ttl: 4.0,
            kind: PayloadKind::Text {
                text: "hello".to_string(),
                x: 1.0,
                y: 2.0,
                color: Color::WHITE,
                size: SizePreset::Large,
            },
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["kind"], "text");
        assert_eq!(value["text"], "hello");
        assert_eq!(value["size"], "large");
    }
}
