//! Per-tick layout output handed to the rendering surface.

use std::sync::Arc;

use serde::Serialize;

use crate::config::GroupKey;
use crate::geometry::{Bounds, Coord, Size, SurfaceMapping, SurfaceSpace};
use crate::style::{Color, MarkerShape, SizePreset};

/// A label attached to a vector marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedLabel {
    /// Top-left corner of the label text.
    pub origin: Coord<SurfaceSpace>,
    pub text: String,
    pub font_px: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedPoint {
    pub position: Coord<SurfaceSpace>,
    pub marker: Option<MarkerShape>,
    pub marker_radius: f64,
    pub color: Color,
    pub label: Option<RenderedLabel>,
}

/// Final surface geometry of one payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RenderedGeometry {
    #[serde(rename_all = "camelCase")]
    Text {
        origin: Coord<SurfaceSpace>,
        text: String,
        color: Color,
        size: SizePreset,
        font_px: f64,
    },
    Rect {
        bounds: Bounds<SurfaceSpace>,
        color: Color,
        fill: Option<Color>,
    },
    Vector {
        points: Vec<RenderedPoint>,
        color: Color,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedPayload {
    pub id: String,
    pub plugin: Option<Arc<str>>,
    pub group: Option<GroupKey>,
    pub geometry: RenderedGeometry,
    pub bounds: Bounds<SurfaceSpace>,
}

impl RenderedPayload {
    /// Move the whole payload by a surface-space delta.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        if dx == 0.0 && dy == 0.0 {
            return;
        }
        self.bounds = self.bounds.translate(dx, dy);
        match &mut self.geometry {
            RenderedGeometry::Text { origin, .. } => *origin = origin.translate(dx, dy),
            RenderedGeometry::Rect { bounds, .. } => *bounds = bounds.translate(dx, dy),
            RenderedGeometry::Vector { points, .. } => {
                for point in points {
                    point.position = point.position.translate(dx, dy);
                    if let Some(label) = &mut point.label {
                        label.origin = label.origin.translate(dx, dy);
                    }
                }
            }
        }
    }
}

/// Background drawn behind a group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupBackground {
    pub color: Color,
    /// Border width in surface pixels.
    pub border_width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedGroup {
    pub key: GroupKey,
    /// Union of the members' final bounds.
    pub bounds: Bounds<SurfaceSpace>,
    pub anchor_point: Coord<SurfaceSpace>,
    pub background: Option<GroupBackground>,
}

/// Everything the renderer needs for one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameOutput {
    pub surface: Size<SurfaceSpace>,
    pub mapping: SurfaceMapping,
    /// Generation of the grouping snapshot the frame was built from.
    pub generation: u64,
    /// Sorted by payload id.
    pub payloads: Vec<RenderedPayload>,
    /// Sorted by group key; only groups with visible members.
    pub groups: Vec<RenderedGroup>,
}

impl FrameOutput {
    pub fn payload(&self, id: &str) -> Option<&RenderedPayload> {
        self.payloads.iter().find(|p| p.id == id)
    }

    pub fn group(&self, key: &GroupKey) -> Option<&RenderedGroup> {
        self.groups.iter().find(|g| &g.key == key)
    }
}
