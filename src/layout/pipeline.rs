//! Per-tick layout transform.
//!
//! [`compute_frame`] is a pure function of the classified payloads, one
//! grouping snapshot, the surface size, and the settings. Each group (or
//! each ungrouped payload on its own) goes through, in order:
//!
//! 1. offset: the group's `offsetX/offsetY` added in canvas space
//! 2. anchor: the anchor point of the offset group box becomes the reference
//! 3. justification: narrower text/rect members aligned to the widest one
//! 4. scaling: canvas → surface, with the anchor remapped under `fill`
//! 5. nudge: the group moved back inside the surface, as a unit

use std::collections::BTreeMap;

use crate::config::{
    Anchor, GroupKey, GroupSpec, GroupingSnapshot, Justification, MarkerLabelPosition,
    OverlaySettings,
};
use crate::geometry::{Bounds, CanvasSpace, Coord, Size, SurfaceMapping, SurfaceSpace};
use crate::payload::{Payload, PayloadKind};
use crate::resolver::ClassifiedPayload;
use crate::style::{snap_to_ladder, MARKER_RADIUS};

use super::measure::TextMeasurer;
use super::output::{
    FrameOutput, GroupBackground, RenderedGeometry, RenderedGroup, RenderedLabel, RenderedPayload,
    RenderedPoint,
};
use super::scale::{anchor_shift, base_mapping};

/// Gap between a marker and its label, in surface pixels at scale 1.
const LABEL_GAP: f64 = 2.0;

pub struct FrameInput<'a> {
    pub payloads: &'a [ClassifiedPayload],
    pub snapshot: &'a GroupingSnapshot,
    pub surface: Size<SurfaceSpace>,
    pub settings: &'a OverlaySettings,
    pub measurer: &'a dyn TextMeasurer,
}

/// A payload being laid out: its canvas extent plus the canvas shift
/// accumulated by the offset and justification steps.
struct Item<'a> {
    entry: &'a ClassifiedPayload,
    extent: Bounds<CanvasSpace>,
    shift_x: f64,
    shift_y: f64,
}

impl Item<'_> {
    fn shifted_extent(&self) -> Bounds<CanvasSpace> {
        self.extent.translate(self.shift_x, self.shift_y)
    }

    fn justifiable(&self) -> bool {
        !self.entry.payload.is_vector()
    }
}

/// Lay out every payload for one frame.
///
/// The caller must have validated `input.surface`.
pub fn compute_frame(input: &FrameInput<'_>) -> FrameOutput {
    let base = base_mapping(input.settings.scale_mode, input.surface);

    let mut grouped: BTreeMap<GroupKey, Vec<Item<'_>>> = BTreeMap::new();
    let mut loose: Vec<Item<'_>> = Vec::new();
    let mut ordered: Vec<&ClassifiedPayload> = input.payloads.iter().collect();
    ordered.sort_by(|a, b| a.payload.id.cmp(&b.payload.id));
    for entry in ordered {
        let item = Item {
            entry,
            extent: canvas_extent(&entry.payload, input.measurer),
            shift_x: 0.0,
            shift_y: 0.0,
        };
        match entry
            .class
            .group_key()
            .filter(|key| input.snapshot.group(key).is_some())
        {
            Some(key) => grouped.entry(key).or_default().push(item),
            None => loose.push(item),
        }
    }

    let mut payloads = Vec::with_capacity(input.payloads.len());
    let mut groups = Vec::with_capacity(grouped.len());

    for (key, mut members) in grouped {
        let Some(spec) = input.snapshot.group(&key) else {
            continue;
        };
        let placed = place(&mut members, Some(spec), &base, input);
        let bounds = placed
            .iter()
            .fold(Bounds::empty(), |acc, p: &RenderedPayload| acc.union(&p.bounds));
        groups.push(RenderedGroup {
            anchor_point: spec.anchor.point(&bounds),
            background: spec.background_color.map(|color| GroupBackground {
                color,
                border_width: spec.background_border_width * base.uniform_scale(),
            }),
            key,
            bounds,
        });
        payloads.extend(placed);
    }

    for item in loose {
        payloads.extend(place(&mut [item], None, &base, input));
    }

    payloads.sort_by(|a, b| a.id.cmp(&b.id));
    log::trace!(
        "[PIPELINE] {} payloads in {} groups on {}x{}",
        payloads.len(),
        groups.len(),
        input.surface.width,
        input.surface.height
    );

    FrameOutput {
        surface: input.surface,
        mapping: base,
        generation: input.snapshot.generation,
        payloads,
        groups,
    }
}

/// Run steps 1-5 for one group (or one ungrouped payload when `spec` is None).
fn place(
    members: &mut [Item<'_>],
    spec: Option<&GroupSpec>,
    base: &SurfaceMapping,
    input: &FrameInput<'_>,
) -> Vec<RenderedPayload> {
    let (offset_x, offset_y) = spec.map_or((0.0, 0.0), |s| (s.offset_x, s.offset_y));
    for item in members.iter_mut() {
        item.shift_x += offset_x;
        item.shift_y += offset_y;
    }

    let anchor = spec.map_or(Anchor::Nw, |s| s.anchor);
    let group_extent = members
        .iter()
        .fold(Bounds::empty(), |acc, item| acc.union(&item.shifted_extent()));
    let anchor_point = if group_extent.is_empty() {
        Coord::new(0.0, 0.0)
    } else {
        anchor.point(&group_extent)
    };

    if let Some(spec) = spec {
        justify(members, spec.justification);
    }

    let (dx, dy) = anchor_shift(input.settings.scale_mode, base, input.surface, anchor_point);
    let mapping = base.shifted(dx, dy);
    let label_position = spec.map_or(MarkerLabelPosition::Below, |s| s.marker_label_position);

    let mut rendered: Vec<RenderedPayload> = members
        .iter()
        .map(|item| render(item, &mapping, label_position, input.measurer))
        .collect();

    let nudge = spec
        .and_then(|s| s.nudge_overflow)
        .unwrap_or(input.settings.nudge_overflow);
    if nudge {
        let bounds = rendered
            .iter()
            .fold(Bounds::empty(), |acc, p| acc.union(&p.bounds));
        let (nx, ny) = nudge_delta(&bounds, input.surface, input.settings.nudge_gutter);
        for payload in &mut rendered {
            payload.translate(nx, ny);
        }
    }

    rendered
}

/// Align narrower text/rect members to the widest one.
///
/// The widest member (first by id on ties) never moves; vectors are skipped.
/// Running this again on its own output changes nothing.
fn justify(members: &mut [Item<'_>], justification: Justification) {
    if justification == Justification::Left {
        return;
    }

    let mut widest: Option<(usize, f64)> = None;
    for (index, item) in members.iter().enumerate() {
        if !item.justifiable() {
            continue;
        }
        let width = item.extent.width();
        if widest.map_or(true, |(_, best)| width > best) {
            widest = Some((index, width));
        }
    }
    let Some((widest_index, _)) = widest else {
        return;
    };
    let reference = members[widest_index].shifted_extent();

    for (index, item) in members.iter_mut().enumerate() {
        if index == widest_index || !item.justifiable() {
            continue;
        }
        let extent = item.shifted_extent();
        let delta = match justification {
            Justification::Center => reference.center_x() - extent.center_x(),
            Justification::Right => reference.max_x - extent.max_x,
            Justification::Left => 0.0,
        };
        item.shift_x += delta;
    }
}

/// Canvas extent of a payload before any shift.
fn canvas_extent(payload: &Payload, measurer: &dyn TextMeasurer) -> Bounds<CanvasSpace> {
    match &payload.kind {
        PayloadKind::Text { text, x, y, size, .. } => {
            let extent = measurer.measure(text, size.canvas_px());
            Bounds::from_xywh(*x, *y, extent.width, extent.height)
        }
        PayloadKind::Rect { .. } => payload.shape_bounds().unwrap_or_default(),
        PayloadKind::Vector { points, .. } => {
            let bounds = payload.shape_bounds().unwrap_or_default();
            if points.iter().any(|p| p.marker.is_some()) {
                bounds.inflate(MARKER_RADIUS)
            } else {
                bounds
            }
        }
    }
}

/// Surface marker radius at `scale`, snapped to the font ladder.
fn marker_radius(scale: f64) -> f64 {
    snap_to_ladder(MARKER_RADIUS * 2.0 * scale) / 2.0
}

fn render(
    item: &Item<'_>,
    mapping: &SurfaceMapping,
    label_position: MarkerLabelPosition,
    measurer: &dyn TextMeasurer,
) -> RenderedPayload {
    let payload = &item.entry.payload;
    let to_surface =
        |x: f64, y: f64| mapping.map_point(Coord::new(x + item.shift_x, y + item.shift_y));
    let scale = mapping.uniform_scale();

    let (geometry, bounds) = match &payload.kind {
        PayloadKind::Text {
            text,
            x,
            y,
            color,
            size,
        } => {
            let origin = to_surface(*x, *y);
            // font_px is a draw hint; the box follows the justified canvas extent
            let font_px = size.surface_px(scale);
            let bounds = mapping.map_bounds(&item.shifted_extent());
            (
                RenderedGeometry::Text {
                    origin,
                    text: text.clone(),
                    color: *color,
                    size: *size,
                    font_px,
                },
                bounds,
            )
        }
        PayloadKind::Rect {
            x,
            y,
            w,
            h,
            color,
            fill,
        } => {
            let canvas = Bounds::<CanvasSpace>::from_xywh(x + item.shift_x, y + item.shift_y, *w, *h);
            let bounds = mapping.map_bounds(&canvas);
            (
                RenderedGeometry::Rect {
                    bounds,
                    color: *color,
                    fill: *fill,
                },
                bounds,
            )
        }
        PayloadKind::Vector {
            points,
            color,
            size,
        } => {
            let radius = marker_radius(scale);
            let font_px = size.surface_px(scale);
            let gap = LABEL_GAP * scale;
            let mut bounds = Bounds::empty();

            let rendered: Vec<RenderedPoint> = points
                .iter()
                .map(|point| {
                    let position = to_surface(point.x, point.y);
                    let marker_radius = if point.marker.is_some() { radius } else { 0.0 };
                    bounds = bounds.union(
                        &Bounds::new(position.x, position.y, position.x, position.y)
                            .inflate(marker_radius),
                    );

                    let label = point.text.as_ref().map(|text| {
                        let extent = measurer.measure(text, font_px);
                        let x = position.x - extent.width / 2.0;
                        let y = match label_position {
                            MarkerLabelPosition::Below => position.y + marker_radius + gap,
                            MarkerLabelPosition::Above => {
                                position.y - marker_radius - gap - extent.height
                            }
                            MarkerLabelPosition::Centered => position.y - extent.height / 2.0,
                        };
                        bounds = bounds.union(&Bounds::from_xywh(x, y, extent.width, extent.height));
                        RenderedLabel {
                            origin: Coord::new(x, y),
                            text: text.clone(),
                            font_px,
                        }
                    });

                    RenderedPoint {
                        position,
                        marker: point.marker,
                        marker_radius,
                        color: point.color.unwrap_or(*color),
                        label,
                    }
                })
                .collect();
            (
                RenderedGeometry::Vector {
                    points: rendered,
                    color: *color,
                },
                bounds,
            )
        }
    };

    RenderedPayload {
        id: payload.id.clone(),
        plugin: item.entry.class.plugin().cloned(),
        group: item.entry.class.group_key(),
        geometry,
        bounds,
    }
}

/// Smallest shift that brings `bounds` inside the surface minus `gutter`.
///
/// A box larger than the usable area is pinned to the top/left gutter.
pub(crate) fn nudge_delta(bounds: &Bounds<SurfaceSpace>, surface: Size<SurfaceSpace>, gutter: f64) -> (f64, f64) {
    if bounds.is_empty() {
        return (0.0, 0.0);
    }
    let axis = |min: f64, max: f64, length: f64| -> f64 {
        let (low, high) = (gutter, length - gutter);
        if max - min > high - low || min < low {
            low - min
        } else if max > high {
            high - max
        } else {
            0.0
        }
    };
    (
        axis(bounds.min_x, bounds.max_x, surface.width),
        axis(bounds.min_y, bounds.max_y, surface.height),
    )
}
