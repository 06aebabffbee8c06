//! Canvas → surface scaling.

use crate::config::ScaleMode;
use crate::geometry::{canvas_size, CanvasSpace, Coord, Size, SurfaceMapping, SurfaceSpace};

/// Tolerance for deciding that an axis overflows the surface.
const OVERFLOW_EPSILON: f64 = 1e-6;

/// Mapping of the whole canvas onto `surface` for `mode`.
///
/// `fit` and `fill` center the scaled canvas; under `fill` the offset on
/// the overflowing axis is negative.
pub fn base_mapping(mode: ScaleMode, surface: Size<SurfaceSpace>) -> SurfaceMapping {
    let canvas = canvas_size();
    let sx = surface.width / canvas.width;
    let sy = surface.height / canvas.height;

    let (scale_x, scale_y) = match mode {
        ScaleMode::Fit => (sx.min(sy), sx.min(sy)),
        ScaleMode::Fill => (sx.max(sy), sx.max(sy)),
        ScaleMode::Stretch => (sx, sy),
    };

    SurfaceMapping {
        scale_x,
        scale_y,
        offset: Coord::new(
            (surface.width - canvas.width * scale_x) / 2.0,
            (surface.height - canvas.height * scale_y) / 2.0,
        ),
    }
}

/// Surface-space shift that keeps a group's anchor on-surface under `fill`.
///
/// On each overflowing axis the anchor is moved to the same proportional
/// position on the surface it had on the canvas. Other modes never shift.
pub fn anchor_shift(
    mode: ScaleMode,
    base: &SurfaceMapping,
    surface: Size<SurfaceSpace>,
    anchor: Coord<CanvasSpace>,
) -> (f64, f64) {
    if mode != ScaleMode::Fill {
        return (0.0, 0.0);
    }
    let canvas = canvas_size();
    let mapped = base.map_point(anchor);

    let dx = if canvas.width * base.scale_x > surface.width + OVERFLOW_EPSILON {
        anchor.x / canvas.width * surface.width - mapped.x
    } else {
        0.0
    };
    let dy = if canvas.height * base.scale_y > surface.height + OVERFLOW_EPSILON {
        anchor.y / canvas.height * surface.height - mapped.y
    } else {
        0.0
    };
    (dx, dy)
}
