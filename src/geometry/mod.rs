//! Geometry primitives shared by the transform pipeline and the bounds cache.

pub mod coord;

pub use coord::{Bounds, CanvasSpace, Coord, Size, SurfaceMapping, SurfaceSpace};

/// Width of the legacy virtual canvas.
pub const CANVAS_WIDTH: f64 = 1280.0;

/// Height of the legacy virtual canvas.
pub const CANVAS_HEIGHT: f64 = 960.0;

/// The virtual canvas as a size.
pub fn canvas_size() -> Size<CanvasSpace> {
    Size::new(CANVAS_WIDTH, CANVAS_HEIGHT)
}
