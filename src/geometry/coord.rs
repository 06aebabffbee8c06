//! Type-safe coordinates for the overlay transform pipeline.
//!
//! Legacy producers address a fixed virtual canvas; the renderer draws on
//! the real surface. Each space is a phantom type so canvas and surface
//! values cannot be mixed without going through a [`SurfaceMapping`]:
//!
//! ```text
//! CanvasSpace (1280x960) → SurfaceSpace (window pixels)
//! ```

use std::marker::PhantomData;
use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

/// Fixed virtual canvas legacy producers address.
/// `(0, 0)` is the top-left corner; nominal size is 1280x960.
#[derive(Default, Clone, Copy, Debug, PartialEq)]
pub struct CanvasSpace;

/// Pixel space of the actual render surface.
/// `(0, 0)` is the top-left of the overlay window.
#[derive(Default, Clone, Copy, Debug, PartialEq)]
pub struct SurfaceSpace;

/// A 2D coordinate tagged with its space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Coord<TSpace> {
    pub x: f64,
    pub y: f64,
    #[serde(skip)]
    _space: PhantomData<TSpace>,
}

impl<TSpace: Default> Coord<TSpace> {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            _space: PhantomData,
        }
    }

    pub fn as_tuple(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    /// Offset by `dx`, `dy` in the same space.
    pub fn translate(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl<T: Default> Add for Coord<T> {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl<T: Default> Sub for Coord<T> {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl<T: Default> Mul<f64> for Coord<T> {
    type Output = Self;
    fn mul(self, scalar: f64) -> Self {
        Self::new(self.x * scalar, self.y * scalar)
    }
}

/// Size in a specific coordinate space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Size<TSpace> {
    pub width: f64,
    pub height: f64,
    #[serde(skip)]
    _space: PhantomData<TSpace>,
}

impl<TSpace: Default> Size<TSpace> {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            _space: PhantomData,
        }
    }

    /// A size is usable for scaling when both sides are finite and positive.
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width / self.height
    }
}

/// Axis-aligned bounding box stored as min/max edges.
///
/// An "empty" box has `min > max` and acts as the identity for [`Bounds::union`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds<TSpace> {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
    #[serde(skip)]
    _space: PhantomData<TSpace>,
}

impl<TSpace: Default + Copy> Default for Bounds<TSpace> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<TSpace: Default + Copy> Bounds<TSpace> {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
            _space: PhantomData,
        }
    }

    /// Box from an origin and a size; negative sizes are normalized.
    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(
            x.min(x + width),
            y.min(y + height),
            x.max(x + width),
            y.max(y + height),
        )
    }

    pub fn from_origin_size(origin: Coord<TSpace>, size: Size<TSpace>) -> Self {
        Self::from_xywh(origin.x, origin.y, size.width, size.height)
    }

    pub fn empty() -> Self {
        Self::new(f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY)
    }

    pub fn is_empty(&self) -> bool {
        !(self.min_x <= self.max_x && self.min_y <= self.max_y)
    }

    pub fn width(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.max_x - self.min_x
        }
    }

    pub fn height(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.max_y - self.min_y
        }
    }

    pub fn center_x(&self) -> f64 {
        (self.min_x + self.max_x) / 2.0
    }

    pub fn center_y(&self) -> f64 {
        (self.min_y + self.max_y) / 2.0
    }

    pub fn top_left(&self) -> Coord<TSpace> {
        Coord::new(self.min_x, self.min_y)
    }

    /// Smallest box containing both. Empty boxes are ignored.
    pub fn union(&self, other: &Self) -> Self {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Self::new(
            self.min_x.min(other.min_x),
            self.min_y.min(other.min_y),
            self.max_x.max(other.max_x),
            self.max_y.max(other.max_y),
        )
    }

    /// Grow the box to include a point.
    pub fn include_point(&self, point: Coord<TSpace>) -> Self {
        self.union(&Self::new(point.x, point.y, point.x, point.y))
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        if self.is_empty() {
            return *self;
        }
        Self::new(
            self.min_x + dx,
            self.min_y + dy,
            self.max_x + dx,
            self.max_y + dy,
        )
    }

    pub fn inflate(&self, amount: f64) -> Self {
        if self.is_empty() {
            return *self;
        }
        Self::new(
            self.min_x - amount,
            self.min_y - amount,
            self.max_x + amount,
            self.max_y + amount,
        )
    }

    /// True when `other` lies entirely inside this box (edges inclusive).
    pub fn contains_bounds(&self, other: &Self) -> bool {
        if other.is_empty() {
            return true;
        }
        !self.is_empty()
            && other.min_x >= self.min_x
            && other.min_y >= self.min_y
            && other.max_x <= self.max_x
            && other.max_y <= self.max_y
    }
}

// ============================================================================
// Canvas → Surface mapping
// ============================================================================

/// Affine map from canvas to surface space: `surface = canvas * scale + offset`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceMapping {
    pub scale_x: f64,
    pub scale_y: f64,
    pub offset: Coord<SurfaceSpace>,
}

impl SurfaceMapping {
    pub fn identity() -> Self {
        Self {
            scale_x: 1.0,
            scale_y: 1.0,
            offset: Coord::new(0.0, 0.0),
        }
    }

    /// Scale used for sizes that must stay proportional (fonts, markers).
    pub fn uniform_scale(&self) -> f64 {
        self.scale_x.min(self.scale_y)
    }

    /// Same mapping, shifted by a surface-space delta.
    pub fn shifted(&self, dx: f64, dy: f64) -> Self {
        Self {
            offset: self.offset.translate(dx, dy),
            ..*self
        }
    }

    pub fn map_point(&self, point: Coord<CanvasSpace>) -> Coord<SurfaceSpace> {
        Coord::new(
            point.x * self.scale_x + self.offset.x,
            point.y * self.scale_y + self.offset.y,
        )
    }

    pub fn map_size(&self, size: Size<CanvasSpace>) -> Size<SurfaceSpace> {
        Size::new(size.width * self.scale_x, size.height * self.scale_y)
    }

    pub fn map_bounds(&self, bounds: &Bounds<CanvasSpace>) -> Bounds<SurfaceSpace> {
        if bounds.is_empty() {
            return Bounds::empty();
        }
        let min = self.map_point(Coord::new(bounds.min_x, bounds.min_y));
        let max = self.map_point(Coord::new(bounds.max_x, bounds.max_y));
        Bounds::new(min.x, min.y, max.x, max.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_from_negative_size_normalizes() {
        let b = Bounds::<CanvasSpace>::from_xywh(100.0, 50.0, -20.0, -10.0);
        assert_eq!(b, Bounds::new(80.0, 40.0, 100.0, 50.0));
        assert!((b.width() - 20.0).abs() < 0.001);
    }

    #[test]
    fn test_empty_bounds_is_union_identity() {
        let empty = Bounds::<SurfaceSpace>::empty();
        let b = Bounds::new(1.0, 2.0, 3.0, 4.0);
        assert!(empty.is_empty());
        assert_eq!(empty.union(&b), b);
        assert_eq!(b.union(&empty), b);
        assert_eq!(empty.width(), 0.0);
    }

    #[test]
    fn test_union_and_contains() {
        let a = Bounds::<SurfaceSpace>::new(0.0, 0.0, 10.0, 10.0);
        let b = Bounds::new(5.0, -5.0, 20.0, 8.0);
        let u = a.union(&b);
        assert_eq!(u, Bounds::new(0.0, -5.0, 20.0, 10.0));
        assert!(u.contains_bounds(&a));
        assert!(u.contains_bounds(&b));
        assert!(!a.contains_bounds(&b));
    }

    #[test]
    fn test_mapping_scales_and_offsets() {
        let mapping = SurfaceMapping {
            scale_x: 1.5,
            scale_y: 1.5,
            offset: Coord::new(0.0, -180.0),
        };
        let p = mapping.map_point(Coord::new(640.0, 480.0));
        assert!((p.x - 960.0).abs() < 0.001);
        assert!((p.y - 540.0).abs() < 0.001);

        let b = mapping.map_bounds(&Bounds::from_xywh(540.0, 0.0, 200.0, 40.0));
        assert!((b.min_x - 810.0).abs() < 0.001);
        assert!((b.width() - 300.0).abs() < 0.001);
        assert!((b.height() - 60.0).abs() < 0.001);
    }

    #[test]
    fn test_bounds_serialization_skips_space_marker() {
        let b = Bounds::<SurfaceSpace>::new(1.0, 2.0, 3.0, 4.0);
        let json = serde_json::to_string(&b).unwrap();
        assert_eq!(json, r#"{"min_x":1.0,"min_y":2.0,"max_x":3.0,"max_y":4.0}"#);
        let restored: Bounds<SurfaceSpace> = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, b);
    }
}
