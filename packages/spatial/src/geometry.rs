//! Geometry capabilities required by tract imputation and grid building.
//!
//! The census and grid algorithms only ever ask three questions of a tract
//! polygon, captured by [`TractGeometry`]. Any computational-geometry
//! backend can answer them; [`geo::MultiPolygon`] is the one used by the
//! loaders in this crate.

use geo::{Area, BooleanOps, BoundingRect, Intersects, MultiPolygon, Rect, coord};

/// Axis-aligned bounding box in `(x = lon, y = lat)` order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    #[must_use]
    pub const fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }
}

impl From<Rect<f64>> for Bounds {
    fn from(rect: Rect<f64>) -> Self {
        Self::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    }
}

/// Capabilities a tract polygon must provide.
pub trait TractGeometry {
    /// Whether the two geometries share any point, boundaries included.
    fn intersects(&self, other: &Self) -> bool;

    /// Bounding box and planar area, or `None` for an empty geometry.
    fn bounds_and_area(&self) -> Option<(Bounds, f64)>;

    /// Planar area of the overlap between this geometry and a box.
    fn box_overlap_area(&self, cell: &Bounds) -> f64;
}

impl TractGeometry for MultiPolygon<f64> {
    fn intersects(&self, other: &Self) -> bool {
        Intersects::intersects(self, other)
    }

    fn bounds_and_area(&self) -> Option<(Bounds, f64)> {
        let rect = self.bounding_rect()?;
        Some((Bounds::from(rect), self.unsigned_area()))
    }

    fn box_overlap_area(&self, cell: &Bounds) -> f64 {
        let rect = Rect::new(
            coord! { x: cell.min_x, y: cell.min_y },
            coord! { x: cell.max_x, y: cell.max_y },
        );
        self.intersection(&rect.to_polygon()).unsigned_area()
    }
}
