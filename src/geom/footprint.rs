use geo::{Area, BoundingRect, Coord, Distance, Euclidean, LineString, MultiPolygon, Point, Polygon, Rect};

use crate::error::{PolisError, Result};

/// A validated polygon outline, ready to be indexed and scored.
///
/// Only the exterior ring is kept; holes play no part in the polis metric.
#[derive(Debug, Clone, PartialEq)]
pub struct Footprint {
    exterior: LineString<f64>,
    bbox: Rect<f64>,
}

impl Footprint {
    /// Build a footprint from a polygon's exterior ring.
    ///
    /// Fails with `InvalidGeometry` when the ring is empty, holds a non-finite
    /// coordinate, or has fewer than two distinct vertices.
    pub fn new(polygon: &Polygon<f64>) -> Result<Self> {
        let exterior = polygon.exterior();
        let first = *exterior.0.first()
            .ok_or_else(|| PolisError::invalid_geometry("empty exterior ring"))?;

        if let Some(bad) = exterior.coords().find(|c| !c.x.is_finite() || !c.y.is_finite()) {
            return Err(PolisError::invalid_geometry(
                format!("non-finite coordinate ({}, {})", bad.x, bad.y)));
        }
        if !exterior.coords().any(|c| *c != first) {
            return Err(PolisError::invalid_geometry(
                "exterior ring has fewer than 2 distinct vertices"));
        }

        let bbox = exterior.bounding_rect()
            .ok_or_else(|| PolisError::invalid_geometry("exterior ring has no extent"))?;

        // geo closes rings on construction; keep that invariant for hand-built rings too.
        let mut exterior = exterior.clone();
        exterior.close();

        Ok(Self { exterior, bbox })
    }

    /// Build a footprint from the part of `shape` with the largest area.
    pub fn from_multi_polygon(shape: &MultiPolygon<f64>) -> Result<Self> {
        match shape.0.as_slice() {
            [] => Err(PolisError::invalid_geometry("multipolygon has no parts")),
            [polygon] => Self::new(polygon),
            parts => {
                let largest = parts.iter()
                    .reduce(|best, p| if p.unsigned_area() > best.unsigned_area() { p } else { best })
                    .ok_or_else(|| PolisError::invalid_geometry("multipolygon has no parts"))?;
                Self::new(largest)
            }
        }
    }

    /// Get the closed exterior ring (first coordinate repeated at the end).
    #[inline] pub fn exterior(&self) -> &LineString<f64> { &self.exterior }

    /// Get the axis-aligned bounding box of the exterior ring.
    #[inline] pub fn bbox(&self) -> Rect<f64> { self.bbox }

    /// Shortest distance from `point` to the exterior ring, measured against
    /// every segment rather than only the vertices.
    #[inline]
    pub fn boundary_distance(&self, point: Coord<f64>) -> f64 {
        Euclidean.distance(&Point::from(point), &self.exterior)
    }

    /// Polis distance to `other`.
    #[inline]
    pub fn polis(&self, other: &Footprint) -> f64 {
        crate::metric::polis(self, other)
    }
}
