use geo::Rect;
use rstar::{PointDistance, RTreeObject, AABB};

/// A bounding box in an R-tree, associated with a reference polygon by id.
#[derive(Debug, Clone)]
pub(super) struct BoundingBox {
    id: usize, // Position of the polygon in the reference set
    bbox: Rect<f64>,
}

impl BoundingBox {
    pub(super) fn new(id: usize, bbox: Rect<f64>) -> Self {
        Self { id, bbox }
    }

    /// Get the reference id of the boxed polygon.
    #[inline] pub(super) fn id(&self) -> usize { self.id }

    /// Get a reference to the bounding rectangle.
    #[inline] pub(super) fn bbox(&self) -> &Rect<f64> { &self.bbox }
}

impl RTreeObject for BoundingBox {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.bbox.min().into(), self.bbox.max().into())
    }
}

impl PointDistance for BoundingBox {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        self.envelope().distance_2(point)
    }
}

/// Squared Euclidean gap between two axis-aligned boxes; zero when they touch or overlap.
pub(super) fn box_distance_2(a: &Rect<f64>, b: &Rect<f64>) -> f64 {
    let dx = (a.min().x - b.max().x).max(b.min().x - a.max().x).max(0.0);
    let dy = (a.min().y - b.max().y).max(b.min().y - a.max().y).max(0.0);
    dx * dx + dy * dy
}

/// Grow a box by `pad` on every side.
pub(super) fn expand(rect: &Rect<f64>, pad: f64) -> AABB<[f64; 2]> {
    AABB::from_corners(
        [rect.min().x - pad, rect.min().y - pad],
        [rect.max().x + pad, rect.max().y + pad],
    )
}
