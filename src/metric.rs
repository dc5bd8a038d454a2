//! The polis boundary-distance metric.
//!
//! See "A Metric for Polygon Comparison and Building Extraction Evaluation"
//! (Avbelj et al.). Each vertex of one outline is measured against the other
//! outline's boundary curve, and the two directed averages are summed.

use geo::{LineString, Polygon};

use crate::error::Result;
use crate::geom::Footprint;

/// Polis distance between two polygons' exterior rings.
///
/// Fails with `InvalidGeometry` if either polygon cannot be turned into a
/// [`Footprint`].
pub fn polis_distance(a: &Polygon<f64>, b: &Polygon<f64>) -> Result<f64> {
    Ok(polis(&Footprint::new(a)?, &Footprint::new(b)?))
}

/// Polis distance between two validated footprints. Symmetric and non-negative.
#[inline]
pub fn polis(a: &Footprint, b: &Footprint) -> f64 {
    half_polis(a.exterior(), b) + half_polis(b.exterior(), a)
}

/// One direction of the metric: the summed distance from every vertex of the
/// closed ring `coords` (closing duplicate excluded) to the boundary of
/// `other`, divided by twice the closed ring length.
pub fn half_polis(coords: &LineString<f64>, other: &Footprint) -> f64 {
    let Some((_closing, vertices)) = coords.0.split_last() else { return 0.0 };
    let sum = vertices.iter()
        .map(|&c| other.boundary_distance(c))
        .sum::<f64>();
    sum / (2 * coords.0.len()) as f64
}
