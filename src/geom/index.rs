use geo::Rect;
use rstar::RTree;
use smallvec::SmallVec;

use crate::geom::bbox::{box_distance_2, expand, BoundingBox};

/// Reference ids returned by a nearest-box query.
pub type Neighbors = SmallVec<[usize; 8]>;

/// FootprintIndex is a bulk-loaded R-tree over the bounding boxes of a reference set.
#[derive(Debug, Clone)]
pub struct FootprintIndex {
    rtree: RTree<BoundingBox>,
}

impl FootprintIndex {
    /// Bulk-load the index from `(id, bounding box)` pairs.
    pub fn new(entries: impl IntoIterator<Item = (usize, Rect<f64>)>) -> Self {
        Self {
            rtree: RTree::bulk_load(
                entries.into_iter()
                    .map(|(id, bbox)| BoundingBox::new(id, bbox))
                    .collect()
            ),
        }
    }

    /// Get the number of indexed boxes.
    #[inline] pub fn len(&self) -> usize { self.rtree.size() }

    /// Check if the index holds no boxes.
    #[inline] pub fn is_empty(&self) -> bool { self.rtree.size() == 0 }

    /// Ids of the `k` boxes closest to `rect`, plus every further box tied
    /// with the k-th. Distance is the gap between boxes (zero when they
    /// overlap); ties come back in ascending id order.
    pub fn nearest(&self, rect: &Rect<f64>, k: usize) -> Neighbors {
        if k == 0 || self.is_empty() { return Neighbors::new() }

        // Any k entries bound the k-th smallest box distance from above.
        let center: [f64; 2] = rect.center().into();
        let seeds = self.rtree.nearest_neighbor_iter(&center)
            .take(k)
            .map(|entry| (box_distance_2(rect, entry.bbox()), entry.id()))
            .collect::<Vec<_>>();
        let bound = seeds.iter().map(|&(d2, _)| d2).fold(0.0, f64::max).sqrt();

        let mut found = self.rtree.locate_in_envelope_intersecting(&expand(rect, bound))
            .map(|entry| (box_distance_2(rect, entry.bbox()), entry.id()))
            .chain(seeds)
            .collect::<Vec<_>>();
        found.sort_unstable_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        found.dedup_by_key(|&mut (_, id)| id);

        let Some(&(cutoff, _)) = found.get(k - 1).or(found.last()) else { return Neighbors::new() };
        found.into_iter()
            .take_while(|&(d2, _)| d2 <= cutoff)
            .map(|(_, id)| id)
            .collect()
    }
}
