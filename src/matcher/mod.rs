mod stats;

pub use stats::{RunStatistics, RunSummary};

use geo::MultiPolygon;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::config::MatchConfig;
use crate::error::{PolisError, Result};
use crate::geom::{Footprint, FootprintIndex, Neighbors};

/// The reference chosen for one candidate and its polis score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    pub reference: usize,
    pub score: f64,
}

/// ReferenceSet holds the reference footprints by position plus an index over their boxes.
///
/// Positions are stable ids. A reference that failed validation keeps its
/// slot (and so counts toward misses) but is never indexed.
#[derive(Debug, Clone)]
pub struct ReferenceSet {
    footprints: Vec<Option<Footprint>>,
    index: FootprintIndex,
}

impl ReferenceSet {
    /// Bulk-index every present footprint.
    pub fn new(footprints: Vec<Option<Footprint>>) -> Self {
        let index = FootprintIndex::new(
            footprints.iter().enumerate()
                .filter_map(|(id, fp)| fp.as_ref().map(|fp| (id, fp.bbox())))
        );
        Self { footprints, index }
    }

    /// Validate raw reference geometries (in file order) and index the valid ones.
    pub fn from_geometries<'a>(geometries: impl IntoIterator<Item = Option<&'a MultiPolygon<f64>>>) -> Self {
        let footprints = geometries.into_iter().enumerate()
            .map(|(id, geometry)| {
                let footprint = geometry
                    .ok_or_else(|| PolisError::invalid_geometry("record has no polygon geometry"))
                    .and_then(Footprint::from_multi_polygon);
                match footprint {
                    Ok(fp) => Some(fp),
                    Err(e) => {
                        warn!(reference = id, "reference polygon left out of the index: {e}");
                        None
                    }
                }
            })
            .collect();
        Self::new(footprints)
    }

    /// Number of reference records, including ones that were not indexed.
    #[inline] pub fn len(&self) -> usize { self.footprints.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.footprints.is_empty() }

    /// Number of references available for matching.
    #[inline] pub fn indexed(&self) -> usize { self.index.len() }

    /// Get the footprint at `id`, if it was valid.
    #[inline]
    pub fn get(&self, id: usize) -> Option<&Footprint> {
        self.footprints.get(id).and_then(Option::as_ref)
    }

    #[inline] pub fn index(&self) -> &FootprintIndex { &self.index }
}

/// Matcher pairs candidate polygons with their best reference.
#[derive(Debug, Clone, Copy)]
pub struct Matcher<'a> {
    references: &'a ReferenceSet,
    config: MatchConfig,
}

impl<'a> Matcher<'a> {
    /// Fails with `NoReferenceData` when nothing in `references` can be matched against.
    pub fn new(references: &'a ReferenceSet, config: MatchConfig) -> Result<Self> {
        config.validate()?;
        if references.indexed() == 0 {
            return Err(PolisError::NoReferenceData);
        }
        Ok(Self { references, config })
    }

    /// Reference ids to score for `candidate`: nearest by bounding box, in
    /// index order, truncated to `max_candidates`.
    pub fn shortlist(&self, candidate: &Footprint) -> Neighbors {
        let mut ids = self.references.index().nearest(&candidate.bbox(), self.config.neighbors);
        if ids.len() > self.config.max_candidates {
            debug!(tied = ids.len(), kept = self.config.max_candidates, "truncating reference shortlist");
            ids.truncate(self.config.max_candidates);
        }
        ids
    }

    /// Score `candidate` against its shortlist and keep the lowest score.
    /// The earliest id wins an exact tie.
    pub fn best_match(&self, candidate: &Footprint) -> Result<Match> {
        let mut best: Option<Match> = None;
        for id in self.shortlist(candidate) {
            let Some(reference) = self.references.get(id) else { continue };
            let score = candidate.polis(reference);
            if best.is_none_or(|b| score < b.score) {
                best = Some(Match { reference: id, score });
            }
        }
        best.ok_or(PolisError::NoReferenceData)
    }

    /// Match a raw candidate geometry; `None` means the record had no polygon.
    pub fn match_geometry(&self, geometry: Option<&MultiPolygon<f64>>) -> Result<Match> {
        let geometry = geometry
            .ok_or_else(|| PolisError::invalid_geometry("record has no polygon geometry"))?;
        self.best_match(&Footprint::from_multi_polygon(geometry)?)
    }

    /// Match a batch in parallel. Outcomes keep the batch order.
    pub fn match_batch(&self, batch: &[Option<MultiPolygon<f64>>]) -> Vec<Result<Match>> {
        batch.par_iter()
            .map(|geometry| self.match_geometry(geometry.as_ref()))
            .collect()
    }
}

/// Match every candidate against `references`.
///
/// Returns one outcome per candidate in input order, plus the run statistics.
/// Record-level failures stay in their slot; only an unusable reference set
/// or configuration fails the whole call.
pub fn match_and_score(
    references: &ReferenceSet,
    candidates: &[Option<MultiPolygon<f64>>],
    config: MatchConfig,
) -> Result<(Vec<Result<Match>>, RunStatistics)> {
    let matcher = Matcher::new(references, config)?;
    let outcomes = matcher.match_batch(candidates);

    let mut stats = RunStatistics::new();
    for outcome in &outcomes {
        stats.record(outcome);
    }
    Ok((outcomes, stats))
}
