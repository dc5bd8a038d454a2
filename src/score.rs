use std::path::Path;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::common::require_file_exists;
use crate::config::ScoreOptions;
use crate::error::{PolisError, Result};
use crate::io::{self, Feature, FeatureWriter, VectorFormat};
use crate::matcher::{Match, Matcher, ReferenceSet, RunStatistics, RunSummary};

/// A scored candidate: the record as read plus its match, or the record-level error.
#[derive(Debug)]
pub struct MatchResult<'a> {
    pub feature: &'a Feature,
    pub outcome: Result<Match>,
}

impl MatchResult<'_> {
    /// The polis score, if the record was scored.
    #[inline]
    pub fn score(&self) -> Option<f64> {
        self.outcome.as_ref().ok().map(|m| m.score)
    }
}

/// Load every reference record of `path` and bulk-index the valid ones.
pub fn load_references(path: &Path) -> Result<ReferenceSet> {
    require_file_exists(path)?;
    let features = io::read_features(path)?;
    Ok(ReferenceSet::from_geometries(features.iter().map(|f| f.polygons.as_ref())))
}

/// Score a batch of candidates in parallel; results keep the batch order.
pub fn score_batch<'a>(matcher: &Matcher<'_>, batch: &'a [Feature]) -> Vec<MatchResult<'a>> {
    batch.par_iter()
        .map(|feature| MatchResult { feature, outcome: matcher.match_geometry(feature.polygons.as_ref()) })
        .collect()
}

/// Score every polygon of `candidate` against `reference` and write the
/// candidate geometries, each with its `polis` score, to `output`.
///
/// Candidates that cannot be scored are logged, written with a null score
/// and counted as invalid. The output only appears at `output` once every
/// record has been written.
pub fn score_files(
    reference: &Path,
    candidate: &Path,
    output: &Path,
    options: &ScoreOptions,
) -> Result<RunSummary> {
    options.validate()?;
    require_file_exists(reference)?;
    require_file_exists(candidate)?;
    VectorFormat::from_path(output)?;

    match options.threads {
        Some(threads) => rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| PolisError::InvalidConfig(format!("failed to start {threads} worker threads: {e}")))?
            .install(|| run(reference, candidate, output, options)),
        None => run(reference, candidate, output, options),
    }
}

fn run(reference: &Path, candidate: &Path, output: &Path, options: &ScoreOptions) -> Result<RunSummary> {
    info!("loading reference polygons from {}", reference.display());
    let references = load_references(reference)?;
    info!(records = references.len(), indexed = references.indexed(), "reference index built");

    let matcher = Matcher::new(&references, options.matching)?;
    let mut writer = FeatureWriter::create(output, options.precision)?;
    let mut stats = RunStatistics::new();

    info!("scoring candidate polygons from {}", candidate.display());
    io::for_each_batch(candidate, options.batch_size, |batch| {
        let first = stats.candidates();
        let mut partial = RunStatistics::new();
        for (offset, result) in score_batch(&matcher, &batch).into_iter().enumerate() {
            if let Err(e) = &result.outcome {
                if !e.is_record_error() {
                    return result.outcome.map(|_| ());
                }
                warn!(record = first + offset, "candidate not scored: {e}");
            }
            partial.record(&result.outcome);
            writer.write(result.feature, result.score())?;
        }
        stats.merge(partial);
        debug!(records = stats.candidates(), "batch written");
        Ok(())
    })?;

    let skipped = writer.skipped();
    let written = writer.finish()?;
    let summary = stats.summary(references.len());
    info!(
        written, skipped,
        matches = summary.matches, invalid = summary.invalid,
        misses = summary.misses, duplicates = summary.duplicates,
        "wrote {}", output.display()
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use geo::{polygon, MultiPolygon};
    use serde_json::json;

    use super::score_batch;
    use crate::io::{Feature, RawGeometry};
    use crate::{MatchConfig, Matcher, ReferenceSet};

    fn feature(polygons: Option<MultiPolygon<f64>>) -> Feature {
        Feature { geometry: RawGeometry::GeoJson(json!(null)), polygons }
    }

    #[test]
    fn batch_results_keep_order_and_expose_scores() {
        let square = MultiPolygon(vec![polygon![(x: 0., y: 0.), (x: 1., y: 0.), (x: 1., y: 1.), (x: 0., y: 1.)]]);
        let references = ReferenceSet::from_geometries([Some(&square)]);
        let matcher = Matcher::new(&references, MatchConfig::default()).unwrap();

        let batch = vec![feature(Some(square.clone())), feature(None), feature(Some(square.clone()))];
        let results = score_batch(&matcher, &batch);

        assert_eq!(results.len(), 3);
        assert!(std::ptr::eq(results[1].feature, &batch[1]));
        assert_eq!(results[0].score(), Some(0.0));
        assert_eq!(results[1].score(), None);
        assert!(results[1].outcome.as_ref().is_err_and(|e| e.is_record_error()));
        assert_eq!(results[2].score(), Some(0.0));
    }
}
