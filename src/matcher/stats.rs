use ahash::AHashMap;
use serde::Serialize;

use crate::error::Result;
use crate::matcher::Match;

/// Running counters for a scoring run.
///
/// Only ever updated from one thread; parallel workers build their own
/// partials and [`merge`](Self::merge) them.
#[derive(Debug, Clone, Default)]
pub struct RunStatistics {
    candidates: usize,
    invalid: usize,
    hits: AHashMap<usize, usize>, // reference id -> number of candidates assigned to it
}

impl RunStatistics {
    pub fn new() -> Self { Self::default() }

    /// Count one successfully scored candidate assigned to `reference`.
    pub fn record_match(&mut self, reference: usize) {
        self.candidates += 1;
        *self.hits.entry(reference).or_default() += 1;
    }

    /// Count one candidate that failed with a record-level error.
    pub fn record_invalid(&mut self) {
        self.candidates += 1;
        self.invalid += 1;
    }

    /// Count the outcome of matching one candidate.
    pub fn record(&mut self, outcome: &Result<Match>) {
        match outcome {
            Ok(m) => self.record_match(m.reference),
            Err(_) => self.record_invalid(),
        }
    }

    /// Fold another partial into this one.
    pub fn merge(&mut self, other: RunStatistics) {
        self.candidates += other.candidates;
        self.invalid += other.invalid;
        for (reference, count) in other.hits {
            *self.hits.entry(reference).or_default() += count;
        }
    }

    /// Total candidates seen, scored or not.
    #[inline] pub fn candidates(&self) -> usize { self.candidates }

    /// Candidates successfully scored.
    #[inline] pub fn matches(&self) -> usize { self.candidates - self.invalid }

    #[inline] pub fn invalid(&self) -> usize { self.invalid }

    /// Distinct reference ids assigned at least once.
    #[inline] pub fn distinct(&self) -> usize { self.hits.len() }

    /// Reference ids assigned to two or more candidates.
    pub fn duplicates(&self) -> usize {
        self.hits.values().filter(|&&count| count > 1).count()
    }

    /// References never assigned, out of `reference_count`.
    #[inline]
    pub fn misses(&self, reference_count: usize) -> usize {
        reference_count.saturating_sub(self.distinct())
    }

    pub fn summary(&self, reference_count: usize) -> RunSummary {
        RunSummary {
            references: reference_count,
            candidates: self.candidates(),
            matches: self.matches(),
            invalid: self.invalid(),
            misses: self.misses(reference_count),
            duplicates: self.duplicates(),
        }
    }
}

/// Final counts reported at the end of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub references: usize,
    pub candidates: usize,
    pub matches: usize,
    pub invalid: usize,
    pub misses: usize,
    pub duplicates: usize,
}
