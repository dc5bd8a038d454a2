#![doc = "Polygon matching and scoring with the polis boundary-distance metric"]
mod common;
mod config;
mod error;
mod geom;
mod matcher;
mod score;

pub mod io;
pub mod metric;

#[doc(inline)]
pub use config::{MatchConfig, ScoreOptions};

#[doc(inline)]
pub use error::{PolisError, Result};

#[doc(inline)]
pub use geom::{Footprint, FootprintIndex, Neighbors};

#[doc(inline)]
pub use matcher::{match_and_score, Match, Matcher, ReferenceSet, RunStatistics, RunSummary};

#[doc(inline)]
pub use metric::{polis, polis_distance};

#[doc(inline)]
pub use score::{load_references, score_batch, score_files, MatchResult};
