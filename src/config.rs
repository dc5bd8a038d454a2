use crate::error::{PolisError, Result};

/// Candidate selection policy for the matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchConfig {
    /// How many nearest reference boxes to ask the index for. Boxes tied
    /// with the last one are always included.
    pub neighbors: usize,

    /// Upper bound on the number of references scored per candidate.
    pub max_candidates: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self { neighbors: 1, max_candidates: 5 }
    }
}

impl MatchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.neighbors == 0 {
            return Err(PolisError::InvalidConfig("neighbors must be at least 1".into()));
        }
        if self.max_candidates == 0 {
            return Err(PolisError::InvalidConfig("max_candidates must be at least 1".into()));
        }
        Ok(())
    }
}

/// Options for a full file-to-file scoring run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreOptions {
    pub matching: MatchConfig,

    /// Decimal places kept for the written `polis` attribute.
    pub precision: u8,

    /// Candidates read and scored together before being written.
    pub batch_size: usize,

    /// Worker threads; `None` uses rayon's global pool.
    pub threads: Option<usize>,
}

impl Default for ScoreOptions {
    fn default() -> Self {
        Self {
            matching: MatchConfig::default(),
            precision: 2,
            batch_size: 1024,
            threads: None,
        }
    }
}

impl ScoreOptions {
    pub fn validate(&self) -> Result<()> {
        self.matching.validate()?;
        if self.batch_size == 0 {
            return Err(PolisError::InvalidConfig("batch_size must be at least 1".into()));
        }
        if self.threads == Some(0) {
            return Err(PolisError::InvalidConfig("threads must be at least 1".into()));
        }
        // Shapefile numeric fields are 15 wide; leave room for the integer part.
        if self.precision > 10 {
            return Err(PolisError::InvalidConfig("precision must be at most 10".into()));
        }
        Ok(())
    }
}
