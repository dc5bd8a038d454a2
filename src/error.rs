use std::path::PathBuf;

/// Errors raised while loading, matching or writing polygons.
#[derive(Debug, thiserror::Error)]
pub enum PolisError {
    /// A polygon cannot be scored: empty or collapsed exterior ring, non-finite
    /// coordinates, or no polygonal geometry at all.
    #[error("invalid geometry: {reason}")]
    InvalidGeometry { reason: String },

    /// The reference set holds no polygon that can be indexed.
    #[error("no reference data: the reference set has no valid polygons")]
    NoReferenceData,

    #[error("I/O failure on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file exists but its content could not be decoded or encoded.
    #[error("malformed vector file {}: {message}", path.display())]
    Format { path: PathBuf, message: String },

    #[error("unsupported vector format for {} (expected .shp, .geojson or .json)", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PolisError {
    pub(crate) fn invalid_geometry(reason: impl Into<String>) -> Self {
        Self::InvalidGeometry { reason: reason.into() }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub(crate) fn format(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Format { path: path.into(), message: message.to_string() }
    }

    /// True for errors scoped to a single record, which never abort a run.
    #[inline]
    pub fn is_record_error(&self) -> bool {
        matches!(self, Self::InvalidGeometry { .. })
    }
}

pub type Result<T, E = PolisError> = std::result::Result<T, E>;
