use std::path::Path;

use crate::error::{PolisError, Result};

/// Error unless `path` exists and is a regular file.
pub(crate) fn require_file_exists(path: &Path) -> Result<()> {
    let metadata = std::fs::metadata(path).map_err(|e| PolisError::io(path, e))?;
    if !metadata.is_file() {
        return Err(PolisError::io(path, std::io::Error::new(
            std::io::ErrorKind::InvalidInput, "path exists but is not a file")));
    }
    Ok(())
}
