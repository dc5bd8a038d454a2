use std::fs::{self, File};
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::warn;

use crate::error::{PolisError, Result};

/// Write-then-rename staging area for outputs that may span several files
/// (a shapefile's `.shp`, `.shx` and `.dbf`).
///
/// Files are written into a hidden temporary directory next to the target
/// and only moved into place by [`commit`](Self::commit). Dropping without
/// committing removes everything that was staged.
pub(crate) struct StagedOutput {
    target: PathBuf,
    dir: TempDir,
}

impl StagedOutput {
    pub(crate) fn new(target: &Path) -> Result<Self> {
        let parent = match target.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(|e| PolisError::io(parent, e))?;
        if target.file_name().is_none() {
            return Err(PolisError::io(target, std::io::Error::new(
                std::io::ErrorKind::InvalidInput, "output path has no file name")));
        }

        let dir = tempfile::Builder::new()
            .prefix(".polis-")
            .tempdir_in(parent)
            .map_err(|e| PolisError::io(parent, e))?;
        Ok(Self { target: target.to_path_buf(), dir })
    }

    /// Where the writer should put the main output file.
    pub(crate) fn path(&self) -> PathBuf {
        self.dir.path().join(self.target.file_name().unwrap_or_default())
    }

    /// Move every staged file next to the target, then remove the staging directory.
    pub(crate) fn commit(self) -> Result<()> {
        let dest_dir = self.target.parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));

        let entries = fs::read_dir(self.dir.path()).map_err(|e| PolisError::io(self.dir.path(), e))?;
        for entry in entries {
            let entry = entry.map_err(|e| PolisError::io(self.dir.path(), e))?;
            let dest = dest_dir.join(entry.file_name());
            sync(&entry.path());
            fs::rename(entry.path(), &dest).map_err(|e| PolisError::io(&dest, e))?;
        }
        sync(dest_dir);

        self.dir.close().map_err(|e| PolisError::io(&self.target, e))
    }
}

/// fsync a file or directory; failures are logged, not fatal.
fn sync(path: &Path) {
    if let Err(e) = File::open(path).and_then(|f| f.sync_all()) {
        warn!("failed to sync {}: {e}", path.display());
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{sync, StagedOutput};

    #[test]
    fn commit_moves_all_sidecars() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("out.shp");

        let staged = StagedOutput::new(&target).unwrap();
        let main = staged.path();
        fs::write(&main, b"shp").unwrap();
        fs::write(main.with_extension("dbf"), b"dbf").unwrap();
        assert!(!target.exists());

        staged.commit().unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"shp");
        assert_eq!(fs::read(tmp.path().join("out.dbf")).unwrap(), b"dbf");
        // Only the committed files remain; the staging directory is gone.
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 2);
    }

    #[test]
    fn drop_discards_staged_files() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("out.geojson");
        {
            let staged = StagedOutput::new(&target).unwrap();
            fs::write(staged.path(), b"{}").unwrap();
        }
        assert!(!target.exists());
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn sync_failure_is_not_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        sync(&tmp.path().join("missing.shp"));
        sync(tmp.path());
    }
}
