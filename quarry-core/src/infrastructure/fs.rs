use crate::infrastructure::error::InfrastructureError;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// Write `content` to `path` through a temporary sibling file, creating the
/// parent directory if needed. Readers see either the old file or the whole
/// new one.
pub fn atomic_write<P: AsRef<Path>, C: AsRef<[u8]>>(
    path: P,
    content: C,
) -> Result<(), InfrastructureError> {
    let path = path.as_ref();
    let parent = parent_dir(path);
    fs::create_dir_all(parent)?;

    let mut temp_file = tempfile::NamedTempFile::new_in(parent)?;
    temp_file.write_all(content.as_ref())?;
    temp_file
        .persist(path)
        .map_err(|e| InfrastructureError::Io(e.error))?;
    Ok(())
}

/// Reserve a temporary path next to `path` for writers that insist on
/// creating the file themselves (DuckDB `COPY ... TO`). The caller renames
/// it into place with `promote`.
pub fn staging_path(path: &Path) -> Result<PathBuf, InfrastructureError> {
    let parent = parent_dir(path);
    fs::create_dir_all(parent)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "out".to_string());
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    Ok(parent.join(format!(".{}.{}.tmp{}", file_name, std::process::id(), ext)))
}

pub fn promote(staged: &Path, path: &Path) -> Result<(), InfrastructureError> {
    fs::rename(staged, path).map_err(|e| {
        let _ = fs::remove_file(staged);
        InfrastructureError::Io(e)
    })
}

/// Output files written into one hidden scratch directory and moved to
/// their targets together by `commit`. Dropping without committing removes
/// everything staged, so a failed run leaves the targets untouched.
pub struct StagedOutputs {
    dir: tempfile::TempDir,
    moves: Vec<(PathBuf, PathBuf)>,
}

impl StagedOutputs {
    /// The scratch directory lives under `root` so the final renames stay on
    /// one filesystem.
    pub fn new_in(root: &Path) -> Result<Self, InfrastructureError> {
        fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new()
            .prefix(".quarry-run-")
            .tempdir_in(root)?;
        Ok(Self {
            dir,
            moves: Vec::new(),
        })
    }

    /// Scratch path standing in for `target` until commit. The extension is
    /// kept; writers pick the format from it.
    pub fn stage(&mut self, target: &Path) -> PathBuf {
        let file_name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "out".to_string());
        let staged = self
            .dir
            .path()
            .join(format!("{}-{}", self.moves.len(), file_name));
        self.moves.push((staged.clone(), target.to_path_buf()));
        staged
    }

    /// Move every staged file onto its target. Returns the targets in the
    /// order they were staged.
    pub fn commit(self) -> Result<Vec<PathBuf>, InfrastructureError> {
        for (staged, _) in &self.moves {
            if !staged.exists() {
                return Err(InfrastructureError::FileNotFound(
                    staged.display().to_string(),
                ));
            }
        }
        let mut promoted = Vec::with_capacity(self.moves.len());
        for (staged, target) in self.moves {
            fs::create_dir_all(parent_dir(&target))?;
            if fs::rename(&staged, &target).is_err() {
                fs::copy(&staged, &target)?;
                fs::remove_file(&staged)?;
            }
            promoted.push(target);
        }
        Ok(promoted)
    }
}

/// Time since the file was last modified, or `None` if it does not exist.
pub fn file_age(path: &Path) -> Result<Option<Duration>, InfrastructureError> {
    match fs::metadata(path) {
        Ok(meta) => {
            let modified = meta.modified()?;
            // A clock that went backwards counts as "just written".
            Ok(Some(
                SystemTime::now()
                    .duration_since(modified)
                    .unwrap_or(Duration::ZERO),
            ))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    #[test]
    fn test_atomic_write_creates_parent_dirs() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("processed").join("_run_meta.json");

        atomic_write(&file_path, "{}")?;

        assert_eq!(fs::read_to_string(file_path)?, "{}");
        Ok(())
    }

    #[test]
    fn test_atomic_write_overwrites_existing() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("report.csv");

        atomic_write(&file_path, "old")?;
        atomic_write(&file_path, "new")?;

        assert_eq!(fs::read_to_string(file_path)?, "new");
        // No temp files left behind.
        assert_eq!(fs::read_dir(dir.path())?.count(), 1);
        Ok(())
    }

    #[test]
    fn test_staging_path_keeps_extension() -> Result<()> {
        let dir = tempdir()?;
        let staged = staging_path(&dir.path().join("orders.parquet"))?;
        assert_eq!(staged.extension().unwrap(), "parquet");
        assert_eq!(staged.parent(), Some(dir.path()));
        Ok(())
    }

    #[test]
    fn test_staged_outputs_land_together() -> Result<()> {
        let dir = tempdir()?;
        let out = dir.path().join("processed");
        let mut staged = StagedOutputs::new_in(dir.path())?;

        let a = staged.stage(&out.join("orders_clean.parquet"));
        let b = staged.stage(&out.join("reports").join("missingness.csv"));
        assert_eq!(a.extension().unwrap(), "parquet");
        fs::write(&a, "a")?;
        fs::write(&b, "b")?;
        assert!(!out.exists());

        let promoted = staged.commit()?;
        assert_eq!(promoted.len(), 2);
        assert_eq!(fs::read_to_string(out.join("orders_clean.parquet"))?, "a");
        assert_eq!(fs::read_to_string(out.join("reports").join("missingness.csv"))?, "b");
        // Scratch directory is gone.
        assert_eq!(fs::read_dir(dir.path())?.count(), 1);
        Ok(())
    }

    #[test]
    fn test_staged_outputs_dropped_leave_nothing() -> Result<()> {
        let dir = tempdir()?;
        let target = dir.path().join("processed").join("analytics.parquet");
        {
            let mut staged = StagedOutputs::new_in(dir.path())?;
            fs::write(staged.stage(&target), "partial")?;
        }
        assert!(!target.exists());
        assert_eq!(fs::read_dir(dir.path())?.count(), 0);
        Ok(())
    }

    #[test]
    fn test_staged_outputs_refuse_unwritten_files() -> Result<()> {
        let dir = tempdir()?;
        let mut staged = StagedOutputs::new_in(dir.path())?;
        let first = staged.stage(&dir.path().join("a.csv"));
        fs::write(first, "x")?;
        staged.stage(&dir.path().join("b.csv"));

        assert!(staged.commit().is_err());
        assert!(!dir.path().join("a.csv").exists());
        Ok(())
    }

    #[test]
    fn test_file_age() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("cache.json");
        assert!(file_age(&file_path)?.is_none());

        atomic_write(&file_path, "[]")?;
        let age = file_age(&file_path)?.unwrap();
        assert!(age < Duration::from_secs(60));
        Ok(())
    }
}
