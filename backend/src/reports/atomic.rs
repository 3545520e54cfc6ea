//! Replace-by-rename file writes.
//!
//! Payloads are first staged into temporary files next to their targets and
//! only then renamed over them. A rename within one directory is atomic, so a
//! reader sees either the old file or the new one, never a partial write.
//!
//! A batch is committed as a unit: targets are checked before the first
//! rename, and if a rename still fails the targets already replaced are
//! restored from backups taken just before the renames.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::warn;

use super::error::{ReportError, ReportResult};

/// A payload written to a temporary file, waiting to be renamed into place.
pub struct StagedFile {
    temp: NamedTempFile,
    target: PathBuf,
}

impl StagedFile {
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Rename the staged file over its target.
    pub fn commit(self) -> ReportResult<PathBuf> {
        let target = self.target;
        self.temp
            .persist(&target)
            .map_err(|e| ReportError::write_failure(&target, e.error))?;
        Ok(target)
    }
}

fn parent_dir(target: &Path) -> &Path {
    target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// Write `bytes` to a hidden temporary file in the target's directory.
///
/// Dropping the returned value without committing removes the temporary file.
pub fn stage(target: &Path, bytes: &[u8]) -> ReportResult<StagedFile> {
    let mut temp = tempfile::Builder::new()
        .prefix(".tmp-")
        .tempfile_in(parent_dir(target))
        .map_err(|e| ReportError::write_failure(target, e))?;
    temp.write_all(bytes)
        .and_then(|_| temp.as_file().sync_all())
        .map_err(|e| ReportError::write_failure(target, e))?;

    Ok(StagedFile {
        temp,
        target: target.to_path_buf(),
    })
}

/// Stage every payload. Fails without touching any target.
pub fn stage_all(files: &[(PathBuf, Vec<u8>)]) -> ReportResult<Vec<StagedFile>> {
    files.iter().map(|(path, bytes)| stage(path, bytes)).collect()
}

/// Previous content of a target, kept until the whole batch is committed.
enum Backup {
    /// The target did not exist.
    Absent,
    Copy(NamedTempFile),
}

fn backup(target: &Path) -> ReportResult<Backup> {
    if !target.exists() {
        return Ok(Backup::Absent);
    }
    let copy = tempfile::Builder::new()
        .prefix(".bak-")
        .tempfile_in(parent_dir(target))
        .and_then(|copy| fs::copy(target, copy.path()).map(|_| copy))
        .map_err(|e| ReportError::write_failure(target, e))?;
    Ok(Backup::Copy(copy))
}

fn restore(target: &Path, backup: Backup) {
    let restored = match backup {
        Backup::Absent => fs::remove_file(target),
        Backup::Copy(copy) => copy.persist(target).map(|_| ()).map_err(|e| e.error),
    };
    if let Err(e) = restored {
        warn!(path = %target.display(), error = %e, "Failed to restore report after aborted commit");
    }
}

/// Rename every staged file over its target, all or nothing.
///
/// A target that is a directory aborts the batch before any rename. When a
/// rename fails midway, targets replaced so far get their previous content
/// back (or are removed if they did not exist).
pub fn commit_all(staged: Vec<StagedFile>) -> ReportResult<Vec<PathBuf>> {
    if let Some(file) = staged.iter().find(|f| f.target().is_dir()) {
        return Err(ReportError::write_failure(
            file.target(),
            io::Error::other("target is a directory"),
        ));
    }

    let backups = staged
        .iter()
        .map(|f| backup(f.target()))
        .collect::<ReportResult<Vec<_>>>()?;

    let mut committed: Vec<(PathBuf, Backup)> = Vec::with_capacity(staged.len());
    let mut backups = backups.into_iter();
    for file in staged {
        let previous = backups.next().unwrap_or(Backup::Absent);
        match file.commit() {
            Ok(path) => committed.push((path, previous)),
            Err(e) => {
                for (path, previous) in committed.into_iter().rev() {
                    restore(&path, previous);
                }
                return Err(e);
            }
        }
    }

    Ok(committed.into_iter().map(|(path, _)| path).collect())
}

/// Stage every payload, then commit them all.
pub fn write_all_atomic(files: Vec<(PathBuf, Vec<u8>)>) -> ReportResult<Vec<PathBuf>> {
    commit_all(stage_all(&files)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hidden_files(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|n| n.starts_with(".tmp-") || n.starts_with(".bak-"))
            .collect()
    }

    #[test]
    fn test_write_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("report.csv");
        fs::write(&target, b"old").unwrap();

        write_all_atomic(vec![(target.clone(), b"new".to_vec())]).unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"new");
        assert!(hidden_files(dir.path()).is_empty());
    }

    #[test]
    fn test_staging_failure_leaves_targets_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("a.csv");
        fs::write(&good, b"old").unwrap();
        let bad = dir.path().join("missing").join("b.csv");

        let err = write_all_atomic(vec![
            (good.clone(), b"new".to_vec()),
            (bad, b"new".to_vec()),
        ])
        .unwrap_err();

        assert!(matches!(err, ReportError::WriteFailure { .. }));
        assert_eq!(fs::read(&good).unwrap(), b"old");
    }

    #[test]
    fn test_directory_target_aborts_before_any_rename() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.csv");
        fs::write(&first, b"old").unwrap();
        let blocked = dir.path().join("b.xlsx");
        fs::create_dir(&blocked).unwrap();
        fs::write(blocked.join("inner"), b"x").unwrap();

        let err = write_all_atomic(vec![
            (first.clone(), b"new".to_vec()),
            (blocked.clone(), b"new".to_vec()),
        ])
        .unwrap_err();

        assert!(matches!(err, ReportError::WriteFailure { ref path, .. } if *path == blocked));
        assert_eq!(fs::read(&first).unwrap(), b"old");
        assert!(hidden_files(dir.path()).is_empty());
    }

    #[test]
    fn test_failed_rename_restores_committed_targets() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("a.csv");
        fs::write(&existing, b"old").unwrap();
        let fresh = dir.path().join("c.csv");
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();

        let staged = stage_all(&[
            (existing.clone(), b"new".to_vec()),
            (fresh.clone(), b"new".to_vec()),
            (sub.join("b.csv"), b"new".to_vec()),
        ])
        .unwrap();
        // The staged file of the last target disappears with its directory,
        // so its rename fails after the first two were committed.
        fs::remove_dir_all(&sub).unwrap();

        assert!(commit_all(staged).is_err());
        assert_eq!(fs::read(&existing).unwrap(), b"old");
        assert!(!fresh.exists());
        assert!(hidden_files(dir.path()).is_empty());
    }
}
