//! Pruning of timestamped report copies.

use chrono::{Duration, Local, NaiveDateTime};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// `_YYYYMMDD_HHMMSS` suffix embedded in history file names.
const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const STAMP_LEN: usize = 15;

/// How long timestamped report copies are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// `0` disables pruning.
    pub keep_days: u32,
}

impl RetentionPolicy {
    pub fn new(keep_days: u32) -> Self {
        Self { keep_days }
    }

    pub fn is_enabled(&self) -> bool {
        self.keep_days > 0
    }

    /// Delete history files in `dirs` stamped before `now - keep_days`.
    ///
    /// Only files whose name ends in a valid stamp before the extension are
    /// candidates; "latest" artifacts and unrelated files are never removed.
    /// Returns the deleted paths. Individual failures are logged and skipped.
    pub fn prune(&self, dirs: &[&Path], now: NaiveDateTime) -> Vec<PathBuf> {
        if !self.is_enabled() {
            return Vec::new();
        }
        let cutoff = now - Duration::days(i64::from(self.keep_days));
        let mut removed = Vec::new();

        for dir in dirs {
            let entries = match fs::read_dir(dir) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "Cannot list report directory");
                    continue;
                }
            };

            for entry in entries.filter_map(Result::ok) {
                let path = entry.path();
                if !path.is_file() {
                    continue;
                }
                let Some(stamp) = history_stamp(&path) else {
                    continue;
                };
                if stamp >= cutoff {
                    continue;
                }
                match fs::remove_file(&path) {
                    Ok(()) => {
                        debug!(path = %path.display(), "Deleted old report");
                        removed.push(path);
                    }
                    Err(e) => warn!(path = %path.display(), error = %e, "Failed to delete old report"),
                }
            }
        }

        if !removed.is_empty() {
            info!(count = removed.len(), keep_days = self.keep_days, "Pruned old reports");
        }
        removed
    }

    pub fn prune_now(&self, dirs: &[&Path]) -> Vec<PathBuf> {
        self.prune(dirs, Local::now().naive_local())
    }
}

/// Extract the embedded stamp of a history file name such as
/// `daily_report_20240105_080000.xlsx`.
pub fn history_stamp(path: &Path) -> Option<NaiveDateTime> {
    let stem = path.file_stem()?.to_str()?;
    if stem.len() <= STAMP_LEN || !stem.is_char_boundary(stem.len() - STAMP_LEN) {
        return None;
    }
    let (prefix, stamp) = stem.split_at(stem.len() - STAMP_LEN);
    if !prefix.ends_with('_') {
        return None;
    }
    NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT).ok()
}
