//! Spreadsheet and flat-file reports.
//!
//! [`ReportWriter::write_reports`] renders every payload of a snapshot in
//! memory, stages them next to their targets, and renames them over the
//! "latest" artifacts only once all of them were staged. Timestamped history
//! copies are written afterwards on a best-effort basis.
//!
//! ```text
//! <report_dir>/daily_report.xlsx                      latest workbook
//! <report_dir>/daily_report_YYYYMMDD_HHMMSS.xlsx      history
//! <report_dir>/<csv>/<dept>_data.csv                  latest flat files
//! <report_dir>/<csv>/<dept>_data_YYYYMMDD_HHMMSS.csv  history
//! ```

pub mod atomic;
pub mod csv_export;
pub mod error;
pub mod retention;
pub mod workbook;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

use crate::models::{Department, Snapshot};

pub use error::{ReportError, ReportResult};
pub use retention::RetentionPolicy;

const WORKBOOK_STEM: &str = "daily_report";

/// Downloadable report artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Excel,
    Csv(Department),
}

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Excel => "excel",
            ReportKind::Csv(Department::Purchase) => "purchase_csv",
            ReportKind::Csv(Department::Production) => "production_csv",
            ReportKind::Csv(Department::Packing) => "packing_csv",
            ReportKind::Csv(Department::Shipment) => "shipment_csv",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ReportKind::Excel => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ReportKind::Csv(_) => "text/csv",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        if s == "excel" {
            return Ok(ReportKind::Excel);
        }
        s.strip_suffix("_csv")
            .and_then(|dept| dept.parse::<Department>().ok())
            .map(ReportKind::Csv)
            .ok_or_else(|| format!("Unknown report type: {}", s))
    }
}

/// What a successful [`ReportWriter::write_reports`] produced.
#[derive(Debug, Clone, Default)]
pub struct ReportOutcome {
    pub latest: Vec<PathBuf>,
    pub history: Vec<PathBuf>,
    /// History copies that could not be written.
    pub history_errors: Vec<String>,
}

/// Writes report artifacts into a report directory.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    report_dir: PathBuf,
    csv_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(report_dir: impl Into<PathBuf>, csv_subdir: &str) -> Self {
        let report_dir = report_dir.into();
        let csv_dir = report_dir.join(csv_subdir);
        Self {
            report_dir,
            csv_dir,
        }
    }

    pub fn report_dir(&self) -> &Path {
        &self.report_dir
    }

    pub fn csv_dir(&self) -> &Path {
        &self.csv_dir
    }

    /// Create the report and CSV directories if missing.
    pub fn ensure_dirs(&self) -> ReportResult<()> {
        fs::create_dir_all(&self.csv_dir)
            .map_err(|e| ReportError::write_failure(&self.csv_dir, e))
    }

    /// Path of the "latest" artifact of `kind`.
    pub fn artifact_path(&self, kind: ReportKind) -> PathBuf {
        match kind {
            ReportKind::Excel => self.report_dir.join(format!("{}.xlsx", WORKBOOK_STEM)),
            ReportKind::Csv(dept) => self
                .csv_dir
                .join(format!("{}.csv", dept.schema().file_stem)),
        }
    }

    fn history_path(&self, kind: ReportKind, stamp: &str) -> PathBuf {
        match kind {
            ReportKind::Excel => self
                .report_dir
                .join(format!("{}_{}.xlsx", WORKBOOK_STEM, stamp)),
            ReportKind::Csv(dept) => self
                .csv_dir
                .join(format!("{}_{}.csv", dept.schema().file_stem, stamp)),
        }
    }

    /// Render and write every artifact of `snapshot`.
    ///
    /// On error no "latest" artifact has been replaced.
    pub fn write_reports(&self, snapshot: &Snapshot) -> ReportResult<ReportOutcome> {
        let payloads = self.render_all(snapshot)?;

        let files: Vec<(PathBuf, Vec<u8>)> = payloads
            .iter()
            .map(|(kind, bytes)| (self.artifact_path(*kind), bytes.clone()))
            .collect();
        let latest = atomic::write_all_atomic(files)?;

        let stamp = snapshot.artifact_stamp();
        let mut outcome = ReportOutcome {
            latest,
            ..Default::default()
        };
        for (kind, bytes) in payloads {
            let path = self.history_path(kind, &stamp);
            match atomic::stage(&path, &bytes).and_then(atomic::StagedFile::commit) {
                Ok(path) => outcome.history.push(path),
                Err(e) => {
                    warn!(report = %kind, error = %e, "Failed to write history copy");
                    outcome.history_errors.push(e.to_string());
                }
            }
        }

        info!(
            generation = snapshot.generation,
            latest = outcome.latest.len(),
            history = outcome.history.len(),
            dir = %self.report_dir.display(),
            "Reports written"
        );
        Ok(outcome)
    }

    /// Apply `policy` to both report directories.
    pub fn prune_history(&self, policy: &RetentionPolicy) -> Vec<PathBuf> {
        policy.prune_now(&[self.report_dir.as_path(), self.csv_dir.as_path()])
    }

    fn render_all(&self, snapshot: &Snapshot) -> ReportResult<Vec<(ReportKind, Vec<u8>)>> {
        let mut payloads = Vec::with_capacity(Department::ALL.len() + 1);
        for dept in Department::ALL {
            let bytes = csv_export::render_csv(dept, snapshot.records(dept))?;
            payloads.push((ReportKind::Csv(dept), bytes));
        }
        payloads.push((ReportKind::Excel, workbook::render_workbook(snapshot)?));
        Ok(payloads)
    }
}
