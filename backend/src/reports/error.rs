//! Error types for report generation.

use std::path::PathBuf;

/// Result type for report operations
pub type ReportResult<T> = Result<T, ReportError>;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// The target location could not be written.
    #[error("Failed to write report {}: {source}", path.display())]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A payload could not be rendered in memory.
    #[error("Failed to render report: {0}")]
    Render(String),
}

impl ReportError {
    pub fn write_failure(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::WriteFailure {
            path: path.into(),
            source,
        }
    }
}

impl From<csv::Error> for ReportError {
    fn from(err: csv::Error) -> Self {
        Self::Render(format!("CSV: {}", err))
    }
}

impl From<rust_xlsxwriter::XlsxError> for ReportError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        Self::Render(format!("Workbook: {}", err))
    }
}
