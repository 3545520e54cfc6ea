//! HTTP server module.
//!
//! Exposes the latest snapshot, manual refresh and report downloads as a
//! JSON API consumed by the dashboard.
//!
//! Reads never wait on a refresh; writes only ask the orchestrator to start one:
//!
//! ```text
//! GET  /api/summary, /api/department/{name} ──▶ QueryService ──▶ SnapshotStore
//! POST /api/refresh                         ──▶ RefreshOrchestrator (single flight)
//! GET  /api/refresh/status                  ──▶ RefreshOrchestrator::status
//! GET  /api/download/{report_type}          ──▶ ReportWriter::artifact_path ──▶ file
//! GET  /health                              ──▶ scheduler flag + last_updated
//! ```

pub mod dto;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use error::{ApiError, AppError};
pub use router::create_router;
pub use state::AppState;
