//! HTTP handlers for the REST API.
//!
//! Handlers read from the query service and never wait for a refresh;
//! `POST /api/refresh` only asks the orchestrator to start one.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::io::ErrorKind;
use tracing::info;

use super::dto::{
    format_last_updated, DepartmentResponse, HealthResponse, RefreshResponse,
    RefreshStatusResponse, SummaryResponse,
};
use super::error::AppError;
use super::state::AppState;
use crate::reports::ReportKind;
use crate::services::{RefreshTrigger, TriggerOutcome};

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

pub const REFRESH_INITIATED: &str = "refresh initiated";
pub const REFRESH_IN_PROGRESS: &str = "already in progress";

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        system_running: state.system_running(),
        last_update: state.query.last_updated().map(|t| t.to_rfc3339()),
    })
}

/// GET /api/summary
///
/// Before the first refresh every aggregate is zero and `last_updated` is null.
pub async fn get_summary(State(state): State<AppState>) -> Json<SummaryResponse> {
    Json(SummaryResponse {
        summary: state.query.get_summary(),
    })
}

/// GET /api/department/{name}
pub async fn get_department(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> HandlerResult<DepartmentResponse> {
    let data = state.query.get_department(&name)?;
    Ok(Json(DepartmentResponse {
        department: data.department,
        count: data.records.len(),
        data: data.records,
        last_updated: format_last_updated(data.last_updated),
        generation: data.generation,
    }))
}

/// POST /api/refresh
///
/// 202 when a new cycle was started, 200 when one was already running.
pub async fn trigger_refresh(State(state): State<AppState>) -> (StatusCode, Json<RefreshResponse>) {
    let (code, status) = match state.orchestrator.trigger_refresh(RefreshTrigger::Manual) {
        TriggerOutcome::Started => {
            info!("Manual refresh initiated");
            (StatusCode::ACCEPTED, REFRESH_INITIATED)
        }
        TriggerOutcome::AlreadyInProgress => (StatusCode::OK, REFRESH_IN_PROGRESS),
    };
    (
        code,
        Json(RefreshResponse {
            status: status.to_string(),
        }),
    )
}

/// GET /api/refresh/status
pub async fn refresh_status(State(state): State<AppState>) -> Json<RefreshStatusResponse> {
    let orchestrator = &state.orchestrator;
    Json(RefreshStatusResponse {
        running: orchestrator.is_running(),
        source: orchestrator.source_name().to_string(),
        generation: orchestrator.store().generation(),
        status: orchestrator.status(),
        recent_cycles: orchestrator.recent_cycles(),
    })
}

/// GET /api/download/{report_type}
///
/// Serves the latest artifact of `report_type` as an attachment.
pub async fn download_report(
    State(state): State<AppState>,
    Path(report_type): Path<String>,
) -> Result<Response, AppError> {
    let kind: ReportKind = report_type
        .parse()
        .map_err(AppError::UnknownReportType)?;
    let path = state.reports.artifact_path(kind);

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(AppError::MissingArtifact(format!("Report not found: {}", kind)));
        }
        Err(e) => {
            return Err(AppError::Internal(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            )))
        }
    };

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| kind.to_string());

    Ok((
        [
            (header::CONTENT_TYPE, kind.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    )
        .into_response())
}
