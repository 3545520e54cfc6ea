//! HTTP error mapping.
//!
//! Every failure a handler can return ends up as a JSON `{code, message}`
//! body. Refresh and report-writing failures never reach this layer; they
//! are visible only through `/api/refresh/status` and `last_updated`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::services::QueryError;

/// JSON error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("{0}")]
    UnknownReportType(String),

    /// A known artifact that has not been written yet.
    #[error("{0}")]
    MissingArtifact(String),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Query(QueryError::UnknownDepartment(_)) | AppError::MissingArtifact(_) => {
                StatusCode::NOT_FOUND
            }
            AppError::UnknownReportType(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Query(QueryError::UnknownDepartment(_)) => "UNKNOWN_DEPARTMENT",
            AppError::UnknownReportType(_) => "UNKNOWN_REPORT_TYPE",
            AppError::MissingArtifact(_) => "REPORT_NOT_FOUND",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn to_body(&self) -> ApiError {
        ApiError {
            code: self.code().to_string(),
            message: self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status().is_server_error() {
            tracing::error!(code = self.code(), error = %self, "Request failed");
        }
        (self.status(), Json(self.to_body())).into_response()
    }
}
