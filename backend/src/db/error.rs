//! Error types for data source operations.
//!
//! Every fetch failure carries an [`ErrorContext`] describing where it
//! happened, and maps onto one of the refresh failure reasons reported by the
//! orchestrator.

use serde::Serialize;
use std::fmt;

use crate::models::Department;

/// Result type for data source operations
pub type SourceResult<T> = Result<T, SourceError>;

/// Why a fetch cycle failed, as exposed to operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureReason {
    SourceUnreachable,
    Timeout,
    MalformedData,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::SourceUnreachable => "source-unreachable",
            FailureReason::Timeout => "timeout",
            FailureReason::MalformedData => "malformed-data",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured context for source errors.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The operation being performed (e.g., "fetch", "connect")
    pub operation: Option<String>,
    /// Department whose records were being fetched
    pub department: Option<Department>,
    /// Additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: Some(operation.into()),
            ..Default::default()
        }
    }

    pub fn with_department(mut self, department: Department) -> Self {
        self.department = Some(department);
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(ref op) = self.operation {
            parts.push(format!("operation={}", op));
        }
        if let Some(dept) = self.department {
            parts.push(format!("department={}", dept));
        }
        if let Some(ref details) = self.details {
            parts.push(format!("details={}", details));
        }
        write!(f, "[{}]", parts.join(", "))
    }
}

/// Error type for data source operations
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Connection could not be established or was lost mid-query.
    #[error("Source unreachable: {message} {context}")]
    Unreachable {
        message: String,
        context: ErrorContext,
    },

    /// The source did not answer within the fetch timeout.
    #[error("Timeout error: {message} {context}")]
    Timeout {
        message: String,
        context: ErrorContext,
    },

    /// Rows came back but do not fit the department schema.
    #[error("Malformed data: {message} {context}")]
    MalformedData {
        message: String,
        context: ErrorContext,
    },

    /// The source is misconfigured (missing credentials, unknown type).
    #[error("Configuration error: {message} {context}")]
    Configuration {
        message: String,
        context: ErrorContext,
    },
}

impl SourceError {
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::Unreachable {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedData {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Map onto the operator-facing failure reason.
    pub fn failure_reason(&self) -> FailureReason {
        match self {
            Self::Unreachable { .. } | Self::Configuration { .. } => {
                FailureReason::SourceUnreachable
            }
            Self::Timeout { .. } => FailureReason::Timeout,
            Self::MalformedData { .. } => FailureReason::MalformedData,
        }
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            Self::Unreachable { context, .. }
            | Self::Timeout { context, .. }
            | Self::MalformedData { context, .. }
            | Self::Configuration { context, .. } => context,
        }
    }

    /// Add or update the operation in the error context.
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.context_mut().operation = Some(operation.into());
        self
    }

    /// Tag the error with the department being fetched.
    pub fn for_department(mut self, department: Department) -> Self {
        self.context_mut().department = Some(department);
        self
    }
}
