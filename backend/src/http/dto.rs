//! Data Transfer Objects for the HTTP API.

use chrono::{DateTime, Local};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::models::{Department, DepartmentSummary, Record, Summary};
use crate::services::{Cycle, RefreshStatus};

/// Timestamp format of `last_updated` fields.
pub const LAST_UPDATED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn format_last_updated(at: Option<DateTime<Local>>) -> Option<String> {
    at.map(|t| t.format(LAST_UPDATED_FORMAT).to_string())
}

/// `GET /api/summary` body: one object per department keyed by its name,
/// plus `last_updated` and `generation`.
#[derive(Debug, Clone)]
pub struct SummaryResponse {
    pub summary: Summary,
}

struct DepartmentMetrics<'a>(&'a DepartmentSummary);

impl Serialize for DepartmentMetrics<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.metrics.len()))?;
        for metric in &self.0.metrics {
            map.serialize_entry(metric.rule.key, &metric.value)?;
        }
        map.end()
    }
}

impl Serialize for SummaryResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let departments = &self.summary.departments;
        let mut map = serializer.serialize_map(Some(departments.len() + 2))?;
        for dept in departments {
            map.serialize_entry(dept.department.as_str(), &DepartmentMetrics(dept))?;
        }
        map.serialize_entry("last_updated", &format_last_updated(self.summary.last_updated))?;
        map.serialize_entry("generation", &self.summary.generation)?;
        map.end()
    }
}

/// `GET /api/department/{name}` body.
#[derive(Debug, Clone, Serialize)]
pub struct DepartmentResponse {
    pub department: Department,
    pub data: Vec<Record>,
    pub count: usize,
    pub last_updated: Option<String>,
    pub generation: u64,
}

/// `POST /api/refresh` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub status: String,
}

/// `GET /api/refresh/status` body.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshStatusResponse {
    pub running: bool,
    pub source: String,
    pub generation: u64,
    #[serde(flatten)]
    pub status: RefreshStatus,
    pub recent_cycles: Vec<Cycle>,
}

/// `GET /health` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// Whether the scheduler's timers are active.
    pub system_running: bool,
    /// RFC 3339 time of the last published snapshot.
    pub last_update: Option<String>,
}
