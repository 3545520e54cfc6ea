//! Read-side queries over the latest snapshot.
//!
//! Every call reads the store once, so all values of one response come from
//! the same snapshot. Nothing here waits on a running refresh.

use chrono::{DateTime, Local};
use std::sync::Arc;

use super::snapshot_store::SnapshotStore;
use crate::models::{compute_summary, Department, Record, Summary};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("Unknown department: {0}")]
    UnknownDepartment(String),
}

/// Records of one department as of one snapshot.
#[derive(Debug, Clone)]
pub struct DepartmentData {
    pub department: Department,
    pub records: Vec<Record>,
    pub last_updated: Option<DateTime<Local>>,
    pub generation: u64,
}

#[derive(Clone)]
pub struct QueryService {
    store: Arc<SnapshotStore>,
}

impl QueryService {
    pub fn new(store: Arc<SnapshotStore>) -> Self {
        Self { store }
    }

    pub fn get_summary(&self) -> Summary {
        compute_summary(&self.store.read())
    }

    /// Records of the department called `name` (case-insensitive).
    pub fn get_department(&self, name: &str) -> Result<DepartmentData, QueryError> {
        let department: Department = name
            .parse()
            .map_err(|_| QueryError::UnknownDepartment(name.to_string()))?;
        let snapshot = self.store.read();
        Ok(DepartmentData {
            department,
            records: snapshot.records(department).to_vec(),
            last_updated: snapshot.last_updated,
            generation: snapshot.generation,
        })
    }

    pub fn last_updated(&self) -> Option<DateTime<Local>> {
        self.store.read().last_updated
    }
}
