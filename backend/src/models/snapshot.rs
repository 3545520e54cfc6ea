//! Point-in-time view across all departments.

use chrono::{DateTime, Local};
use std::collections::BTreeMap;

use super::department::Department;
use super::record::Record;

/// One consistent copy of every department's records.
///
/// Snapshots are immutable once published; a refresh builds a new one and
/// swaps it in as a whole.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    /// Publish generation, assigned by the store. `0` is the initial empty snapshot.
    pub generation: u64,
    /// When the data was fetched. `None` until the first successful refresh.
    pub last_updated: Option<DateTime<Local>>,
    tables: BTreeMap<Department, Vec<Record>>,
}

impl Snapshot {
    /// The snapshot served before any refresh has succeeded.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build an unpublished snapshot from fully fetched tables.
    pub fn new(tables: BTreeMap<Department, Vec<Record>>, last_updated: DateTime<Local>) -> Self {
        Self {
            generation: 0,
            last_updated: Some(last_updated),
            tables,
        }
    }

    pub fn records(&self, department: Department) -> &[Record] {
        self.tables.get(&department).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn record_count(&self, department: Department) -> usize {
        self.records(department).len()
    }

    /// `true` once a refresh has been published.
    pub fn is_populated(&self) -> bool {
        self.last_updated.is_some()
    }

    /// Timestamp suffix used to name history artifacts generated from this snapshot.
    pub fn artifact_stamp(&self) -> String {
        self.last_updated
            .unwrap_or_else(Local::now)
            .format("%Y%m%d_%H%M%S")
            .to_string()
    }
}
