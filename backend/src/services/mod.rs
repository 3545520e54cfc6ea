//! Service layer: snapshot storage, refresh orchestration and queries.
//!
//! The HTTP layer and the scheduler only talk to these services; neither of
//! them touches a data source or the report directory directly.

pub mod cycle_tracker;
pub mod query;
pub mod refresh;
pub mod snapshot_store;

pub use cycle_tracker::{Cycle, CycleStatus, CycleTracker, LogEntry, LogLevel};
pub use query::{DepartmentData, QueryError, QueryService};
pub use refresh::{
    FailureRecord, RefreshError, RefreshOrchestrator, RefreshOutcome, RefreshPhase,
    RefreshStatus, RefreshTrigger, ReportFailure, TriggerOutcome,
};
pub use snapshot_store::SnapshotStore;
