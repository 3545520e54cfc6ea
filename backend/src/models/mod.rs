//! Domain model: departments, records, snapshots and their summaries.

pub mod department;
pub mod record;
pub mod snapshot;
pub mod summary;

pub use department::{
    AggregateKind, AggregateRule, Department, DepartmentSchema, FieldKind, FieldSpec,
};
pub use record::{FieldValue, Record, TIMESTAMP_FORMAT};
pub use snapshot::Snapshot;
pub use summary::{
    compute_summary, summarize_department, AggregateValue, DepartmentSummary, Metric, Summary,
};
