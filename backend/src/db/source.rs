//! Data source trait consumed by the refresh pipeline.

use async_trait::async_trait;

use super::error::SourceResult;
use crate::models::{Department, Record};

/// Capability to pull one department's records from the ERP.
///
/// Implementations must not touch any pipeline state; the orchestrator owns
/// what happens to the returned rows.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Short identifier used in logs and health output.
    fn name(&self) -> &str;

    /// Fetch the current records of `department` in source order.
    async fn fetch(&self, department: Department) -> SourceResult<Vec<Record>>;

    /// Check whether the source can currently be reached.
    async fn health_check(&self) -> SourceResult<bool> {
        Ok(true)
    }
}
