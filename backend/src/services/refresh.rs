//! Refresh orchestration.
//!
//! One refresh cycle fetches every department concurrently, publishes a new
//! snapshot only when all of them succeeded, then writes the reports of that
//! snapshot. At most one cycle runs at a time; triggers arriving meanwhile
//! are answered with [`TriggerOutcome::AlreadyInProgress`] and dropped.
//!
//! ```text
//! Idle ──trigger──▶ Fetching ──all ok──▶ Publishing (publish + reports) ──▶ Idle
//!                      │
//!                      └──any error──▶ failure recorded, snapshot unchanged ──▶ Idle
//! ```

use chrono::{DateTime, Local};
use futures::future::try_join_all;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use super::cycle_tracker::{Cycle, CycleTracker, LogLevel};
use super::snapshot_store::SnapshotStore;
use crate::db::{DataSource, FailureReason, SourceError, SourceResult};
use crate::models::{Department, Record, Snapshot};
use crate::reports::{ReportWriter, RetentionPolicy};

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// What started a refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshTrigger {
    Startup,
    Manual,
    Interval,
    Daily,
}

impl fmt::Display for RefreshTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RefreshTrigger::Startup => "startup",
            RefreshTrigger::Manual => "manual",
            RefreshTrigger::Interval => "interval",
            RefreshTrigger::Daily => "daily",
        };
        f.write_str(s)
    }
}

/// Immediate answer to a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Started,
    AlreadyInProgress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshPhase {
    Idle,
    Fetching,
    Publishing,
}

/// Most recent failed fetch.
#[derive(Debug, Clone, Serialize)]
pub struct FailureRecord {
    pub reason: FailureReason,
    pub message: String,
    pub at: DateTime<Local>,
}

/// Most recent report write failure.
#[derive(Debug, Clone, Serialize)]
pub struct ReportFailure {
    pub generation: u64,
    pub message: String,
    pub at: DateTime<Local>,
}

/// Observable state of the orchestrator.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshStatus {
    pub phase: RefreshPhase,
    pub last_success: Option<DateTime<Local>>,
    pub last_failure: Option<FailureRecord>,
    pub last_report_error: Option<ReportFailure>,
    /// Number of cycles that published a snapshot.
    pub cycles_completed: u64,
}

impl Default for RefreshStatus {
    fn default() -> Self {
        Self {
            phase: RefreshPhase::Idle,
            last_success: None,
            last_failure: None,
            last_report_error: None,
            cycles_completed: 0,
        }
    }
}

/// Result of a cycle that published.
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub cycle_id: String,
    pub generation: u64,
    pub records: usize,
    /// Set when the snapshot was published but its reports could not be written.
    pub report_error: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error("A refresh is already in progress")]
    AlreadyInProgress,

    #[error("Fetching {department} failed: {source}")]
    Fetch {
        department: Department,
        #[source]
        source: SourceError,
    },
}

impl RefreshError {
    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self {
            RefreshError::AlreadyInProgress => None,
            RefreshError::Fetch { source, .. } => Some(source.failure_reason()),
        }
    }
}

/// Runs refresh cycles against a data source and publishes their snapshots.
pub struct RefreshOrchestrator {
    source: Arc<dyn DataSource>,
    store: Arc<SnapshotStore>,
    writer: Arc<ReportWriter>,
    retention: RetentionPolicy,
    fetch_timeout: Duration,
    in_flight: AtomicBool,
    status: RwLock<RefreshStatus>,
    cycles: CycleTracker,
    idle: Notify,
}

/// Holds the single-flight flag; releases it and returns to `Idle` on drop,
/// including during a panic unwind.
struct FlightGuard<'a> {
    orchestrator: &'a RefreshOrchestrator,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.orchestrator.status.write().phase = RefreshPhase::Idle;
        self.orchestrator.in_flight.store(false, Ordering::Release);
        self.orchestrator.idle.notify_waiters();
    }
}

impl RefreshOrchestrator {
    pub fn new(
        source: Arc<dyn DataSource>,
        store: Arc<SnapshotStore>,
        writer: Arc<ReportWriter>,
    ) -> Self {
        Self {
            source,
            store,
            writer,
            retention: RetentionPolicy::new(0),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            in_flight: AtomicBool::new(false),
            status: RwLock::new(RefreshStatus::default()),
            cycles: CycleTracker::new(),
            idle: Notify::new(),
        }
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn status(&self) -> RefreshStatus {
        self.status.read().clone()
    }

    /// Recent cycles, newest first.
    pub fn recent_cycles(&self) -> Vec<Cycle> {
        self.cycles.recent()
    }

    /// Start a cycle in the background unless one is already running.
    ///
    /// Returns immediately. Must be called from within a tokio runtime.
    pub fn trigger_refresh(self: &Arc<Self>, trigger: RefreshTrigger) -> TriggerOutcome {
        if !self.try_begin() {
            info!(trigger = %trigger, "Refresh already in progress, trigger dropped");
            return TriggerOutcome::AlreadyInProgress;
        }

        let this = Arc::clone(self);
        tokio::spawn(async move {
            let guard = FlightGuard { orchestrator: &this };
            // Failures are recorded in the status and cycle history.
            let _ = this.run_cycle(trigger).await;
            drop(guard);
        });
        TriggerOutcome::Started
    }

    /// Run a cycle and wait for it to finish.
    pub async fn refresh_now(
        &self,
        trigger: RefreshTrigger,
    ) -> Result<RefreshOutcome, RefreshError> {
        if !self.try_begin() {
            return Err(RefreshError::AlreadyInProgress);
        }
        let _guard = FlightGuard { orchestrator: self };
        self.run_cycle(trigger).await
    }

    /// Resolve once no cycle is in flight.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if !self.is_running() {
                return;
            }
            notified.await;
        }
    }

    fn try_begin(&self) -> bool {
        let acquired = self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if acquired {
            self.set_phase(RefreshPhase::Fetching);
        }
        acquired
    }

    fn set_phase(&self, phase: RefreshPhase) {
        self.status.write().phase = phase;
    }

    async fn run_cycle(&self, trigger: RefreshTrigger) -> Result<RefreshOutcome, RefreshError> {
        let cycle_id = self.cycles.start(trigger);
        info!(
            cycle_id = %cycle_id,
            trigger = %trigger,
            source = self.source.name(),
            "Refresh started"
        );
        self.cycles.log(
            &cycle_id,
            LogLevel::Info,
            format!("Fetching {} departments from {}", Department::ALL.len(), self.source.name()),
        );

        let tables = match self.fetch_all().await {
            Ok(tables) => tables,
            Err(err) => {
                self.record_failure(&cycle_id, &err);
                return Err(err);
            }
        };
        let records: usize = tables.values().map(Vec::len).sum();

        self.set_phase(RefreshPhase::Publishing);
        let snapshot = self.store.publish(Snapshot::new(tables, Local::now()));
        self.cycles.set_generation(&cycle_id, snapshot.generation);
        self.cycles.log(
            &cycle_id,
            LogLevel::Success,
            format!("Published generation {} with {} records", snapshot.generation, records),
        );
        info!(
            cycle_id = %cycle_id,
            generation = snapshot.generation,
            records,
            "Snapshot published"
        );

        let report_error = self.write_reports(&cycle_id, &snapshot).await;

        {
            let mut status = self.status.write();
            status.last_success = snapshot.last_updated;
            status.cycles_completed += 1;
            if let Some(ref message) = report_error {
                status.last_report_error = Some(ReportFailure {
                    generation: snapshot.generation,
                    message: message.clone(),
                    at: Local::now(),
                });
            }
        }
        self.cycles.complete(&cycle_id);

        Ok(RefreshOutcome {
            cycle_id,
            generation: snapshot.generation,
            records,
            report_error,
        })
    }

    async fn fetch_all(&self) -> Result<BTreeMap<Department, Vec<Record>>, RefreshError> {
        let fetches = Department::ALL
            .iter()
            .map(|&department| self.fetch_department(department));
        let tables = try_join_all(fetches).await?;
        Ok(tables.into_iter().collect())
    }

    async fn fetch_department(
        &self,
        department: Department,
    ) -> Result<(Department, Vec<Record>), RefreshError> {
        let fetched = match tokio::time::timeout(self.fetch_timeout, self.source.fetch(department))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(SourceError::timeout(format!(
                "no response within {}s",
                self.fetch_timeout.as_secs_f64()
            ))),
        };

        let records = fetched
            .and_then(|rows| {
                rows.into_iter()
                    .map(|row| row.conform(department.schema()).map_err(SourceError::malformed))
                    .collect::<SourceResult<Vec<_>>>()
            })
            .map_err(|e| RefreshError::Fetch {
                department,
                source: e.with_operation("fetch").for_department(department),
            })?;

        debug!(department = %department, records = records.len(), "Department fetched");
        Ok((department, records))
    }

    fn record_failure(&self, cycle_id: &str, err: &RefreshError) {
        let reason = err.failure_reason().unwrap_or(FailureReason::SourceUnreachable);
        error!(cycle_id = %cycle_id, reason = %reason, error = %err, "Refresh failed, snapshot unchanged");
        self.status.write().last_failure = Some(FailureRecord {
            reason,
            message: err.to_string(),
            at: Local::now(),
        });
        self.cycles.fail(cycle_id, format!("{}: {}", reason, err));
    }

    /// Write reports of `snapshot` on the blocking pool, then prune history.
    /// Returns the error message when the reports could not be written.
    async fn write_reports(&self, cycle_id: &str, snapshot: &Arc<Snapshot>) -> Option<String> {
        let writer = Arc::clone(&self.writer);
        let to_write = Arc::clone(snapshot);
        let written = tokio::task::spawn_blocking(move || writer.write_reports(&to_write)).await;

        let message = match written {
            Ok(Ok(outcome)) => {
                self.cycles.log(
                    cycle_id,
                    LogLevel::Success,
                    format!("Wrote {} report files", outcome.latest.len()),
                );
                for history_error in outcome.history_errors {
                    self.cycles.log(cycle_id, LogLevel::Warning, history_error);
                }
                self.prune_history(cycle_id).await;
                return None;
            }
            Ok(Err(e)) => e.to_string(),
            Err(join_error) => format!("Report task failed: {}", join_error),
        };

        error!(
            cycle_id = %cycle_id,
            generation = snapshot.generation,
            error = %message,
            "Report generation failed, snapshot kept"
        );
        self.cycles.log(cycle_id, LogLevel::Error, message.clone());
        Some(message)
    }

    async fn prune_history(&self, cycle_id: &str) {
        if !self.retention.is_enabled() {
            return;
        }
        let writer = Arc::clone(&self.writer);
        let retention = self.retention;
        match tokio::task::spawn_blocking(move || writer.prune_history(&retention)).await {
            Ok(removed) if !removed.is_empty() => self.cycles.log(
                cycle_id,
                LogLevel::Info,
                format!("Removed {} old report files", removed.len()),
            ),
            Ok(_) => {}
            Err(e) => warn!(cycle_id = %cycle_id, error = %e, "Report pruning task failed"),
        }
    }
}
