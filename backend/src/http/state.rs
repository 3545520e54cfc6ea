//! Application state for the HTTP server.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::reports::ReportWriter;
use crate::services::{QueryService, RefreshOrchestrator};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub query: QueryService,
    pub orchestrator: Arc<RefreshOrchestrator>,
    /// Resolves download paths; the orchestrator owns the writes.
    pub reports: Arc<ReportWriter>,
    /// Mirrors the scheduler's running flag.
    pub scheduler_running: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(
        orchestrator: Arc<RefreshOrchestrator>,
        reports: Arc<ReportWriter>,
        scheduler_running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            query: QueryService::new(Arc::clone(orchestrator.store())),
            orchestrator,
            reports,
            scheduler_running,
        }
    }

    pub fn system_running(&self) -> bool {
        self.scheduler_running.load(Ordering::Acquire)
    }
}
