//! Timer-driven refresh triggers.
//!
//! Two independent tokio tasks call
//! [`RefreshOrchestrator::trigger_refresh`]: one once a day at a local
//! wall-clock time, one on a fixed interval. Ticks that come due while a
//! refresh is still running are dropped by the orchestrator's single-flight
//! guard, so cycles never queue up.

use chrono::{DateTime, Duration as ChronoDuration, Local, NaiveTime, TimeZone};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::config::{ConfigError, ScheduleSettings};
use crate::services::{RefreshOrchestrator, RefreshTrigger, TriggerOutcome};

/// When the scheduler fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Local time of the daily refresh; `None` disables it.
    pub daily_at: Option<NaiveTime>,
    /// Period of the interval refresh; `None` disables it.
    pub interval: Option<Duration>,
}

impl SchedulerConfig {
    pub fn from_settings(settings: &ScheduleSettings) -> Result<Self, ConfigError> {
        Ok(Self {
            daily_at: Some(settings.daily_at()?),
            interval: settings.refresh_interval(),
        })
    }
}

/// Next occurrence of `at` strictly after `now`, in `now`'s time zone.
///
/// A wall-clock time skipped by a DST transition resolves to the first
/// valid instant after it.
pub fn next_daily_run<Tz: TimeZone>(now: &DateTime<Tz>, at: NaiveTime) -> DateTime<Tz> {
    let tz = now.timezone();
    let mut candidate = now.date_naive().and_time(at);
    if candidate <= now.naive_local() {
        candidate += ChronoDuration::days(1);
    }
    for _ in 0..4 {
        if let Some(resolved) = tz.from_local_datetime(&candidate).earliest() {
            return resolved;
        }
        candidate += ChronoDuration::hours(1);
    }
    tz.from_utc_datetime(&candidate)
}

/// Background timers driving the refresh orchestrator.
pub struct Scheduler {
    orchestrator: Arc<RefreshOrchestrator>,
    config: SchedulerConfig,
    running: Arc<AtomicBool>,
    shutdown: Mutex<Option<watch::Sender<bool>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(orchestrator: Arc<RefreshOrchestrator>, config: SchedulerConfig) -> Self {
        Self {
            orchestrator,
            config,
            running: Arc::new(AtomicBool::new(false)),
            shutdown: Mutex::new(None),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Shared flag mirroring [`Scheduler::is_running`].
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Spawn the timer tasks. Returns `false` if they are already running.
    pub fn start(&self) -> bool {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let (tx, rx) = watch::channel(false);
        let mut tasks = self.tasks.lock();

        if let Some(at) = self.config.daily_at {
            info!(at = %at.format("%H:%M"), "Daily refresh scheduled");
            tasks.push(tokio::spawn(run_daily(
                Arc::clone(&self.orchestrator),
                at,
                rx.clone(),
            )));
        }
        if let Some(period) = self.config.interval {
            info!(every_secs = period.as_secs(), "Interval refresh scheduled");
            tasks.push(tokio::spawn(run_interval(
                Arc::clone(&self.orchestrator),
                period,
                rx,
            )));
        }

        *self.shutdown.lock() = Some(tx);
        true
    }

    /// Stop the timer tasks and wait for them to exit.
    ///
    /// A refresh already in flight is left to finish.
    pub async fn stop(&self) {
        if let Some(tx) = self.shutdown.lock().take() {
            let _ = tx.send(true);
        }
        let tasks: Vec<JoinHandle<()>> = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            let _ = task.await;
        }
        if self.running.swap(false, Ordering::AcqRel) {
            info!("Scheduler stopped");
        }
    }
}

fn fire(orchestrator: &Arc<RefreshOrchestrator>, trigger: RefreshTrigger) {
    match orchestrator.trigger_refresh(trigger) {
        TriggerOutcome::Started => info!(trigger = %trigger, "Scheduled refresh started"),
        TriggerOutcome::AlreadyInProgress => {
            debug!(trigger = %trigger, "Scheduled tick skipped, refresh in flight")
        }
    }
}

async fn run_daily(
    orchestrator: Arc<RefreshOrchestrator>,
    at: NaiveTime,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let now = Local::now();
        let next = next_daily_run(&now, at);
        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
        debug!(next = %next, "Next daily refresh");

        tokio::select! {
            _ = tokio::time::sleep(wait) => fire(&orchestrator, RefreshTrigger::Daily),
            _ = shutdown.changed() => break,
        }
        if *shutdown.borrow() {
            break;
        }
    }
}

async fn run_interval(
    orchestrator: Arc<RefreshOrchestrator>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => fire(&orchestrator, RefreshTrigger::Interval),
            _ = shutdown.changed() => break,
        }
        if *shutdown.borrow() {
            break;
        }
    }
}

#[cfg(test)]
mod tests;
