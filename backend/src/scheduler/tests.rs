//! Scheduler tests: daily-run arithmetic and timer task lifecycle.

use super::*;
use crate::db::{RecordCounts, SyntheticSource};
use crate::reports::ReportWriter;
use crate::services::SnapshotStore;
use chrono::{NaiveDate, Utc};

fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.from_utc_datetime(
        &NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap(),
    )
}

fn eight() -> NaiveTime {
    NaiveTime::from_hms_opt(8, 0, 0).unwrap()
}

#[test]
fn test_next_daily_run_later_today() {
    assert_eq!(next_daily_run(&utc(2024, 6, 1, 7, 30), eight()), utc(2024, 6, 1, 8, 0));
}

#[test]
fn test_next_daily_run_after_time_rolls_to_tomorrow() {
    assert_eq!(next_daily_run(&utc(2024, 6, 1, 9, 0), eight()), utc(2024, 6, 2, 8, 0));
}

#[test]
fn test_next_daily_run_exactly_at_time_is_tomorrow() {
    assert_eq!(next_daily_run(&utc(2024, 6, 1, 8, 0), eight()), utc(2024, 6, 2, 8, 0));
}

#[test]
fn test_next_daily_run_across_month_end() {
    assert_eq!(next_daily_run(&utc(2024, 2, 29, 23, 0), eight()), utc(2024, 3, 1, 8, 0));
}

#[test]
fn test_config_from_settings() {
    let settings = ScheduleSettings {
        refresh_interval_minutes: 0,
        ..ScheduleSettings::default()
    };
    let config = SchedulerConfig::from_settings(&settings).unwrap();
    assert_eq!(config.daily_at, Some(eight()));
    assert_eq!(config.interval, None);
}

fn orchestrator(dir: &std::path::Path) -> Arc<RefreshOrchestrator> {
    let counts = RecordCounts {
        purchase: 2,
        production: 2,
        packing: 2,
        shipment: 2,
    };
    let writer = ReportWriter::new(dir, "csv");
    writer.ensure_dirs().unwrap();
    Arc::new(RefreshOrchestrator::new(
        Arc::new(SyntheticSource::new(Some(1), counts)),
        Arc::new(SnapshotStore::new()),
        Arc::new(writer),
    ))
}

#[tokio::test]
async fn test_interval_tick_triggers_refresh() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = orchestrator(dir.path());
    let scheduler = Scheduler::new(
        Arc::clone(&orchestrator),
        SchedulerConfig {
            daily_at: None,
            interval: Some(Duration::from_millis(50)),
        },
    );

    assert!(scheduler.start());
    assert!(scheduler.is_running());
    assert!(!scheduler.start());

    let deadline = Instant::now() + Duration::from_secs(10);
    while orchestrator.store().generation() == 0 && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    scheduler.stop().await;
    orchestrator.wait_idle().await;

    assert!(!scheduler.is_running());
    assert!(orchestrator.store().generation() >= 1);
}

#[tokio::test]
async fn test_stop_halts_further_ticks() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = orchestrator(dir.path());
    let scheduler = Scheduler::new(
        Arc::clone(&orchestrator),
        SchedulerConfig {
            daily_at: Some(eight()),
            interval: Some(Duration::from_millis(30)),
        },
    );

    scheduler.start();
    scheduler.stop().await;
    orchestrator.wait_idle().await;
    let generation = orchestrator.store().generation();

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(orchestrator.store().generation(), generation);
    assert!(!scheduler.is_running());
}

#[tokio::test]
async fn test_scheduler_can_restart() {
    let dir = tempfile::tempdir().unwrap();
    let scheduler = Scheduler::new(
        orchestrator(dir.path()),
        SchedulerConfig {
            daily_at: None,
            interval: Some(Duration::from_secs(3600)),
        },
    );
    assert!(scheduler.start());
    scheduler.stop().await;
    assert!(scheduler.start());
    scheduler.stop().await;
}
