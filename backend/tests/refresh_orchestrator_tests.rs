//! Refresh cycle behavior: single flight, all-or-nothing publish, report
//! failures and consistency of concurrent reads.

mod support;

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use erp_dashboard::db::{FailureReason, RecordCounts, SyntheticSource};
use erp_dashboard::models::Department;
use erp_dashboard::reports::{ReportKind, ReportWriter};
use erp_dashboard::services::{
    CycleStatus, RefreshError, RefreshOrchestrator, RefreshPhase, RefreshTrigger, SnapshotStore,
    TriggerOutcome,
};
use support::{harness, records, Script, ScriptedSource};

#[tokio::test]
async fn test_concurrent_triggers_start_exactly_one_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let (source, gate) = ScriptedSource::gated(3);
    let source = Arc::new(source);
    let h = harness(source.clone(), dir.path());

    let outcomes: Vec<TriggerOutcome> = (0..10)
        .map(|_| h.orchestrator.trigger_refresh(RefreshTrigger::Manual))
        .collect();

    let started = outcomes
        .iter()
        .filter(|o| **o == TriggerOutcome::Started)
        .count();
    assert_eq!(started, 1);
    assert!(h.orchestrator.is_running());

    gate.open();
    h.orchestrator.wait_idle().await;

    assert_eq!(source.fetch_count(), Department::ALL.len());
    assert_eq!(h.store.generation(), 1);
    assert_eq!(h.orchestrator.status().phase, RefreshPhase::Idle);
    assert_eq!(h.orchestrator.status().cycles_completed, 1);
}

#[tokio::test]
async fn test_concurrent_triggers_from_many_tasks() {
    let dir = tempfile::tempdir().unwrap();
    let (source, gate) = ScriptedSource::gated(1);
    let h = harness(Arc::new(source), dir.path());

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let orchestrator = Arc::clone(&h.orchestrator);
            tokio::spawn(async move { orchestrator.trigger_refresh(RefreshTrigger::Manual) })
        })
        .collect();

    let mut started = 0;
    for handle in handles {
        if handle.await.unwrap() == TriggerOutcome::Started {
            started += 1;
        }
    }
    assert_eq!(started, 1);

    gate.open();
    h.orchestrator.wait_idle().await;
    assert_eq!(h.store.generation(), 1);
}

#[tokio::test]
async fn test_refresh_now_rejects_while_in_flight() {
    let dir = tempfile::tempdir().unwrap();
    let (source, gate) = ScriptedSource::gated(1);
    let h = harness(Arc::new(source), dir.path());

    assert_eq!(
        h.orchestrator.trigger_refresh(RefreshTrigger::Daily),
        TriggerOutcome::Started
    );
    let err = h
        .orchestrator
        .refresh_now(RefreshTrigger::Manual)
        .await
        .unwrap_err();
    assert!(matches!(err, RefreshError::AlreadyInProgress));

    gate.open();
    h.orchestrator.wait_idle().await;
    assert!(!h.orchestrator.is_running());
}

#[tokio::test]
async fn test_successful_cycle_publishes_all_departments() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(Arc::new(ScriptedSource::uniform(4)), dir.path());

    let outcome = h
        .orchestrator
        .refresh_now(RefreshTrigger::Startup)
        .await
        .unwrap();

    assert_eq!(outcome.generation, 1);
    assert_eq!(outcome.records, 16);
    assert!(outcome.report_error.is_none());

    let snapshot = h.store.read();
    assert!(snapshot.last_updated.is_some());
    for dept in Department::ALL {
        assert_eq!(snapshot.record_count(dept), 4);
    }
    assert_eq!(h.orchestrator.status().last_success, snapshot.last_updated);
    assert!(h.writer.artifact_path(ReportKind::Excel).exists());

    let cycles = h.orchestrator.recent_cycles();
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].status, CycleStatus::Completed);
    assert_eq!(cycles[0].generation, Some(1));
}

#[tokio::test]
async fn test_unreachable_department_publishes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(ScriptedSource::uniform(2));
    let h = harness(source.clone(), dir.path());
    h.orchestrator
        .refresh_now(RefreshTrigger::Startup)
        .await
        .unwrap();
    let before = h.store.read();

    source.set(Department::Purchase, Script::Rows(records(Department::Purchase, 9, "Pending")));
    source.set(Department::Shipment, Script::Unreachable);
    let err = h
        .orchestrator
        .refresh_now(RefreshTrigger::Manual)
        .await
        .unwrap_err();

    match &err {
        RefreshError::Fetch { department, .. } => assert_eq!(*department, Department::Shipment),
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(err.failure_reason(), Some(FailureReason::SourceUnreachable));

    let after = h.store.read();
    assert_eq!(after.generation, before.generation);
    assert_eq!(after.last_updated, before.last_updated);
    // Purchase succeeded in the failed cycle but must not leak into the store.
    assert_eq!(after.record_count(Department::Purchase), 2);

    let status = h.orchestrator.status();
    let failure = status.last_failure.unwrap();
    assert_eq!(failure.reason, FailureReason::SourceUnreachable);
    assert!(failure.message.contains("shipment"));
    assert_eq!(status.cycles_completed, 1);
    assert_eq!(status.phase, RefreshPhase::Idle);
    assert_eq!(h.orchestrator.recent_cycles()[0].status, CycleStatus::Failed);
}

#[tokio::test]
async fn test_malformed_rows_fail_the_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(ScriptedSource::uniform(2));
    source.set(Department::Packing, Script::Malformed);
    let h = harness(source, dir.path());

    let err = h
        .orchestrator
        .refresh_now(RefreshTrigger::Manual)
        .await
        .unwrap_err();

    assert_eq!(err.failure_reason(), Some(FailureReason::MalformedData));
    assert_eq!(h.store.generation(), 0);
    assert!(!h.writer.artifact_path(ReportKind::Excel).exists());
}

#[tokio::test]
async fn test_slow_department_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(ScriptedSource::uniform(2));
    source.set(Department::Production, Script::Stall(Duration::from_secs(30)));
    let writer = Arc::new(ReportWriter::new(dir.path(), "csv"));
    writer.ensure_dirs().unwrap();
    let store = Arc::new(SnapshotStore::new());
    let orchestrator = RefreshOrchestrator::new(source, Arc::clone(&store), writer)
        .with_fetch_timeout(Duration::from_millis(100));

    let err = orchestrator
        .refresh_now(RefreshTrigger::Interval)
        .await
        .unwrap_err();

    assert_eq!(err.failure_reason(), Some(FailureReason::Timeout));
    assert_eq!(store.generation(), 0);
    assert_eq!(
        orchestrator.status().last_failure.unwrap().reason,
        FailureReason::Timeout
    );
}

#[tokio::test]
async fn test_report_failure_keeps_published_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(Arc::new(ScriptedSource::uniform(2)), dir.path());
    h.orchestrator
        .refresh_now(RefreshTrigger::Startup)
        .await
        .unwrap();
    let workbook = h.writer.artifact_path(ReportKind::Excel);
    let workbook_before = fs::read(&workbook).unwrap();

    // A file where the CSV directory should be makes every CSV write fail.
    fs::remove_dir_all(h.writer.csv_dir()).unwrap();
    fs::write(h.writer.csv_dir(), b"not a directory").unwrap();

    let outcome = h
        .orchestrator
        .refresh_now(RefreshTrigger::Manual)
        .await
        .unwrap();

    assert_eq!(outcome.generation, 2);
    assert!(outcome.report_error.is_some());
    assert_eq!(h.store.generation(), 2);
    assert_eq!(fs::read(&workbook).unwrap(), workbook_before);

    let status = h.orchestrator.status();
    let report_error = status.last_report_error.unwrap();
    assert_eq!(report_error.generation, 2);
    assert_eq!(status.cycles_completed, 2);
    assert!(status.last_failure.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_readers_see_one_generation_at_a_time() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(ScriptedSource::uniform(0));
    let h = harness(source.clone(), dir.path());

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&h.store);
            tokio::spawn(async move {
                let mut last = 0;
                for _ in 0..2000 {
                    let snapshot = store.read();
                    assert!(snapshot.generation >= last);
                    // Cycle k publishes k records in every department.
                    for dept in Department::ALL {
                        assert_eq!(snapshot.record_count(dept) as u64, snapshot.generation);
                    }
                    last = snapshot.generation;
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    for k in 1..=8 {
        for dept in Department::ALL {
            source.set(dept, Script::Rows(records(dept, k, "Pending")));
        }
        h.orchestrator
            .refresh_now(RefreshTrigger::Manual)
            .await
            .unwrap();
    }

    for reader in readers {
        reader.await.unwrap();
    }
    assert_eq!(h.store.generation(), 8);
}

#[tokio::test]
async fn test_synthetic_source_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let counts = RecordCounts::default();
    let h = harness(Arc::new(SyntheticSource::new(Some(42), counts)), dir.path());

    let outcome = h
        .orchestrator
        .refresh_now(RefreshTrigger::Startup)
        .await
        .unwrap();

    assert_eq!(outcome.records, 50 + 60 + 45 + 40);
    for dept in Department::ALL {
        assert!(h.writer.artifact_path(ReportKind::Csv(dept)).exists());
    }
}
