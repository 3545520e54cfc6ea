//! Read-side behavior before, during and after refreshes.

mod support;

use std::sync::Arc;

use erp_dashboard::models::{AggregateValue, Department};
use erp_dashboard::services::{QueryError, QueryService, RefreshTrigger};
use support::{harness, mixed, Script, ScriptedSource};

#[tokio::test]
async fn test_reads_before_first_refresh() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(Arc::new(ScriptedSource::uniform(3)), dir.path());
    let query = QueryService::new(Arc::clone(&h.store));

    let summary = query.get_summary();
    assert!(summary.last_updated.is_none());
    assert_eq!(summary.generation, 0);
    for dept in &summary.departments {
        for metric in &dept.metrics {
            assert_eq!(metric.value.as_f64(), 0.0);
        }
    }

    let data = query.get_department("packing").unwrap();
    assert!(data.records.is_empty());
    assert!(data.last_updated.is_none());
}

#[tokio::test]
async fn test_pending_count_follows_refreshes() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(ScriptedSource::uniform(1));
    let h = harness(source.clone(), dir.path());
    let query = QueryService::new(Arc::clone(&h.store));

    source.set(
        Department::Purchase,
        Script::Rows(mixed(Department::Purchase, 15, 35, "Approved")),
    );
    h.orchestrator
        .refresh_now(RefreshTrigger::Manual)
        .await
        .unwrap();

    let summary = query.get_summary();
    let purchase = summary.department(Department::Purchase).unwrap();
    assert_eq!(purchase.get("total_orders"), Some(AggregateValue::Count(50)));
    assert_eq!(purchase.get("pending"), Some(AggregateValue::Count(15)));
    assert_eq!(purchase.get("completed"), Some(AggregateValue::Count(35)));

    source.set(
        Department::Purchase,
        Script::Rows(mixed(Department::Purchase, 10, 50, "Delivered")),
    );
    h.orchestrator
        .refresh_now(RefreshTrigger::Manual)
        .await
        .unwrap();

    let summary = query.get_summary();
    let purchase = summary.department(Department::Purchase).unwrap();
    assert_eq!(purchase.get("total_orders"), Some(AggregateValue::Count(60)));
    assert_eq!(purchase.get("pending"), Some(AggregateValue::Count(10)));
    assert_eq!(summary.generation, 2);
}

#[tokio::test]
async fn test_unknown_department_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(Arc::new(ScriptedSource::uniform(1)), dir.path());
    let query = QueryService::new(Arc::clone(&h.store));

    assert_eq!(
        query.get_department("quality").unwrap_err(),
        QueryError::UnknownDepartment("quality".to_string())
    );
    assert_eq!(
        query.get_department("Shipment").unwrap().department,
        Department::Shipment
    );
}

#[tokio::test]
async fn test_department_records_keep_source_order() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(Arc::new(ScriptedSource::uniform(5)), dir.path());
    h.orchestrator
        .refresh_now(RefreshTrigger::Manual)
        .await
        .unwrap();
    let query = QueryService::new(Arc::clone(&h.store));

    let data = query.get_department("shipment").unwrap();
    let ids: Vec<String> = data
        .records
        .iter()
        .map(|r| r.get("shipment_id").unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["SHIP0001", "SHIP0002", "SHIP0003", "SHIP0004", "SHIP0005"]);
    assert_eq!(data.last_updated, h.store.read().last_updated);
}

#[tokio::test]
async fn test_queries_do_not_wait_for_running_refresh() {
    let dir = tempfile::tempdir().unwrap();
    let (source, gate) = ScriptedSource::gated(2);
    let h = harness(Arc::new(source), dir.path());
    let query = QueryService::new(Arc::clone(&h.store));

    h.orchestrator.trigger_refresh(RefreshTrigger::Manual);
    tokio::task::yield_now().await;
    assert!(h.orchestrator.is_running());

    // Served from the previous (empty) snapshot while the fetch is blocked.
    assert_eq!(query.get_summary().generation, 0);
    assert!(query.get_department("purchase").unwrap().records.is_empty());

    gate.open();
    h.orchestrator.wait_idle().await;
    assert_eq!(query.get_summary().generation, 1);
    assert_eq!(query.get_department("purchase").unwrap().records.len(), 2);
}
