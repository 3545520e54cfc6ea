#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime, SubsecRound};
use parking_lot::Mutex as PlMutex;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

use erp_dashboard::db::{DataSource, SourceError, SourceResult};
use erp_dashboard::models::{Department, Record};
use erp_dashboard::reports::ReportWriter;
use erp_dashboard::services::{RefreshOrchestrator, SnapshotStore};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with environment variables temporarily modified.
///
/// Restores variables on unwind and serializes access to the process-global
/// environment so parallel tests do not interfere.
///
/// `changes` is a list of `(key, value)` pairs:
/// - `Some(v)` sets the variable to `v`
/// - `None` removes the variable
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let _guard = ScopedEnv::new(changes);
    f()
}

struct ScopedEnv {
    snapshot: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    fn new(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let snapshot = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect::<Vec<_>>();

        for (k, v) in changes {
            match v {
                Some(val) => std::env::set_var(k, val),
                None => std::env::remove_var(k),
            }
        }

        Self { snapshot }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (k, v) in self.snapshot.drain(..) {
            match v {
                Some(val) => std::env::set_var(&k, val),
                None => std::env::remove_var(&k),
            }
        }
    }
}

// =============================================================================
// Record builders
// =============================================================================

pub fn now() -> NaiveDateTime {
    Local::now().naive_local().trunc_subsecs(0)
}

/// A schema-complete record of `department` with the given status.
pub fn record(department: Department, i: usize, status: &str) -> Record {
    let ts = now();
    match department {
        Department::Purchase => Record::new()
            .with("po_id", format!("PO{:04}", i))
            .with("vendor_name", "Vendor A")
            .with("item_name", "Component X")
            .with("quantity", 10i64)
            .with("unit_price", 2.5)
            .with("amount", 25.0)
            .with("order_date", ts)
            .with("delivery_date", ts)
            .with("status", status),
        Department::Production => Record::new()
            .with("production_id", format!("PROD{:04}", i))
            .with("product_name", "Product A")
            .with("batch_no", format!("B{:03}", i))
            .with("quantity", 100i64)
            .with("unit", "KG")
            .with("start_date", ts)
            .with("end_date", ts)
            .with("status", status)
            .with("department", "Dept A"),
        Department::Packing => Record::new()
            .with("packing_id", format!("PACK{:04}", i))
            .with("product_name", "Product A")
            .with("quantity", 20i64)
            .with("package_type", "Box")
            .with("packing_date", ts)
            .with("status", status)
            .with("operator", "Operator 1"),
        Department::Shipment => Record::new()
            .with("shipment_id", format!("SHIP{:04}", i))
            .with("customer_name", "Customer A")
            .with("destination", "Delhi")
            .with("quantity", 5i64)
            .with("shipment_date", ts)
            .with("expected_delivery", ts)
            .with("status", status)
            .with("transporter", "Transport A"),
    }
}

/// `n` records of `department`, numbered from 1.
pub fn records(department: Department, n: usize, status: &str) -> Vec<Record> {
    (1..=n).map(|i| record(department, i, status)).collect()
}

/// `pending` Pending records followed by `other` records with status `other_status`.
pub fn mixed(department: Department, pending: usize, other: usize, other_status: &str) -> Vec<Record> {
    let mut rows = records(department, pending, "Pending");
    rows.extend((pending + 1..=pending + other).map(|i| record(department, i, other_status)));
    rows
}

// =============================================================================
// Test data sources
// =============================================================================

/// What a [`ScriptedSource`] answers for one department.
#[derive(Clone)]
pub enum Script {
    Rows(Vec<Record>),
    Unreachable,
    Malformed,
    /// Sleep before answering; used to trigger fetch timeouts.
    Stall(Duration),
}

/// Data source answering from per-department scripts that tests can change
/// between cycles. Optionally blocks every fetch until its gate opens.
pub struct ScriptedSource {
    scripts: PlMutex<HashMap<Department, Script>>,
    fetches: AtomicUsize,
    gate: Option<watch::Receiver<bool>>,
}

/// Releases fetches of a gated [`ScriptedSource`].
pub struct Gate(watch::Sender<bool>);

impl Gate {
    pub fn open(&self) {
        let _ = self.0.send(true);
    }
}

impl ScriptedSource {
    /// Every department answers with `n` "Pending" records.
    pub fn uniform(n: usize) -> Self {
        let scripts = Department::ALL
            .iter()
            .map(|&d| (d, Script::Rows(records(d, n, "Pending"))))
            .collect();
        Self {
            scripts: PlMutex::new(scripts),
            fetches: AtomicUsize::new(0),
            gate: None,
        }
    }

    /// Like [`ScriptedSource::uniform`], but fetches wait until the gate opens.
    pub fn gated(n: usize) -> (Self, Gate) {
        let (tx, rx) = watch::channel(false);
        let mut source = Self::uniform(n);
        source.gate = Some(rx);
        (source, Gate(tx))
    }

    pub fn set(&self, department: Department, script: Script) {
        self.scripts.lock().insert(department, script);
    }

    /// Number of department fetches started so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn fetch(&self, department: Department) -> SourceResult<Vec<Record>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            let mut gate = gate.clone();
            let _ = gate.wait_for(|open| *open).await;
        }

        let script = self
            .scripts
            .lock()
            .get(&department)
            .cloned()
            .unwrap_or(Script::Rows(Vec::new()));

        match script {
            Script::Rows(rows) => Ok(rows),
            Script::Unreachable => Err(SourceError::unreachable("connection refused")),
            Script::Malformed => Ok(vec![Record::new().with("unexpected", "value")]),
            Script::Stall(delay) => {
                tokio::time::sleep(delay).await;
                Ok(Vec::new())
            }
        }
    }
}

// =============================================================================
// Wiring
// =============================================================================

pub struct Harness {
    pub orchestrator: Arc<RefreshOrchestrator>,
    pub writer: Arc<ReportWriter>,
    pub store: Arc<SnapshotStore>,
}

/// Orchestrator over `source` writing reports into `report_dir`.
pub fn harness(source: Arc<dyn DataSource>, report_dir: &Path) -> Harness {
    let writer = Arc::new(ReportWriter::new(report_dir, "csv"));
    writer.ensure_dirs().unwrap();
    let store = Arc::new(SnapshotStore::new());
    let orchestrator = Arc::new(
        RefreshOrchestrator::new(source, Arc::clone(&store), Arc::clone(&writer))
            .with_fetch_timeout(Duration::from_secs(5)),
    );
    Harness {
        orchestrator,
        writer,
        store,
    }
}
