//! History of recent refresh cycles.
//!
//! Each cycle gets an id and a list of timestamped log lines so operators can
//! see what the last few refreshes did without digging through server logs.

use chrono::{DateTime, Local};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use uuid::Uuid;

use super::refresh::RefreshTrigger;

/// Number of cycles kept in memory.
pub const DEFAULT_HISTORY: usize = 20;

/// A single log line with timestamp and message.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub level: LogLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleStatus {
    Running,
    Completed,
    Failed,
}

/// One refresh cycle and its log.
#[derive(Debug, Clone, Serialize)]
pub struct Cycle {
    pub cycle_id: String,
    pub trigger: RefreshTrigger,
    pub status: CycleStatus,
    pub started_at: DateTime<Local>,
    pub finished_at: Option<DateTime<Local>>,
    /// Generation published by this cycle, if it got that far.
    pub generation: Option<u64>,
    pub logs: Vec<LogEntry>,
}

/// Bounded in-memory cycle history, newest last.
#[derive(Clone)]
pub struct CycleTracker {
    cycles: Arc<RwLock<VecDeque<Cycle>>>,
    capacity: usize,
}

impl CycleTracker {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cycles: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            capacity: capacity.max(1),
        }
    }

    /// Open a new cycle and return its id. Evicts the oldest cycle when full.
    pub fn start(&self, trigger: RefreshTrigger) -> String {
        let cycle_id = Uuid::new_v4().to_string();
        let cycle = Cycle {
            cycle_id: cycle_id.clone(),
            trigger,
            status: CycleStatus::Running,
            started_at: Local::now(),
            finished_at: None,
            generation: None,
            logs: vec![],
        };
        let mut cycles = self.cycles.write();
        while cycles.len() >= self.capacity {
            cycles.pop_front();
        }
        cycles.push_back(cycle);
        cycle_id
    }

    pub fn log(&self, cycle_id: &str, level: LogLevel, message: impl Into<String>) {
        self.update(cycle_id, |cycle| {
            cycle.logs.push(LogEntry {
                timestamp: Local::now(),
                level,
                message: message.into(),
            });
        });
    }

    pub fn set_generation(&self, cycle_id: &str, generation: u64) {
        self.update(cycle_id, |cycle| cycle.generation = Some(generation));
    }

    pub fn complete(&self, cycle_id: &str) {
        self.update(cycle_id, |cycle| {
            cycle.status = CycleStatus::Completed;
            cycle.finished_at = Some(Local::now());
        });
    }

    pub fn fail(&self, cycle_id: &str, error_message: impl Into<String>) {
        self.update(cycle_id, |cycle| {
            let now = Local::now();
            cycle.status = CycleStatus::Failed;
            cycle.finished_at = Some(now);
            cycle.logs.push(LogEntry {
                timestamp: now,
                level: LogLevel::Error,
                message: error_message.into(),
            });
        });
    }

    pub fn get(&self, cycle_id: &str) -> Option<Cycle> {
        self.cycles
            .read()
            .iter()
            .find(|c| c.cycle_id == cycle_id)
            .cloned()
    }

    /// Recent cycles, newest first.
    pub fn recent(&self) -> Vec<Cycle> {
        self.cycles.read().iter().rev().cloned().collect()
    }

    fn update(&self, cycle_id: &str, f: impl FnOnce(&mut Cycle)) {
        let mut cycles = self.cycles.write();
        if let Some(cycle) = cycles.iter_mut().find(|c| c.cycle_id == cycle_id) {
            f(cycle);
        }
    }
}

impl Default for CycleTracker {
    fn default() -> Self {
        Self::new()
    }
}
