//! Per-department aggregates derived from a snapshot.
//!
//! [`compute_summary`] is the single source of these numbers: both the JSON
//! API and the workbook's Summary sheet are rendered from its output, so the
//! dashboard and the reports cannot disagree for the same snapshot.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;

use super::department::{AggregateKind, AggregateRule, Department, FieldKind};
use super::record::{FieldValue, Record};
use super::snapshot::Snapshot;

/// Value of a single metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AggregateValue {
    Count(u64),
    Integer(i64),
    Float(f64),
}

impl AggregateValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            AggregateValue::Count(v) => *v as f64,
            AggregateValue::Integer(v) => *v as f64,
            AggregateValue::Float(v) => *v,
        }
    }
}

impl fmt::Display for AggregateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateValue::Count(v) => write!(f, "{}", v),
            AggregateValue::Integer(v) => write!(f, "{}", v),
            AggregateValue::Float(v) => write!(f, "{:.2}", v),
        }
    }
}

/// One computed metric.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub rule: &'static AggregateRule,
    pub value: AggregateValue,
}

/// Metrics of one department in rule order.
#[derive(Debug, Clone, PartialEq)]
pub struct DepartmentSummary {
    pub department: Department,
    pub metrics: Vec<Metric>,
}

impl DepartmentSummary {
    pub fn get(&self, key: &str) -> Option<AggregateValue> {
        self.metrics
            .iter()
            .find(|m| m.rule.key == key)
            .map(|m| m.value)
    }
}

/// Summary of a whole snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub departments: Vec<DepartmentSummary>,
    pub last_updated: Option<DateTime<Local>>,
    pub generation: u64,
}

impl Summary {
    pub fn department(&self, department: Department) -> Option<&DepartmentSummary> {
        self.departments.iter().find(|d| d.department == department)
    }
}

/// Compute the aggregates of every department in `snapshot`.
pub fn compute_summary(snapshot: &Snapshot) -> Summary {
    let departments = Department::ALL
        .iter()
        .map(|&dept| summarize_department(dept, snapshot.records(dept)))
        .collect();

    Summary {
        departments,
        last_updated: snapshot.last_updated,
        generation: snapshot.generation,
    }
}

/// Compute the aggregates of one department's records.
pub fn summarize_department(department: Department, records: &[Record]) -> DepartmentSummary {
    let schema = department.schema();
    let metrics = schema
        .aggregates
        .iter()
        .map(|rule| {
            let value = match rule.kind {
                AggregateKind::Count => AggregateValue::Count(records.len() as u64),
                AggregateKind::Sum(field) => {
                    let integral = schema
                        .field(field)
                        .map(|f| f.kind == FieldKind::Integer)
                        .unwrap_or(false);
                    sum_field(records, field, integral)
                }
                AggregateKind::StatusIn(values) => {
                    let count = records
                        .iter()
                        .filter(|r| {
                            r.get(schema.status_field)
                                .and_then(FieldValue::as_str)
                                .map(|s| values.iter().any(|v| *v == s))
                                .unwrap_or(false)
                        })
                        .count();
                    AggregateValue::Count(count as u64)
                }
            };
            Metric { rule, value }
        })
        .collect();

    DepartmentSummary {
        department,
        metrics,
    }
}

fn sum_field(records: &[Record], field: &str, integral: bool) -> AggregateValue {
    if integral {
        let total = records
            .iter()
            .filter_map(|r| match r.get(field) {
                Some(FieldValue::Integer(v)) => Some(*v),
                _ => None,
            })
            .fold(0i64, i64::saturating_add);
        AggregateValue::Integer(total)
    } else {
        let total: f64 = records
            .iter()
            .filter_map(|r| r.get(field).and_then(FieldValue::as_f64))
            .sum();
        // Keep currency totals at cent precision.
        AggregateValue::Float((total * 100.0).round() / 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn shipment(status: &str, quantity: i64) -> Record {
        Record::new()
            .with("status", status)
            .with("quantity", quantity)
    }

    #[test]
    fn test_empty_snapshot_summary_is_zero() {
        let summary = compute_summary(&Snapshot::empty());
        assert_eq!(summary.departments.len(), 4);
        for dept in &summary.departments {
            for metric in &dept.metrics {
                assert_eq!(metric.value.as_f64(), 0.0);
            }
        }
        assert!(summary.last_updated.is_none());
    }

    #[test]
    fn test_shipment_status_breakdown() {
        let records = vec![
            shipment("Dispatched", 10),
            shipment("Pending", 5),
            shipment("Pending", 7),
            shipment("In Transit", 3),
        ];
        let summary = summarize_department(Department::Shipment, &records);
        assert_eq!(summary.get("total_shipments"), Some(AggregateValue::Count(4)));
        assert_eq!(summary.get("total_shipped"), Some(AggregateValue::Integer(25)));
        assert_eq!(summary.get("dispatched"), Some(AggregateValue::Count(1)));
        assert_eq!(summary.get("pending"), Some(AggregateValue::Count(2)));
        assert_eq!(summary.get("delivered"), Some(AggregateValue::Count(0)));
    }

    #[test]
    fn test_purchase_amount_sum_rounds_to_cents() {
        let records = vec![
            Record::new().with("amount", 0.1).with("status", "Approved"),
            Record::new().with("amount", 0.2).with("status", "Delivered"),
        ];
        let summary = summarize_department(Department::Purchase, &records);
        assert_eq!(summary.get("total_amount"), Some(AggregateValue::Float(0.3)));
        assert_eq!(summary.get("completed"), Some(AggregateValue::Count(2)));
    }

    #[test]
    fn test_integer_sum_saturates() {
        let records = vec![
            shipment("Pending", i64::MAX),
            shipment("Pending", 1),
            shipment("Delivered", i64::MAX),
        ];
        let summary = summarize_department(Department::Shipment, &records);
        assert_eq!(
            summary.get("total_shipped"),
            Some(AggregateValue::Integer(i64::MAX))
        );
    }

    #[test]
    fn test_summary_carries_snapshot_metadata() {
        let mut tables = BTreeMap::new();
        tables.insert(Department::Shipment, vec![shipment("Pending", 1)]);
        let mut snapshot = Snapshot::new(tables, Local::now());
        snapshot.generation = 7;
        let summary = compute_summary(&snapshot);
        assert_eq!(summary.generation, 7);
        assert_eq!(summary.last_updated, snapshot.last_updated);
    }

    proptest! {
        #[test]
        fn prop_status_counts_never_exceed_total(
            rows in prop::collection::vec((0usize..4, 0i64..1000), 0..80)
        ) {
            let statuses = ["Dispatched", "In Transit", "Pending", "Delivered"];
            let records: Vec<Record> = rows
                .iter()
                .map(|(s, q)| shipment(statuses[*s], *q))
                .collect();
            let summary = summarize_department(Department::Shipment, &records);
            let total = summary.get("total_shipments").unwrap().as_f64();
            let by_status = summary.get("dispatched").unwrap().as_f64()
                + summary.get("pending").unwrap().as_f64()
                + summary.get("delivered").unwrap().as_f64();
            prop_assert_eq!(total, records.len() as f64);
            prop_assert!(by_status <= total);
            let shipped: i64 = rows.iter().map(|(_, q)| *q).sum();
            prop_assert_eq!(summary.get("total_shipped"), Some(AggregateValue::Integer(shipped)));
        }
    }
}
