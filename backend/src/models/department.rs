//! Departments and their static schema descriptors.
//!
//! The pipeline never matches on a department to decide which columns to
//! write or which aggregates to compute: everything is driven by the
//! [`DepartmentSchema`] attached to each variant.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Semantic type of a record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Integer,
    Float,
    Timestamp,
}

/// One column of a department table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

const fn field(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec { name, kind }
}

/// How a single summary metric is derived from a department's records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateKind {
    /// Number of records.
    Count,
    /// Sum of a numeric field.
    Sum(&'static str),
    /// Number of records whose status is one of the listed values.
    StatusIn(&'static [&'static str]),
}

/// A named summary metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateRule {
    /// Key used in the JSON API.
    pub key: &'static str,
    /// Label used in the Summary sheet.
    pub label: &'static str,
    pub kind: AggregateKind,
}

const fn rule(key: &'static str, label: &'static str, kind: AggregateKind) -> AggregateRule {
    AggregateRule { key, label, kind }
}

/// Static description of a department table.
#[derive(Debug)]
pub struct DepartmentSchema {
    /// Columns in their stable output order.
    pub fields: &'static [FieldSpec],
    /// Field holding the workflow status.
    pub status_field: &'static str,
    pub aggregates: &'static [AggregateRule],
    /// Workbook sheet name.
    pub sheet_name: &'static str,
    /// File stem of the flat-file export (`<stem>.csv`).
    pub file_stem: &'static str,
}

impl DepartmentSchema {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.name)
    }
}

use FieldKind::{Float, Integer, Text, Timestamp};

static PURCHASE: DepartmentSchema = DepartmentSchema {
    fields: &[
        field("po_id", Text),
        field("vendor_name", Text),
        field("item_name", Text),
        field("quantity", Integer),
        field("unit_price", Float),
        field("amount", Float),
        field("order_date", Timestamp),
        field("delivery_date", Timestamp),
        field("status", Text),
    ],
    status_field: "status",
    aggregates: &[
        rule("total_orders", "Total Orders", AggregateKind::Count),
        rule("total_amount", "Total Value", AggregateKind::Sum("amount")),
        rule("pending", "Pending", AggregateKind::StatusIn(&["Pending"])),
        rule(
            "completed",
            "Completed",
            AggregateKind::StatusIn(&["Approved", "Delivered"]),
        ),
    ],
    sheet_name: "Purchase",
    file_stem: "purchase_data",
};

static PRODUCTION: DepartmentSchema = DepartmentSchema {
    fields: &[
        field("production_id", Text),
        field("product_name", Text),
        field("batch_no", Text),
        field("quantity", Integer),
        field("unit", Text),
        field("start_date", Timestamp),
        field("end_date", Timestamp),
        field("status", Text),
        field("department", Text),
    ],
    status_field: "status",
    aggregates: &[
        rule("total_batches", "Total Batches", AggregateKind::Count),
        rule("total_units", "Total Quantity", AggregateKind::Sum("quantity")),
        rule("completed", "Completed", AggregateKind::StatusIn(&["Completed"])),
        rule("in_progress", "In Progress", AggregateKind::StatusIn(&["In Progress"])),
        rule("pending", "Pending", AggregateKind::StatusIn(&["Pending"])),
    ],
    sheet_name: "Production",
    file_stem: "production_data",
};

static PACKING: DepartmentSchema = DepartmentSchema {
    fields: &[
        field("packing_id", Text),
        field("product_name", Text),
        field("quantity", Integer),
        field("package_type", Text),
        field("packing_date", Timestamp),
        field("status", Text),
        field("operator", Text),
    ],
    status_field: "status",
    aggregates: &[
        rule("total_records", "Total Records", AggregateKind::Count),
        rule("total_packed", "Total Packed", AggregateKind::Sum("quantity")),
        rule("completed", "Completed", AggregateKind::StatusIn(&["Completed"])),
        rule("pending", "Pending", AggregateKind::StatusIn(&["Pending"])),
    ],
    sheet_name: "Packing",
    file_stem: "packing_data",
};

static SHIPMENT: DepartmentSchema = DepartmentSchema {
    fields: &[
        field("shipment_id", Text),
        field("customer_name", Text),
        field("destination", Text),
        field("quantity", Integer),
        field("shipment_date", Timestamp),
        field("expected_delivery", Timestamp),
        field("status", Text),
        field("transporter", Text),
    ],
    status_field: "status",
    aggregates: &[
        rule("total_shipments", "Total Shipments", AggregateKind::Count),
        rule("total_shipped", "Total Shipped", AggregateKind::Sum("quantity")),
        rule("dispatched", "Dispatched", AggregateKind::StatusIn(&["Dispatched"])),
        rule("pending", "Pending", AggregateKind::StatusIn(&["Pending"])),
        rule("delivered", "Delivered", AggregateKind::StatusIn(&["Delivered"])),
    ],
    sheet_name: "Shipment",
    file_stem: "shipment_data",
};

/// One of the fixed business domains pulled from the ERP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Department {
    Purchase,
    Production,
    Packing,
    Shipment,
}

impl Department {
    /// All departments in pipeline order.
    pub const ALL: [Department; 4] = [
        Department::Purchase,
        Department::Production,
        Department::Packing,
        Department::Shipment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Department::Purchase => "purchase",
            Department::Production => "production",
            Department::Packing => "packing",
            Department::Shipment => "shipment",
        }
    }

    pub fn schema(&self) -> &'static DepartmentSchema {
        match self {
            Department::Purchase => &PURCHASE,
            Department::Production => &PRODUCTION,
            Department::Packing => &PACKING,
            Department::Shipment => &SHIPMENT,
        }
    }
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Department {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "purchase" => Ok(Department::Purchase),
            "production" => Ok(Department::Production),
            "packing" => Ok(Department::Packing),
            "shipment" => Ok(Department::Shipment),
            _ => Err(format!("Unknown department: {}", s)),
        }
    }
}
