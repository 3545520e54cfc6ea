//! Live extraction from the ERP's SQL Server database.
//!
//! One fixed query per department; result columns are named after the
//! department schema fields so rows can be conformed without a mapping table.

pub mod config;
pub mod pool;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::time::Duration;
use tiberius::{ColumnData, FromSql, Row};
use tracing::{debug, info};

pub use config::{DbAuthMethod, DbConfig};
pub use pool::DbPool;

use super::error::{ErrorContext, SourceError, SourceResult};
use super::source::DataSource;
use crate::models::{Department, FieldValue, Record};

/// Extraction query for a department. Column aliases match the schema fields.
pub fn extraction_query(department: Department) -> &'static str {
    match department {
        Department::Purchase => {
            r#"
            SELECT
                po.purchase_order_id AS po_id,
                v.vendor_name,
                i.item_name,
                pod.quantity,
                pod.unit_price,
                pod.quantity * pod.unit_price AS amount,
                po.order_date,
                po.delivery_date,
                po.status
            FROM purchase_orders po
            JOIN purchase_order_details pod ON po.purchase_order_id = pod.purchase_order_id
            JOIN vendors v ON po.vendor_id = v.vendor_id
            JOIN items i ON pod.item_id = i.item_id
            WHERE po.order_date >= DATEADD(day, -30, GETDATE())
            ORDER BY po.purchase_order_id
            "#
        }
        Department::Production => {
            r#"
            SELECT
                p.production_id,
                pr.product_name,
                p.batch_no,
                p.quantity,
                p.unit,
                p.start_date,
                p.end_date,
                p.status,
                d.department_name AS department
            FROM production p
            JOIN products pr ON p.product_id = pr.product_id
            JOIN departments d ON p.department_id = d.department_id
            WHERE p.start_date >= DATEADD(day, -20, GETDATE())
            ORDER BY p.production_id
            "#
        }
        Department::Packing => {
            r#"
            SELECT
                pk.packing_id,
                pr.product_name,
                pk.quantity,
                pk.package_type,
                pk.packing_date,
                pk.status,
                e.employee_name AS operator
            FROM packing pk
            JOIN products pr ON pk.product_id = pr.product_id
            JOIN employees e ON pk.operator_id = e.employee_id
            WHERE pk.packing_date >= DATEADD(day, -15, GETDATE())
            ORDER BY pk.packing_id
            "#
        }
        Department::Shipment => {
            r#"
            SELECT
                s.shipment_id,
                c.customer_name,
                s.destination,
                s.quantity,
                s.shipment_date,
                s.expected_delivery,
                s.status,
                t.transporter_name AS transporter
            FROM shipments s
            JOIN customers c ON s.customer_id = c.customer_id
            JOIN transporters t ON s.transporter_id = t.transporter_id
            WHERE s.shipment_date >= DATEADD(day, -10, GETDATE())
            ORDER BY s.shipment_id
            "#
        }
    }
}

/// [`DataSource`] reading from SQL Server through a bb8 pool.
pub struct SqlServerSource {
    pool: DbPool,
}

impl SqlServerSource {
    pub fn new(config: &DbConfig, connect_timeout: Duration) -> Self {
        info!(
            server = %config.server,
            database = %config.database,
            "Configured SQL Server source"
        );
        Self {
            pool: pool::build_pool(config, connect_timeout),
        }
    }

    /// Build the source from `DB_*` environment variables.
    pub fn from_env(connect_timeout: Duration) -> SourceResult<Self> {
        let config = DbConfig::from_env()?;
        Ok(Self::new(&config, connect_timeout))
    }
}

#[async_trait]
impl DataSource for SqlServerSource {
    fn name(&self) -> &str {
        "sqlserver"
    }

    async fn fetch(&self, department: Department) -> SourceResult<Vec<Record>> {
        let mut conn = self.pool.get().await.map_err(pool::checkout_error)?;

        let rows = conn
            .simple_query(extraction_query(department))
            .await
            .map_err(query_error)?
            .into_first_result()
            .await
            .map_err(query_error)?;

        debug!(department = %department, rows = rows.len(), "Fetched rows from SQL Server");
        rows.into_iter().map(row_to_record).collect()
    }

    async fn health_check(&self) -> SourceResult<bool> {
        let mut conn = self.pool.get().await.map_err(pool::checkout_error)?;
        conn.simple_query("SELECT 1")
            .await
            .map_err(query_error)?
            .into_row()
            .await
            .map_err(query_error)?;
        Ok(true)
    }
}

fn query_error(err: tiberius::error::Error) -> SourceError {
    let context = ErrorContext::new("query").with_details(err.to_string());
    match err {
        tiberius::error::Error::Conversion(message) => SourceError::MalformedData {
            message: message.to_string(),
            context,
        },
        other => SourceError::Unreachable {
            message: format!("Query failed: {}", other),
            context,
        },
    }
}

fn row_to_record(row: Row) -> SourceResult<Record> {
    let names: Vec<String> = row.columns().iter().map(|c| c.name().to_string()).collect();
    let mut record = Record::new();
    for (name, data) in names.into_iter().zip(row) {
        let value = column_value(&data)
            .map_err(|e| SourceError::malformed(format!("column '{}': {}", name, e)))?;
        record.insert(name, value);
    }
    Ok(record)
}

fn column_value(data: &ColumnData<'static>) -> Result<FieldValue, String> {
    let value = match data {
        ColumnData::U8(v) => v.map(|v| FieldValue::Integer(i64::from(v))),
        ColumnData::I16(v) => v.map(|v| FieldValue::Integer(i64::from(v))),
        ColumnData::I32(v) => v.map(|v| FieldValue::Integer(i64::from(v))),
        ColumnData::I64(v) => v.map(FieldValue::Integer),
        ColumnData::F32(v) => v.map(|v| FieldValue::Float(f64::from(v))),
        ColumnData::F64(v) => v.map(FieldValue::Float),
        ColumnData::Bit(v) => v.map(|v| FieldValue::Integer(i64::from(v))),
        ColumnData::String(v) => v.as_ref().map(|s| FieldValue::Text(s.to_string())),
        ColumnData::Numeric(v) => v.as_ref().map(|n| {
            FieldValue::Float(n.value() as f64 / 10f64.powi(i32::from(n.scale())))
        }),
        ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
            NaiveDateTime::from_sql(data)
                .map_err(|e| e.to_string())?
                .map(FieldValue::Timestamp)
        }
        ColumnData::DateTimeOffset(_) => DateTime::<Utc>::from_sql(data)
            .map_err(|e| e.to_string())?
            .map(|dt| FieldValue::Timestamp(dt.naive_utc())),
        ColumnData::Date(_) => NaiveDate::from_sql(data)
            .map_err(|e| e.to_string())?
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(FieldValue::Timestamp),
        other => return Err(format!("unsupported column type {:?}", other)),
    };
    Ok(value.unwrap_or(FieldValue::Null))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    #[test]
    fn test_queries_alias_every_schema_field() {
        for dept in Department::ALL {
            let sql = extraction_query(dept);
            for name in dept.schema().field_names() {
                assert!(sql.contains(name), "{} query lacks {}", dept, name);
            }
        }
    }

    #[test]
    fn test_column_value_conversions() {
        assert_eq!(column_value(&ColumnData::I32(Some(5))).unwrap(), FieldValue::Integer(5));
        assert_eq!(column_value(&ColumnData::I32(None)).unwrap(), FieldValue::Null);
        assert_eq!(
            column_value(&ColumnData::String(Some(Cow::Borrowed("Box")))).unwrap(),
            FieldValue::Text("Box".to_string())
        );
        assert_eq!(
            column_value(&ColumnData::F64(Some(2.5))).unwrap(),
            FieldValue::Float(2.5)
        );
    }
}
