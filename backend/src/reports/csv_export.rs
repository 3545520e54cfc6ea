//! Flat-file rendering of one department table.

use crate::models::{Department, FieldValue, Record};

use super::error::{ReportError, ReportResult};

/// Render `records` as CSV with the schema fields as header.
///
/// Timestamps use the same format as the JSON API; missing values are empty
/// cells.
pub fn render_csv(department: Department, records: &[Record]) -> ReportResult<Vec<u8>> {
    let schema = department.schema();
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record(schema.field_names())?;
    for record in records {
        writer.write_record(
            schema
                .field_names()
                .map(|name| record.get(name).map(FieldValue::to_string).unwrap_or_default()),
        )?;
    }

    writer
        .into_inner()
        .map_err(|e| ReportError::Render(format!("CSV: {}", e)))
}
