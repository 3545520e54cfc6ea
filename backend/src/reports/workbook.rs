//! Workbook rendering: one sheet per department plus a Summary sheet.

use rust_xlsxwriter::{Format, Workbook, Worksheet};

use crate::models::{compute_summary, Department, FieldValue, Record, Snapshot};

use super::error::ReportResult;

pub const SUMMARY_SHEET: &str = "Summary";
const DATETIME_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

/// Render the whole snapshot as an in-memory `.xlsx` file.
pub fn render_workbook(snapshot: &Snapshot) -> ReportResult<Vec<u8>> {
    let header = Format::new().set_bold();
    let datetime = Format::new().set_num_format(DATETIME_FORMAT);
    let mut workbook = Workbook::new();

    for department in Department::ALL {
        let sheet = workbook.add_worksheet();
        write_department_sheet(
            sheet,
            department,
            snapshot.records(department),
            &header,
            &datetime,
        )?;
    }

    write_summary_sheet(workbook.add_worksheet(), snapshot, &header)?;

    Ok(workbook.save_to_buffer()?)
}

fn write_department_sheet(
    sheet: &mut Worksheet,
    department: Department,
    records: &[Record],
    header: &Format,
    datetime: &Format,
) -> ReportResult<()> {
    let schema = department.schema();
    sheet.set_name(schema.sheet_name)?;

    for (col, name) in schema.field_names().enumerate() {
        sheet.write_string_with_format(0, col as u16, name, header)?;
    }
    sheet.set_freeze_panes(1, 0)?;

    for (i, record) in records.iter().enumerate() {
        let row = (i + 1) as u32;
        for (col, name) in schema.field_names().enumerate() {
            let col = col as u16;
            match record.get(name) {
                None | Some(FieldValue::Null) => {}
                Some(FieldValue::Text(s)) => {
                    sheet.write_string(row, col, s)?;
                }
                Some(FieldValue::Integer(v)) => {
                    sheet.write_number(row, col, *v as f64)?;
                }
                Some(FieldValue::Float(v)) => {
                    sheet.write_number(row, col, *v)?;
                }
                Some(FieldValue::Timestamp(ts)) => {
                    sheet.write_datetime_with_format(row, col, ts, datetime)?;
                }
            }
        }
    }

    Ok(())
}

fn write_summary_sheet(
    sheet: &mut Worksheet,
    snapshot: &Snapshot,
    header: &Format,
) -> ReportResult<()> {
    sheet.set_name(SUMMARY_SHEET)?;
    for (col, title) in ["Department", "Metric", "Value"].into_iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, title, header)?;
    }
    sheet.set_freeze_panes(1, 0)?;

    let summary = compute_summary(snapshot);
    let mut row = 1u32;
    for dept in &summary.departments {
        for metric in &dept.metrics {
            sheet.write_string(row, 0, dept.department.schema().sheet_name)?;
            sheet.write_string(row, 1, metric.rule.label)?;
            sheet.write_number(row, 2, metric.value.as_f64())?;
            row += 1;
        }
    }

    Ok(())
}
