//! Table re-serialization back into the source file format.

use rosterflow_core::models::TableFormat;
use rust_xlsxwriter::Workbook;

use crate::error::TableError;
use crate::fields::{CanonicalField, FieldResolver};
use crate::table::{CellValue, Table};

/// Re-serialize a parsed table in its original format.
///
/// Columns keep their source order. With `credit_override` set, every row is
/// written with **all** known credit-header spellings carrying the override
/// value; downstream consumers read whichever alias they were built against,
/// so alias columns missing from the source are appended after the original
/// header order.
pub fn write_table(
    table: &Table,
    format: TableFormat,
    credit_override: Option<i32>,
) -> Result<Vec<u8>, TableError> {
    let headers = output_headers(table, credit_override.is_some());
    match format {
        TableFormat::Csv => write_csv(table, &headers, credit_override),
        TableFormat::Xlsx => write_xlsx(table, &headers, credit_override),
    }
}

fn output_headers(table: &Table, with_all_credit_aliases: bool) -> Vec<String> {
    let mut headers = table.headers.clone();
    if with_all_credit_aliases {
        for alias in FieldResolver::aliases(CanonicalField::Credits) {
            if !headers.iter().any(|h| h == alias) {
                headers.push(alias.to_string());
            }
        }
    }
    headers
}

fn write_csv(
    table: &Table,
    headers: &[String],
    credit_override: Option<i32>,
) -> Result<Vec<u8>, TableError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(headers)?;

    for row in &table.rows {
        let record: Vec<String> = headers
            .iter()
            .map(|header| match credit_override {
                Some(credits) if FieldResolver::is_credit_header(header) => credits.to_string(),
                _ => row.get(header).map(CellValue::to_text).unwrap_or_default(),
            })
            .collect();
        writer.write_record(&record)?;
    }

    writer
        .into_inner()
        .map_err(|e| TableError::Write(format!("csv: {}", e)))
}

fn write_xlsx(
    table: &Table,
    headers: &[String],
    credit_override: Option<i32>,
) -> Result<Vec<u8>, TableError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (col, header) in headers.iter().enumerate() {
        worksheet.write_string(0, col as u16, header)?;
    }

    for (row_idx, row) in table.rows.iter().enumerate() {
        let out_row = (row_idx + 1) as u32;
        for (col_idx, header) in headers.iter().enumerate() {
            let col = col_idx as u16;
            if let Some(credits) = credit_override {
                if FieldResolver::is_credit_header(header) {
                    worksheet.write_number(out_row, col, credits as f64)?;
                    continue;
                }
            }
            match row.get(header) {
                Some(CellValue::Text(s)) => {
                    worksheet.write_string(out_row, col, s)?;
                }
                Some(CellValue::Number(n)) => {
                    worksheet.write_number(out_row, col, *n)?;
                }
                Some(CellValue::Empty) | None => {}
            }
        }
    }

    workbook.save_to_buffer().map_err(TableError::from)
}
