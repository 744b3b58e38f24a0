//! Table parsing: delimited text (CSV) and native spreadsheet (XLSX) bytes
//! into an ordered [`Table`].

use std::io::Cursor;

use calamine::{Data, Reader, Xlsx};
use rosterflow_core::models::TableFormat;

use crate::error::TableError;
use crate::table::{CellValue, Row, Table};

/// Parse raw file bytes into a table.
///
/// CSV bytes are decoded as UTF-8 text first. XLSX payloads are read with
/// calamine; only the first worksheet is used. The header row becomes the
/// row-map keys and source row order is preserved. Rows whose cells are all
/// empty are dropped, matching what the upload UI produces for trailing
/// blank lines.
pub fn parse_table(bytes: &[u8], format: TableFormat) -> Result<Table, TableError> {
    match format {
        TableFormat::Csv => parse_csv(bytes),
        TableFormat::Xlsx => parse_xlsx(bytes),
    }
}

fn parse_csv(bytes: &[u8]) -> Result<Table, TableError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| TableError::UnparseableTable(format!("not valid UTF-8: {}", e)))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| TableError::UnparseableTable(format!("csv: {}", e)))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(TableError::UnparseableTable(
            "no recognizable header row".to_string(),
        ));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| TableError::UnparseableTable(format!("csv: {}", e)))?;
        let mut row = Row::new();
        for (idx, header) in headers.iter().enumerate() {
            if header.is_empty() {
                continue;
            }
            let cell = match record.get(idx) {
                Some(value) if !value.trim().is_empty() => {
                    CellValue::Text(value.trim().to_string())
                }
                _ => CellValue::Empty,
            };
            row.insert(header.clone(), cell);
        }
        if row.values().all(|v| v.is_empty()) {
            continue;
        }
        rows.push(row);
    }

    Ok(Table { headers, rows })
}

fn parse_xlsx(bytes: &[u8]) -> Result<Table, TableError> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes.to_vec()))
        .map_err(|e| TableError::UnparseableTable(format!("corrupt workbook: {}", e)))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .ok_or_else(|| TableError::UnparseableTable("workbook has no sheets".to_string()))?
        .clone();

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| TableError::UnparseableTable(format!("sheet {}: {}", sheet_name, e)))?;

    let mut source_rows = range.rows();
    let header_row = source_rows
        .next()
        .ok_or_else(|| TableError::UnparseableTable("no recognizable header row".to_string()))?;

    let headers: Vec<String> = header_row
        .iter()
        .map(|cell| cell_to_value(cell).to_text().trim().to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(TableError::UnparseableTable(
            "no recognizable header row".to_string(),
        ));
    }

    let mut rows = Vec::new();
    for source_row in source_rows {
        let mut row = Row::new();
        for (idx, header) in headers.iter().enumerate() {
            if header.is_empty() {
                continue;
            }
            let cell = source_row
                .get(idx)
                .map(cell_to_value)
                .unwrap_or(CellValue::Empty);
            row.insert(header.clone(), cell);
        }
        if row.values().all(|v| v.is_empty()) {
            continue;
        }
        rows.push(row);
    }

    Ok(Table { headers, rows })
}

fn cell_to_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => {
            if s.trim().is_empty() {
                CellValue::Empty
            } else {
                CellValue::Text(s.trim().to_string())
            }
        }
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Text(format!("{:?}", e)),
    }
}
