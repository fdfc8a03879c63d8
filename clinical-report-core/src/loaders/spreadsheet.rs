//! Spreadsheet workbook loader
//!
//! Reads every sheet of an XLSX/XLS/ODS workbook with `calamine` (format
//! auto-detected). The first non-empty row of a sheet is its header.

use super::DatasetLoader;
use crate::types::{Dataset, ReportError, Result, Table, Value};
use calamine::{Data, ExcelDateTime, Reader};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashSet;
use std::path::Path;

/// Loads all sheets of a workbook into a dataset
#[derive(Debug, Clone, Default)]
pub struct SpreadsheetLoader;

impl SpreadsheetLoader {
    pub fn new() -> Self {
        Self
    }
}

impl DatasetLoader for SpreadsheetLoader {
    fn load(&self, path: &Path) -> Result<Dataset> {
        log::info!("Loading workbook: {:?}", path);

        let mut workbook = calamine::open_workbook_auto(path).map_err(|e| ReportError::load(path, e))?;

        let mut dataset = Dataset::new(path);
        for name in workbook.sheet_names() {
            let range = workbook
                .worksheet_range(&name)
                .map_err(|e| ReportError::load(path, format!("sheet {:?}: {}", name, e)))?;

            let rows = range
                .rows()
                .map(|row| row.iter().map(convert_cell).collect::<Vec<Value>>());
            let table = table_from_rows(&name, rows);
            log::debug!(
                "Sheet {:?}: {} columns, {} rows",
                table.name,
                table.num_columns(),
                table.num_rows()
            );
            dataset.tables.push(table);
        }

        if dataset.tables.is_empty() {
            return Err(ReportError::load(path, "workbook contains no sheets"));
        }

        log::info!("Workbook loaded: {} sheet(s) from {:?}", dataset.tables.len(), path);
        Ok(dataset)
    }
}

/// Largest serial Excel can display (9999-12-31)
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

/// Build a table from raw sheet rows
///
/// Leading empty rows are skipped and the first non-empty row names the
/// columns. Blank names become `Unnamed: <index>`, and a repeated name gets a
/// numeric suffix (`Reads`, `Reads.1`). Columns past the header are kept when
/// any data row fills them. Fully empty data rows are dropped.
pub fn table_from_rows<I>(name: &str, rows: I) -> Table
where
    I: IntoIterator<Item = Vec<Value>>,
{
    let mut rows: Vec<Vec<Value>> = rows
        .into_iter()
        .filter(|row: &Vec<Value>| row.iter().any(|v| !v.is_empty()))
        .collect();
    if rows.is_empty() {
        return Table::new(name, Vec::new());
    }
    let header = rows.remove(0);

    let filled = |row: &Vec<Value>| row.iter().rposition(|v| !v.is_empty()).map_or(0, |i| i + 1);
    let width = rows.iter().map(filled).fold(filled(&header), usize::max);

    let names = (0..width)
        .map(|idx| match header.get(idx) {
            Some(cell) if !cell.is_empty() => cell.to_string().trim().to_string(),
            _ => format!("Unnamed: {}", idx),
        })
        .collect();

    let mut table = Table::new(name, dedupe_column_names(names));
    for row in rows {
        table.push_row(row);
    }
    table
}

/// Suffix repeated column names with `.1`, `.2`, ... skipping taken names
fn dedupe_column_names(names: Vec<String>) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::with_capacity(names.len());
    let mut out = Vec::with_capacity(names.len());
    for name in names {
        let mut unique = name.clone();
        let mut n = 0;
        while taken.contains(&unique) {
            n += 1;
            unique = format!("{}.{}", name, n);
        }
        if n > 0 {
            log::debug!("Duplicate column {:?} renamed to {:?}", name, unique);
        }
        taken.insert(unique.clone());
        out.push(unique);
    }
    out
}

/// Convert a calamine cell, keeping numbers and dates typed
fn convert_cell(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Empty,
        Data::String(s) => Value::Text(s.clone()),
        Data::Float(f) => Value::Float(*f),
        Data::Int(i) => Value::Integer(*i),
        Data::Bool(b) => Value::Boolean(*b),
        Data::DateTime(dt) => excel_datetime(dt)
            .map(Value::DateTime)
            .unwrap_or(Value::Float(dt.as_f64())),
        Data::DateTimeIso(s) => parse_iso_datetime(s)
            .map(Value::DateTime)
            .unwrap_or_else(|| Value::Text(s.clone())),
        Data::Error(e) => Value::Text(format!("#ERR:{:?}", e)),
        // Durations and any future variants
        other => Value::Text(other.to_string()),
    }
}

/// Date-time of an Excel serial, honouring the workbook's 1900/1904 system
///
/// Durations and serials outside the range Excel can display stay numeric.
fn excel_datetime(dt: &ExcelDateTime) -> Option<NaiveDateTime> {
    let serial = dt.as_f64();
    if dt.is_duration() || !(0.0..=MAX_EXCEL_SERIAL).contains(&serial) {
        return None;
    }
    dt.as_datetime()
}

fn parse_iso_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
