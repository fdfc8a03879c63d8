//! Core types for the clinical report library
//!
//! This module defines the in-memory dataset model shared by the loaders, the
//! table builder and the assembler. A `Dataset` is loaded once per run and is
//! never mutated afterwards.

use chrono::{NaiveDateTime, Timelike};
use std::fmt;
use std::path::PathBuf;

/// Result type for report operations
pub type Result<T> = std::result::Result<T, ReportError>;

/// Errors that can occur while loading data or generating reports
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Failed to load {path:?}: {reason}")]
    Load { path: PathBuf, reason: String },

    #[error("Cannot build an empty table ({rows} rows x {columns} columns)")]
    EmptyTable { rows: usize, columns: usize },

    #[error("Anchor not found: {0:?}")]
    AnchorNotFound(String),

    #[error("Failed to write {path:?}: {reason}")]
    Write { path: PathBuf, reason: String },

    #[error("Invalid template: {0}")]
    Template(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Field not found: {0}")]
    FieldNotFound(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ReportError {
    /// Build a load error for the given input file
    pub fn load(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        ReportError::Load {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Build a write error for the given output file
    pub fn write(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        ReportError::Write {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// A scalar cell value
///
/// Numbers and dates keep their type until they are rendered into a table
/// cell or a placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Empty,
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    DateTime(NaiveDateTime),
}

impl Value {
    /// Numeric view of the value, parsing text when it looks like a number
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// True for empty cells and whitespace-only text
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Empty => true,
            Value::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => Ok(()),
            Value::Text(s) => write!(f, "{}", s),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Boolean(v) => write!(f, "{}", if *v { "TRUE" } else { "FALSE" }),
            Value::DateTime(dt) => {
                if dt.hour() == 0 && dt.minute() == 0 && dt.second() == 0 {
                    write!(f, "{}", dt.format("%Y-%m-%d"))
                } else {
                    write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S"))
                }
            }
        }
    }
}

/// A named table of records (one spreadsheet sheet)
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Sheet name
    pub name: String,
    /// Column names in sheet order
    pub columns: Vec<String>,
    /// Rows, each padded to `columns.len()`
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row, padding or truncating it to the column count
    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Empty);
        self.rows.push(row);
    }

    /// Index of a column by exact name
    pub fn column_index(&self, field: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == field)
    }

    /// Value of `field` in row `row`
    pub fn value(&self, row: usize, field: &str) -> Option<&Value> {
        let col = self.column_index(field)?;
        self.rows.get(row).and_then(|r| r.get(col))
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Copy of this table keeping only the rows accepted by `keep`
    pub fn filter_rows<F>(&self, mut keep: F) -> Table
    where
        F: FnMut(&[Value]) -> bool,
    {
        Table {
            name: self.name.clone(),
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }
}

/// All tables loaded from one input file
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    /// Input file the dataset was loaded from
    pub source: PathBuf,
    /// Tables in source order
    pub tables: Vec<Table>,
}

impl Dataset {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            tables: Vec::new(),
        }
    }

    /// Look up a table by name
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// The named table, or the first one when `name` is `None`
    pub fn primary_table(&self, name: Option<&str>) -> Result<&Table> {
        match name {
            Some(name) => self
                .table(name)
                .ok_or_else(|| ReportError::FieldNotFound(format!("sheet {:?} in {:?}", name, self.source))),
            None => self
                .tables
                .first()
                .ok_or_else(|| ReportError::load(&self.source, "workbook contains no sheets")),
        }
    }

    /// First value of `field` across the tables (used for key/value sources)
    pub fn scalar(&self, field: &str) -> Option<&Value> {
        self.tables
            .iter()
            .find_map(|t| t.value(0, field))
            .filter(|v| !v.is_empty())
    }

    /// Group the rows of `table` by the `key` column in first-appearance order
    pub fn sample_groups(&self, table: Option<&str>, key: &str) -> Result<Vec<SampleGroup>> {
        let table = self.primary_table(table)?;
        let col = table
            .column_index(key)
            .ok_or_else(|| ReportError::FieldNotFound(format!("{} in sheet {:?}", key, table.name)))?;

        let mut groups: Vec<SampleGroup> = Vec::new();
        for (idx, row) in table.rows.iter().enumerate() {
            let id_value = &row[col];
            if id_value.is_empty() {
                log::warn!("Row {} of sheet {:?} has no {}, skipping", idx + 1, table.name, key);
                continue;
            }
            let sample_id = id_value.to_string().trim().to_string();
            match groups.iter_mut().find(|g| g.sample_id == sample_id) {
                Some(group) => group.records.rows.push(row.clone()),
                None => {
                    let mut records = Table::new(table.name.clone(), table.columns.clone());
                    records.rows.push(row.clone());
                    groups.push(SampleGroup { sample_id, records });
                }
            }
        }

        log::info!("Found {} sample(s) in sheet {:?}", groups.len(), table.name);
        Ok(groups)
    }
}

/// All records sharing one sample identifier
#[derive(Debug, Clone, PartialEq)]
pub struct SampleGroup {
    /// Sample identifier (display form of the key cell)
    pub sample_id: String,
    /// The sample's rows, with the columns of the source table
    pub records: Table,
}

impl SampleGroup {
    /// A group with no records, for single-sample sources
    pub fn standalone(sample_id: impl Into<String>) -> Self {
        Self {
            sample_id: sample_id.into(),
            records: Table::new("", Vec::new()),
        }
    }

    /// Value of `field` in the group's first record
    pub fn first_value(&self, field: &str) -> Option<&Value> {
        self.records.value(0, field).filter(|v| !v.is_empty())
    }
}
