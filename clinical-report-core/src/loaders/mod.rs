//! Data source loaders (spreadsheet workbooks, HTML reports)
//!
//! Each loader turns one input file into an immutable `Dataset`. Loading is
//! all-or-nothing: any failure is a `ReportError::Load` naming the file.

use crate::config::MetricRule;
use crate::types::{Dataset, Result};
use std::path::Path;

pub mod markup;
pub mod spreadsheet;

pub use markup::MarkupLoader;
pub use spreadsheet::SpreadsheetLoader;

/// Common trait for all data source loaders
pub trait DatasetLoader {
    /// Load a file into a dataset
    fn load(&self, path: &Path) -> Result<Dataset>;
}

/// Kind of data source to load
#[derive(Debug, Clone)]
pub enum SourceKind {
    /// Spreadsheet workbook (XLSX/XLS/ODS), every sheet loaded
    Spreadsheet,
    /// HTML report, metrics extracted with the given rules
    Markup(Vec<MetricRule>),
}

/// Load a dataset from `path`
pub fn load_dataset(path: &Path, kind: &SourceKind) -> Result<Dataset> {
    match kind {
        SourceKind::Spreadsheet => SpreadsheetLoader::new().load(path),
        SourceKind::Markup(rules) => MarkupLoader::new(rules.clone()).load(path),
    }
}
