//! Clinical Report Library
//!
//! Generates clinical laboratory reports by merging structured data
//! (spreadsheet rows, metrics parsed from HTML reports) into Word (`.docx`)
//! templates. One populated document is written per sample.
//!
//! # Architecture
//!
//! The pipeline has four stages:
//! - Loaders read a workbook or an HTML report into an immutable `Dataset`
//! - The locator finds anchor paragraphs in the template
//! - The table builder turns records into formatted `w:tbl` elements
//! - The assembler substitutes placeholders and inserts the tables
//!
//! The template is parsed once and deep-copied for every sample, so samples
//! never share mutable state. Command-line handling lives in the application
//! layer (clinical-report-cli).
//!
//! # Example Usage
//!
//! ```no_run
//! use clinical_report_core::{load_dataset, GenerationMode, ReportConfig, ReportGenerator, SourceKind};
//! use std::path::Path;
//!
//! let config = ReportConfig::ngs_default();
//! let generator = ReportGenerator::from_template_path(config, Path::new("template.docx")).unwrap();
//!
//! let dataset = load_dataset(Path::new("ngs.xlsx"), &SourceKind::Spreadsheet).unwrap();
//! let summary = generator
//!     .generate_all(&dataset, None, Path::new("reports"), GenerationMode::Sequential)
//!     .unwrap();
//!
//! for report in &summary.reports {
//!     println!("Report saved at {}", report.path.display());
//! }
//! for failure in &summary.failures {
//!     eprintln!("Sample {} failed: {}", failure.sample_id, failure.error);
//! }
//! ```

// Public modules
pub mod assembler;
pub mod config;
pub mod docx;
pub mod generator;
pub mod loaders;
pub mod locator;
pub mod table;
pub mod types;

// Re-export main types for convenience
pub use assembler::{substitute_placeholders, AssemblyStats, PlaceholderMap, ReportAssembler};
pub use config::{
    ColumnSpec, MetricRule, MissingAnchorPolicy, Orientation, OutputConfig, PlaceholderRule,
    PlaceholderSource, ReportConfig, SectionConfig, TableOptions, TableSource,
};
pub use docx::TemplateDocument;
pub use generator::{
    sanitize_file_name, BatchSummary, GeneratedReport, GenerationMode, ReportGenerator, SampleFailure,
};
pub use loaders::{load_dataset, DatasetLoader, MarkupLoader, SourceKind, SpreadsheetLoader};
pub use locator::{locate, locate_all};
pub use table::{format_percent, BuiltTable, TableBuilder, TableGrid};
pub use types::{Dataset, ReportError, Result, SampleGroup, Table, Value};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
