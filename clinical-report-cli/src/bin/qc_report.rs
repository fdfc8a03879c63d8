//! qc-report: clinical report from a MultiQC HTML report plus an Excel file
//!
//! QC metrics extracted from the HTML report fill the template placeholders;
//! every sheet of the Excel file is appended as a captioned table.

use anyhow::{Context, Result};
use clap::Parser;
use clinical_report_cli::{init_logging, report_summary, resolve_config, CommonArgs};
use clinical_report_core::{
    load_dataset, GenerationMode, ReportConfig, ReportGenerator, SampleGroup, SourceKind,
};
use std::path::{Path, PathBuf};

/// Metric holding the sample id when the report provides one
const SAMPLE_ID_METRIC: &str = "sample_id";

/// Generate a clinical report from MultiQC output and an Excel file
#[derive(Parser, Debug)]
#[command(name = "qc-report")]
#[command(about = "Generate a clinical report from MultiQC output and an Excel file", long_about = None)]
#[command(version)]
struct Args {
    /// Path to input MultiQC HTML file
    #[arg(short, long = "in-file", alias = "inFile", value_name = "FILE")]
    in_file: PathBuf,

    /// Path to the Word template file
    #[arg(short, long, value_name = "FILE")]
    template: PathBuf,

    /// Path to the Excel file with additional tables
    #[arg(short, long = "excel-file", alias = "excelfile", value_name = "FILE")]
    excel_file: PathBuf,

    /// Path to output directory where reports will be saved
    #[arg(short, long, value_name = "DIR")]
    outdir: PathBuf,

    /// Sample id for the report (default: extracted from the HTML, else its file name)
    #[arg(short, long, value_name = "ID")]
    sample_id: Option<String>,

    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.common.verbose, args.common.quiet);

    log::info!("qc-report v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using report library v{}", clinical_report_core::VERSION);

    let config = resolve_config(args.common.config.as_deref(), ReportConfig::multiqc_default)?;

    let metrics = load_dataset(&args.in_file, &SourceKind::Markup(config.extraction.clone()))
        .with_context(|| format!("Failed to load input file {:?}", args.in_file))?;

    let workbook = load_dataset(&args.excel_file, &SourceKind::Spreadsheet)
        .with_context(|| format!("Failed to load Excel file {:?}", args.excel_file))?;

    let generator = ReportGenerator::from_template_path(config, &args.template)
        .with_context(|| format!("Failed to open template {:?}", args.template))?;

    let sample_id = args
        .sample_id
        .clone()
        .or_else(|| metrics.scalar(SAMPLE_ID_METRIC).map(|v| v.to_string()))
        .unwrap_or_else(|| file_stem(&args.in_file));
    log::info!("Sample id: {}", sample_id);

    let summary = generator
        .generate_groups(
            &[SampleGroup::standalone(sample_id)],
            &workbook,
            Some(&metrics),
            &args.outdir,
            GenerationMode::Sequential,
        )
        .with_context(|| format!("Failed to generate report from {:?}", args.in_file))?;

    report_summary(&summary)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".to_string())
}
