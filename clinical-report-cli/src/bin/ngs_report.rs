//! ngs-report: one clinical report per sample of an NGS variant workbook
//!
//! Rows of the workbook are grouped by sample id. Each report gets a patient
//! information table after "Clinical Report" and the sample's variants after
//! "Somatic Variants" (see `ReportConfig::ngs_default`).

use anyhow::{Context, Result};
use clap::Parser;
use clinical_report_cli::{init_logging, report_summary, resolve_config, CommonArgs};
use clinical_report_core::{load_dataset, GenerationMode, ReportConfig, ReportGenerator, SourceKind};
use std::path::PathBuf;

/// Generate per-sample clinical reports from an NGS Excel file
#[derive(Parser, Debug)]
#[command(name = "ngs-report")]
#[command(about = "Generate per-sample clinical reports from an NGS Excel file", long_about = None)]
#[command(version)]
struct Args {
    /// Path to input NGS Excel file
    #[arg(short, long = "in-file", alias = "inFile", value_name = "FILE")]
    in_file: PathBuf,

    /// Path to Word template file
    #[arg(short, long, value_name = "FILE")]
    template: PathBuf,

    /// Path to output directory for reports
    #[arg(short, long, value_name = "DIR")]
    outdir: PathBuf,

    /// Generate reports in parallel
    #[arg(long)]
    parallel: bool,

    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.common.verbose, args.common.quiet);

    log::info!("ngs-report v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using report library v{}", clinical_report_core::VERSION);

    let config = resolve_config(args.common.config.as_deref(), ReportConfig::ngs_default)?;

    let generator = ReportGenerator::from_template_path(config, &args.template)
        .with_context(|| format!("Failed to open template {:?}", args.template))?;

    let dataset = load_dataset(&args.in_file, &SourceKind::Spreadsheet)
        .with_context(|| format!("Failed to load input file {:?}", args.in_file))?;

    let mode = if args.parallel {
        GenerationMode::Parallel
    } else {
        GenerationMode::Sequential
    };

    let summary = generator
        .generate_all(&dataset, None, &args.outdir, mode)
        .with_context(|| format!("Failed to generate reports from {:?}", args.in_file))?;

    report_summary(&summary)
}
