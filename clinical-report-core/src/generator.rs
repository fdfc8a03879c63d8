//! Batch report generation
//!
//! The `ReportGenerator` is the entry point of the library: it owns the
//! configuration and the template (parsed once) and produces one document per
//! sample group. A failure while generating one sample never stops the
//! others; it is recorded in the `BatchSummary`.

use crate::assembler::ReportAssembler;
use crate::config::ReportConfig;
use crate::docx::TemplateDocument;
use crate::types::{Dataset, ReportError, Result, SampleGroup};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// How sample groups are processed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GenerationMode {
    /// One sample after the other
    #[default]
    Sequential,
    /// Independent rayon tasks sharing the read-only inputs
    Parallel,
}

/// A report that was written successfully
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedReport {
    pub sample_id: String,
    pub path: PathBuf,
    pub tables_inserted: usize,
    pub placeholders_replaced: usize,
}

/// A sample whose report could not be produced
#[derive(Debug)]
pub struct SampleFailure {
    pub sample_id: String,
    pub error: ReportError,
}

/// Outcome of a batch, in sample group order
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub reports: Vec<GeneratedReport>,
    pub failures: Vec<SampleFailure>,
}

impl BatchSummary {
    /// True when every sample produced a report
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn total(&self) -> usize {
        self.reports.len() + self.failures.len()
    }
}

/// Generates per-sample reports from one template
pub struct ReportGenerator {
    config: ReportConfig,
    template: TemplateDocument,
}

impl ReportGenerator {
    /// Create a generator; the configuration is validated first
    pub fn new(config: ReportConfig, template: TemplateDocument) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, template })
    }

    /// Create a generator, loading the template from `path`
    pub fn from_template_path(config: ReportConfig, path: &Path) -> Result<Self> {
        let template = TemplateDocument::open(path)?;
        Self::new(config, template)
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    pub fn template(&self) -> &TemplateDocument {
        &self.template
    }

    /// Group the dataset's sample records by the configured key
    pub fn sample_groups(&self, dataset: &Dataset) -> Result<Vec<SampleGroup>> {
        dataset.sample_groups(self.config.sheet.as_deref(), &self.config.sample_key)
    }

    /// Output path of every group, in group order
    ///
    /// Names come from the sanitized sample id; identifiers that sanitize to
    /// the same name get a numeric suffix in group order.
    pub fn output_paths(&self, groups: &[SampleGroup], output_dir: &Path) -> Vec<PathBuf> {
        let mut seen: HashMap<String, usize> = HashMap::new();
        groups
            .iter()
            .map(|group| {
                let base = sanitize_file_name(&group.sample_id);
                let count = seen.entry(base.clone()).or_insert(0);
                *count += 1;
                let stem = if *count == 1 {
                    base
                } else {
                    format!("{}_{}", base, count)
                };
                output_dir.join(self.config.output.file_pattern.replace("{sample_id}", &stem))
            })
            .collect()
    }

    /// Build and save the report of one sample group
    pub fn generate(
        &self,
        group: &SampleGroup,
        dataset: &Dataset,
        metrics: Option<&Dataset>,
        path: &Path,
    ) -> Result<GeneratedReport> {
        let mut doc = self.template.instantiate();
        let stats = ReportAssembler::new(&self.config).assemble(&mut doc, group, dataset, metrics)?;
        doc.save(path)?;

        log::info!("Report for sample {} saved: {:?}", group.sample_id, path);
        Ok(GeneratedReport {
            sample_id: group.sample_id.clone(),
            path: path.to_path_buf(),
            tables_inserted: stats.tables_inserted,
            placeholders_replaced: stats.placeholders_replaced,
        })
    }

    /// Generate one report per sample group of `dataset`
    pub fn generate_all(
        &self,
        dataset: &Dataset,
        metrics: Option<&Dataset>,
        output_dir: &Path,
        mode: GenerationMode,
    ) -> Result<BatchSummary> {
        let groups = self.sample_groups(dataset)?;
        self.generate_groups(&groups, dataset, metrics, output_dir, mode)
    }

    /// Generate reports for the given groups
    ///
    /// The output directory is created first; failing to create it fails the
    /// whole batch. Per-sample failures are collected in the summary.
    pub fn generate_groups(
        &self,
        groups: &[SampleGroup],
        dataset: &Dataset,
        metrics: Option<&Dataset>,
        output_dir: &Path,
        mode: GenerationMode,
    ) -> Result<BatchSummary> {
        std::fs::create_dir_all(output_dir).map_err(|e| ReportError::write(output_dir, e))?;

        let paths = self.output_paths(groups, output_dir);
        log::info!(
            "Generating {} report(s) in {:?} ({:?})",
            groups.len(),
            output_dir,
            mode
        );

        let run = |(group, path): (&SampleGroup, &PathBuf)| {
            self.generate(group, dataset, metrics, path)
                .map_err(|error| SampleFailure {
                    sample_id: group.sample_id.clone(),
                    error,
                })
        };

        let results: Vec<std::result::Result<GeneratedReport, SampleFailure>> = match mode {
            GenerationMode::Sequential => groups.iter().zip(&paths).map(run).collect(),
            GenerationMode::Parallel => groups.par_iter().zip(&paths).map(run).collect(),
        };

        let mut summary = BatchSummary::default();
        for result in results {
            match result {
                Ok(report) => summary.reports.push(report),
                Err(failure) => {
                    log::error!("Sample {} failed: {}", failure.sample_id, failure.error);
                    summary.failures.push(failure);
                }
            }
        }

        log::info!(
            "Batch finished: {} written, {} failed",
            summary.reports.len(),
            summary.failures.len()
        );
        Ok(summary)
    }
}

/// File-system safe form of a sample id
///
/// Characters outside `[A-Za-z0-9._-]` become `_`.
pub fn sanitize_file_name(sample_id: &str) -> String {
    let name: String = sample_id
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if name.is_empty() || name == "." || name == ".." {
        return name.replace('.', "_") + "_";
    }
    name
}
