//! Report configuration types
//!
//! Anchor markers, placeholder tokens and the HTML extraction schema are
//! configuration, not control flow. A `ReportConfig` can be built in code
//! (see [`ReportConfig::ngs_default`] and [`ReportConfig::multiqc_default`])
//! or deserialized from TOML.

use crate::types::{ReportError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for one report generation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Column holding the sample identifier
    #[serde(default = "default_sample_key")]
    pub sample_key: String,

    /// Sheet holding the sample records (first sheet when absent)
    #[serde(default)]
    pub sheet: Option<String>,

    /// Replacement used when a placeholder value is unavailable
    #[serde(default = "default_missing_value")]
    pub missing_value: String,

    /// Ratio fields rendered as percentages (x100, 2 decimals)
    #[serde(default = "default_percent_fields")]
    pub percent_fields: Vec<String>,

    #[serde(default)]
    pub output: OutputConfig,

    /// Inline tokens replaced in every paragraph
    #[serde(default)]
    pub placeholders: Vec<PlaceholderRule>,

    /// Tables inserted into the document, in order
    #[serde(default)]
    pub sections: Vec<SectionConfig>,

    /// Metric extraction schema for HTML sources
    #[serde(default)]
    pub extraction: Vec<MetricRule>,
}

fn default_sample_key() -> String {
    "SampleID".to_string()
}

fn default_missing_value() -> String {
    "N/A".to_string()
}

fn default_percent_fields() -> Vec<String> {
    vec!["VAF".to_string()]
}

fn default_file_pattern() -> String {
    "{sample_id}.docx".to_string()
}

fn default_font_size() -> f32 {
    11.0
}

fn default_style_id() -> String {
    "TableGrid".to_string()
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            sample_key: default_sample_key(),
            sheet: None,
            missing_value: default_missing_value(),
            percent_fields: default_percent_fields(),
            output: OutputConfig::default(),
            placeholders: Vec::new(),
            sections: Vec::new(),
            extraction: Vec::new(),
        }
    }
}

/// Where generated documents are written
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// File name pattern; `{sample_id}` is replaced by the sanitized sample id
    #[serde(default = "default_file_pattern")]
    pub file_pattern: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            file_pattern: default_file_pattern(),
        }
    }
}

/// A placeholder token and where its value comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceholderRule {
    /// Literal token, e.g. `<<SampleID>>`
    pub token: String,
    pub source: PlaceholderSource,
}

/// Source of a placeholder's replacement value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderSource {
    /// The sample group identifier
    SampleId,
    /// A field of the group's first record
    Field(String),
    /// A metric extracted from the HTML report
    Metric(String),
    /// A fixed string
    Literal(String),
}

/// One table inserted into the report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionConfig {
    /// Name used in logs
    pub name: String,

    /// Marker of the paragraph the table follows (append when absent)
    #[serde(default)]
    pub anchor: Option<String>,

    #[serde(default)]
    pub source: TableSource,

    #[serde(default)]
    pub orientation: Orientation,

    /// Drop duplicate rows, keeping the first occurrence
    #[serde(default)]
    pub distinct: bool,

    #[serde(default)]
    pub on_missing_anchor: MissingAnchorPolicy,

    /// Paragraph placed before the table; `{sheet}` expands to the sheet name
    #[serde(default)]
    pub caption: Option<String>,

    /// Columns to include (all columns when empty)
    #[serde(default)]
    pub columns: Vec<ColumnSpec>,

    #[serde(default)]
    pub table: TableOptions,
}

impl SectionConfig {
    /// Create a section appended at the end of the document
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            anchor: None,
            source: TableSource::default(),
            orientation: Orientation::default(),
            distinct: false,
            on_missing_anchor: MissingAnchorPolicy::default(),
            caption: None,
            columns: Vec::new(),
            table: TableOptions::default(),
        }
    }

    /// Builder method: insert after the paragraph containing `marker`
    pub fn with_anchor(mut self, marker: impl Into<String>) -> Self {
        self.anchor = Some(marker.into());
        self
    }

    /// Builder method: set the data source
    pub fn with_source(mut self, source: TableSource) -> Self {
        self.source = source;
        self
    }

    /// Builder method: set the table orientation
    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    /// Builder method: drop duplicate rows
    pub fn with_distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self
    }

    /// Builder method: set the missing anchor policy
    pub fn with_missing_anchor_policy(mut self, policy: MissingAnchorPolicy) -> Self {
        self.on_missing_anchor = policy;
        self
    }

    /// Builder method: set the caption paragraph
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Builder method: add a column with its field name as label
    pub fn add_column(mut self, field: impl Into<String>) -> Self {
        self.columns.push(ColumnSpec::new(field));
        self
    }

    /// Builder method: add a column with a display label
    pub fn add_labeled_column(mut self, field: impl Into<String>, label: impl Into<String>) -> Self {
        self.columns.push(ColumnSpec::labeled(field, label));
        self
    }

    /// Builder method: set table formatting
    pub fn with_table_options(mut self, options: TableOptions) -> Self {
        self.table = options;
        self
    }
}

/// Rows a section's table is built from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableSource {
    /// The current sample group's records
    #[default]
    Sample,
    /// A whole named sheet
    Sheet(String),
    /// Every sheet of the workbook, one table each
    AllSheets,
}

/// Table orientation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// One row per record, header row first
    #[default]
    Records,
    /// Fields as rows, one value column per record
    Transposed,
}

/// What to do when a section's anchor is not in the template
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingAnchorPolicy {
    /// Log and leave the section out
    Skip,
    /// Append the table at the end of the document
    #[default]
    Append,
}

/// A column of a section table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub field: String,
    #[serde(default)]
    pub label: Option<String>,
}

impl ColumnSpec {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            label: None,
        }
    }

    pub fn labeled(field: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            label: Some(label.into()),
        }
    }

    /// Header text for this column
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.field)
    }
}

/// Formatting applied to a rendered table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableOptions {
    #[serde(default)]
    pub bold_header: bool,

    /// Font size in points
    #[serde(default = "default_font_size")]
    pub font_size: f32,

    #[serde(default)]
    pub autofit: bool,

    /// Centre the text of every cell
    #[serde(default)]
    pub align_center: bool,

    /// Table style id from the template's styles
    #[serde(default = "default_style_id")]
    pub style_id: String,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            bold_header: false,
            font_size: default_font_size(),
            autofit: false,
            align_center: false,
            style_id: default_style_id(),
        }
    }
}

impl TableOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: bold the header row
    pub fn with_bold_header(mut self, enabled: bool) -> Self {
        self.bold_header = enabled;
        self
    }

    /// Builder method: set the font size in points
    pub fn with_font_size(mut self, points: f32) -> Self {
        self.font_size = points;
        self
    }

    /// Builder method: enable autofit layout
    pub fn with_autofit(mut self, enabled: bool) -> Self {
        self.autofit = enabled;
        self
    }

    /// Builder method: centre cell text
    pub fn with_align_center(mut self, enabled: bool) -> Self {
        self.align_center = enabled;
        self
    }

    /// Builder method: set the table style id
    pub fn with_style_id(mut self, style_id: impl Into<String>) -> Self {
        self.style_id = style_id.into();
        self
    }
}

/// Extraction rule for one metric in an HTML report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricRule {
    /// Field name the metric is stored under
    pub field: String,
    /// CSS selector of the tagged section
    pub section: String,
    /// CSS selector of the value node inside the section (section text when absent)
    #[serde(default)]
    pub value: Option<String>,
    /// Read this attribute instead of the node text
    #[serde(default)]
    pub attribute: Option<String>,
}

impl MetricRule {
    pub fn new(field: impl Into<String>, section: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            section: section.into(),
            value: None,
            attribute: None,
        }
    }

    /// Builder method: select the value node inside the section
    pub fn with_value(mut self, selector: impl Into<String>) -> Self {
        self.value = Some(selector.into());
        self
    }

    /// Builder method: read an attribute of the value node
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }
}

impl ReportConfig {
    /// Create a configuration with default settings and no sections
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration of the NGS Excel-to-report tool
    ///
    /// Patient fields go after "Clinical Report" as a transposed table and
    /// the sample's variants follow "Somatic Variants".
    pub fn ngs_default() -> Self {
        let patient = SectionConfig::new("patient")
            .with_anchor("Clinical Report")
            .with_orientation(Orientation::Transposed)
            .with_distinct(true)
            .add_labeled_column("RecordNumber", "Record Number")
            .add_labeled_column("SampleID", "Sample ID")
            .add_labeled_column("SampleDate", "Sample Date")
            .add_labeled_column("RunDate", "Run Date")
            .add_labeled_column("SampleType", "Sample Type")
            .with_table_options(TableOptions::new().with_font_size(10.0).with_autofit(true));

        let variants = SectionConfig::new("somatic_variants")
            .with_anchor("Somatic Variants")
            .add_column("Chrom")
            .add_column("Gene")
            .add_column("Variant-ID")
            .add_column("VAF")
            .add_column("HGVS Consequence")
            .with_table_options(
                TableOptions::new()
                    .with_bold_header(true)
                    .with_font_size(8.0)
                    .with_autofit(true)
                    .with_align_center(true),
            );

        Self::new()
            .add_placeholder("<<SampleID>>", PlaceholderSource::SampleId)
            .add_section(patient)
            .add_section(variants)
    }

    /// Configuration of the MultiQC + Excel merge tool
    pub fn multiqc_default() -> Self {
        let sheets = SectionConfig::new("excel_sheets")
            .with_source(TableSource::AllSheets)
            .with_caption("Table from {sheet} sheet:")
            .with_table_options(TableOptions::new().with_bold_header(true));

        Self::new()
            .with_file_pattern("report_{sample_id}.docx")
            .add_placeholder("<<SampleID>>", PlaceholderSource::SampleId)
            .add_placeholder("<<CoverageValue>>", PlaceholderSource::Metric("coverage".into()))
            .add_placeholder("<<QualityValue>>", PlaceholderSource::Metric("quality".into()))
            .add_metric_rule(
                MetricRule::new("coverage", "div#coverage-section").with_value("span.metric-value"),
            )
            .add_metric_rule(
                MetricRule::new("quality", "div#quality-section").with_value("span.metric-value"),
            )
            .add_section(sheets)
    }

    /// Builder method: set the sample identifier column
    pub fn with_sample_key(mut self, key: impl Into<String>) -> Self {
        self.sample_key = key.into();
        self
    }

    /// Builder method: read sample records from a named sheet
    pub fn with_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.sheet = Some(sheet.into());
        self
    }

    /// Builder method: set the output file name pattern
    pub fn with_file_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.output.file_pattern = pattern.into();
        self
    }

    /// Builder method: add a placeholder token
    pub fn add_placeholder(mut self, token: impl Into<String>, source: PlaceholderSource) -> Self {
        self.placeholders.push(PlaceholderRule {
            token: token.into(),
            source,
        });
        self
    }

    /// Builder method: add a table section
    pub fn add_section(mut self, section: SectionConfig) -> Self {
        self.sections.push(section);
        self
    }

    /// Builder method: add an HTML metric extraction rule
    pub fn add_metric_rule(mut self, rule: MetricRule) -> Self {
        self.extraction.push(rule);
        self
    }

    /// Distinct anchor markers, in section order
    pub fn anchor_markers(&self) -> Vec<&str> {
        let mut markers: Vec<&str> = Vec::new();
        for marker in self.sections.iter().filter_map(|s| s.anchor.as_deref()) {
            if !markers.contains(&marker) {
                markers.push(marker);
            }
        }
        markers
    }

    /// Placeholder tokens, in substitution order
    pub fn placeholder_keys(&self) -> Vec<&str> {
        self.placeholders.iter().map(|p| p.token.as_str()).collect()
    }

    /// Check if a field is rendered as a percentage
    pub fn is_percent_field(&self, field: &str) -> bool {
        self.percent_fields.iter().any(|f| f == field)
    }

    /// Check the configuration for values that cannot work
    pub fn validate(&self) -> Result<()> {
        if self.sample_key.trim().is_empty() {
            return Err(ReportError::Config("sample_key must not be empty".into()));
        }
        if !self.output.file_pattern.contains("{sample_id}") {
            return Err(ReportError::Config(format!(
                "output.file_pattern {:?} must contain {{sample_id}}",
                self.output.file_pattern
            )));
        }
        if let Some(rule) = self.placeholders.iter().find(|p| p.token.is_empty()) {
            return Err(ReportError::Config(format!("empty placeholder token for {:?}", rule.source)));
        }
        for section in &self.sections {
            if section.anchor.as_deref() == Some("") {
                return Err(ReportError::Config(format!("section {:?} has an empty anchor", section.name)));
            }
            if !(section.table.font_size > 0.0) {
                return Err(ReportError::Config(format!(
                    "section {:?} has invalid font size {}",
                    section.name, section.table.font_size
                )));
            }
        }
        for rule in &self.extraction {
            if rule.field.is_empty() || rule.section.is_empty() {
                return Err(ReportError::Config("extraction rules need a field and a section".into()));
            }
        }
        Ok(())
    }
}
