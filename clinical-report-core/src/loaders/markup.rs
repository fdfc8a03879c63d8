//! HTML report loader
//!
//! Extracts scalar metrics (e.g. coverage, quality) from a MultiQC-style HTML
//! report. Which nodes hold which metric is described by `MetricRule`s, so the
//! schema of a real report is configuration rather than code.
//!
//! A rule whose section or value node is missing simply yields no field;
//! consumers substitute their missing value.

use super::DatasetLoader;
use crate::config::MetricRule;
use crate::types::{Dataset, ReportError, Result, Table, Value};
use scraper::{ElementRef, Html, Selector};
use std::path::Path;

/// Name of the single table produced by the markup loader
pub const METRICS_TABLE: &str = "metrics";

/// Loads metrics from an HTML document
#[derive(Debug, Clone, Default)]
pub struct MarkupLoader {
    rules: Vec<MetricRule>,
}

/// A metric rule with its selectors compiled
struct CompiledRule<'a> {
    rule: &'a MetricRule,
    section: Selector,
    value: Option<Selector>,
}

impl MarkupLoader {
    pub fn new(rules: Vec<MetricRule>) -> Self {
        Self { rules }
    }

    /// Extract metrics from an HTML string
    ///
    /// Returns the metrics table; only rules that matched contribute a column.
    pub fn extract(&self, html: &str) -> Result<Table> {
        let compiled = self.compile()?;
        let document = Html::parse_document(html);

        let mut columns = Vec::new();
        let mut values = Vec::new();
        for rule in &compiled {
            match extract_metric(&document, rule) {
                Some(value) => {
                    log::debug!("Metric {:?} = {:?}", rule.rule.field, value);
                    columns.push(rule.rule.field.clone());
                    values.push(Value::Text(value));
                }
                None => log::warn!("Metric {:?} not found in report", rule.rule.field),
            }
        }

        let mut table = Table::new(METRICS_TABLE, columns);
        table.push_row(values);
        Ok(table)
    }

    fn compile(&self) -> Result<Vec<CompiledRule<'_>>> {
        self.rules
            .iter()
            .map(|rule| {
                let section = parse_selector(&rule.section)?;
                let value = rule.value.as_deref().map(parse_selector).transpose()?;
                Ok(CompiledRule { rule, section, value })
            })
            .collect()
    }
}

impl DatasetLoader for MarkupLoader {
    fn load(&self, path: &Path) -> Result<Dataset> {
        log::info!("Loading HTML report: {:?}", path);

        let html = std::fs::read_to_string(path).map_err(|e| ReportError::load(path, e))?;
        let table = self.extract(&html).map_err(|e| match e {
            ReportError::Config(reason) => ReportError::load(path, reason),
            other => other,
        })?;

        log::info!(
            "Extracted {}/{} metric(s) from {:?}",
            table.num_columns(),
            self.rules.len(),
            path
        );

        let mut dataset = Dataset::new(path);
        dataset.tables.push(table);
        Ok(dataset)
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| ReportError::Config(format!("invalid CSS selector {:?}: {:?}", selector, e)))
}

fn extract_metric(document: &Html, rule: &CompiledRule<'_>) -> Option<String> {
    let section = document.select(&rule.section).next()?;
    let node = match &rule.value {
        Some(selector) => section.select(selector).next()?,
        None => section,
    };
    let raw = match &rule.rule.attribute {
        Some(attr) => node.value().attr(attr)?.to_string(),
        None => node_text(node),
    };
    let text = raw.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

fn node_text(node: ElementRef<'_>) -> String {
    node.text().collect::<String>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReportConfig;

    const REPORT: &str = r#"
        <html><body>
          <div id="coverage-section">
            <h2>Coverage</h2>
            <span class="metric-value"> 512.3x </span>
          </div>
          <div id="summary" data-sample="S-001">
            <span class="metric-value">ok</span>
          </div>
        </body></html>
    "#;

    #[test]
    fn test_default_rules_with_missing_section() {
        let loader = MarkupLoader::new(ReportConfig::multiqc_default().extraction);
        let table = loader.extract(REPORT).unwrap();

        assert_eq!(table.columns, vec!["coverage"]);
        assert_eq!(table.value(0, "coverage"), Some(&Value::Text("512.3x".into())));
        assert_eq!(table.value(0, "quality"), None);
    }

    #[test]
    fn test_attribute_and_section_text_rules() {
        let loader = MarkupLoader::new(vec![
            MetricRule::new("sample_id", "div#summary").with_attribute("data-sample"),
            MetricRule::new("heading", "div#coverage-section h2"),
        ]);
        let table = loader.extract(REPORT).unwrap();

        assert_eq!(table.value(0, "sample_id"), Some(&Value::Text("S-001".into())));
        assert_eq!(table.value(0, "heading"), Some(&Value::Text("Coverage".into())));
    }

    #[test]
    fn test_invalid_selector_is_rejected() {
        let loader = MarkupLoader::new(vec![MetricRule::new("x", "div[")]);
        assert!(matches!(loader.extract(REPORT), Err(ReportError::Config(_))));
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let loader = MarkupLoader::new(Vec::new());
        let result = loader.load(Path::new("/nonexistent/multiqc.html"));
        assert!(matches!(result, Err(ReportError::Load { .. })));
    }
}
