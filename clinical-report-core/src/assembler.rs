//! Document assembler
//!
//! Populates one template instance for one sample group: placeholder tokens
//! are replaced first, then every configured section is rendered and inserted
//! after its anchor paragraph (or appended at the end of the body).

use crate::config::{MissingAnchorPolicy, PlaceholderSource, ReportConfig, SectionConfig, TableSource};
use crate::docx::wordml::{for_each_paragraph_mut, plain_paragraph, replace_in_paragraph};
use crate::docx::{TemplateDocument, XmlElement};
use crate::locator::locate_all;
use crate::table::{render_value, TableBuilder, TableGrid};
use crate::types::{Dataset, ReportError, Result, SampleGroup, Table};

/// Ordered token -> replacement mapping for one sample
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaceholderMap {
    entries: Vec<(String, String)>,
}

impl PlaceholderMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a token
    pub fn insert(&mut self, token: impl Into<String>, value: impl Into<String>) {
        let token = token.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(t, _)| *t == token) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((token, value)),
        }
    }

    pub fn get(&self, token: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(t, _)| t == token)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    /// Resolve the configured placeholders for one sample group
    ///
    /// Values that cannot be resolved become `config.missing_value`.
    pub fn resolve(config: &ReportConfig, group: &SampleGroup, metrics: Option<&Dataset>) -> Self {
        let mut map = Self::new();
        for rule in &config.placeholders {
            let value = match &rule.source {
                PlaceholderSource::SampleId => Some(group.sample_id.clone()),
                PlaceholderSource::Literal(text) => Some(text.clone()),
                PlaceholderSource::Field(field) => group
                    .first_value(field)
                    .map(|v| render_value(v, config.is_percent_field(field))),
                PlaceholderSource::Metric(field) => metrics
                    .and_then(|m| m.scalar(field))
                    .map(|v| render_value(v, config.is_percent_field(field))),
            };
            let value = value.unwrap_or_else(|| {
                log::warn!(
                    "No value for placeholder {} ({:?}) in sample {}, using {:?}",
                    rule.token,
                    rule.source,
                    group.sample_id,
                    config.missing_value
                );
                config.missing_value.clone()
            });
            map.insert(rule.token.clone(), value);
        }
        map
    }
}

/// Replace placeholder tokens in every paragraph of the document body,
/// including paragraphs inside table cells
///
/// Returns the number of (paragraph, token) replacements made.
pub fn substitute_placeholders(doc: &mut TemplateDocument, map: &PlaceholderMap) -> usize {
    if map.is_empty() {
        return 0;
    }
    let mut replaced = 0;
    for_each_paragraph_mut(doc.body_mut(), &mut |p| {
        replaced += replace_in_paragraph(p, map.entries());
    });
    replaced
}

/// Insert blocks after the anchor paragraph, or append them when there is none
pub fn insert_blocks(doc: &mut TemplateDocument, anchor: Option<usize>, blocks: Vec<XmlElement>) -> Result<()> {
    match anchor {
        Some(index) => doc.insert_after_paragraph(index, blocks),
        None => {
            doc.append(blocks);
            Ok(())
        }
    }
}

/// Counters for one assembled document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblyStats {
    pub tables_inserted: usize,
    pub placeholders_replaced: usize,
}

/// A rendered section waiting to be inserted
struct Placement {
    /// Position of the section in the configuration
    order: usize,
    anchor: Option<usize>,
    tables: usize,
    blocks: Vec<XmlElement>,
}

/// Assembles report documents according to a configuration
pub struct ReportAssembler<'a> {
    config: &'a ReportConfig,
}

impl<'a> ReportAssembler<'a> {
    pub fn new(config: &'a ReportConfig) -> Self {
        Self { config }
    }

    /// Populate `doc` for one sample group
    ///
    /// `dataset` supplies `sheet` and `all_sheets` section sources; `metrics`
    /// supplies `metric` placeholders.
    pub fn assemble(
        &self,
        doc: &mut TemplateDocument,
        group: &SampleGroup,
        dataset: &Dataset,
        metrics: Option<&Dataset>,
    ) -> Result<AssemblyStats> {
        let map = PlaceholderMap::resolve(self.config, group, metrics);
        let placeholders_replaced = substitute_placeholders(doc, &map);
        log::debug!(
            "Sample {}: {} placeholder replacement(s)",
            group.sample_id,
            placeholders_replaced
        );

        let markers = self.config.anchor_markers();
        let anchors = locate_all(doc, &markers);
        let anchor_of = |marker: &str| {
            anchors
                .iter()
                .find(|(m, _)| *m == marker)
                .and_then(|(_, index)| *index)
        };

        let mut anchored = Vec::new();
        let mut appended = Vec::new();
        for (order, section) in self.config.sections.iter().enumerate() {
            let anchor = match section.anchor.as_deref() {
                None => None,
                Some(marker) => match anchor_of(marker) {
                    Some(index) => Some(index),
                    None => {
                        let err = ReportError::AnchorNotFound(marker.to_string());
                        match section.on_missing_anchor {
                            MissingAnchorPolicy::Skip => {
                                log::warn!("{}; skipping section {:?}", err, section.name);
                                continue;
                            }
                            MissingAnchorPolicy::Append => {
                                log::warn!("{}; appending section {:?} at the end", err, section.name);
                                None
                            }
                        }
                    }
                },
            };

            let (blocks, tables) = self.render_section(section, group, dataset)?;
            if blocks.is_empty() {
                continue;
            }
            let placement = Placement {
                order,
                anchor,
                tables,
                blocks,
            };
            if anchor.is_some() {
                anchored.push(placement);
            } else {
                appended.push(placement);
            }
        }

        // Highest paragraph index first so earlier indices stay valid; sections
        // sharing an anchor end up in configuration order.
        anchored.sort_by(|a, b| b.anchor.cmp(&a.anchor).then(b.order.cmp(&a.order)));

        let mut tables_inserted = 0;
        for placement in anchored.into_iter().chain(appended) {
            log::debug!(
                "Inserting {} table(s) {}",
                placement.tables,
                match placement.anchor {
                    Some(index) => format!("after paragraph {}", index),
                    None => "at the end".to_string(),
                }
            );
            tables_inserted += placement.tables;
            insert_blocks(doc, placement.anchor, placement.blocks)?;
        }

        Ok(AssemblyStats {
            tables_inserted,
            placeholders_replaced,
        })
    }

    /// Render the blocks of one section; empty tables are skipped
    fn render_section(
        &self,
        section: &SectionConfig,
        group: &SampleGroup,
        dataset: &Dataset,
    ) -> Result<(Vec<XmlElement>, usize)> {
        let sources: Vec<&Table> = match &section.source {
            TableSource::Sample => vec![&group.records],
            TableSource::Sheet(name) => vec![dataset.table(name).ok_or_else(|| {
                ReportError::FieldNotFound(format!("sheet {:?} in {:?}", name, dataset.source))
            })?],
            TableSource::AllSheets => dataset.tables.iter().collect(),
        };

        let builder = TableBuilder::new(section.table.clone());
        let mut blocks = Vec::new();
        let mut tables = 0;
        for table in sources {
            let grid = TableGrid::from_records(table, &section.columns, section.distinct, |field| {
                self.config.is_percent_field(field)
            })
            .and_then(|grid| builder.build(grid.oriented(section.orientation)));

            let built = match grid {
                Ok(built) => built,
                Err(err @ ReportError::EmptyTable { .. }) => {
                    log::warn!(
                        "Section {:?} (sheet {:?}) for sample {}: {}; skipping",
                        section.name,
                        table.name,
                        group.sample_id,
                        err
                    );
                    continue;
                }
                Err(err) => return Err(err),
            };

            if let Some(caption) = &section.caption {
                blocks.push(plain_paragraph(&caption.replace("{sheet}", &table.name)));
            }
            blocks.push(built.to_xml());
            tables += 1;
        }
        Ok((blocks, tables))
    }
}
