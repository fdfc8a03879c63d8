//! Table builder
//!
//! Turns a slice of a dataset into a grid of display strings and renders the
//! grid as a WordprocessingML table (`w:tbl`).

use crate::config::{ColumnSpec, Orientation, TableOptions};
use crate::docx::wordml::{paragraph, ParagraphFormat, RunFormat};
use crate::docx::XmlElement;
use crate::types::{ReportError, Result, Table, Value};

/// Total table width in twentieths of a point (6 inch text column)
const TABLE_WIDTH_TWIPS: u32 = 8640;

/// A grid of display strings, optionally with a header row
#[derive(Debug, Clone, PartialEq)]
pub struct TableGrid {
    /// Rows of cells; all rows have the same length
    pub cells: Vec<Vec<String>>,
    /// Row 0 is a header row
    pub header: bool,
}

impl TableGrid {
    /// Create a grid, padding short rows with empty cells
    pub fn new(mut cells: Vec<Vec<String>>, header: bool) -> Self {
        let width = cells.iter().map(|r| r.len()).max().unwrap_or(0);
        for row in cells.iter_mut() {
            row.resize(width, String::new());
        }
        Self { cells, header }
    }

    /// Build a grid from table records
    ///
    /// `columns` selects and labels the fields (every column of `table` when
    /// empty). The header row holds the labels. Fields accepted by
    /// `is_percent` render as percentages. With `distinct`, repeated rows
    /// are dropped after rendering, keeping the first occurrence.
    pub fn from_records<F>(table: &Table, columns: &[ColumnSpec], distinct: bool, is_percent: F) -> Result<Self>
    where
        F: Fn(&str) -> bool,
    {
        // every column by position, so repeated names keep their own values
        let (columns, indices): (Vec<ColumnSpec>, Vec<usize>) = if columns.is_empty() {
            table.columns.iter().enumerate().map(|(i, c)| (ColumnSpec::new(c), i)).unzip()
        } else {
            let mut indices = Vec::with_capacity(columns.len());
            for column in columns {
                let index = table.column_index(&column.field).ok_or_else(|| {
                    ReportError::FieldNotFound(format!("{} in sheet {:?}", column.field, table.name))
                })?;
                indices.push(index);
            }
            (columns.to_vec(), indices)
        };

        if table.is_empty() || columns.is_empty() {
            return Err(ReportError::EmptyTable {
                rows: table.num_rows(),
                columns: columns.len(),
            });
        }

        let mut cells: Vec<Vec<String>> = vec![columns.iter().map(|c| c.label().to_string()).collect()];
        for row in &table.rows {
            let rendered: Vec<String> = columns
                .iter()
                .zip(&indices)
                .map(|(column, &index)| render_value(&row[index], is_percent(column.field.as_str())))
                .collect();
            if distinct && cells[1..].contains(&rendered) {
                continue;
            }
            cells.push(rendered);
        }

        Ok(Self { cells, header: true })
    }

    pub fn num_rows(&self) -> usize {
        self.cells.len()
    }

    pub fn num_columns(&self) -> usize {
        self.cells.first().map(|r| r.len()).unwrap_or(0)
    }

    /// Rows below the header
    pub fn data_rows(&self) -> usize {
        self.num_rows().saturating_sub(self.header as usize)
    }

    /// Fields as rows: the header becomes the first column
    pub fn transpose(&self) -> Self {
        let cells = (0..self.num_columns())
            .map(|col| self.cells.iter().map(|row| row[col].clone()).collect())
            .collect();
        Self { cells, header: false }
    }

    /// Apply an orientation
    pub fn oriented(self, orientation: Orientation) -> Self {
        match orientation {
            Orientation::Records => self,
            Orientation::Transposed => self.transpose(),
        }
    }
}

/// Render a value for display
///
/// Percentage fields are ratios: multiplied by 100 and rounded to 2 decimals
/// (`0.1234` -> `12.34`). Non-numeric values are left unchanged.
pub fn render_value(value: &Value, percent: bool) -> String {
    if percent {
        if let Some(ratio) = value.as_f64() {
            return format_percent(ratio);
        }
    }
    value.to_string()
}

/// Format a ratio as a percentage with at most 2 decimals
pub fn format_percent(ratio: f64) -> String {
    let percent = (ratio * 100.0 * 100.0).round() / 100.0;
    format!("{}", percent)
}

/// Builds rendered tables with fixed formatting options
#[derive(Debug, Clone)]
pub struct TableBuilder {
    options: TableOptions,
}

impl TableBuilder {
    pub fn new(options: TableOptions) -> Self {
        Self { options }
    }

    /// Validate a grid and attach the formatting
    pub fn build(&self, grid: TableGrid) -> Result<BuiltTable> {
        if grid.data_rows() == 0 || grid.num_columns() == 0 {
            return Err(ReportError::EmptyTable {
                rows: grid.data_rows(),
                columns: grid.num_columns(),
            });
        }
        Ok(BuiltTable {
            grid,
            options: self.options.clone(),
        })
    }
}

/// A validated grid ready to be rendered
#[derive(Debug, Clone)]
pub struct BuiltTable {
    grid: TableGrid,
    options: TableOptions,
}

impl BuiltTable {
    pub fn num_rows(&self) -> usize {
        self.grid.num_rows()
    }

    pub fn num_columns(&self) -> usize {
        self.grid.num_columns()
    }

    pub fn grid(&self) -> &TableGrid {
        &self.grid
    }

    /// Whether the cells of `row` are rendered bold
    pub fn is_bold(&self, row: usize) -> bool {
        row == 0 && self.grid.header && self.options.bold_header
    }

    /// Render as a `w:tbl` element
    pub fn to_xml(&self) -> XmlElement {
        let columns = self.num_columns() as u32;
        let col_width = TABLE_WIDTH_TWIPS / columns.max(1);
        let size = (self.options.font_size * 2.0).round() as u32;
        let layout = if self.options.autofit { "autofit" } else { "fixed" };

        let mut tbl_pr = XmlElement::new("w:tblPr")
            .with_child(XmlElement::new("w:tblStyle").with_attr("w:val", self.options.style_id.as_str()));
        tbl_pr = if self.options.autofit {
            tbl_pr.with_child(XmlElement::new("w:tblW").with_attr("w:w", "0").with_attr("w:type", "auto"))
        } else {
            tbl_pr.with_child(
                XmlElement::new("w:tblW")
                    .with_attr("w:w", (col_width * columns).to_string())
                    .with_attr("w:type", "dxa"),
            )
        };
        tbl_pr = tbl_pr
            .with_child(XmlElement::new("w:tblLayout").with_attr("w:type", layout))
            .with_child(
                XmlElement::new("w:tblLook")
                    .with_attr("w:val", "04A0")
                    .with_attr("w:firstRow", if self.grid.header { "1" } else { "0" })
                    .with_attr("w:firstColumn", "0"),
            );

        let mut tbl_grid = XmlElement::new("w:tblGrid");
        for _ in 0..columns {
            tbl_grid = tbl_grid.with_child(XmlElement::new("w:gridCol").with_attr("w:w", col_width.to_string()));
        }

        let mut tbl = XmlElement::new("w:tbl").with_child(tbl_pr).with_child(tbl_grid);
        for (r, row) in self.grid.cells.iter().enumerate() {
            let format = RunFormat {
                bold: self.is_bold(r),
                size_half_points: Some(size),
            };
            let para = ParagraphFormat {
                center: self.options.align_center,
            };

            let mut tr = XmlElement::new("w:tr");
            if r == 0 && self.grid.header {
                tr = tr.with_child(XmlElement::new("w:trPr").with_child(XmlElement::new("w:tblHeader")));
            }
            for cell in row {
                let tc_pr = XmlElement::new("w:tcPr").with_child(
                    XmlElement::new("w:tcW")
                        .with_attr("w:w", col_width.to_string())
                        .with_attr("w:type", "dxa"),
                );
                let tc = XmlElement::new("w:tc")
                    .with_child(tc_pr)
                    .with_child(paragraph(cell, para, format));
                tr = tr.with_child(tc);
            }
            tbl = tbl.with_child(tr);
        }
        tbl
    }
}
