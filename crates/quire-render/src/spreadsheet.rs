//! The spreadsheet renderer.

use crate::{OutputFormat, RenderError, Renderer};
use itertools::Itertools;
use log::debug;
use quire_template::RenderModel;
use quire_types::{Artifact, CellValue, RowSet};

/// Renders a model's table bindings into a delimited workbook.
///
/// Scalar values come first as `name,value` pairs, then one sheet per
/// table binding. Sheets are announced with a `# sheet:` line when the
/// model carries more than one table. Cell formatting is out of scope;
/// values are emitted in their canonical textual form.
pub struct SpreadsheetRenderer {
    document_name: String,
}

impl SpreadsheetRenderer {
    pub fn new(document_name: impl Into<String>) -> Self {
        Self {
            document_name: document_name.into(),
        }
    }

    fn write_table(
        out: &mut String,
        name: &str,
        rows: &RowSet,
        announce: bool,
    ) -> Result<(), RenderError> {
        if announce {
            out.push_str(&format!("# sheet: {name}\n"));
        }
        out.push_str(&rows.column_names().map(escape).join(","));
        out.push('\n');
        for (i, row) in rows.rows().iter().enumerate() {
            let line: Result<Vec<String>, RenderError> = row
                .iter()
                .zip(rows.columns())
                .map(|(cell, col)| {
                    cell_text(cell).ok_or_else(|| RenderError::Value {
                        subject: format!("cell {name}[{i}].{}", col.name),
                        cause: "non-finite float".to_string(),
                    })
                })
                .collect();
            out.push_str(&line?.join(","));
            out.push('\n');
        }
        Ok(())
    }
}

impl Renderer for SpreadsheetRenderer {
    fn format(&self) -> OutputFormat {
        OutputFormat::Spreadsheet
    }

    fn render(&self, model: &RenderModel) -> Result<Artifact, RenderError> {
        let mut out = String::new();
        for (name, value) in model.values() {
            let text = cell_text(value).ok_or_else(|| RenderError::Value {
                subject: format!("placeholder {name}"),
                cause: "non-finite float".to_string(),
            })?;
            out.push_str(&format!("{},{}\n", escape(name), text));
        }
        if !model.values().is_empty() && !model.tables().is_empty() {
            out.push('\n');
        }
        let announce = model.tables().len() > 1;
        for (name, rows) in model.tables() {
            Self::write_table(&mut out, name, rows, announce)?;
        }
        debug!(
            "[RENDER] Spreadsheet '{}': {} bytes",
            self.document_name,
            out.len()
        );
        Ok(Artifact::new(
            out.into_bytes(),
            self.format().content_type(),
            format!("{}.{}", self.document_name, self.format().extension()),
        ))
    }

    fn name(&self) -> &'static str {
        "SpreadsheetRenderer"
    }
}

/// Textual form of a cell, or `None` for values the format cannot carry.
fn cell_text(cell: &CellValue) -> Option<String> {
    match cell {
        CellValue::Float(f) if !f.is_finite() => None,
        other => Some(escape(&other.to_string())),
    }
}

/// Quote a field when it contains the delimiter, quotes or line breaks.
fn escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
