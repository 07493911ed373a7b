//! Binding resolution and the render model.

use crate::{Template, TemplateError};
use log::debug;
use quire_types::{CellValue, RowSet};
use std::collections::BTreeMap;
use std::fmt;

/// The data offered to a template: scalar values and named row sets for
/// repeated sections.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    scalars: BTreeMap<String, CellValue>,
    tables: BTreeMap<String, RowSet>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scalar(mut self, name: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.scalars.insert(name.into(), value.into());
        self
    }

    pub fn table(mut self, name: impl Into<String>, rows: RowSet) -> Self {
        self.tables.insert(name.into(), rows);
        self
    }
}

/// A non-fatal finding recorded during resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateWarning {
    /// A binding was provided that no placeholder references.
    UnusedBinding { name: String },
}

impl fmt::Display for TemplateWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateWarning::UnusedBinding { name } => {
                write!(f, "binding '{name}' is not referenced by the template")
            }
        }
    }
}

/// The placeholder-to-value mapping plus repeated-row table bindings,
/// ready for exactly one renderer invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderModel {
    template_text: String,
    values: BTreeMap<String, CellValue>,
    tables: BTreeMap<String, RowSet>,
}

impl RenderModel {
    pub fn template_text(&self) -> &str {
        &self.template_text
    }

    pub fn values(&self) -> &BTreeMap<String, CellValue> {
        &self.values
    }

    pub fn tables(&self) -> &BTreeMap<String, RowSet> {
        &self.tables
    }

    /// Flatten the model into the JSON object a substitution engine binds
    /// against: scalars as values, tables as arrays of row objects.
    pub fn to_binding_json(&self) -> serde_json::Value {
        let mut root = serde_json::Map::new();
        for (name, value) in &self.values {
            root.insert(name.clone(), value.to_json());
        }
        for (name, rows) in &self.tables {
            let array: Vec<serde_json::Value> = rows
                .rows()
                .iter()
                .map(|row| {
                    let mut obj = serde_json::Map::new();
                    for (col, cell) in rows.columns().iter().zip(row) {
                        obj.insert(col.name.clone(), cell.to_json());
                    }
                    serde_json::Value::Object(obj)
                })
                .collect();
            root.insert(name.clone(), serde_json::Value::Array(array));
        }
        serde_json::Value::Object(root)
    }
}

/// A successful resolution: the model plus any warnings.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub model: RenderModel,
    pub warnings: Vec<TemplateWarning>,
}

pub(crate) fn resolve(
    template: &Template,
    bindings: &Bindings,
) -> Result<Resolved, TemplateError> {
    let mut values = BTreeMap::new();
    let mut tables = BTreeMap::new();

    // Validate every placeholder before building anything user-visible;
    // resolution either fully succeeds or returns no model at all.
    for slot in template.placeholders() {
        if slot.repeated {
            match bindings.tables.get(&slot.name) {
                Some(rows) => {
                    tables.insert(slot.name.clone(), rows.clone());
                }
                None if bindings.scalars.contains_key(&slot.name) => {
                    return Err(TemplateError::KindMismatch {
                        name: slot.name.clone(),
                        expected: "row set",
                    });
                }
                None if slot.required => {
                    return Err(TemplateError::MissingBinding {
                        name: slot.name.clone(),
                    });
                }
                // An optional section with no binding renders zero rows.
                None => {}
            }
        } else {
            match bindings.scalars.get(&slot.name) {
                Some(value) => {
                    values.insert(slot.name.clone(), value.clone());
                }
                None if bindings.tables.contains_key(&slot.name) => {
                    return Err(TemplateError::KindMismatch {
                        name: slot.name.clone(),
                        expected: "scalar",
                    });
                }
                None => match (&slot.default, slot.required) {
                    (Some(default), _) => {
                        values.insert(slot.name.clone(), default.clone());
                    }
                    (None, true) => {
                        return Err(TemplateError::MissingBinding {
                            name: slot.name.clone(),
                        });
                    }
                    (None, false) => {
                        values.insert(slot.name.clone(), CellValue::Null);
                    }
                },
            }
        }
    }

    let warnings: Vec<TemplateWarning> = bindings
        .scalars
        .keys()
        .chain(bindings.tables.keys())
        .filter(|name| template.placeholder(name).is_none())
        .map(|name| TemplateWarning::UnusedBinding { name: name.clone() })
        .collect();
    if !warnings.is_empty() {
        debug!("[TEMPLATE] {} unused binding(s) ignored", warnings.len());
    }

    Ok(Resolved {
        model: RenderModel {
            template_text: template.text().to_string(),
            values,
            tables,
        },
        warnings,
    })
}
