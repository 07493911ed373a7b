//! Renderers: converting a resolved [`RenderModel`] into a deliverable
//! [`Artifact`].
//!
//! One implementation per output format, all satisfying [`Renderer`]:
//!
//! - [`DocumentRenderer`]: paginated plain-text document, substituting the
//!   model into its template markup;
//! - [`SpreadsheetRenderer`]: delimited workbook built from the model's
//!   table bindings.
//!
//! Determinism is part of the contract: rendering the same model twice
//! yields byte-identical artifacts. Renderers never read a clock; any
//! timestamp in the output must arrive through the model.

mod document;
mod spreadsheet;

pub use document::DocumentRenderer;
pub use spreadsheet::SpreadsheetRenderer;

use quire_template::RenderModel;
use quire_types::Artifact;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Rendering failures. No artifact exists once an error is returned.
#[derive(Error, Debug)]
pub enum RenderError {
    /// A placeholder or cell holds a value the format cannot represent.
    #[error("cannot render {subject}: {cause}")]
    Value { subject: String, cause: String },

    #[error("template substitution failed: {0}")]
    Template(#[from] handlebars::RenderError),
}

/// The output formats the pipeline can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    PaginatedDocument,
    Spreadsheet,
}

impl OutputFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::PaginatedDocument => "text/plain; charset=utf-8",
            OutputFormat::Spreadsheet => "text/csv; charset=utf-8",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::PaginatedDocument => "txt",
            OutputFormat::Spreadsheet => "csv",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::PaginatedDocument => write!(f, "paginated-document"),
            OutputFormat::Spreadsheet => write!(f, "spreadsheet"),
        }
    }
}

/// A trait for document renderers, one implementation per output format.
pub trait Renderer: Send + Sync {
    /// The format this renderer emits.
    fn format(&self) -> OutputFormat;

    /// Convert a model into an artifact.
    ///
    /// Must be deterministic: identical models produce byte-identical
    /// artifacts.
    fn render(&self, model: &RenderModel) -> Result<Artifact, RenderError>;

    /// Human-readable name for logging.
    fn name(&self) -> &'static str;
}
