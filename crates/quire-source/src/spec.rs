//! Backend-specific query descriptions.

use quire_types::{BackendKind, CellValue};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Character encodings supported by the tabular-file connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Encoding {
    #[default]
    Utf8,
    Iso8859_1,
    Ascii,
    Utf16,
}

impl Encoding {
    pub fn label(&self) -> &'static str {
        match self {
            Encoding::Utf8 => "utf-8",
            Encoding::Iso8859_1 => "iso-8859-1",
            Encoding::Ascii => "ascii",
            Encoding::Utf16 => "utf-16",
        }
    }
}

/// A half-open row range within a sheet, zero-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeSelector {
    pub first_row: usize,
    /// Exclusive upper bound; `None` reads to the end of the sheet.
    pub last_row: Option<usize>,
}

/// The backend-specific query description, dispatched by backend family.
///
/// SQL parameters are always passed structurally, never concatenated into
/// the query text; the `params` vector is the only channel for caller
/// input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuerySpec {
    Sql {
        text: String,
        #[serde(default)]
        params: Vec<CellValue>,
    },
    DocumentFilter {
        collection: String,
        filter: serde_json::Value,
    },
    FileRange {
        path: PathBuf,
        #[serde(default)]
        sheet: Option<String>,
        #[serde(default)]
        range: Option<RangeSelector>,
        #[serde(default)]
        encoding: Encoding,
    },
}

impl QuerySpec {
    /// Short name of the spec kind, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            QuerySpec::Sql { .. } => "sql",
            QuerySpec::DocumentFilter { .. } => "document_filter",
            QuerySpec::FileRange { .. } => "file_range",
        }
    }

    /// The backend family this spec is addressed to.
    pub fn backend_kind(&self) -> BackendKind {
        match self {
            QuerySpec::Sql { .. } => BackendKind::Relational,
            QuerySpec::DocumentFilter { .. } => BackendKind::Document,
            QuerySpec::FileRange { .. } => BackendKind::TabularFile,
        }
    }
}
