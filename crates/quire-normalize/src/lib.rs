//! Data normalization: heterogeneous backend results into one canonical
//! tabular representation.
//!
//! [`Normalizer::normalize`] consumes a chunk stream incrementally and
//! produces a [`RowSet`](quire_types::RowSet) with:
//!
//! - canonical column names (trimmed, lowercased, whitespace collapsed,
//!   duplicates disambiguated by suffixing);
//! - one canonical type per column, with integer-to-float widening and
//!   hint-driven parsing of textual timestamps and numbers;
//! - a single null representation (absent field and explicit null fold
//!   into the same null cell).
//!
//! Strictness is a policy choice: [`Strictness::Strict`] fails on the
//! first value that cannot be coerced to the column's type;
//! [`Strictness::Lenient`] demotes the column to text and records a
//! [`NormalizeWarning`]. Normalization is idempotent: feeding a
//! normalized row set back through changes nothing.

mod columns;
mod normalizer;

pub use columns::canonical_column_names;
pub use normalizer::{rowset_to_chunks, Normalized, Normalizer};

use quire_source::SourceError;
use quire_types::ColumnType;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Coercion policy when a column's values disagree on a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strictness {
    /// Fail on the first non-coercible value.
    #[default]
    Strict,
    /// Demote the column to text, stringify its values and continue.
    Lenient,
}

/// Options controlling one normalization run.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizeOptions {
    pub strictness: Strictness,
}

/// Caller-provided column types, keyed by canonical column name.
///
/// A hinted column's type is fixed: textual values are parsed into it
/// instead of inferring from the data.
#[derive(Debug, Clone, Default)]
pub struct SchemaHint {
    columns: HashMap<String, ColumnType>,
}

impl SchemaHint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_column(mut self, name: impl Into<String>, ty: ColumnType) -> Self {
        self.columns.insert(name.into(), ty);
        self
    }

    pub fn get(&self, canonical_name: &str) -> Option<ColumnType> {
        self.columns.get(canonical_name).copied()
    }
}

/// Failure to normalize a chunk stream into a consistent row set.
#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("column '{column}' row {row}: cannot coerce {found} into {expected}")]
    TypeConflict {
        column: String,
        row: usize,
        expected: ColumnType,
        found: String,
    },

    #[error("column header changed mid-stream: expected [{expected}], got [{got}]")]
    HeaderMismatch { expected: String, got: String },

    #[error("row {row} has {actual} cells but the header has {expected} columns")]
    RowArity {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("the chunk stream produced no header")]
    EmptyStream,

    #[error("internal row set error: {0}")]
    RowSet(#[from] quire_types::RowSetError),
}

/// A non-fatal finding recorded during normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizeWarning {
    /// Lenient mode demoted a column to text after a type conflict.
    ColumnDemoted { column: String, first_conflict_row: usize },
}

impl fmt::Display for NormalizeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizeWarning::ColumnDemoted {
                column,
                first_conflict_row,
            } => write!(
                f,
                "column '{column}' demoted to text (first conflict at row {first_conflict_row})"
            ),
        }
    }
}
