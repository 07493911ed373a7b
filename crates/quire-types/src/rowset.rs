//! The canonical in-memory tabular result.

use crate::value::{CellValue, ColumnType};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when constructing or extending a [`RowSet`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RowSetError {
    #[error("row has {actual} cells but the row set has {expected} columns")]
    ArityMismatch { expected: usize, actual: usize },

    #[error("cell in column '{column}' has type {actual}, expected {expected}")]
    TypeMismatch {
        column: String,
        expected: ColumnType,
        actual: ColumnType,
    },

    #[error("duplicate column name '{0}'")]
    DuplicateColumn(String),
}

/// One column of a [`RowSet`]: a canonical name plus the type every
/// non-null cell in the column carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// An ordered sequence of rows over a fixed column set.
///
/// Invariants, enforced at construction time:
/// - every row has exactly one cell per column, in column order;
/// - every non-null cell matches its column's type;
/// - column names are unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowSet {
    columns: Vec<Column>,
    rows: Vec<Vec<CellValue>>,
}

impl RowSet {
    /// Create an empty row set over the given columns.
    pub fn new(columns: Vec<Column>) -> Result<Self, RowSetError> {
        for (i, col) in columns.iter().enumerate() {
            if columns[..i].iter().any(|c| c.name == col.name) {
                return Err(RowSetError::DuplicateColumn(col.name.clone()));
            }
        }
        Ok(Self {
            columns,
            rows: Vec::new(),
        })
    }

    /// Append a row, validating arity and per-column cell types.
    pub fn push_row(&mut self, row: Vec<CellValue>) -> Result<(), RowSetError> {
        if row.len() != self.columns.len() {
            return Err(RowSetError::ArityMismatch {
                expected: self.columns.len(),
                actual: row.len(),
            });
        }
        for (cell, col) in row.iter().zip(&self.columns) {
            if let Some(actual) = cell.column_type()
                && actual != col.ty
            {
                return Err(RowSetError::TypeMismatch {
                    column: col.name.clone(),
                    expected: col.ty,
                    actual,
                });
            }
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Index of a column by its canonical name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    /// Cell lookup by row index and column name.
    pub fn get(&self, row: usize, column: &str) -> Option<&CellValue> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
