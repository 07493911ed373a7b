//! Foundation types for the quire report pipeline.
//!
//! This crate defines the canonical tabular model shared by every pipeline
//! stage, along with the immutable descriptors that flow between stages:
//!
//! - [`CellValue`] / [`ColumnType`]: the typed cell model
//! - [`RowSet`]: the backend-agnostic tabular result
//! - [`Artifact`]: the rendered, deliverable byte payload
//! - [`ConnectionProfile`] / [`CredentialsRef`]: backend identity

pub mod artifact;
pub mod profile;
pub mod rowset;
pub mod value;

pub use artifact::Artifact;
pub use profile::{BackendKind, ConnectionProfile, CredentialsRef, PoolBounds};
pub use rowset::{Column, RowSet, RowSetError};
pub use value::{CellValue, ColumnType};
