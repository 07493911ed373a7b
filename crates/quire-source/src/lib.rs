//! Source abstraction: uniform access to heterogeneous data backends.
//!
//! The pieces fit together like this:
//!
//! - [`QuerySpec`] is the backend-specific query description (SQL text with
//!   bound parameters, a document filter, or a file range selector).
//! - [`SourceBackend`] / [`Session`] are the consumed capability traits a
//!   driver adapter implements (connect / execute / probe / close).
//! - [`SourceConnector`] is the per-family dispatch layer: it validates a
//!   spec against the backend family and executes it through a session,
//!   returning a bounded [`ChunkStream`].
//! - [`MemoryBackend`] is the always-available reference implementation,
//!   used in tests and for embedding pre-loaded datasets.
//!
//! Connectors never retry; retry policy belongs to the orchestrating
//! caller. Results stream in bounded chunks so large result sets never
//! materialize wholesale.

pub mod backend;
pub mod chunk;
pub mod connector;
pub mod memory;
pub mod spec;

pub use backend::{Session, SessionConnector, SourceBackend};
pub use chunk::{ChunkStream, RawChunk, RawValue, MAX_CHUNK_ROWS};
pub use connector::SourceConnector;
pub use memory::MemoryBackend;
pub use spec::{Encoding, QuerySpec, RangeSelector};

use quire_types::BackendKind;
use thiserror::Error;

/// A failure while connecting to or querying one backend.
#[derive(Error, Debug)]
#[error("{backend} source error: {cause}")]
pub struct SourceError {
    pub backend: BackendKind,
    #[source]
    pub cause: SourceCause,
}

impl SourceError {
    pub fn new(backend: BackendKind, cause: SourceCause) -> Self {
        Self { backend, cause }
    }
}

/// The underlying cause of a [`SourceError`].
#[derive(Error, Debug)]
pub enum SourceCause {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("query execution failed: {0}")]
    Execute(String),

    #[error("query spec '{spec}' does not match the {expected} connector")]
    SpecMismatch {
        spec: &'static str,
        expected: BackendKind,
    },

    #[error("invalid query spec: {0}")]
    InvalidSpec(String),
}
