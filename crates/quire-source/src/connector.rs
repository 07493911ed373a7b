//! Per-family connector dispatch.
//!
//! One connector variant per backend family, all satisfying the same
//! `fetch(spec, session) -> ChunkStream` contract. The connector validates
//! the spec against its family, then executes through the opaque session.
//! It never retries.

use crate::{ChunkStream, QuerySpec, Session, SourceCause, SourceError, MAX_CHUNK_ROWS};
use log::debug;
use quire_types::BackendKind;

/// Connector for relational backends (SQL text plus bound parameters).
#[derive(Debug, Default, Clone, Copy)]
pub struct RelationalConnector;

/// Connector for document stores (filter expressions).
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentConnector;

/// Connector for tabular files (path plus sheet/range selector).
#[derive(Debug, Default, Clone, Copy)]
pub struct FileConnector;

/// The per-family source connector, dispatched by backend kind.
#[derive(Debug, Clone, Copy)]
pub enum SourceConnector {
    Relational(RelationalConnector),
    Document(DocumentConnector),
    TabularFile(FileConnector),
}

impl SourceConnector {
    /// The connector variant serving a backend family.
    pub fn for_kind(kind: BackendKind) -> Self {
        match kind {
            BackendKind::Relational => SourceConnector::Relational(RelationalConnector),
            BackendKind::Document => SourceConnector::Document(DocumentConnector),
            BackendKind::TabularFile => SourceConnector::TabularFile(FileConnector),
        }
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            SourceConnector::Relational(_) => BackendKind::Relational,
            SourceConnector::Document(_) => BackendKind::Document,
            SourceConnector::TabularFile(_) => BackendKind::TabularFile,
        }
    }

    /// Validate the spec against this connector's family and execute it.
    ///
    /// The returned stream is capped at [`MAX_CHUNK_ROWS`] rows per chunk.
    pub fn fetch(
        &self,
        spec: &QuerySpec,
        session: &mut dyn Session,
    ) -> Result<ChunkStream, SourceError> {
        self.validate(spec)?;
        debug!(
            "[SOURCE] Executing {} spec through {} connector",
            spec.kind_name(),
            self.kind()
        );
        Ok(session.execute(spec)?.bounded(MAX_CHUNK_ROWS))
    }

    fn validate(&self, spec: &QuerySpec) -> Result<(), SourceError> {
        let kind = self.kind();
        if spec.backend_kind() != kind {
            return Err(SourceError::new(
                kind,
                SourceCause::SpecMismatch {
                    spec: spec.kind_name(),
                    expected: kind,
                },
            ));
        }
        let invalid = |msg: &str| {
            Err(SourceError::new(kind, SourceCause::InvalidSpec(msg.into())))
        };
        match spec {
            QuerySpec::Sql { text, .. } if text.trim().is_empty() => {
                invalid("query text is empty")
            }
            QuerySpec::DocumentFilter { collection, .. } if collection.trim().is_empty() => {
                invalid("collection name is empty")
            }
            QuerySpec::FileRange { path, .. } if path.as_os_str().is_empty() => {
                invalid("file path is empty")
            }
            QuerySpec::FileRange {
                range: Some(range), ..
            } if range.last_row.is_some_and(|last| last < range.first_row) => {
                invalid("range upper bound precedes its first row")
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;
    use crate::spec::RangeSelector;
    use crate::{RawChunk, RawValue, SourceBackend};
    use quire_types::{ConnectionProfile, CredentialsRef, PoolBounds};
    use serde_json::json;

    fn profile(kind: BackendKind) -> ConnectionProfile {
        ConnectionProfile {
            id: "test".into(),
            backend: kind,
            host: "localhost".into(),
            port: 0,
            database: None,
            credentials: CredentialsRef::new("none"),
            pool: PoolBounds::default(),
        }
    }

    fn sql(text: &str) -> QuerySpec {
        QuerySpec::Sql {
            text: text.into(),
            params: vec![],
        }
    }

    #[test]
    fn test_fetch_streams_registered_dataset() {
        let backend = MemoryBackend::new(BackendKind::Relational).with_dataset(
            "select id from t",
            vec![RawChunk::new(
                vec!["id".into()],
                vec![vec![RawValue::Integer(7)]],
            )],
        );
        let mut session = backend.connect(&profile(BackendKind::Relational)).unwrap();
        let connector = SourceConnector::for_kind(BackendKind::Relational);

        let chunks: Vec<_> = connector
            .fetch(&sql("select id from t"), session.as_mut())
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].rows[0][0], RawValue::Integer(7));
    }

    #[test]
    fn test_spec_mismatch_rejected() {
        let backend = MemoryBackend::new(BackendKind::Document);
        let mut session = backend.connect(&profile(BackendKind::Document)).unwrap();
        let connector = SourceConnector::for_kind(BackendKind::Document);

        let err = connector.fetch(&sql("select 1"), session.as_mut()).unwrap_err();
        assert!(matches!(err.cause, SourceCause::SpecMismatch { spec: "sql", .. }));
        assert_eq!(err.backend, BackendKind::Document);
    }

    #[test]
    fn test_empty_sql_text_rejected() {
        let backend = MemoryBackend::new(BackendKind::Relational);
        let mut session = backend.connect(&profile(BackendKind::Relational)).unwrap();
        let connector = SourceConnector::for_kind(BackendKind::Relational);

        let err = connector.fetch(&sql("   "), session.as_mut()).unwrap_err();
        assert!(matches!(err.cause, SourceCause::InvalidSpec(_)));
    }

    #[test]
    fn test_inverted_file_range_rejected() {
        let backend = MemoryBackend::new(BackendKind::TabularFile);
        let mut session = backend.connect(&profile(BackendKind::TabularFile)).unwrap();
        let connector = SourceConnector::for_kind(BackendKind::TabularFile);

        let spec = QuerySpec::FileRange {
            path: "data.xlsx".into(),
            sheet: None,
            range: Some(RangeSelector {
                first_row: 10,
                last_row: Some(2),
            }),
            encoding: Default::default(),
        };
        let err = connector.fetch(&spec, session.as_mut()).unwrap_err();
        assert!(matches!(err.cause, SourceCause::InvalidSpec(_)));
    }

    #[test]
    fn test_document_filter_accepted() {
        let backend = MemoryBackend::new(BackendKind::Document).with_dataset(
            "orders",
            vec![RawChunk::new(vec!["status".into()], vec![])],
        );
        let mut session = backend.connect(&profile(BackendKind::Document)).unwrap();
        let connector = SourceConnector::for_kind(BackendKind::Document);

        let spec = QuerySpec::DocumentFilter {
            collection: "orders".into(),
            filter: json!({"status": "open"}),
        };
        let chunks: Vec<_> = connector
            .fetch(&spec, session.as_mut())
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(chunks.len(), 1);
    }
}
