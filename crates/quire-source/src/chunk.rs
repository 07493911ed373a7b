//! Chunked row streaming.
//!
//! Backends return rows in chunks; [`ChunkStream`] is the lazy, finite,
//! non-restartable pull sequence consumers drain until exhaustion.
//! Re-iterating requires re-issuing the query.

use crate::SourceError;
use chrono::{DateTime, Utc};

/// Rows per chunk the connectors guarantee as an upper bound.
///
/// Backends may emit smaller chunks; oversized ones are split by the
/// connector before reaching the normalizer.
pub const MAX_CHUNK_ROWS: usize = 1024;

/// A backend-native value, prior to normalization.
///
/// This is deliberately looser than the canonical cell model: it keeps
/// backend representations (decimal strings, absent fields) that the
/// normalizer folds into canonical types.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
    /// A backend-native exact decimal, carried as its textual form.
    Decimal(String),
    /// An explicit null value.
    Null,
    /// A field missing from the record entirely (document stores).
    Absent,
}

/// One chunk of raw rows sharing a column header.
#[derive(Debug, Clone, PartialEq)]
pub struct RawChunk {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<RawValue>>,
}

impl RawChunk {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<RawValue>>) -> Self {
        Self { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A lazy, finite, non-restartable sequence of row chunks.
pub struct ChunkStream {
    inner: Box<dyn Iterator<Item = Result<RawChunk, SourceError>> + Send>,
}

impl std::fmt::Debug for ChunkStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkStream").finish_non_exhaustive()
    }
}

impl ChunkStream {
    pub fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = Result<RawChunk, SourceError>>,
        I::IntoIter: Send + 'static,
    {
        Self {
            inner: Box::new(iter.into_iter()),
        }
    }

    /// A stream over pre-materialized chunks (memory backend, tests).
    pub fn from_chunks(chunks: Vec<RawChunk>) -> Self {
        Self::from_iter(chunks.into_iter().map(Ok))
    }

    pub fn empty() -> Self {
        Self::from_chunks(Vec::new())
    }

    /// Enforce the chunk-size bound by splitting oversized chunks.
    pub fn bounded(self, max_rows: usize) -> Self {
        let inner = self.inner.flat_map(move |item| match item {
            Ok(chunk) if chunk.rows.len() > max_rows => {
                let columns = chunk.columns;
                let mut rows = chunk.rows;
                let mut pieces = Vec::with_capacity(rows.len().div_ceil(max_rows));
                while !rows.is_empty() {
                    let tail = rows.split_off(rows.len().min(max_rows));
                    pieces.push(Ok(RawChunk::new(columns.clone(), rows)));
                    rows = tail;
                }
                pieces
            }
            other => vec![other],
        });
        Self {
            inner: Box::new(inner),
        }
    }
}

impl Iterator for ChunkStream {
    type Item = Result<RawChunk, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk_of(n: usize) -> RawChunk {
        RawChunk::new(
            vec!["id".into()],
            (0..n).map(|i| vec![RawValue::Integer(i as i64)]).collect(),
        )
    }

    #[test]
    fn test_stream_drains_in_order() {
        let mut stream = ChunkStream::from_chunks(vec![chunk_of(2), chunk_of(3)]);
        assert_eq!(stream.next().unwrap().unwrap().rows.len(), 2);
        assert_eq!(stream.next().unwrap().unwrap().rows.len(), 3);
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_bounded_splits_oversized_chunks() {
        let stream = ChunkStream::from_chunks(vec![chunk_of(10)]).bounded(4);
        let sizes: Vec<usize> = stream.map(|c| c.unwrap().rows.len()).collect();
        assert_eq!(sizes, vec![4, 4, 2]);
    }

    #[test]
    fn test_bounded_preserves_row_order() {
        let stream = ChunkStream::from_chunks(vec![chunk_of(5)]).bounded(2);
        let ids: Vec<i64> = stream
            .flat_map(|c| c.unwrap().rows)
            .map(|row| match &row[0] {
                RawValue::Integer(i) => *i,
                other => panic!("unexpected value: {other:?}"),
            })
            .collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_bounded_keeps_small_chunks_intact() {
        let stream = ChunkStream::from_chunks(vec![chunk_of(3)]).bounded(8);
        let sizes: Vec<usize> = stream.map(|c| c.unwrap().rows.len()).collect();
        assert_eq!(sizes, vec![3]);
    }

    #[test]
    fn test_empty_stream() {
        let mut stream = ChunkStream::empty();
        assert!(stream.next().is_none());
    }
}
