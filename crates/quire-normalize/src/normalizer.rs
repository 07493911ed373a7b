//! The normalization engine.

use crate::columns::canonical_column_names;
use crate::{NormalizeError, NormalizeOptions, NormalizeWarning, SchemaHint, Strictness};
use chrono::{DateTime, Utc};
use itertools::Itertools;
use log::debug;
use quire_source::{ChunkStream, RawChunk, RawValue};
use quire_types::{CellValue, Column, ColumnType, RowSet};

/// The outcome of one normalization run: the canonical row set plus any
/// non-fatal findings.
#[derive(Debug)]
pub struct Normalized {
    pub row_set: RowSet,
    pub warnings: Vec<NormalizeWarning>,
}

/// Converts chunked backend results into canonical [`RowSet`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer {
    options: NormalizeOptions,
}

struct ColState {
    name: String,
    ty: Option<ColumnType>,
    hinted: bool,
    demoted: bool,
}

impl Normalizer {
    pub fn new(options: NormalizeOptions) -> Self {
        Self { options }
    }

    /// Consume a chunk stream and produce a canonical row set.
    ///
    /// Chunks are processed incrementally; only the accumulating output
    /// rows are held in memory. The stream must carry at least one chunk
    /// (backends emit a header chunk even for empty results).
    pub fn normalize(
        &self,
        chunks: ChunkStream,
        hint: Option<&SchemaHint>,
    ) -> Result<Normalized, NormalizeError> {
        let mut header: Option<Vec<String>> = None;
        let mut states: Vec<ColState> = Vec::new();
        let mut rows: Vec<Vec<CellValue>> = Vec::new();
        let mut warnings: Vec<NormalizeWarning> = Vec::new();

        for chunk in chunks {
            let chunk = chunk?;
            match &header {
                None => {
                    let canonical = canonical_column_names(&chunk.columns);
                    states = canonical
                        .iter()
                        .map(|name| {
                            let hinted = hint.and_then(|h| h.get(name));
                            ColState {
                                name: name.clone(),
                                ty: hinted,
                                hinted: hinted.is_some(),
                                demoted: false,
                            }
                        })
                        .collect();
                    header = Some(chunk.columns.clone());
                }
                Some(expected) if *expected != chunk.columns => {
                    return Err(NormalizeError::HeaderMismatch {
                        expected: expected.iter().join(", "),
                        got: chunk.columns.iter().join(", "),
                    });
                }
                Some(_) => {}
            }
            self.ingest_chunk(&chunk, &mut states, &mut rows, &mut warnings)?;
        }

        if header.is_none() {
            return Err(NormalizeError::EmptyStream);
        }

        let columns = states
            .iter()
            .map(|s| Column::new(s.name.clone(), s.ty.unwrap_or(ColumnType::Text)))
            .collect();
        let mut row_set = RowSet::new(columns)?;
        for row in rows {
            row_set.push_row(row)?;
        }
        debug!(
            "[NORMALIZE] Produced row set: {} rows, {} columns, {} warnings",
            row_set.len(),
            row_set.columns().len(),
            warnings.len()
        );
        Ok(Normalized { row_set, warnings })
    }

    fn ingest_chunk(
        &self,
        chunk: &RawChunk,
        states: &mut [ColState],
        rows: &mut Vec<Vec<CellValue>>,
        warnings: &mut Vec<NormalizeWarning>,
    ) -> Result<(), NormalizeError> {
        for raw_row in &chunk.rows {
            let row_index = rows.len();
            if raw_row.len() != states.len() {
                return Err(NormalizeError::RowArity {
                    row: row_index,
                    expected: states.len(),
                    actual: raw_row.len(),
                });
            }
            let mut row = Vec::with_capacity(raw_row.len());
            for (col, raw) in raw_row.iter().enumerate() {
                let cell =
                    self.coerce_cell(raw, col, row_index, states, rows, warnings)?;
                row.push(cell);
            }
            rows.push(row);
        }
        Ok(())
    }

    /// Coerce one raw value into the column's canonical type, updating the
    /// column state (inference, widening, demotion) as a side effect.
    fn coerce_cell(
        &self,
        raw: &RawValue,
        col: usize,
        row_index: usize,
        states: &mut [ColState],
        rows: &mut [Vec<CellValue>],
        warnings: &mut Vec<NormalizeWarning>,
    ) -> Result<CellValue, NormalizeError> {
        // Absent field and explicit null fold into the same null cell and
        // never influence the column type.
        if matches!(raw, RawValue::Null | RawValue::Absent) {
            return Ok(CellValue::Null);
        }
        let state = &mut states[col];
        if state.demoted {
            return Ok(text_cell(raw));
        }

        let natural = natural_cell(raw);
        let outcome = match (state.ty, natural) {
            (None, Ok(cell)) => {
                state.ty = cell.column_type();
                Ok(cell)
            }
            (Some(target), Ok(cell)) => match (target, cell) {
                (t, cell) if cell.column_type() == Some(t) => Ok(cell),
                // Integers widen into an established float column.
                (ColumnType::Float, CellValue::Integer(i)) => Ok(CellValue::Float(i as f64)),
                // A float arriving in an inferred integer column widens the
                // column itself; hinted integer columns stay fixed.
                (ColumnType::Integer, CellValue::Float(f)) if !state.hinted => {
                    state.ty = Some(ColumnType::Float);
                    widen_column(rows, col);
                    Ok(CellValue::Float(f))
                }
                // Hinted columns parse textual values into the fixed type.
                (t, CellValue::Text(s)) if state.hinted => {
                    parse_into(&s, t).ok_or_else(|| describe(raw))
                }
                (_, _) => Err(describe(raw)),
            },
            (_, Err(found)) => Err(found),
        };

        match outcome {
            Ok(cell) => Ok(cell),
            Err(found) => match self.options.strictness {
                Strictness::Strict => Err(NormalizeError::TypeConflict {
                    column: state.name.clone(),
                    row: row_index,
                    expected: state.ty.unwrap_or(ColumnType::Text),
                    found,
                }),
                Strictness::Lenient => {
                    state.demoted = true;
                    state.ty = Some(ColumnType::Text);
                    demote_column(rows, col);
                    warnings.push(NormalizeWarning::ColumnDemoted {
                        column: state.name.clone(),
                        first_conflict_row: row_index,
                    });
                    Ok(text_cell(raw))
                }
            },
        }
    }
}

/// The canonical cell a raw value maps to on its own, or a description of
/// why it cannot map at all (unparsable decimals).
fn natural_cell(raw: &RawValue) -> Result<CellValue, String> {
    match raw {
        RawValue::Text(s) => Ok(CellValue::Text(s.clone())),
        RawValue::Integer(i) => Ok(CellValue::Integer(*i)),
        RawValue::Float(f) => Ok(CellValue::Float(*f)),
        RawValue::Boolean(b) => Ok(CellValue::Boolean(*b)),
        RawValue::Timestamp(ts) => Ok(CellValue::Timestamp(*ts)),
        RawValue::Decimal(s) => s
            .trim()
            .parse::<f64>()
            .map(CellValue::Float)
            .map_err(|_| format!("decimal '{s}'")),
        RawValue::Null | RawValue::Absent => Ok(CellValue::Null),
    }
}

fn describe(raw: &RawValue) -> String {
    match raw {
        RawValue::Text(s) => format!("text '{s}'"),
        RawValue::Integer(i) => format!("integer {i}"),
        RawValue::Float(f) => format!("float {f}"),
        RawValue::Boolean(b) => format!("boolean {b}"),
        RawValue::Timestamp(ts) => format!("timestamp {}", ts.to_rfc3339()),
        RawValue::Decimal(s) => format!("decimal '{s}'"),
        RawValue::Null | RawValue::Absent => "null".to_string(),
    }
}

/// Parse a textual value into a hinted column type.
fn parse_into(text: &str, target: ColumnType) -> Option<CellValue> {
    let trimmed = text.trim();
    match target {
        ColumnType::Text => Some(CellValue::Text(text.to_string())),
        ColumnType::Integer => trimmed.parse::<i64>().ok().map(CellValue::Integer),
        ColumnType::Float => trimmed.parse::<f64>().ok().map(CellValue::Float),
        ColumnType::Boolean => match trimmed.to_ascii_lowercase().as_str() {
            "true" => Some(CellValue::Boolean(true)),
            "false" => Some(CellValue::Boolean(false)),
            _ => None,
        },
        ColumnType::Timestamp => DateTime::parse_from_rfc3339(trimmed)
            .ok()
            .map(|ts| CellValue::Timestamp(ts.with_timezone(&Utc))),
    }
}

/// Stringify a raw value for a demoted text column. Nulls stay null.
fn text_cell(raw: &RawValue) -> CellValue {
    match raw {
        RawValue::Text(s) => CellValue::Text(s.clone()),
        RawValue::Integer(i) => CellValue::Text(i.to_string()),
        RawValue::Float(f) => CellValue::Text(f.to_string()),
        RawValue::Boolean(b) => CellValue::Text(b.to_string()),
        RawValue::Timestamp(ts) => CellValue::Text(ts.to_rfc3339()),
        RawValue::Decimal(s) => CellValue::Text(s.clone()),
        RawValue::Null | RawValue::Absent => CellValue::Null,
    }
}

/// Convert every stored integer cell of a column to float.
fn widen_column(rows: &mut [Vec<CellValue>], col: usize) {
    for row in rows {
        if let CellValue::Integer(i) = row[col] {
            row[col] = CellValue::Float(i as f64);
        }
    }
}

/// Convert every stored cell of a column to its textual form.
fn demote_column(rows: &mut [Vec<CellValue>], col: usize) {
    for row in rows {
        let text = match &row[col] {
            CellValue::Null => continue,
            cell => cell.to_string(),
        };
        row[col] = CellValue::Text(text);
    }
}

/// Re-expose a row set as a single-chunk stream.
///
/// Used for re-normalization (idempotence checks) and for feeding cached
/// row sets back through the pipeline.
pub fn rowset_to_chunks(row_set: &RowSet) -> ChunkStream {
    let columns: Vec<String> = row_set.column_names().map(str::to_string).collect();
    let rows = row_set
        .rows()
        .iter()
        .map(|row| row.iter().map(cell_to_raw).collect())
        .collect();
    ChunkStream::from_chunks(vec![RawChunk::new(columns, rows)])
}

fn cell_to_raw(cell: &CellValue) -> RawValue {
    match cell {
        CellValue::Text(s) => RawValue::Text(s.clone()),
        CellValue::Integer(i) => RawValue::Integer(*i),
        CellValue::Float(f) => RawValue::Float(*f),
        CellValue::Boolean(b) => RawValue::Boolean(*b),
        CellValue::Timestamp(ts) => RawValue::Timestamp(*ts),
        CellValue::Null => RawValue::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn stream(chunks: Vec<RawChunk>) -> ChunkStream {
        ChunkStream::from_chunks(chunks)
    }

    fn strict() -> Normalizer {
        Normalizer::default()
    }

    fn lenient() -> Normalizer {
        Normalizer::new(NormalizeOptions {
            strictness: Strictness::Lenient,
        })
    }

    #[test]
    fn test_integer_column_widens_to_float() {
        let chunk = RawChunk::new(
            vec!["amount".into()],
            vec![
                vec![RawValue::Integer(2)],
                vec![RawValue::Float(2.5)],
                vec![RawValue::Integer(3)],
            ],
        );
        let out = strict().normalize(stream(vec![chunk]), None).unwrap();
        assert_eq!(out.row_set.columns()[0].ty, ColumnType::Float);
        assert_eq!(out.row_set.get(0, "amount"), Some(&CellValue::Float(2.0)));
        assert_eq!(out.row_set.get(2, "amount"), Some(&CellValue::Float(3.0)));
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_decimal_coerces_to_float() {
        let chunk = RawChunk::new(
            vec!["price".into()],
            vec![vec![RawValue::Decimal("19.99".into())]],
        );
        let out = strict().normalize(stream(vec![chunk]), None).unwrap();
        assert_eq!(out.row_set.get(0, "price"), Some(&CellValue::Float(19.99)));
    }

    #[test]
    fn test_strict_mode_fails_on_first_conflict() {
        let chunk = RawChunk::new(
            vec!["id".into()],
            vec![
                vec![RawValue::Integer(1)],
                vec![RawValue::Text("oops".into())],
            ],
        );
        let err = strict().normalize(stream(vec![chunk]), None).unwrap_err();
        match err {
            NormalizeError::TypeConflict { column, row, .. } => {
                assert_eq!(column, "id");
                assert_eq!(row, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_lenient_mode_demotes_column_with_one_warning() {
        let chunk = RawChunk::new(
            vec!["id".into()],
            vec![
                vec![RawValue::Integer(1)],
                vec![RawValue::Text("oops".into())],
                vec![RawValue::Boolean(true)],
            ],
        );
        let out = lenient().normalize(stream(vec![chunk]), None).unwrap();
        assert_eq!(out.row_set.columns()[0].ty, ColumnType::Text);
        assert_eq!(out.row_set.get(0, "id"), Some(&CellValue::Text("1".into())));
        assert_eq!(
            out.row_set.get(2, "id"),
            Some(&CellValue::Text("true".into()))
        );
        assert_eq!(
            out.warnings,
            vec![NormalizeWarning::ColumnDemoted {
                column: "id".into(),
                first_conflict_row: 1
            }]
        );
    }

    #[test]
    fn test_absent_and_null_both_become_null() {
        let chunk = RawChunk::new(
            vec!["a".into(), "b".into()],
            vec![vec![RawValue::Null, RawValue::Absent]],
        );
        let out = strict().normalize(stream(vec![chunk]), None).unwrap();
        assert_eq!(out.row_set.get(0, "a"), Some(&CellValue::Null));
        assert_eq!(out.row_set.get(0, "b"), Some(&CellValue::Null));
    }

    #[test]
    fn test_all_null_column_defaults_to_text() {
        let chunk = RawChunk::new(vec!["ghost".into()], vec![vec![RawValue::Null]]);
        let out = strict().normalize(stream(vec![chunk]), None).unwrap();
        assert_eq!(out.row_set.columns()[0].ty, ColumnType::Text);
    }

    #[test]
    fn test_duplicate_headers_disambiguated() {
        let chunk = RawChunk::new(
            vec!["ID".into(), " id".into()],
            vec![vec![RawValue::Integer(1), RawValue::Integer(2)]],
        );
        let out = strict().normalize(stream(vec![chunk]), None).unwrap();
        let names: Vec<&str> = out.row_set.column_names().collect();
        assert_eq!(names, vec!["id", "id_2"]);
    }

    #[test]
    fn test_header_mismatch_across_chunks() {
        let first = RawChunk::new(vec!["a".into()], vec![vec![RawValue::Integer(1)]]);
        let second = RawChunk::new(vec!["b".into()], vec![vec![RawValue::Integer(2)]]);
        let err = strict()
            .normalize(stream(vec![first, second]), None)
            .unwrap_err();
        assert!(matches!(err, NormalizeError::HeaderMismatch { .. }));
    }

    #[test]
    fn test_timestamp_hint_parses_text() {
        let hint = SchemaHint::new().with_column("seen_at", ColumnType::Timestamp);
        let chunk = RawChunk::new(
            vec!["Seen At".into()],
            vec![vec![RawValue::Text("2024-05-01T12:00:00Z".into())]],
        );
        let out = strict().normalize(stream(vec![chunk]), Some(&hint)).unwrap();
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert_eq!(
            out.row_set.get(0, "seen_at"),
            Some(&CellValue::Timestamp(expected))
        );
    }

    #[test]
    fn test_hinted_integer_column_does_not_widen() {
        let hint = SchemaHint::new().with_column("n", ColumnType::Integer);
        let chunk = RawChunk::new(
            vec!["n".into()],
            vec![vec![RawValue::Integer(1)], vec![RawValue::Float(1.5)]],
        );
        let err = strict()
            .normalize(stream(vec![chunk]), Some(&hint))
            .unwrap_err();
        assert!(matches!(err, NormalizeError::TypeConflict { .. }));
    }

    #[test]
    fn test_empty_stream_is_an_error() {
        let err = strict().normalize(ChunkStream::empty(), None).unwrap_err();
        assert!(matches!(err, NormalizeError::EmptyStream));
    }

    #[test]
    fn test_header_only_chunk_yields_empty_row_set() {
        let chunk = RawChunk::new(vec!["id".into()], vec![]);
        let out = strict().normalize(stream(vec![chunk]), None).unwrap();
        assert!(out.row_set.is_empty());
        assert_eq!(out.row_set.columns().len(), 1);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let chunk = RawChunk::new(
            vec!["Order ID".into(), "order id".into(), "Total".into()],
            vec![
                vec![
                    RawValue::Integer(1),
                    RawValue::Text("a".into()),
                    RawValue::Decimal("10.5".into()),
                ],
                vec![RawValue::Integer(2), RawValue::Absent, RawValue::Integer(4)],
            ],
        );
        let first = strict().normalize(stream(vec![chunk]), None).unwrap();
        let second = strict()
            .normalize(rowset_to_chunks(&first.row_set), None)
            .unwrap();
        assert_eq!(first.row_set, second.row_set);
        assert!(second.warnings.is_empty());
    }
}
