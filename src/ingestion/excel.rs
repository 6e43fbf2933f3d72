#![cfg(feature = "excel")]

use std::io::{Cursor, Read};
use std::path::Path;

use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Range, Reader};

use crate::error::{MergeError, MergeResult};
use crate::types::{RowBatch, Value};

/// Read the first sheet of a workbook (`.xlsx`, `.xls`, ...) from a stream into one batch.
///
/// The stream is buffered in full; workbooks have no incremental row access.
///
/// Behavior:
/// - Detects the first non-empty row as the header row and drops its contents
/// - The batch width is the sheet's used-range width
/// - Fully empty rows below the header are skipped
/// - Cells keep the type the workbook stores (string, number, bool); nothing is coerced
/// - Date cells are rendered as `YYYY-MM-DD HH:MM:SS`
pub fn read_first_sheet<R: Read>(mut reader: R) -> MergeResult<RowBatch> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(buf))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| MergeError::malformed("workbook has no sheets"))??;
    Ok(batch_from_range(&range))
}

/// Same as [`read_first_sheet`], opening the workbook from disk.
pub fn read_first_sheet_from_path(path: impl AsRef<Path>) -> MergeResult<RowBatch> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| MergeError::malformed("workbook has no sheets"))??;
    Ok(batch_from_range(&range))
}

fn batch_from_range(range: &Range<Data>) -> RowBatch {
    let header_row_idx = range.rows().position(|row| !is_blank(row));
    let Some(header_row_idx) = header_row_idx else {
        return RowBatch::with_width(0, Vec::new());
    };

    let rows: Vec<Vec<Value>> = range
        .rows()
        .skip(header_row_idx + 1)
        .filter(|row| !is_blank(row))
        .map(|row| row.iter().map(convert_cell).collect())
        .collect();

    RowBatch::with_width(range.width(), rows)
}

fn is_blank(row: &[Data]) -> bool {
    row.iter().all(|c| matches!(c, Data::Empty))
}

fn convert_cell(c: &Data) -> Value {
    match c {
        Data::Empty => Value::Null,
        Data::String(s) if s.is_empty() => Value::Null,
        Data::String(s) => Value::Utf8(s.clone()),
        Data::Int(i) => Value::Int64(*i),
        Data::Float(f) => Value::Float64(*f),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(d) if !d.is_duration() => match d.as_datetime() {
            Some(dt) => Value::Utf8(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => Value::Utf8(d.to_string()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::Utf8(s.clone()),
        other => Value::Utf8(other.to_string()),
    }
}
