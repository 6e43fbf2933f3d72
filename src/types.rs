//! Core data model types for merging.
//!
//! Ingestion produces [`RowBatch`]es; the accumulator folds them into one [`Table`]. Cells are
//! untyped beyond what the source format reports natively: delimited text always yields
//! [`Value::Utf8`] (or [`Value::Null`] for empty fields), spreadsheets may also yield numbers and
//! booleans.

use std::fmt;

/// A single scalar cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing/empty value.
    Null,
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// Boolean.
    Bool(bool),
    /// UTF-8 string.
    Utf8(String),
}

impl Value {
    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// Renders a cell the way it is written to the merged output.
///
/// `Null` is empty, integral floats drop their fraction, booleans are `True`/`False`.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int64(i) => write!(f, "{i}"),
            Value::Float64(v) => {
                if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
                    write!(f, "{}", *v as i64)
                } else {
                    write!(f, "{v}")
                }
            }
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Utf8(s) => f.write_str(s),
        }
    }
}

/// Positional labels `Column1..ColumnN`.
pub fn positional_labels(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("Column{i}")).collect()
}

/// One block of rows produced by a format parser.
///
/// Every row holds exactly `labels.len()` cells.
#[derive(Debug, Clone, PartialEq)]
pub struct RowBatch {
    /// Column labels, in column order.
    pub labels: Vec<String>,
    /// Row-major cells.
    pub rows: Vec<Vec<Value>>,
}

impl RowBatch {
    /// Build a batch of `width` columns, padding short rows with [`Value::Null`] and cutting
    /// long ones, so the width invariant holds. Labels are positional.
    pub fn with_width(width: usize, rows: Vec<Vec<Value>>) -> Self {
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Value::Null);
                row
            })
            .collect();
        Self {
            labels: positional_labels(width),
            rows,
        }
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.labels.len()
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// The merged result: one label sequence and length-homogeneous rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    /// Column labels (`Column1..ColumnK`).
    pub labels: Vec<String>,
    /// Row-major cells; every row has `labels.len()` cells.
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    /// Create a table from labels and rows.
    pub fn new(labels: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { labels, rows }
    }

    /// Number of rows in the table.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns in the table.
    pub fn width(&self) -> usize {
        self.labels.len()
    }

    /// A table without rows counts as empty, even if a header-only batch set its labels.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
