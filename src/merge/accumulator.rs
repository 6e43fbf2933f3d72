//! Schema-reconciling accumulator.
//!
//! Batches are reconciled purely by position:
//!
//! 1. every batch is relabelled `Column1..ColumnN`;
//! 2. while the table holds no rows, a batch is adopted wholesale (labels and rows);
//! 3. otherwise the batch takes the table's first `N` labels and its rows are appended, padded
//!    with nulls when narrower than the table; surplus columns of a wider batch follow
//!    [`SurplusColumns`].
//!
//! Once the table holds rows its labels never change.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{MergeError, MergeResult};
use crate::types::{positional_labels, RowBatch, Table, Value};

/// What to do with a batch wider than the established table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurplusColumns {
    /// Append the batch's rows with their trailing columns cut to the table width.
    #[default]
    Truncate,
    /// Refuse the batch with [`MergeError::LengthMismatch`].
    Reject,
}

/// Position to return to when a file fails part-way through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    rows: usize,
    width: usize,
}

/// Running merge state.
#[derive(Debug, Default)]
pub struct Accumulator {
    table: Table,
    surplus: SurplusColumns,
}

impl Accumulator {
    /// Create an empty accumulator.
    pub fn new(surplus: SurplusColumns) -> Self {
        Self {
            table: Table::default(),
            surplus,
        }
    }

    /// Fold one batch into the table.
    pub fn accept(&mut self, batch: RowBatch) -> MergeResult<()> {
        let width = batch.width();
        let rows = batch.rows;

        if self.table.is_empty() {
            debug!(width, rows = rows.len(), "adopting batch shape");
            self.table = Table::new(positional_labels(width), rows);
            return Ok(());
        }

        let table_width = self.table.width();
        if width > table_width {
            match self.surplus {
                SurplusColumns::Reject => {
                    return Err(MergeError::LengthMismatch {
                        batch_width: width,
                        table_width,
                    });
                }
                SurplusColumns::Truncate => {
                    debug!(width, table_width, "dropping surplus columns");
                }
            }
        }

        self.table.rows.reserve(rows.len());
        for mut row in rows {
            row.resize(table_width, Value::Null);
            self.table.rows.push(row);
        }
        Ok(())
    }

    /// Mark the current state so a failing file can be undone.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            rows: self.table.row_count(),
            width: self.table.width(),
        }
    }

    /// Drop everything accepted since `checkpoint`.
    ///
    /// If the table was row-empty at the checkpoint, the labels go back to the width they had
    /// then.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        self.table.rows.truncate(checkpoint.rows);
        if checkpoint.rows == 0 {
            self.table.labels = positional_labels(checkpoint.width);
        }
    }

    /// Rows currently held.
    pub fn row_count(&self) -> usize {
        self.table.row_count()
    }

    /// Labels currently held.
    pub fn labels(&self) -> &[String] {
        &self.table.labels
    }

    /// Finish merging and hand back the table.
    pub fn finalize(self) -> Table {
        self.table
    }
}
