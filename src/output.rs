//! CSV serialization of the merged table and the transient download artifact.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

use crate::error::{MergeError, MergeResult};
use crate::types::Table;

/// File name of the download artifact.
pub const DEFAULT_OUTPUT_FILE_NAME: &str = "merged_output.csv";

/// Write `table` as comma-separated values: one header line of labels, then one line per row.
///
/// Quoting follows standard CSV rules; there is no index column. A table without labels
/// writes nothing.
pub fn write_csv<W: Write>(table: &Table, writer: W) -> MergeResult<()> {
    if table.width() == 0 {
        return Ok(());
    }

    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(&table.labels)?;
    for row in &table.rows {
        wtr.write_record(row.iter().map(|v| v.to_string()))?;
    }
    wtr.flush()?;
    Ok(())
}

/// The merged CSV on disk, inside a temporary directory removed on drop.
#[derive(Debug)]
pub struct MergedArtifact {
    dir: TempDir,
    path: PathBuf,
    rows: usize,
}

impl MergedArtifact {
    /// Serialize `table` to `<tempdir>/<file_name>`.
    ///
    /// Fails with [`MergeError::EmptyResult`] if the table has no rows.
    pub fn create(table: &Table, file_name: &str) -> MergeResult<Self> {
        if table.is_empty() {
            return Err(MergeError::EmptyResult);
        }

        let dir = tempfile::Builder::new().prefix("tabular-merge-").tempdir()?;
        let path = dir.path().join(file_name);
        write_csv(table, BufWriter::new(File::create(&path)?))?;
        debug!(path = %path.display(), rows = table.row_count(), "wrote merged artifact");

        Ok(Self {
            dir,
            path,
            rows: table.row_count(),
        })
    }

    /// Location of the CSV file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Download name of the CSV file.
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(DEFAULT_OUTPUT_FILE_NAME)
    }

    /// Data rows in the file (excluding the header).
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Full contents of the CSV file.
    pub fn read_bytes(&self) -> MergeResult<Vec<u8>> {
        Ok(std::fs::read(&self.path)?)
    }

    /// Copy the CSV out of the temporary directory before it is discarded.
    pub fn persist_to(&self, dest: impl AsRef<Path>) -> MergeResult<u64> {
        Ok(std::fs::copy(&self.path, dest)?)
    }

    /// Remove the temporary directory now, reporting any cleanup failure.
    pub fn discard(self) -> MergeResult<()> {
        self.dir.close()?;
        Ok(())
    }
}
