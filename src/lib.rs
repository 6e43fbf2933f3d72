//! `tabular-merge` concatenates the rows of many tabular files into one CSV.
//!
//! Inputs are matched to a parser by file-name suffix (case-sensitive):
//!
//! - **CSV**: `.csv` (comma-delimited, read in row-blocks)
//! - **TSV**: `.txt` (tab-delimited, read in row-blocks)
//! - **Excel/workbooks** (Cargo feature `excel`, on by default): `.xls`, `.xlsx`; only the
//!   first sheet is read, in full
//!
//! Anything else is skipped with a warning. A file that fails to parse is skipped with an error
//! and does not stop the run.
//!
//! ## Schema reconciliation
//!
//! Header text is discarded. Columns are matched purely by position and labelled
//! `Column1..ColumnK`, where `K` is the width of the first batch that put rows into the table.
//! Narrower inputs are padded with empty cells; wider inputs lose their surplus columns (or are
//! refused, see [`merge::SurplusColumns`]). No type coercion, trimming or deduplication takes
//! place.
//!
//! ## Quick example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use tabular_merge::ingestion::InputFile;
//! use tabular_merge::merge::{merge_files, MergeOptions, NotificationLog};
//!
//! # fn main() -> Result<(), tabular_merge::MergeError> {
//! let log = Arc::new(NotificationLog::new());
//! let opts = MergeOptions {
//!     observer: Some(log.clone()),
//!     ..Default::default()
//! };
//!
//! let outcome = merge_files(
//!     vec![
//!         InputFile::from_bytes("q1.csv", "id,name,score\n1,Ada,98\n"),
//!         InputFile::from_bytes("q2.txt", "id\tname\n2\tGrace\n"),
//!         InputFile::from_bytes("notes.pdf", "%PDF"),
//!     ],
//!     &opts,
//! );
//!
//! assert_eq!(outcome.row_count(), 2);
//! assert!(log.messages().contains(&"Unsupported file type: notes.pdf".to_string()));
//!
//! let artifact = outcome.into_artifact()?;
//! assert_eq!(artifact.file_name(), "merged_output.csv");
//! assert_eq!(
//!     artifact.read_bytes()?,
//!     b"Column1,Column2,Column3\n1,Ada,98\n2,Grace,\n"
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`ingestion`]: input streams, format dispatch and format-specific readers
//! - [`merge`]: the merge driver, the accumulator and observer hooks
//! - [`output`]: CSV serialization and the transient download artifact
//! - [`types`]: cells, batches and the merged table
//! - [`error`]: error type shared across the crate

pub mod error;
pub mod ingestion;
pub mod merge;
pub mod output;
pub mod types;

pub use error::{MergeError, MergeResult};
pub use merge::{merge_files, merge_to_artifact, MergeOptions, MergeOutcome};
