//! Ingestion: turning one named input stream into row batches.
//!
//! Most callers never use this module directly; [`crate::merge::merge_files`] resolves each
//! [`InputFile`] through a [`FormatRegistry`] and drains the resulting batches.
//!
//! Format-specific readers are also available under:
//! - [`csv`]: chunked delimited text
//! - `excel`: first-sheet spreadsheet reading (feature `excel`)

pub mod csv;
#[cfg(feature = "excel")]
pub mod excel;
pub mod input;
pub mod unified;

pub use input::{inputs_from_dir, inputs_from_glob, InputFile};
pub use unified::{
    Batches, FormatParser, FormatRegistry, HeaderMode, ParseOptions, SpreadsheetParser, DEFAULT_CHUNK_ROWS,
};
