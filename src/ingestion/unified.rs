//! Format dispatch.
//!
//! A [`FormatRegistry`] maps file-name suffixes to [`FormatParser`]s. The standard registry
//! recognizes, in lookup order:
//!
//! - `.csv`: comma-delimited text, read in row-blocks
//! - `.txt`: tab-delimited text, read in row-blocks
//! - `.xls` / `.xlsx`: spreadsheets, first sheet only, read in full
//!
//! Suffix matching is case-sensitive. New formats are added by registering another parser; the
//! accumulator never sees anything but [`RowBatch`]es.

use std::fmt;
use std::io::Read;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::MergeResult;
use crate::types::RowBatch;

use super::csv::DelimitedParser;

/// Default number of data rows per delimited-text batch.
pub const DEFAULT_CHUNK_ROWS: usize = 100_000;

/// Lazy, finite sequence of batches for one input.
pub type Batches = Box<dyn Iterator<Item = MergeResult<RowBatch>>>;

/// How delimited-text row-blocks derive their width.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderMode {
    /// Each block is at least as wide as the header line; a wider record in the block widens
    /// it.
    #[default]
    PerChunk,
    /// The header line fixes the width for the whole file; wider records fail the file.
    PerFile,
}

/// Parser settings derived from [`crate::merge::MergeOptions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Rows per delimited-text batch. Zero is treated as one.
    pub chunk_rows: usize,
    /// Block width policy for delimited text.
    pub header_mode: HeaderMode,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            chunk_rows: DEFAULT_CHUNK_ROWS,
            header_mode: HeaderMode::default(),
        }
    }
}

/// Turns one input stream into row batches.
pub trait FormatParser: Send + Sync {
    /// Short format name used in logs and notifications.
    fn name(&self) -> &'static str;

    /// Parse `reader` into a lazy batch sequence.
    ///
    /// Errors discovered up front (e.g. a missing header) are returned directly; errors found
    /// while reading later blocks are yielded by the iterator.
    fn parse(&self, reader: Box<dyn Read + Send>, options: &ParseOptions) -> MergeResult<Batches>;
}

/// Spreadsheet parser: first sheet, header row consumed, one batch.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpreadsheetParser;

impl FormatParser for SpreadsheetParser {
    fn name(&self) -> &'static str {
        "spreadsheet"
    }

    #[cfg_attr(not(feature = "excel"), allow(unused_variables))]
    fn parse(&self, reader: Box<dyn Read + Send>, _options: &ParseOptions) -> MergeResult<Batches> {
        #[cfg(feature = "excel")]
        {
            let batch = super::excel::read_first_sheet(reader)?;
            Ok(Box::new(std::iter::once(Ok(batch))))
        }

        #[cfg(not(feature = "excel"))]
        {
            Err(crate::error::MergeError::FeatureDisabled { feature: "excel" })
        }
    }
}

/// Ordered suffix → parser table.
#[derive(Clone, Default)]
pub struct FormatRegistry {
    entries: Vec<(String, Arc<dyn FormatParser>)>,
}

impl FormatRegistry {
    /// Registry with no formats.
    pub fn empty() -> Self {
        Self::default()
    }

    /// `.csv`, `.txt`, `.xls`, `.xlsx`, in that lookup order.
    pub fn standard() -> Self {
        let spreadsheet: Arc<dyn FormatParser> = Arc::new(SpreadsheetParser);
        Self::empty()
            .with(".csv", Arc::new(DelimitedParser::comma()))
            .with(".txt", Arc::new(DelimitedParser::tab()))
            .with(".xls", Arc::clone(&spreadsheet))
            .with(".xlsx", spreadsheet)
    }

    /// Append a suffix mapping. Earlier registrations win when several suffixes match.
    pub fn with(mut self, suffix: impl Into<String>, parser: Arc<dyn FormatParser>) -> Self {
        self.register(suffix, parser);
        self
    }

    /// Append a suffix mapping in place.
    pub fn register(&mut self, suffix: impl Into<String>, parser: Arc<dyn FormatParser>) -> &mut Self {
        self.entries.push((suffix.into(), parser));
        self
    }

    /// Parser for a file name, by case-sensitive suffix match.
    pub fn resolve(&self, file_name: &str) -> Option<&Arc<dyn FormatParser>> {
        self.entries
            .iter()
            .find(|(suffix, _)| file_name.ends_with(suffix.as_str()))
            .map(|(_, parser)| parser)
    }

    /// Registered suffixes in lookup order.
    pub fn suffixes(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(s, _)| s.as_str())
    }
}

impl fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(s, p)| (s, p.name())))
            .finish()
    }
}
