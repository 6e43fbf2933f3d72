//! Delimited-text ingestion, read in bounded row-blocks.

use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use tracing::trace;

use crate::error::{MergeError, MergeResult};
use crate::types::{RowBatch, Value};

use super::unified::{Batches, FormatParser, HeaderMode, ParseOptions};

/// [`FormatParser`] for comma- or tab-delimited text.
#[derive(Debug, Clone, Copy)]
pub struct DelimitedParser {
    delimiter: u8,
    name: &'static str,
}

impl DelimitedParser {
    /// Parser for an arbitrary single-byte delimiter.
    pub const fn new(delimiter: u8, name: &'static str) -> Self {
        Self { delimiter, name }
    }

    /// Comma-separated values.
    pub const fn comma() -> Self {
        Self::new(b',', "csv")
    }

    /// Tab-separated values.
    pub const fn tab() -> Self {
        Self::new(b'\t', "tsv")
    }

    /// Field delimiter.
    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }
}

impl FormatParser for DelimitedParser {
    fn name(&self) -> &'static str {
        self.name
    }

    fn parse(&self, reader: Box<dyn Read + Send>, options: &ParseOptions) -> MergeResult<Batches> {
        Ok(Box::new(CsvChunks::from_reader(reader, self.delimiter, options)?))
    }
}

/// Iterator over row-blocks of a delimited-text source.
///
/// The first line is the header. Its cells are discarded; only its field count is kept. Each
/// block holds at most `chunk_rows` records and gets positional labels for its own width (see
/// [`HeaderMode`]). A header-only source yields exactly one empty batch.
pub struct CsvChunks<R: Read> {
    rdr: csv::Reader<R>,
    header_width: usize,
    chunk_rows: usize,
    header_mode: HeaderMode,
    emitted: bool,
    done: bool,
}

impl<R: Read> CsvChunks<R> {
    /// Start reading `reader`. Fails if the source has no header line.
    pub fn from_reader(reader: R, delimiter: u8, options: &ParseOptions) -> MergeResult<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(reader);

        let header_width = rdr.headers()?.len();
        if header_width == 0 {
            return Err(MergeError::malformed("No columns to parse from file"));
        }

        Ok(Self {
            rdr,
            header_width,
            chunk_rows: options.chunk_rows.max(1),
            header_mode: options.header_mode,
            emitted: false,
            done: false,
        })
    }

    /// Field count of the header line.
    pub fn header_width(&self) -> usize {
        self.header_width
    }

    fn read_chunk(&mut self) -> MergeResult<Option<RowBatch>> {
        let mut rows: Vec<Vec<Value>> = Vec::with_capacity(self.chunk_rows.min(8_192));
        let mut record = StringRecord::new();

        while rows.len() < self.chunk_rows && self.rdr.read_record(&mut record)? {
            if self.header_mode == HeaderMode::PerFile && record.len() > self.header_width {
                let line = record.position().map(|p| p.line()).unwrap_or_default();
                return Err(MergeError::malformed(format!(
                    "Expected {} fields in line {line}, saw {}",
                    self.header_width,
                    record.len()
                )));
            }
            rows.push(record.iter().map(cell_value).collect());
        }

        if rows.is_empty() {
            if self.emitted {
                return Ok(None);
            }
            self.emitted = true;
            return Ok(Some(RowBatch::with_width(self.header_width, rows)));
        }

        let width = match self.header_mode {
            HeaderMode::PerFile => self.header_width,
            // Never narrower than the header.
            HeaderMode::PerChunk => rows.iter().map(Vec::len).max().unwrap_or(0).max(self.header_width),
        };
        trace!(rows = rows.len(), width, "read delimited block");

        self.emitted = true;
        Ok(Some(RowBatch::with_width(width, rows)))
    }
}

impl<R: Read> Iterator for CsvChunks<R> {
    type Item = MergeResult<RowBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_chunk() {
            Ok(Some(batch)) => Some(Ok(batch)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Open a delimited-text file for chunked reading.
pub fn chunks_from_path(
    path: impl AsRef<Path>,
    delimiter: u8,
    options: &ParseOptions,
) -> MergeResult<CsvChunks<std::io::BufReader<std::fs::File>>> {
    let file = std::fs::File::open(path)?;
    CsvChunks::from_reader(std::io::BufReader::new(file), delimiter, options)
}

fn cell_value(raw: &str) -> Value {
    if raw.is_empty() {
        Value::Null
    } else {
        Value::Utf8(raw.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf8(s: &str) -> Value {
        Value::Utf8(s.to_string())
    }

    fn chunks(input: &'static str, delimiter: u8, chunk_rows: usize, header_mode: HeaderMode) -> CsvChunks<&'static [u8]> {
        let opts = ParseOptions {
            chunk_rows,
            header_mode,
        };
        CsvChunks::from_reader(input.as_bytes(), delimiter, &opts).unwrap()
    }

    #[test]
    fn splits_into_blocks_of_chunk_rows() {
        let batches: Vec<RowBatch> = chunks("h1,h2\n1,2\n3,4\n5,6\n", b',', 2, HeaderMode::PerChunk)
            .collect::<MergeResult<_>>()
            .unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].row_count(), 2);
        assert_eq!(batches[1].rows, vec![vec![utf8("5"), utf8("6")]]);
        assert_eq!(batches[1].labels, vec!["Column1", "Column2"]);
    }

    #[test]
    fn header_only_yields_one_empty_batch() {
        let batches: Vec<RowBatch> = chunks("a\tb\tc\n", b'\t', 10, HeaderMode::PerChunk)
            .collect::<MergeResult<_>>()
            .unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].width(), 3);
        assert_eq!(batches[0].row_count(), 0);
    }

    #[test]
    fn empty_source_has_no_columns() {
        let err = CsvChunks::from_reader("".as_bytes(), b',', &ParseOptions::default())
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "No columns to parse from file");
    }

    #[test]
    fn short_records_are_padded_and_empty_fields_are_null() {
        let batch = chunks("a,b,c\n1,,3\n4\n", b',', 10, HeaderMode::PerFile)
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(batch.rows[0], vec![utf8("1"), Value::Null, utf8("3")]);
        assert_eq!(batch.rows[1], vec![utf8("4"), Value::Null, Value::Null]);
    }

    #[test]
    fn per_chunk_mode_lets_a_wide_block_redefine_its_width() {
        let batches: Vec<RowBatch> = chunks("a,b\n1,2\n3,4,5\n", b',', 1, HeaderMode::PerChunk)
            .collect::<MergeResult<_>>()
            .unwrap();
        assert_eq!(batches[0].width(), 2);
        assert_eq!(batches[1].width(), 3);
        assert_eq!(batches[1].labels, vec!["Column1", "Column2", "Column3"]);
    }

    #[test]
    fn per_chunk_mode_keeps_header_width_for_short_blocks() {
        let batches: Vec<RowBatch> = chunks("a,b,c\n1,2\n3\n", b',', 1, HeaderMode::PerChunk)
            .collect::<MergeResult<_>>()
            .unwrap();
        assert_eq!(batches[0].width(), 3);
        assert_eq!(batches[0].rows[0], vec![utf8("1"), utf8("2"), Value::Null]);
        assert_eq!(batches[1].width(), 3);
    }

    #[test]
    fn per_file_mode_rejects_records_wider_than_header() {
        let mut it = chunks("a,b\n1,2\n3,4,5\n", b',', 10, HeaderMode::PerFile);
        let err = it.next().unwrap().unwrap_err();
        assert_eq!(err.to_string(), "Expected 2 fields in line 3, saw 3");
        assert!(it.next().is_none());
    }

    #[test]
    fn cells_are_not_trimmed_or_coerced() {
        let batch = chunks("a,b\n 007 ,\"x, y\"\n", b',', 10, HeaderMode::PerChunk)
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(batch.rows[0], vec![utf8(" 007 "), utf8("x, y")]);
    }
}
