//! Merge driver.
//!
//! [`merge_files`] (or [`FileMerger::merge`]) walks the inputs strictly in the order given:
//!
//! - resolves each input's parser by file-name suffix ([`FormatRegistry`])
//! - drains the parser's batches straight into one [`Accumulator`]
//! - isolates failures: a file that cannot be read or parsed is rolled back, reported to the
//!   observer and recorded in [`MergeOutcome::skipped_files`]; the run continues
//!
//! Nothing runs concurrently and the run cannot be cancelled; the outcome is only visible once
//! every input has been attempted.

pub mod accumulator;
pub mod observability;

use std::fmt;
use std::io::Write;
use std::sync::Arc;

use tracing::debug_span;

use crate::error::{MergeError, MergeResult};
use crate::ingestion::{FormatParser, FormatRegistry, HeaderMode, InputFile, ParseOptions, DEFAULT_CHUNK_ROWS};
use crate::output::{self, MergedArtifact, DEFAULT_OUTPUT_FILE_NAME};
use crate::types::Table;

pub use accumulator::{Accumulator, Checkpoint, SurplusColumns};
pub use observability::{
    severity_for_error, CompositeObserver, FileContext, FileStats, JsonLinesObserver, MergeObserver, MergeSummary,
    Notification, NotificationLog, Severity, TracingObserver,
};

/// Options controlling a merge run.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct MergeOptions {
    /// Rows per delimited-text batch (default 100,000).
    pub chunk_rows: usize,
    /// How delimited-text blocks derive their width.
    pub header_mode: HeaderMode,
    /// What to do with batches wider than the established table.
    pub surplus_columns: SurplusColumns,
    /// Name of the output artifact.
    pub output_file_name: String,
    /// Optional observer for progress, warnings and errors.
    pub observer: Option<Arc<dyn MergeObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: Severity,
}

impl MergeOptions {
    /// Parser settings for ingestion.
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            chunk_rows: self.chunk_rows,
            header_mode: self.header_mode,
        }
    }
}

impl fmt::Debug for MergeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MergeOptions")
            .field("chunk_rows", &self.chunk_rows)
            .field("header_mode", &self.header_mode)
            .field("surplus_columns", &self.surplus_columns)
            .field("output_file_name", &self.output_file_name)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            chunk_rows: DEFAULT_CHUNK_ROWS,
            header_mode: HeaderMode::default(),
            surplus_columns: SurplusColumns::default(),
            output_file_name: DEFAULT_OUTPUT_FILE_NAME.to_string(),
            observer: None,
            alert_at_or_above: Severity::Critical,
        }
    }
}

/// Why an input did not contribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The suffix did not resolve to a parser.
    Unsupported,
    /// Reading or parsing failed.
    Failed { cause: String, severity: Severity },
}

/// An input that was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    /// Declared file name.
    pub name: String,
    /// Why it was skipped.
    pub reason: SkipReason,
}

impl fmt::Display for SkippedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            SkipReason::Unsupported => write!(f, "Unsupported file type: {}", self.name),
            SkipReason::Failed { cause, .. } => write!(f, "Error processing {}: {cause}", self.name),
        }
    }
}

/// An input that was folded in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    /// Declared file name.
    pub name: String,
    /// Parser that read it.
    pub format: &'static str,
    /// Rows and batches contributed.
    pub stats: FileStats,
}

/// Result of a merge run.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// The merged table.
    pub table: Table,
    /// Inputs that were folded in, in arrival order.
    pub merged_files: Vec<FileReport>,
    /// Inputs that were skipped, in arrival order.
    pub skipped_files: Vec<SkippedFile>,
    output_file_name: String,
}

impl MergeOutcome {
    /// `true` when no input contributed a row.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Rows in the merged table.
    pub fn row_count(&self) -> usize {
        self.table.row_count()
    }

    /// Counts for the run.
    pub fn summary(&self) -> MergeSummary {
        MergeSummary {
            files: self.merged_files.len() + self.skipped_files.len(),
            merged_files: self.merged_files.len(),
            skipped_files: self.skipped_files.len(),
            rows: self.table.row_count(),
            columns: self.table.width(),
        }
    }

    /// Serialize the merged table as CSV into `writer`.
    pub fn write_csv<W: Write>(&self, writer: W) -> MergeResult<()> {
        output::write_csv(&self.table, writer)
    }

    /// Serialize the merged table as CSV into memory.
    pub fn to_csv_bytes(&self) -> MergeResult<Vec<u8>> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf)?;
        Ok(buf)
    }

    /// Write the downloadable artifact into a fresh temporary directory.
    ///
    /// Returns [`MergeError::EmptyResult`] when nothing was merged; no file is created then.
    pub fn into_artifact(self) -> MergeResult<MergedArtifact> {
        MergedArtifact::create(&self.table, &self.output_file_name)
    }
}

/// Merges inputs with a fixed set of options and formats.
#[derive(Debug, Clone)]
pub struct FileMerger {
    options: MergeOptions,
    registry: FormatRegistry,
}

impl Default for FileMerger {
    fn default() -> Self {
        Self::new(MergeOptions::default())
    }
}

impl FileMerger {
    /// Merger with the standard formats (`.csv`, `.txt`, `.xls`, `.xlsx`).
    pub fn new(options: MergeOptions) -> Self {
        Self {
            options,
            registry: FormatRegistry::standard(),
        }
    }

    /// Replace the format registry.
    pub fn with_registry(mut self, registry: FormatRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Formats this merger recognizes.
    pub fn registry(&self) -> &FormatRegistry {
        &self.registry
    }

    /// Merge `inputs` in order.
    ///
    /// When an observer is configured, this reports:
    ///
    /// - `on_start` once, with the input count
    /// - `on_unsupported` for each input whose suffix is not recognized
    /// - `on_file_merged` for each input folded in, with row and batch counts
    /// - `on_failure` for each input that fails, with a computed severity
    /// - `on_alert` on failure when the severity is >= `options.alert_at_or_above`
    /// - `on_finish` once, with the run summary
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tabular_merge::ingestion::InputFile;
    /// use tabular_merge::merge::{FileMerger, MergeOptions};
    ///
    /// let inputs = vec![
    ///     InputFile::from_bytes("a.csv", "x,y,z\na,b,c\n"),
    ///     InputFile::from_bytes("b.txt", "x\ty\tz\nd\te\tf\n"),
    /// ];
    /// let outcome = FileMerger::new(MergeOptions::default()).merge(inputs);
    /// let csv = String::from_utf8(outcome.to_csv_bytes().unwrap()).unwrap();
    /// assert_eq!(csv, "Column1,Column2,Column3\na,b,c\nd,e,f\n");
    /// ```
    pub fn merge<I>(&self, inputs: I) -> MergeOutcome
    where
        I: IntoIterator<Item = InputFile>,
    {
        let inputs: Vec<InputFile> = inputs.into_iter().collect();
        let observer = self.options.observer.as_deref();
        if let Some(obs) = observer {
            obs.on_start(inputs.len());
        }

        let mut acc = Accumulator::new(self.options.surplus_columns);
        let mut merged_files = Vec::new();
        let mut skipped_files = Vec::new();

        for input in inputs {
            let mut ctx = FileContext {
                name: input.name().to_owned(),
                size_bytes: input.size_bytes(),
                format: None,
            };
            let _span = debug_span!("merge_file", file = %ctx.name).entered();

            let Some(parser) = self.registry.resolve(&ctx.name) else {
                if let Some(obs) = observer {
                    obs.on_unsupported(&ctx);
                }
                skipped_files.push(SkippedFile {
                    name: ctx.name,
                    reason: SkipReason::Unsupported,
                });
                continue;
            };
            ctx.format = Some(parser.name());

            let checkpoint = acc.checkpoint();
            match self.fold_file(&mut acc, parser.as_ref(), input) {
                Ok(stats) => {
                    if let Some(obs) = observer {
                        obs.on_file_merged(&ctx, stats);
                    }
                    merged_files.push(FileReport {
                        name: ctx.name,
                        format: parser.name(),
                        stats,
                    });
                }
                Err(e) => {
                    acc.rollback(checkpoint);
                    let severity = severity_for_error(&e);
                    if let Some(obs) = observer {
                        obs.on_failure(&ctx, severity, &e);
                        if severity >= self.options.alert_at_or_above {
                            obs.on_alert(&ctx, severity, &e);
                        }
                    }
                    skipped_files.push(SkippedFile {
                        name: ctx.name,
                        reason: SkipReason::Failed {
                            cause: e.to_string(),
                            severity,
                        },
                    });
                }
            }
        }

        let outcome = MergeOutcome {
            table: acc.finalize(),
            merged_files,
            skipped_files,
            output_file_name: self.options.output_file_name.clone(),
        };
        if let Some(obs) = observer {
            obs.on_finish(&outcome.summary());
        }
        outcome
    }

    fn fold_file(&self, acc: &mut Accumulator, parser: &dyn FormatParser, input: InputFile) -> MergeResult<FileStats> {
        let reader = input.into_reader()?;
        let batches = parser.parse(reader, &self.options.parse_options())?;

        let mut stats = FileStats { rows: 0, batches: 0 };
        for batch in batches {
            let batch = batch?;
            stats.rows += batch.row_count();
            stats.batches += 1;
            acc.accept(batch)?;
        }
        Ok(stats)
    }
}

/// Merge `inputs` with the standard formats. See [`FileMerger::merge`].
pub fn merge_files<I>(inputs: I, options: &MergeOptions) -> MergeOutcome
where
    I: IntoIterator<Item = InputFile>,
{
    FileMerger::new(options.clone()).merge(inputs)
}

/// Merge `inputs` and write the artifact in one step.
///
/// Fails with [`MergeError::EmptyResult`] when no input contributed a row.
pub fn merge_to_artifact<I>(inputs: I, options: &MergeOptions) -> MergeResult<MergedArtifact>
where
    I: IntoIterator<Item = InputFile>,
{
    let outcome = merge_files(inputs, options);
    if outcome.is_empty() {
        return Err(MergeError::EmptyResult);
    }
    outcome.into_artifact()
}
