use thiserror::Error;

/// Convenience result type for merge operations.
pub type MergeResult<T> = Result<T, MergeError>;

/// Error type returned by ingestion, merging and output functions.
///
/// Per-file variants are caught by the merge loop and reported to the observer; only
/// [`MergeError::EmptyResult`] and output-side I/O failures reach the caller of
/// [`crate::merge::MergeOutcome::into_artifact`].
#[derive(Debug, Error)]
pub enum MergeError {
    /// Underlying I/O error (e.g. file not found, permission denied, broken stream).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "excel")]
    /// Spreadsheet decoding error (feature-gated behind `excel`).
    #[error("excel error: {0}")]
    Excel(#[from] calamine::Error),

    /// Delimited-text decoding error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// The file name does not end in a recognized suffix.
    #[error("Unsupported file type: {name}")]
    UnsupportedFormat { name: String },

    /// The content does not have a usable tabular shape.
    #[error("{message}")]
    Malformed { message: String },

    /// A batch is wider than the established table and the surplus policy rejects it.
    #[error(
        "Length mismatch: Expected axis has {batch_width} elements, new values have {table_width} elements"
    )]
    LengthMismatch {
        batch_width: usize,
        table_width: usize,
    },

    /// The format is recognized but its decoder was compiled out.
    #[error("{feature} support not enabled (enable cargo feature '{feature}')")]
    FeatureDisabled { feature: &'static str },

    /// No input contributed a single row.
    #[error("No data was merged. Please check the files.")]
    EmptyResult,
}

impl MergeError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }
}
