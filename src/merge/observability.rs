use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::MergeError;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational event.
    Info,
    /// Warning-level event (file skipped, nothing merged).
    Warning,
    /// Error-level event (one file failed to parse).
    Error,
    /// Critical error (typically I/O or other infrastructure failures).
    Critical,
}

/// Severity for a per-file failure.
pub fn severity_for_error(e: &MergeError) -> Severity {
    match e {
        MergeError::Io(_) => Severity::Critical,
        MergeError::Csv(err) => match err.kind() {
            csv::ErrorKind::Io(_) => Severity::Critical,
            _ => Severity::Error,
        },
        MergeError::UnsupportedFormat { .. } | MergeError::EmptyResult => Severity::Warning,
        _ => Severity::Error,
    }
}

/// The file an event refers to.
#[derive(Debug, Clone)]
pub struct FileContext {
    /// Declared file name.
    pub name: String,
    /// Declared size in bytes.
    pub size_bytes: u64,
    /// Parser name, when the suffix resolved.
    pub format: Option<&'static str>,
}

/// Counts reported when a file has been folded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStats {
    /// Rows contributed by the file.
    pub rows: usize,
    /// Batches the file was read in.
    pub batches: usize,
}

/// End-of-run summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    /// Inputs offered.
    pub files: usize,
    /// Inputs that contributed (possibly zero rows).
    pub merged_files: usize,
    /// Inputs skipped as unsupported or failed.
    pub skipped_files: usize,
    /// Rows in the merged table.
    pub rows: usize,
    /// Columns in the merged table.
    pub columns: usize,
}

/// User-facing notifications, rendered by [`fmt::Display`] as the texts a UI shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    /// Merging started.
    Started { files: usize },
    /// One file was folded in.
    FileMerged { name: String, rows: usize },
    /// A file's suffix is not recognized.
    Unsupported { name: String },
    /// A file failed to parse.
    FileFailed {
        name: String,
        cause: String,
        severity: Severity,
    },
    /// The run produced rows.
    Succeeded { rows: usize },
    /// The run produced no rows.
    NothingMerged,
}

impl Notification {
    /// Severity of the notification.
    pub fn severity(&self) -> Severity {
        match self {
            Notification::Started { .. } | Notification::FileMerged { .. } | Notification::Succeeded { .. } => {
                Severity::Info
            }
            Notification::Unsupported { .. } | Notification::NothingMerged => Severity::Warning,
            Notification::FileFailed { severity, .. } => *severity,
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notification::Started { .. } => f.write_str("Merging files. Please wait..."),
            Notification::FileMerged { name, rows } => write!(f, "Merged {name} ({rows} rows)"),
            Notification::Unsupported { name } => write!(f, "Unsupported file type: {name}"),
            Notification::FileFailed { name, cause, .. } => write!(f, "Error processing {name}: {cause}"),
            Notification::Succeeded { .. } => f.write_str("Files merged successfully!"),
            Notification::NothingMerged => f.write_str("No data was merged. Please check the files."),
        }
    }
}

/// Observer interface for merge progress.
///
/// Implementors can drive a UI, record metrics, or trigger alerts. All methods default to
/// no-ops.
pub trait MergeObserver: Send + Sync {
    /// Called once before the first input is read.
    fn on_start(&self, _files: usize) {}

    /// Called when a file has been fully folded in.
    fn on_file_merged(&self, _ctx: &FileContext, _stats: FileStats) {}

    /// Called when a file's suffix does not resolve to a parser.
    fn on_unsupported(&self, _ctx: &FileContext) {}

    /// Called when a file fails to parse.
    fn on_failure(&self, _ctx: &FileContext, _severity: Severity, _error: &MergeError) {}

    /// Called when a failure meets the alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &FileContext, severity: Severity, error: &MergeError) {
        self.on_failure(ctx, severity, error)
    }

    /// Called once after the last input.
    fn on_finish(&self, _summary: &MergeSummary) {}
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn MergeObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn MergeObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl MergeObserver for CompositeObserver {
    fn on_start(&self, files: usize) {
        for o in &self.observers {
            o.on_start(files);
        }
    }

    fn on_file_merged(&self, ctx: &FileContext, stats: FileStats) {
        for o in &self.observers {
            o.on_file_merged(ctx, stats);
        }
    }

    fn on_unsupported(&self, ctx: &FileContext) {
        for o in &self.observers {
            o.on_unsupported(ctx);
        }
    }

    fn on_failure(&self, ctx: &FileContext, severity: Severity, error: &MergeError) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &FileContext, severity: Severity, error: &MergeError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }

    fn on_finish(&self, summary: &MergeSummary) {
        for o in &self.observers {
            o.on_finish(summary);
        }
    }
}

/// Emits merge events as `tracing` events.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl MergeObserver for TracingObserver {
    fn on_start(&self, files: usize) {
        info!(files, "merge started");
    }

    fn on_file_merged(&self, ctx: &FileContext, stats: FileStats) {
        info!(
            file = %ctx.name,
            format = ctx.format.unwrap_or("unknown"),
            rows = stats.rows,
            batches = stats.batches,
            "file merged"
        );
    }

    fn on_unsupported(&self, ctx: &FileContext) {
        warn!(file = %ctx.name, "unsupported file type");
    }

    fn on_failure(&self, ctx: &FileContext, severity: Severity, error: &MergeError) {
        error!(file = %ctx.name, ?severity, %error, "file failed");
    }

    fn on_alert(&self, ctx: &FileContext, severity: Severity, error: &MergeError) {
        error!(file = %ctx.name, ?severity, %error, alert = true, "file failed");
    }

    fn on_finish(&self, summary: &MergeSummary) {
        if summary.rows == 0 {
            warn!(files = summary.files, skipped = summary.skipped_files, "no data was merged");
        } else {
            info!(
                rows = summary.rows,
                columns = summary.columns,
                merged = summary.merged_files,
                skipped = summary.skipped_files,
                "merge finished"
            );
        }
    }
}

fn notification_for_failure(ctx: &FileContext, severity: Severity, error: &MergeError) -> Notification {
    Notification::FileFailed {
        name: ctx.name.clone(),
        cause: error.to_string(),
        severity,
    }
}

fn notification_for_finish(summary: &MergeSummary) -> Notification {
    if summary.rows == 0 {
        Notification::NothingMerged
    } else {
        Notification::Succeeded { rows: summary.rows }
    }
}

/// Collects [`Notification`]s in arrival order, for hosts that render them afterwards.
#[derive(Debug, Default)]
pub struct NotificationLog {
    entries: Mutex<Vec<Notification>>,
}

impl NotificationLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far.
    pub fn notifications(&self) -> Vec<Notification> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Rendered texts of everything recorded so far.
    pub fn messages(&self) -> Vec<String> {
        self.notifications().iter().map(ToString::to_string).collect()
    }

    fn push(&self, n: Notification) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(n);
        }
    }
}

impl MergeObserver for NotificationLog {
    fn on_start(&self, files: usize) {
        self.push(Notification::Started { files });
    }

    fn on_file_merged(&self, ctx: &FileContext, stats: FileStats) {
        self.push(Notification::FileMerged {
            name: ctx.name.clone(),
            rows: stats.rows,
        });
    }

    fn on_unsupported(&self, ctx: &FileContext) {
        self.push(Notification::Unsupported { name: ctx.name.clone() });
    }

    fn on_failure(&self, ctx: &FileContext, severity: Severity, error: &MergeError) {
        self.push(notification_for_failure(ctx, severity, error));
    }

    // An alert is the same failure at a higher threshold; record it once.
    fn on_alert(&self, _ctx: &FileContext, _severity: Severity, _error: &MergeError) {}

    fn on_finish(&self, summary: &MergeSummary) {
        self.push(notification_for_finish(summary));
    }
}

#[derive(Serialize)]
struct JsonLine<'a> {
    ts: u64,
    level: Severity,
    message: String,
    #[serde(flatten)]
    notification: &'a Notification,
}

/// Appends notifications to a local file as JSON lines.
#[derive(Debug)]
pub struct JsonLinesObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonLinesObserver {
    /// Create an observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append(&self, notification: &Notification) {
        let line = JsonLine {
            ts: unix_ts(),
            level: notification.severity(),
            message: notification.to_string(),
            notification,
        };
        let Ok(json) = serde_json::to_string(&line) else {
            return;
        };
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{json}");
        }
    }
}

impl MergeObserver for JsonLinesObserver {
    fn on_start(&self, files: usize) {
        self.append(&Notification::Started { files });
    }

    fn on_file_merged(&self, ctx: &FileContext, stats: FileStats) {
        self.append(&Notification::FileMerged {
            name: ctx.name.clone(),
            rows: stats.rows,
        });
    }

    fn on_unsupported(&self, ctx: &FileContext) {
        self.append(&Notification::Unsupported { name: ctx.name.clone() });
    }

    fn on_failure(&self, ctx: &FileContext, severity: Severity, error: &MergeError) {
        self.append(&notification_for_failure(ctx, severity, error));
    }

    // Already written by `on_failure`.
    fn on_alert(&self, _ctx: &FileContext, _severity: Severity, _error: &MergeError) {}

    fn on_finish(&self, summary: &MergeSummary) {
        self.append(&notification_for_finish(summary));
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_texts() {
        let failed = Notification::FileFailed {
            name: "bad.xlsx".into(),
            cause: "boom".into(),
            severity: Severity::Error,
        };
        assert_eq!(failed.to_string(), "Error processing bad.xlsx: boom");
        assert_eq!(
            Notification::Unsupported { name: "a.pdf".into() }.to_string(),
            "Unsupported file type: a.pdf"
        );
        assert_eq!(
            Notification::NothingMerged.to_string(),
            "No data was merged. Please check the files."
        );
        assert_eq!(Notification::NothingMerged.severity(), Severity::Warning);
    }

    #[test]
    fn io_errors_are_critical() {
        let io = MergeError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(severity_for_error(&io), Severity::Critical);
        assert_eq!(severity_for_error(&MergeError::malformed("bad")), Severity::Error);
        assert!(Severity::Critical > Severity::Error);
    }

    #[test]
    fn notification_serializes_with_kind_tag() {
        let json = serde_json::to_value(Notification::FileMerged {
            name: "a.csv".into(),
            rows: 2,
        })
        .unwrap();
        assert_eq!(json["kind"], "file_merged");
        assert_eq!(json["rows"], 2);
    }
}
