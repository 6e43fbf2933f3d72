use std::sync::{Arc, Mutex};

use tabular_merge::ingestion::InputFile;
use tabular_merge::merge::{
    merge_files, CompositeObserver, FileContext, FileStats, JsonLinesObserver, MergeObserver, MergeOptions,
    MergeSummary, Notification, NotificationLog, Severity,
};
use tabular_merge::MergeError;

#[derive(Default)]
struct RecordingObserver {
    started: Mutex<Vec<usize>>,
    merged: Mutex<Vec<(String, usize)>>,
    unsupported: Mutex<Vec<String>>,
    failures: Mutex<Vec<Severity>>,
    alerts: Mutex<Vec<Severity>>,
    finished: Mutex<Vec<MergeSummary>>,
}

impl MergeObserver for RecordingObserver {
    fn on_start(&self, files: usize) {
        self.started.lock().unwrap().push(files);
    }

    fn on_file_merged(&self, ctx: &FileContext, stats: FileStats) {
        self.merged.lock().unwrap().push((ctx.name.clone(), stats.rows));
    }

    fn on_unsupported(&self, ctx: &FileContext) {
        self.unsupported.lock().unwrap().push(ctx.name.clone());
    }

    fn on_failure(&self, _ctx: &FileContext, severity: Severity, _error: &MergeError) {
        self.failures.lock().unwrap().push(severity);
    }

    fn on_alert(&self, _ctx: &FileContext, severity: Severity, _error: &MergeError) {
        self.alerts.lock().unwrap().push(severity);
    }

    fn on_finish(&self, summary: &MergeSummary) {
        self.finished.lock().unwrap().push(summary.clone());
    }
}

fn tmp_file(name: &str) -> std::path::PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("tabular-merge-{name}-{nanos}.jsonl"))
}

#[test]
fn observer_receives_failure_and_alert_on_critical_io_error() {
    let obs = Arc::new(RecordingObserver::default());
    let opts = MergeOptions {
        observer: Some(obs.clone()),
        alert_at_or_above: Severity::Critical,
        ..Default::default()
    };

    // Missing file -> Io error -> Critical
    let outcome = merge_files(vec![InputFile::from_path("tests/fixtures/does_not_exist.csv")], &opts);
    assert!(outcome.is_empty());

    assert_eq!(obs.failures.lock().unwrap().clone(), vec![Severity::Critical]);
    assert_eq!(obs.alerts.lock().unwrap().clone(), vec![Severity::Critical]);
}

#[test]
fn observer_receives_failure_without_alert_for_parse_error() {
    let obs = Arc::new(RecordingObserver::default());
    let opts = MergeOptions {
        observer: Some(obs.clone()),
        ..Default::default()
    };

    let _ = merge_files(vec![InputFile::from_path("tests/fixtures/broken.xlsx")], &opts);

    assert_eq!(obs.failures.lock().unwrap().clone(), vec![Severity::Error]);
    assert!(obs.alerts.lock().unwrap().is_empty());
}

#[test]
fn observer_sees_every_stage_in_order() {
    let obs = Arc::new(RecordingObserver::default());
    let opts = MergeOptions {
        observer: Some(obs.clone()),
        ..Default::default()
    };

    let _ = merge_files(
        vec![
            InputFile::from_path("tests/fixtures/people.csv"),
            InputFile::from_bytes("readme.md", "# hi"),
            InputFile::from_path("tests/fixtures/people.txt"),
        ],
        &opts,
    );

    assert_eq!(obs.started.lock().unwrap().clone(), vec![3]);
    assert_eq!(
        obs.merged.lock().unwrap().clone(),
        vec![("people.csv".to_string(), 2), ("people.txt".to_string(), 1)]
    );
    assert_eq!(obs.unsupported.lock().unwrap().clone(), vec!["readme.md"]);
    assert_eq!(
        obs.finished.lock().unwrap().clone(),
        vec![MergeSummary {
            files: 3,
            merged_files: 2,
            skipped_files: 1,
            rows: 3,
            columns: 3,
        }]
    );
}

#[test]
fn notification_log_renders_user_facing_texts() {
    let log = Arc::new(NotificationLog::new());
    let opts = MergeOptions {
        observer: Some(log.clone()),
        alert_at_or_above: Severity::Info,
        ..Default::default()
    };

    let _ = merge_files(
        vec![
            InputFile::from_bytes("scan.pdf", "%PDF"),
            InputFile::from_bytes("sheet.xlsx", "not a zip"),
        ],
        &opts,
    );

    let messages = log.messages();
    assert_eq!(messages.len(), 4, "alerts must not duplicate failures: {messages:?}");
    assert_eq!(messages[0], "Merging files. Please wait...");
    assert_eq!(messages[1], "Unsupported file type: scan.pdf");
    assert!(messages[2].starts_with("Error processing sheet.xlsx: "));
    assert_eq!(messages[3], "No data was merged. Please check the files.");
    assert_eq!(log.notifications()[3], Notification::NothingMerged);
}

#[test]
fn success_notice_when_rows_were_merged() {
    let log = Arc::new(NotificationLog::new());
    let opts = MergeOptions {
        observer: Some(log.clone()),
        ..Default::default()
    };

    let _ = merge_files(vec![InputFile::from_path("tests/fixtures/people.csv")], &opts);

    assert_eq!(
        log.notifications().last(),
        Some(&Notification::Succeeded { rows: 2 })
    );
    assert_eq!(log.messages().last().unwrap(), "Files merged successfully!");
}

#[test]
fn composite_fans_out_and_json_lines_are_appended() {
    let path = tmp_file("events");
    let log = Arc::new(NotificationLog::new());
    let composite = CompositeObserver::new(vec![
        log.clone() as Arc<dyn MergeObserver>,
        Arc::new(JsonLinesObserver::new(&path)) as Arc<dyn MergeObserver>,
    ]);
    let opts = MergeOptions {
        observer: Some(Arc::new(composite)),
        ..Default::default()
    };

    let _ = merge_files(
        vec![
            InputFile::from_path("tests/fixtures/people.csv"),
            InputFile::from_bytes("x.doc", "?"),
        ],
        &opts,
    );

    assert_eq!(log.notifications().len(), 4);

    let text = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<serde_json::Value> = text
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[1]["kind"], "file_merged");
    assert_eq!(lines[1]["name"], "people.csv");
    assert_eq!(lines[2]["level"], "warning");
    assert_eq!(lines[2]["message"], "Unsupported file type: x.doc");
    assert_eq!(lines[3]["kind"], "succeeded");

    let _ = std::fs::remove_file(&path);
}

#[test]
fn json_lines_record_an_alerted_failure_once() {
    let path = tmp_file("alerts");
    let opts = MergeOptions {
        observer: Some(Arc::new(JsonLinesObserver::new(&path))),
        alert_at_or_above: Severity::Critical,
        ..Default::default()
    };

    let _ = merge_files(vec![InputFile::from_path("tests/fixtures/does_not_exist.csv")], &opts);

    let text = std::fs::read_to_string(&path).unwrap();
    let failed: Vec<serde_json::Value> = text
        .lines()
        .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap())
        .filter(|v| v["kind"] == "file_failed")
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0]["level"], "critical");
    assert_eq!(failed[0]["name"], "does_not_exist.csv");

    let _ = std::fs::remove_file(&path);
}
