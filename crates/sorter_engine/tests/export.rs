use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use pretty_assertions::assert_eq;
use sorter_core::{CheckpointState, ItemMetadata, Outcome, ResultAggregator};
use sorter_engine::{report_json, write_report, RunReport, RunStatus};
use tempfile::tempdir;

fn sample_report() -> RunReport {
    let mut metadata = ItemMetadata::new();
    metadata.insert("author", "张三");

    let mut results = ResultAggregator::new();
    results.record(Outcome {
        item_id: "a.md".to_string(),
        title: "如何学习算法".to_string(),
        category: "专业技术".to_string(),
        tags: vec!["算法".to_string()],
        elapsed: Duration::from_millis(1200),
        success: true,
        error: None,
        classification_error: None,
        metadata: Some(metadata),
        word_count: Some(321),
        destination: Some(PathBuf::from("sorted/专业技术/a.md")),
    });
    results.record(Outcome {
        item_id: "b.md".to_string(),
        title: "b".to_string(),
        category: String::new(),
        tags: Vec::new(),
        elapsed: Duration::from_millis(10),
        success: false,
        error: Some("moving: destination already exists".to_string()),
        classification_error: None,
        metadata: None,
        word_count: None,
        destination: None,
    });

    RunReport {
        status: RunStatus::Completed,
        eligible: 2,
        skipped: 1,
        unsettled: 0,
        summary: results.summary(Duration::from_secs(3)),
        results,
        checkpoint: CheckpointState::new(),
    }
}

#[test]
fn report_carries_summary_and_outcomes() {
    let value = report_json(&sample_report());

    assert_eq!(value["status"], "completed");
    assert_eq!(value["skipped"], 1);
    assert_eq!(value["summary"]["total"], 2);
    assert_eq!(value["summary"]["succeeded"], 1);
    assert_eq!(value["summary"]["success_rate"], 0.5);
    assert_eq!(value["summary"]["category_distribution"]["专业技术"], 1);
    assert_eq!(value["summary"]["wall_clock_ms"], 3000);

    let outcomes = value["outcomes"].as_array().unwrap();
    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0]["title"], "如何学习算法");
    assert_eq!(outcomes[0]["metadata"]["author"], "张三");
    assert_eq!(outcomes[0]["elapsed_ms"], 1200);
    assert_eq!(outcomes[1]["success"], false);
    assert!(outcomes[1]["metadata"].is_null());
}

#[test]
fn write_report_creates_parent_and_replaces_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("reports").join("run.json");

    write_report(&path, &sample_report()).unwrap();
    let mut report = sample_report();
    report.status = RunStatus::Stopped;
    write_report(&path, &report).unwrap();

    let saved: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(saved["status"], "stopped");
    assert_eq!(fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
}
