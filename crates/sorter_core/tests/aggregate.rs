use std::collections::BTreeMap;
use std::time::Duration;

use pretty_assertions::assert_eq;
use sorter_core::{ItemStage, Outcome, ResultAggregator, WorkItem};

fn init_logging() {
    sorter_logging::initialize_for_tests();
}

fn success(id: &str, category: &str, millis: u64) -> Outcome {
    Outcome {
        item_id: id.to_string(),
        title: id.to_string(),
        category: category.to_string(),
        tags: Vec::new(),
        elapsed: Duration::from_millis(millis),
        success: true,
        error: None,
        classification_error: None,
        metadata: None,
        word_count: Some(10),
        destination: None,
    }
}

#[test]
fn summary_counts_successes_per_category() {
    init_logging();
    let mut aggregator = ResultAggregator::new();
    aggregator.record(success("1.md", "A", 100));
    aggregator.record(success("2.md", "A", 300));
    aggregator.record(success("3.md", "B", 200));
    let item = WorkItem::new("4.md").unwrap();
    aggregator.record(Outcome::failed(
        &item,
        ItemStage::Extracting,
        "unreadable",
        None,
        Duration::from_millis(400),
    ));

    let summary = aggregator.summary(Duration::from_secs(2));
    assert_eq!(summary.total, 4);
    assert_eq!(summary.succeeded, 3);
    assert_eq!(summary.failed, 1);
    assert!((summary.success_rate - 0.75).abs() < f64::EPSILON);
    assert_eq!(
        summary.category_distribution,
        BTreeMap::from([("A".to_string(), 2), ("B".to_string(), 1)])
    );
    assert_eq!(summary.timing.min, Duration::from_millis(100));
    assert_eq!(summary.timing.max, Duration::from_millis(400));
    assert_eq!(summary.timing.mean, Duration::from_millis(250));
    assert_eq!(summary.timing.wall_clock, Duration::from_secs(2));
}

#[test]
fn empty_aggregator_reports_zero_rate() {
    init_logging();
    let summary = ResultAggregator::new().summary(Duration::ZERO);
    assert_eq!(summary.total, 0);
    assert_eq!(summary.success_rate, 0.0);
    assert!(summary.category_distribution.is_empty());
    assert_eq!(summary.timing.mean, Duration::ZERO);
}

#[test]
fn degraded_classifications_still_count_as_successes() {
    init_logging();
    let mut aggregator = ResultAggregator::new();
    let mut degraded = success("1.md", "Other", 10);
    degraded.classification_error = Some("timeout".to_string());
    aggregator.record(degraded);
    aggregator.record(success("2.md", "A", 10));

    let summary = aggregator.summary(Duration::from_millis(20));
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.degraded, 1);
    assert_eq!(summary.category_distribution.get("Other"), Some(&1));
}
