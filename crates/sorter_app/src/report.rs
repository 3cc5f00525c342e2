use std::fmt::Write as _;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use sorter_engine::{PipelineEvent, ProgressSink, RunReport, RunStatus};
use sorter_logging::{sorter_debug, sorter_info, sorter_warn};

/// Logs one line per settled item and prints interactive hints to stdout.
#[derive(Debug, Default)]
pub struct ConsoleProgress {
    remaining: AtomicUsize,
}

impl ProgressSink for ConsoleProgress {
    fn emit(&self, event: PipelineEvent) {
        match event {
            PipelineEvent::RunStarted { remaining, .. } => {
                self.remaining.store(remaining, Ordering::Relaxed);
            }
            PipelineEvent::Recorded { index, outcome } => {
                let total = self.remaining.load(Ordering::Relaxed);
                let position = format!("[{}/{}]", index + 1, total);
                if !outcome.success {
                    sorter_warn!(
                        "{} {} FAILED: {}",
                        position,
                        outcome.title,
                        outcome.error.as_deref().unwrap_or("unknown error")
                    );
                } else if outcome.classification_error.is_some() {
                    sorter_info!("{} {} -> {} (fallback)", position, outcome.title, outcome.category);
                } else {
                    sorter_info!("{} {} -> {}", position, outcome.title, outcome.category);
                }
            }
            PipelineEvent::Abandoned { item_id, .. } => {
                println!("stopped before moving {item_id}; it will be retried next run");
            }
            PipelineEvent::Paused => println!("paused; type r to resume or q to stop"),
            PipelineEvent::Stage {
                item_id, stage, ..
            } => sorter_debug!("{} {}", item_id, stage),
            PipelineEvent::CheckpointSaved { settled } => {
                sorter_debug!("checkpoint holds {} settled item(s)", settled)
            }
        }
    }
}

pub fn format_summary(report: &RunReport) -> String {
    let summary = &report.summary;
    let mut out = String::new();
    let status = match report.status {
        RunStatus::Completed => "completed",
        RunStatus::AlreadyComplete => "nothing to do; every document is already settled",
        RunStatus::Stopped => "stopped",
    };
    let _ = writeln!(out, "Run {status}");
    let _ = writeln!(
        out,
        "  processed {} | succeeded {} | failed {} | success rate {:.1}%",
        summary.total,
        summary.succeeded,
        summary.failed,
        summary.success_rate * 100.0
    );
    if summary.degraded > 0 {
        let _ = writeln!(out, "  {} sent to the fallback category", summary.degraded);
    }
    if report.unsettled > 0 {
        let _ = writeln!(out, "  {} left for the next run", report.unsettled);
    }
    for (category, count) in &summary.category_distribution {
        let _ = writeln!(out, "  {category:<12} {count}");
    }
    if summary.total > 0 {
        let timing = &summary.timing;
        let _ = writeln!(
            out,
            "  per item: mean {} / min {} / max {}; wall clock {}",
            seconds(timing.mean),
            seconds(timing.min),
            seconds(timing.max),
            seconds(timing.wall_clock)
        );
    }
    out
}

fn seconds(duration: Duration) -> String {
    format!("{:.2}s", duration.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sorter_core::{CheckpointState, Outcome, ResultAggregator};

    fn outcome(category: &str, degraded: bool) -> Outcome {
        Outcome {
            item_id: format!("{category}.md"),
            title: category.to_string(),
            category: category.to_string(),
            tags: Vec::new(),
            elapsed: Duration::from_millis(500),
            success: true,
            error: None,
            classification_error: degraded.then(|| "timeout".to_string()),
            metadata: None,
            word_count: None,
            destination: None,
        }
    }

    #[test]
    fn summary_lists_counts_and_categories() {
        let mut results = ResultAggregator::new();
        results.record(outcome("工程技术", false));
        results.record(outcome("Other", true));
        let report = RunReport {
            status: RunStatus::Stopped,
            eligible: 3,
            skipped: 0,
            unsettled: 1,
            summary: results.summary(Duration::from_secs(2)),
            results,
            checkpoint: CheckpointState::new(),
        };

        let text = format_summary(&report);
        assert!(text.starts_with("Run stopped\n"));
        assert!(text.contains("processed 2 | succeeded 2 | failed 0 | success rate 100.0%"));
        assert!(text.contains("1 sent to the fallback category"));
        assert!(text.contains("1 left for the next run"));
        assert!(text.contains("工程技术"));
        assert!(text.contains("mean 0.50s"));
    }
}
