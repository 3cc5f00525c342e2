use std::path::Path;

use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};
use sorter_core::Outcome;

use crate::persist::{write_atomic, PersistError};
use crate::pipeline::{RunReport, RunStatus};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("persist report: {0}")]
    Persist(#[from] PersistError),
}

/// Build the JSON report for a finished run.
pub fn report_json(report: &RunReport) -> Value {
    let summary = &report.summary;
    let status = match report.status {
        RunStatus::Completed => "completed",
        RunStatus::AlreadyComplete => "already_complete",
        RunStatus::Stopped => "stopped",
    };
    json!({
        "generated_utc": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        "status": status,
        "eligible": report.eligible,
        "skipped": report.skipped,
        "unsettled": report.unsettled,
        "summary": {
            "total": summary.total,
            "succeeded": summary.succeeded,
            "failed": summary.failed,
            "success_rate": summary.success_rate,
            "degraded": summary.degraded,
            "category_distribution": summary.category_distribution,
            "mean_ms": summary.timing.mean.as_millis() as u64,
            "min_ms": summary.timing.min.as_millis() as u64,
            "max_ms": summary.timing.max.as_millis() as u64,
            "wall_clock_ms": summary.timing.wall_clock.as_millis() as u64,
        },
        "outcomes": report.results.outcomes().iter().map(outcome_json).collect::<Vec<_>>(),
    })
}

fn outcome_json(outcome: &Outcome) -> Value {
    let metadata = outcome.metadata.as_ref().map(|meta| {
        meta.iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect::<serde_json::Map<_, _>>()
    });
    json!({
        "file": outcome.item_id,
        "title": outcome.title,
        "category": outcome.category,
        "tags": outcome.tags,
        "success": outcome.success,
        "elapsed_ms": outcome.elapsed.as_millis() as u64,
        "error": outcome.error,
        "classification_error": outcome.classification_error,
        "word_count": outcome.word_count,
        "destination": outcome.destination.as_ref().map(|p| p.display().to_string()),
        "metadata": metadata,
    })
}

/// Atomically write the run report to `path`.
pub fn write_report(path: &Path, report: &RunReport) -> Result<(), ExportError> {
    let content = serde_json::to_vec_pretty(&report_json(report))?;
    write_atomic(path, &content)?;
    Ok(())
}
