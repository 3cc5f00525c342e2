use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use sorter_core::{
    CategorySet, CheckpointState, ItemStage, Outcome, ResultAggregator, RunPhase, RunSummary,
    WorkItem,
};
use sorter_logging::{sorter_debug, sorter_error, sorter_info, sorter_warn};
use thiserror::Error;

use crate::checkpoint::CheckpointStore;
use crate::classify::Classifier;
use crate::control::RunController;
use crate::extract::Extractor;
use crate::normalize::TagNormalizer;
use crate::persist::{ensure_dir, PersistError};
use crate::relocate::move_into;
use crate::types::{NullSink, PipelineEvent, ProgressSink};

pub const DEFAULT_CHECKPOINT_EVERY: usize = 10;

/// Conditions that prevent a run from starting at all.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("source directory missing: {0}")]
    SourceMissing(PathBuf),
    #[error("no .{extension} files in {dir}")]
    NoEligibleItems { dir: PathBuf, extension: String },
    #[error("cannot list {dir}: {source}")]
    Listing {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot prepare category folders: {0}")]
    Folders(#[from] PersistError),
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub source_dir: PathBuf,
    pub target_dir: PathBuf,
    /// Only files with this extension are work items.
    pub extension: String,
    pub categories: CategorySet,
    /// Persist the checkpoint after this many recorded items.
    pub checkpoint_every: usize,
    /// Pause between items to stay under provider rate limits.
    pub pace: Duration,
    /// Forget previously failed items so they are attempted again.
    pub retry_failed: bool,
}

impl PipelineSettings {
    pub fn new(source_dir: impl Into<PathBuf>, target_dir: impl Into<PathBuf>, categories: CategorySet) -> Self {
        Self {
            source_dir: source_dir.into(),
            target_dir: target_dir.into(),
            extension: "md".to_string(),
            categories,
            checkpoint_every: DEFAULT_CHECKPOINT_EVERY,
            pace: Duration::from_millis(100),
            retry_failed: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every remaining item was attempted.
    Completed,
    /// The checkpoint already covered every item; nothing was done.
    AlreadyComplete,
    /// A stop request ended the run early.
    Stopped,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub status: RunStatus,
    pub eligible: usize,
    /// Files in the source directory that are not work items.
    pub skipped: usize,
    /// Items still unsettled when the run ended.
    pub unsettled: usize,
    pub results: ResultAggregator,
    pub summary: RunSummary,
    pub checkpoint: CheckpointState,
}

/// Lists work items in `dir`, sorted by file name. Returns the items and the
/// count of skipped non-target files.
pub fn discover_items(dir: &Path, extension: &str) -> Result<(Vec<WorkItem>, usize), PipelineError> {
    if !dir.is_dir() {
        return Err(PipelineError::SourceMissing(dir.to_path_buf()));
    }
    let listing = |source: io::Error| PipelineError::Listing {
        dir: dir.to_path_buf(),
        source,
    };
    let mut items = Vec::new();
    let mut skipped = 0;
    for entry in fs::read_dir(dir).map_err(listing)? {
        let entry = entry.map_err(listing)?;
        if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
            continue;
        }
        match WorkItem::new(entry.path()) {
            Some(item) if item.has_extension(extension) => items.push(item),
            _ => skipped += 1,
        }
    }
    items.sort_by(|a, b| a.id().cmp(b.id()));
    Ok((items, skipped))
}

enum ItemResult {
    Recorded(Outcome),
    Abandoned,
}

/// Drives items one at a time through extract, classify, normalize, move, record.
pub struct Pipeline {
    classifier: Arc<dyn Classifier>,
    extractor: Arc<dyn Extractor>,
    normalizer: Arc<dyn TagNormalizer>,
    store: Arc<CheckpointStore>,
    controller: RunController,
    sink: Arc<dyn ProgressSink>,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        extractor: Arc<dyn Extractor>,
        normalizer: Arc<dyn TagNormalizer>,
        store: Arc<CheckpointStore>,
        controller: RunController,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            classifier,
            extractor,
            normalizer,
            store,
            controller,
            sink: Arc::new(NullSink),
            settings,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    pub async fn run(&self) -> Result<RunReport, PipelineError> {
        let started = Instant::now();
        let (items, skipped) = discover_items(&self.settings.source_dir, &self.settings.extension)?;
        if items.is_empty() {
            return Err(PipelineError::NoEligibleItems {
                dir: self.settings.source_dir.clone(),
                extension: self.settings.extension.clone(),
            });
        }

        let mut state = match self.store.load() {
            Ok(state) => state,
            Err(err) => {
                sorter_warn!("ignoring unusable checkpoint: {}", err);
                CheckpointState::new()
            }
        };
        if self.settings.retry_failed {
            let cleared = state.clear_failed();
            if cleared > 0 {
                sorter_info!("re-queued {} previously failed item(s)", cleared);
            }
        }

        let remaining = state.remaining(&items);
        sorter_info!(
            "found {} item(s) ({} skipped); {} already settled, {} remaining",
            items.len(),
            skipped,
            items.len() - remaining.len(),
            remaining.len()
        );
        self.sink.emit(PipelineEvent::RunStarted {
            eligible: items.len(),
            remaining: remaining.len(),
        });

        let mut results = ResultAggregator::new();
        if remaining.is_empty() {
            sorter_info!("all items already settled; nothing to do");
            return Ok(RunReport {
                status: RunStatus::AlreadyComplete,
                eligible: items.len(),
                skipped,
                unsettled: 0,
                summary: results.summary(started.elapsed()),
                results,
                checkpoint: state,
            });
        }

        for folder in self.settings.categories.folder_names() {
            ensure_dir(&self.settings.target_dir.join(folder))?;
        }

        let total = remaining.len();
        let mut status = RunStatus::Completed;
        let mut since_save = 0;
        for (index, item) in remaining.into_iter().enumerate() {
            if self.wait_for_go().await == RunPhase::Stopping {
                sorter_info!("stop requested; {} item(s) left unsettled", total - index);
                status = RunStatus::Stopped;
                break;
            }

            match self.process_item(index, item).await {
                ItemResult::Recorded(outcome) => {
                    if outcome.success {
                        state.mark_processed(item.id());
                    } else {
                        state.mark_failed(item.id());
                    }
                    self.sink.emit(PipelineEvent::Recorded {
                        index,
                        outcome: outcome.clone(),
                    });
                    results.record(outcome);
                    since_save += 1;
                    if since_save >= self.settings.checkpoint_every.max(1) {
                        self.save_checkpoint(&state);
                        since_save = 0;
                    }
                }
                ItemResult::Abandoned => {
                    sorter_info!("stop requested before moving {}; left unsettled", item.id());
                    self.sink.emit(PipelineEvent::Abandoned {
                        index,
                        item_id: item.id().to_string(),
                    });
                    status = RunStatus::Stopped;
                    break;
                }
            }

            if index + 1 < total && !self.settings.pace.is_zero() {
                tokio::time::sleep(self.settings.pace).await;
            }
        }

        self.save_checkpoint(&state);

        let summary = results.summary(started.elapsed());
        Ok(RunReport {
            status,
            eligible: items.len(),
            skipped,
            unsettled: state.remaining(&items).len(),
            summary,
            results,
            checkpoint: state,
        })
    }

    async fn wait_for_go(&self) -> RunPhase {
        if self.controller.phase() == RunPhase::Paused {
            sorter_info!("paused; waiting for resume");
            self.sink.emit(PipelineEvent::Paused);
        }
        self.controller.wait_until_runnable().await
    }

    async fn process_item(&self, index: usize, item: &WorkItem) -> ItemResult {
        let started = Instant::now();
        let stage = |stage: ItemStage| {
            self.sink.emit(PipelineEvent::Stage {
                index,
                item_id: item.id().to_string(),
                stage,
            });
        };

        stage(ItemStage::Extracting);
        let document = match self.extractor.extract(item.path()) {
            Ok(document) => document,
            Err(err) => {
                sorter_error!("extract {} failed: {}", item.id(), err);
                return ItemResult::Recorded(Outcome::failed(
                    item,
                    ItemStage::Extracting,
                    err,
                    None,
                    started.elapsed(),
                ));
            }
        };
        let title = item.title(Some(&document.metadata)).to_string();

        stage(ItemStage::Classifying);
        let classification = self.classifier.classify(&title, &document.body).await;

        stage(ItemStage::Normalizing);
        let category = classification.result.category().to_string();
        let tags = self
            .normalizer
            .normalize(classification.result.tags(), &category);

        if self.wait_for_go().await == RunPhase::Stopping {
            return ItemResult::Abandoned;
        }

        stage(ItemStage::Moving);
        let destination = match move_into(item.path(), &self.settings.target_dir, &category) {
            Ok(destination) => destination,
            Err(err) => {
                sorter_error!("move {} -> {} failed: {}", item.id(), category, err);
                return ItemResult::Recorded(Outcome::failed(
                    item,
                    ItemStage::Moving,
                    err,
                    Some(document.metadata),
                    started.elapsed(),
                ));
            }
        };
        sorter_debug!("moved {} -> {}", item.id(), destination.display());

        stage(ItemStage::Recorded);
        ItemResult::Recorded(Outcome {
            item_id: item.id().to_string(),
            title,
            category,
            tags,
            elapsed: started.elapsed(),
            success: true,
            error: None,
            classification_error: classification.error.map(|e| e.to_string()),
            metadata: Some(document.metadata),
            word_count: Some(document.word_count),
            destination: Some(destination),
        })
    }

    fn save_checkpoint(&self, state: &CheckpointState) {
        match self.store.save(state) {
            Ok(_) => self.sink.emit(PipelineEvent::CheckpointSaved {
                settled: state.settled_count(),
            }),
            Err(err) => sorter_error!("checkpoint save failed, previous checkpoint kept: {}", err),
        }
    }
}
