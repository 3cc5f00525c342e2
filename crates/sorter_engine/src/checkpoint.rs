use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sorter_core::CheckpointState;
use sorter_logging::{sorter_debug, sorter_info};
use thiserror::Error;

use crate::persist::{write_atomic, PersistError};

pub const DEFAULT_CHECKPOINT_FILE: &str = ".mdsort_checkpoint.json";

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint at {path} is unreadable: {message}")]
    Corrupt { path: PathBuf, message: String },
    #[error("processed and failed sets overlap ({0} ids)")]
    Overlap(usize),
    #[error("serialize checkpoint: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("persist checkpoint: {0}")]
    Persist(#[from] PersistError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// On-disk shape of a checkpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CheckpointDocument {
    #[serde(default)]
    processed_files: Vec<String>,
    #[serde(default)]
    failed_files: Vec<String>,
    #[serde(default)]
    last_save_time: Option<DateTime<Utc>>,
    #[serde(default)]
    total_processed: usize,
}

/// Summary of a saved checkpoint, for status reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointInfo {
    pub processed: usize,
    pub failed: usize,
    pub saved_at: Option<DateTime<Utc>>,
}

/// Durable store for [`CheckpointState`].
///
/// Every save rewrites the whole file atomically, and saves are serialized by
/// a writer lock so concurrent callers cannot interleave.
#[derive(Debug)]
pub struct CheckpointStore {
    path: PathBuf,
    writer: Mutex<()>,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the last saved state; a missing file is an empty state.
    pub fn load(&self) -> Result<CheckpointState, CheckpointError> {
        Ok(match self.read_document()? {
            Some(doc) => CheckpointState::from_sets(doc.processed_files, doc.failed_files),
            None => CheckpointState::new(),
        })
    }

    pub fn info(&self) -> Result<Option<CheckpointInfo>, CheckpointError> {
        Ok(self.read_document()?.map(|doc| {
            let state = CheckpointState::from_sets(doc.processed_files, doc.failed_files);
            CheckpointInfo {
                processed: state.processed().len(),
                failed: state.failed().len(),
                saved_at: doc.last_save_time,
            }
        }))
    }

    /// Overwrite the checkpoint with `state`. Returns the save timestamp.
    pub fn save(&self, state: &CheckpointState) -> Result<DateTime<Utc>, CheckpointError> {
        if !state.is_disjoint() {
            let overlap = state.processed().intersection(state.failed()).count();
            return Err(CheckpointError::Overlap(overlap));
        }
        let saved_at = Utc::now();
        let doc = CheckpointDocument {
            processed_files: state.processed().iter().cloned().collect(),
            failed_files: state.failed().iter().cloned().collect(),
            last_save_time: Some(saved_at),
            total_processed: state.settled_count(),
        };
        let content = serde_json::to_vec_pretty(&doc)?;

        let _guard = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        write_atomic(&self.path, &content)?;
        sorter_debug!(
            "checkpoint saved to {:?}: {} processed, {} failed",
            self.path,
            doc.processed_files.len(),
            doc.failed_files.len()
        );
        Ok(saved_at)
    }

    /// Delete the checkpoint file if present.
    pub fn clear(&self) -> Result<(), CheckpointError> {
        let _guard = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match fs::remove_file(&self.path) {
            Ok(()) => {
                sorter_info!("checkpoint {:?} cleared", self.path);
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(CheckpointError::Io(err)),
        }
    }

    fn read_document(&self) -> Result<Option<CheckpointDocument>, CheckpointError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(CheckpointError::Io(err)),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|err| CheckpointError::Corrupt {
                path: self.path.clone(),
                message: err.to_string(),
            })
    }
}
