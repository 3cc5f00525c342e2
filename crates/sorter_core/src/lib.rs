//! Sorter core: pure state for the classification run.
//!
//! Nothing in this crate performs IO. The engine drives these types and
//! persists or logs them as needed.
mod aggregate;
mod category;
mod checkpoint;
mod control;
mod outcome;

pub use aggregate::{ResultAggregator, RunSummary, TimingStats};
pub use category::{CategorySet, ClassificationResult, MAX_TAGS, OTHER_CATEGORY};
pub use checkpoint::CheckpointState;
pub use control::{parse_console_line, ConsoleCommand, ControlCommand, ControlSignal, RunPhase};
pub use outcome::{ItemMetadata, ItemStage, Outcome, WorkItem};
