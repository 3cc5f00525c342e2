//! Sorter engine: provider plumbing, classification, and the batch pipeline.
mod checkpoint;
mod classify;
mod control;
mod decode;
mod export;
mod extract;
mod normalize;
mod parse;
mod persist;
mod pipeline;
mod provider;
mod relocate;
mod selector;
mod types;

pub use checkpoint::{CheckpointError, CheckpointInfo, CheckpointStore, DEFAULT_CHECKPOINT_FILE};
pub use classify::{Classification, ClassificationClient, Classifier, ClassifySettings};
pub use control::RunController;
pub use decode::{decode_text, DecodedText};
pub use export::{report_json, write_report, ExportError};
pub use extract::{
    count_words, split_front_matter, ExtractError, ExtractedDocument, Extractor,
    MarkdownExtractor, DEFAULT_MAX_CONTENT_CHARS,
};
pub use normalize::{TagNormalizer, VocabularyNormalizer};
pub use parse::{parse_reply, ParseBranch, ParsedReply};
pub use persist::{ensure_dir, write_atomic, PersistError};
pub use pipeline::{
    discover_items, Pipeline, PipelineError, PipelineSettings, RunReport, RunStatus,
    DEFAULT_CHECKPOINT_EVERY,
};
pub use provider::{
    ActiveProvider, ProbeStatus, ProviderConfig, ProviderError, ProviderRegistry,
    DEFAULT_PROBE_TIMEOUT,
};
pub use relocate::{move_into, MoveError};
pub use selector::{ProviderSelector, SelectionPolicy};
pub use types::{ClassifyError, FailureKind, NullSink, PipelineEvent, ProgressSink};
