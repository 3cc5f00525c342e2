use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One document discovered in the source directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    path: PathBuf,
    id: String,
    stem: String,
}

impl WorkItem {
    /// Returns `None` for paths without a UTF-8 file name.
    pub fn new(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let id = path.file_name()?.to_str()?.to_string();
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&id)
            .to_string();
        Some(Self { path, id, stem })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Identity used in checkpoints: the file name.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Title derived from the file name with its extension stripped.
    pub fn stem_title(&self) -> &str {
        &self.stem
    }

    /// Front-matter title if present, otherwise the stem title.
    pub fn title<'a>(&'a self, metadata: Option<&'a ItemMetadata>) -> &'a str {
        metadata
            .and_then(ItemMetadata::title)
            .unwrap_or(&self.stem)
    }

    pub fn has_extension(&self, extension: &str) -> bool {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(extension.trim_start_matches('.')))
    }
}

/// Structured header values pulled from a document, keyed by lowercase name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ItemMetadata {
    fields: BTreeMap<String, String>,
}

impl ItemMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.fields.insert(key.trim().to_lowercase(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn title(&self) -> Option<&str> {
        self.get("title")
    }

    pub fn author(&self) -> Option<&str> {
        self.get("author")
    }

    /// Integer-valued fields such as vote or comment counters.
    pub fn counter(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Where an item is in its per-item state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStage {
    Extracting,
    Classifying,
    Normalizing,
    Moving,
    Recorded,
}

impl fmt::Display for ItemStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ItemStage::Extracting => "extracting",
            ItemStage::Classifying => "classifying",
            ItemStage::Normalizing => "normalizing",
            ItemStage::Moving => "moving",
            ItemStage::Recorded => "recorded",
        };
        f.write_str(name)
    }
}

/// The immutable record of what happened to one item.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub item_id: String,
    pub title: String,
    pub category: String,
    pub tags: Vec<String>,
    pub elapsed: Duration,
    pub success: bool,
    /// Why the item failed; set only when `success` is false.
    pub error: Option<String>,
    /// Why classification degraded to `Other`, if it did.
    pub classification_error: Option<String>,
    pub metadata: Option<ItemMetadata>,
    pub word_count: Option<usize>,
    pub destination: Option<PathBuf>,
}

impl Outcome {
    /// Failed outcome carrying whatever was computed before the failure.
    pub fn failed(
        item: &WorkItem,
        stage: ItemStage,
        error: impl fmt::Display,
        metadata: Option<ItemMetadata>,
        elapsed: Duration,
    ) -> Self {
        Self {
            item_id: item.id().to_string(),
            title: item.title(metadata.as_ref()).to_string(),
            category: String::new(),
            tags: Vec::new(),
            elapsed,
            success: false,
            error: Some(format!("{stage}: {error}")),
            classification_error: None,
            word_count: None,
            destination: None,
            metadata,
        }
    }
}
