//! TOML configuration for `mdsort`.
//!
//! Every section carries serde defaults, so a file containing only
//! `[[providers]]` entries is complete. A missing file yields the defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use sorter_core::CategorySet;
use sorter_engine::{
    ClassifySettings, MarkdownExtractor, PipelineSettings, ProviderConfig, SelectionPolicy,
    VocabularyNormalizer, DEFAULT_CHECKPOINT_FILE,
};
use sorter_logging::sorter_warn;

pub const DEFAULT_CONFIG_FILE: &str = "mdsort.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub classification: ClassificationConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default = "default_providers")]
    pub providers: Vec<ProviderEntry>,
    #[serde(default)]
    pub tags: TagsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_dir")]
    pub source_dir: PathBuf,
    #[serde(default = "default_dir")]
    pub target_dir: PathBuf,
    #[serde(default = "default_checkpoint_file")]
    pub checkpoint_file: PathBuf,
    #[serde(default = "default_report_file")]
    pub report_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            source_dir: default_dir(),
            target_dir: default_dir(),
            checkpoint_file: default_checkpoint_file(),
            report_file: default_report_file(),
        }
    }
}

fn default_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_checkpoint_file() -> PathBuf {
    PathBuf::from(DEFAULT_CHECKPOINT_FILE)
}

fn default_report_file() -> PathBuf {
    PathBuf::from("mdsort_report.json")
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_extension")]
    pub extension: String,
    #[serde(default = "default_checkpoint_every")]
    pub checkpoint_every: usize,
    #[serde(default = "default_pace_ms")]
    pub pace_ms: u64,
    #[serde(default)]
    pub retry_failed: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            extension: default_extension(),
            checkpoint_every: default_checkpoint_every(),
            pace_ms: default_pace_ms(),
            retry_failed: false,
        }
    }
}

fn default_extension() -> String {
    "md".to_string()
}

fn default_checkpoint_every() -> usize {
    sorter_engine::DEFAULT_CHECKPOINT_EVERY
}

fn default_pace_ms() -> u64 {
    100
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassificationConfig {
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_secs")]
    pub backoff_step_secs: u64,
    #[serde(default = "default_backoff_secs")]
    pub backoff_floor_secs: u64,
    #[serde(default = "default_backoff_cap_secs")]
    pub backoff_cap_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            categories: default_categories(),
            max_attempts: default_max_attempts(),
            backoff_step_secs: default_backoff_secs(),
            backoff_floor_secs: default_backoff_secs(),
            backoff_cap_secs: default_backoff_cap_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            max_content_chars: default_max_content_chars(),
        }
    }
}

fn default_categories() -> Vec<String> {
    [
        "自然科学", "人文社科", "学习成长", "哲学思辨", "工程技术", "财经投资", "时事时政",
        "情感生活", "体育健康", "文娱艺术", "搞笑趣闻", "外貌穿搭",
    ]
    .iter()
    .map(|c| c.to_string())
    .collect()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_secs() -> u64 {
    2
}

fn default_backoff_cap_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_probe_timeout_secs() -> u64 {
    sorter_engine::DEFAULT_PROBE_TIMEOUT.as_secs()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_max_tokens() -> u32 {
    200
}

fn default_max_content_chars() -> usize {
    sorter_engine::DEFAULT_MAX_CONTENT_CHARS
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    #[default]
    Auto,
    Fixed,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SelectionConfig {
    #[serde(default)]
    pub policy: PolicyKind,
    #[serde(default)]
    pub preferred: Option<String>,
}

#[derive(Clone, Deserialize)]
pub struct ProviderEntry {
    pub id: String,
    pub base_url: String,
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Environment variable holding the key; used when `api_key` is absent.
    #[serde(default)]
    pub api_key_env: Option<String>,
}

impl std::fmt::Debug for ProviderEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderEntry")
            .field("id", &self.id)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_key_env", &self.api_key_env)
            .finish()
    }
}

fn default_providers() -> Vec<ProviderEntry> {
    vec![ProviderEntry {
        id: "deepseek".to_string(),
        base_url: "https://api.deepseek.com/v1".to_string(),
        model: "deepseek-chat".to_string(),
        api_key: None,
        api_key_env: Some("DEEPSEEK_API_KEY".to_string()),
    }]
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TagsConfig {
    /// Allowed tags per category.
    #[serde(default)]
    pub vocabulary: BTreeMap<String, Vec<String>>,
    /// Alias -> canonical tag.
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

/// Read and validate the config at `path`. A missing file yields defaults.
pub fn load_config(path: &Path) -> Result<Config> {
    let config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        parse_config(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?
    } else {
        sorter_warn!("config {} not found; using defaults", path.display());
        parse_config("")?
    };
    config.validate()?;
    Ok(config)
}

fn parse_config(content: &str) -> Result<Config> {
    Ok(toml::from_str(content)?)
}

impl Config {
    fn validate(&self) -> Result<()> {
        if self.categories().names().is_empty() {
            bail!("classification.categories must name at least one category");
        }
        if self.classification.max_attempts == 0 {
            bail!("classification.max_attempts must be >= 1");
        }
        if self.classification.max_content_chars == 0 {
            bail!("classification.max_content_chars must be > 0");
        }
        if self.run.checkpoint_every == 0 {
            bail!("run.checkpoint_every must be >= 1");
        }
        if self.run.extension.trim().is_empty() {
            bail!("run.extension must not be empty");
        }
        if self.selection.policy == PolicyKind::Fixed && self.selection.preferred.is_none() {
            bail!("selection.preferred is required when selection.policy = \"fixed\"");
        }
        for provider in &self.providers {
            if provider.api_key.is_none() && provider.api_key_env.is_none() {
                bail!("provider {} needs api_key or api_key_env", provider.id);
            }
        }
        Ok(())
    }

    pub fn apply_overrides(&mut self, source: Option<PathBuf>, target: Option<PathBuf>, retry_failed: bool) {
        if let Some(source) = source {
            self.paths.source_dir = source;
        }
        if let Some(target) = target {
            self.paths.target_dir = target;
        }
        self.run.retry_failed |= retry_failed;
    }

    pub fn categories(&self) -> CategorySet {
        CategorySet::new(self.classification.categories.iter().map(String::as_str))
    }

    /// Resolve credentials. A key that cannot be resolved stays empty, which
    /// the provider reports as misconfigured when it is used.
    pub fn provider_configs(&self) -> Vec<ProviderConfig> {
        self.providers
            .iter()
            .map(|entry| ProviderConfig {
                id: entry.id.clone(),
                base_url: entry.base_url.clone(),
                model: entry.model.clone(),
                api_key: resolve_api_key(entry),
            })
            .collect()
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.classification.probe_timeout_secs)
    }

    /// `--fixed` wins over `--provider`, which wins over the file.
    pub fn selection_policy(&self, provider: Option<&str>, fixed: Option<&str>) -> SelectionPolicy {
        if let Some(id) = fixed {
            return SelectionPolicy::Fixed(id.to_string());
        }
        let preferred = provider
            .map(str::to_string)
            .or_else(|| self.selection.preferred.clone());
        match (self.selection.policy, preferred) {
            (PolicyKind::Fixed, Some(id)) if provider.is_none() => SelectionPolicy::Fixed(id),
            (_, preferred) => SelectionPolicy::Auto { preferred },
        }
    }

    pub fn classify_settings(&self) -> ClassifySettings {
        let c = &self.classification;
        ClassifySettings {
            max_attempts: c.max_attempts,
            backoff_step: Duration::from_secs(c.backoff_step_secs),
            backoff_floor: Duration::from_secs(c.backoff_floor_secs),
            backoff_cap: Duration::from_secs(c.backoff_cap_secs),
            request_timeout: Duration::from_secs(c.request_timeout_secs),
            temperature: c.temperature,
            max_tokens: c.max_tokens,
        }
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        let mut settings = PipelineSettings::new(
            &self.paths.source_dir,
            &self.paths.target_dir,
            self.categories(),
        );
        settings.extension = self.run.extension.trim_start_matches('.').to_string();
        settings.checkpoint_every = self.run.checkpoint_every;
        settings.pace = Duration::from_millis(self.run.pace_ms);
        settings.retry_failed = self.run.retry_failed;
        settings
    }

    pub fn extractor(&self) -> MarkdownExtractor {
        MarkdownExtractor::new(self.classification.max_content_chars)
    }

    pub fn normalizer(&self) -> VocabularyNormalizer {
        VocabularyNormalizer::new(self.tags.vocabulary.clone(), self.tags.aliases.clone())
    }
}

fn resolve_api_key(entry: &ProviderEntry) -> String {
    if let Some(key) = entry.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
        return key.to_string();
    }
    let Some(var) = entry.api_key_env.as_deref() else {
        return String::new();
    };
    match std::env::var(var) {
        Ok(key) => key,
        Err(_) => {
            sorter_warn!("provider {}: environment variable {} is not set", entry.id, var);
            String::new()
        }
    }
}
