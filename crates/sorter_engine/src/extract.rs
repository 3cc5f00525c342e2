use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use sorter_core::ItemMetadata;
use thiserror::Error;

use crate::decode::decode_text;

pub const DEFAULT_MAX_CONTENT_CHARS: usize = 2000;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDocument {
    pub metadata: ItemMetadata,
    /// Cleaned body, truncated to the extractor's bound.
    pub body: String,
    /// Word count of the full cleaned body, before truncation.
    pub word_count: usize,
    pub encoding: String,
    pub truncated: bool,
}

pub trait Extractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<ExtractedDocument, ExtractError>;
}

/// Markdown extractor: decodes any common encoding, splits off a `---` fenced
/// front-matter block, strips markup, and bounds the body length.
#[derive(Debug, Clone)]
pub struct MarkdownExtractor {
    max_chars: usize,
}

impl Default for MarkdownExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONTENT_CHARS)
    }
}

impl MarkdownExtractor {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    /// Infallible core of extraction; malformed headers degrade to empty metadata.
    pub fn extract_bytes(&self, raw: &[u8]) -> ExtractedDocument {
        let decoded = decode_text(raw);
        let (metadata, body) = split_front_matter(&decoded.text);
        let cleaned = clean_body(body);
        let word_count = count_words(&cleaned);
        let (body, truncated) = truncate_chars(&cleaned, self.max_chars);
        ExtractedDocument {
            metadata,
            body: body.to_string(),
            word_count,
            encoding: decoded.encoding_label,
            truncated,
        }
    }
}

impl Extractor for MarkdownExtractor {
    fn extract(&self, path: &Path) -> Result<ExtractedDocument, ExtractError> {
        let raw = fs::read(path).map_err(|source| ExtractError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(self.extract_bytes(&raw))
    }
}

/// Split a leading front-matter block from the body.
///
/// Without a closing fence the whole text is treated as body.
pub fn split_front_matter(text: &str) -> (ItemMetadata, &str) {
    let mut metadata = ItemMetadata::new();
    let trimmed = text.trim_start_matches('\u{feff}');
    let Some(rest) = trimmed
        .strip_prefix("---\n")
        .or_else(|| trimmed.strip_prefix("---\r\n"))
    else {
        return (metadata, text);
    };

    let mut offset = 0;
    let mut closed = false;
    for line in rest.split_inclusive('\n') {
        offset += line.len();
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim() == "---" {
            closed = true;
            break;
        }
        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim();
            if key.is_empty() || key.starts_with('#') {
                continue;
            }
            let value = value.trim().trim_matches(['"', '\'']);
            metadata.insert(key, value);
        }
    }

    if !closed {
        return (ItemMetadata::new(), text);
    }
    (metadata, rest[offset..].trim_start_matches(['\r', '\n']))
}

static IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").expect("valid image pattern"));
static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").expect("valid link pattern"));
static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?[A-Za-z][^>]*>").expect("valid tag pattern"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

fn clean_body(body: &str) -> String {
    let text = IMAGE.replace_all(body, " ");
    let text = LINK.replace_all(&text, "$1");
    let text = HTML_TAG.replace_all(&text, " ");
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

fn truncate_chars(text: &str, max_chars: usize) -> (&str, bool) {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => (&text[..idx], true),
        None => (text, false),
    }
}

/// Words separated by whitespace, with each CJK ideograph counted on its own.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace()
        .map(|token| {
            let cjk = token.chars().filter(|c| is_cjk(*c)).count();
            let has_other = token.chars().any(|c| c.is_alphanumeric() && !is_cjk(c));
            cjk + usize::from(has_other)
        })
        .sum()
}

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}' | '\u{3400}'..='\u{4DBF}' | '\u{F900}'..='\u{FAFF}'
        | '\u{3040}'..='\u{30FF}' | '\u{AC00}'..='\u{D7AF}'
    )
}
