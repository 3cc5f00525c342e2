//! Recovering a classification from free-form oracle replies.
//!
//! Strategies run in order and the first structurally valid match wins:
//! whole-reply JSON, a fenced ```json block, the smallest `{..}` span holding
//! a `"category"` key, independent `"category"`/`"tags"` field patterns, and
//! finally a literal scan for any known category name.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use sorter_core::{CategorySet, ClassificationResult};
use sorter_logging::sorter_trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseBranch {
    WholeJson,
    FencedJson,
    BraceSpan,
    FieldPattern,
    CategoryScan,
    /// Nothing matched; the result is `Other/[]`.
    Unmatched,
}

impl fmt::Display for ParseBranch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParseBranch::WholeJson => "whole-json",
            ParseBranch::FencedJson => "fenced-json",
            ParseBranch::BraceSpan => "brace-span",
            ParseBranch::FieldPattern => "field-pattern",
            ParseBranch::CategoryScan => "category-scan",
            ParseBranch::Unmatched => "unmatched",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReply {
    pub result: ClassificationResult,
    pub branch: ParseBranch,
}

static FENCED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[ \t]*(?i:json)[ \t]*\r?\n?(.*?)```").expect("valid fence pattern")
});
static BRACE_SPAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\{[^{}]*"category"[^{}]*\}"#).expect("valid brace pattern")
});
static CATEGORY_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""category"\s*:\s*"([^"]*)""#).expect("valid category pattern")
});
static TAGS_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""tags"\s*:\s*\[([^\]]*)\]"#).expect("valid tags pattern"));
static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]*)""#).expect("valid quoted pattern"));

/// Parse an oracle reply into a validated classification. Never fails.
pub fn parse_reply(reply: &str, categories: &CategorySet) -> ParsedReply {
    let trimmed = reply.trim();
    let found = |branch: ParseBranch, (category, tags): (String, Vec<String>)| {
        sorter_trace!("parse branch={} category={:?} tags={}", branch, category, tags.len());
        ParsedReply {
            result: ClassificationResult::new(categories, &category, tags),
            branch,
        }
    };

    if let Some(fields) = fields_from_json(trimmed) {
        return found(ParseBranch::WholeJson, fields);
    }
    sorter_trace!("parse branch={} missed", ParseBranch::WholeJson);

    if let Some(fields) = FENCED
        .captures_iter(trimmed)
        .find_map(|caps| fields_from_json(caps[1].trim()))
    {
        return found(ParseBranch::FencedJson, fields);
    }
    sorter_trace!("parse branch={} missed", ParseBranch::FencedJson);

    if let Some(fields) = BRACE_SPAN
        .find_iter(trimmed)
        .find_map(|m| fields_from_json(m.as_str()))
    {
        return found(ParseBranch::BraceSpan, fields);
    }
    sorter_trace!("parse branch={} missed", ParseBranch::BraceSpan);

    if let Some(caps) = CATEGORY_FIELD.captures(trimmed) {
        let tags: Vec<String> = TAGS_FIELD
            .captures(trimmed)
            .map(|tags| {
                QUOTED
                    .captures_iter(&tags[1])
                    .map(|q| q[1].to_string())
                    .collect()
            })
            .unwrap_or_default();
        return found(ParseBranch::FieldPattern, (caps[1].to_string(), tags));
    }
    sorter_trace!("parse branch={} missed", ParseBranch::FieldPattern);

    if let Some(name) = categories.find_in_text(trimmed) {
        return found(ParseBranch::CategoryScan, (name.to_string(), Vec::new()));
    }
    sorter_trace!("parse branch={} missed; falling back to Other", ParseBranch::CategoryScan);

    ParsedReply {
        result: ClassificationResult::other(),
        branch: ParseBranch::Unmatched,
    }
}

/// A JSON object with a string `category` and an optional array of string `tags`.
fn fields_from_json(text: &str) -> Option<(String, Vec<String>)> {
    let value: Value = serde_json::from_str(text).ok()?;
    let object = value.as_object()?;
    let category = object.get("category")?.as_str()?.to_string();
    let tags = object
        .get("tags")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    Some((category, tags))
}
