//! Ordered extraction strategies for turning a raw log row into an event.
//!
//! Strategies run in a fixed order and the first one that yields both a
//! component identifier and a version target wins: structured context keys,
//! then top-level columns, then free text phrasings over the message.

use crate::model::EventOrigin;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

/// Keys that may carry the component identifier.
pub const SLUG_KEYS: &[&str] = &[
    "plugin_slug",
    "component_slug",
    "slug",
    "plugin",
    "component",
    "plugin_name",
    "component_name",
    "name",
];

/// Keys that may carry the version before the update.
pub const FROM_KEYS: &[&str] = &[
    "plugin_prev_version",
    "previous_version",
    "old_version",
    "version_from",
    "from_version",
    "prev_version",
];

/// Keys that may carry the version after the update.
pub const TO_KEYS: &[&str] = &[
    "plugin_version",
    "new_version",
    "version_to",
    "to_version",
    "version",
];

const NAME: &str = r#"["“]?(?P<name>[^"”()]+?)["”]?"#;
const FROM: &str = r"v?(?P<from>[0-9][0-9A-Za-z.+_-]*)";
const TO: &str = r"v?(?P<to>[0-9][0-9A-Za-z.+_-]*)";
const KIND: &str = r"(?:plugin|component|extension|module)";

static PHRASINGS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        (
            "updated_x_from_to",
            format!(r"(?i)\bupdated\s+{KIND}\s*:?\s*{NAME}\s+from\s+(?:version\s+)?{FROM}\s+to\s+(?:version\s+)?{TO}"),
        ),
        (
            "x_updated_from_to",
            format!(r"(?i)\b{KIND}\s*:?\s*{NAME}\s+(?:was\s+)?(?:updated|upgraded)\s+from\s+(?:version\s+)?{FROM}\s+to\s+(?:version\s+)?{TO}"),
        ),
        (
            "updated_x_arrow",
            format!(r"(?i)\b(?:updated|upgraded)\s+{KIND}\s*:?\s*{NAME}\s*\(\s*{FROM}\s*(?:->|→|=>|to)\s*{TO}\s*\)"),
        ),
        (
            "updated_x_to",
            format!(r"(?i)\b(?:updated|upgraded)\s+{KIND}\s*:?\s*{NAME}\s+to\s+(?:version\s+)?{TO}"),
        ),
    ]
    .into_iter()
    .filter_map(|(name, pattern)| Regex::new(&pattern).ok().map(|re| (name, re)))
    .collect()
});

/// Fields recovered from one row, before timestamp handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub slug: String,
    pub version_from: String,
    pub version_to: String,
    pub origin: EventOrigin,
    /// Name of the strategy that produced the match
    pub strategy: &'static str,
}

/// Input view shared by every strategy.
pub struct RowView<'a> {
    pub context: Option<&'a Map<String, Value>>,
    pub columns: &'a Map<String, Value>,
    pub message: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractorStrategy {
    StructuredContext,
    StructuredColumns,
    MessagePhrasing,
}

impl ExtractorStrategy {
    pub const ORDERED: [ExtractorStrategy; 3] = [
        ExtractorStrategy::StructuredContext,
        ExtractorStrategy::StructuredColumns,
        ExtractorStrategy::MessagePhrasing,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ExtractorStrategy::StructuredContext => "structured_context",
            ExtractorStrategy::StructuredColumns => "structured_columns",
            ExtractorStrategy::MessagePhrasing => "message_phrasing",
        }
    }

    pub fn extract(&self, row: &RowView<'_>) -> Option<Extracted> {
        match self {
            ExtractorStrategy::StructuredContext => row
                .context
                .and_then(|context| from_keys(context, self.name())),
            ExtractorStrategy::StructuredColumns => from_keys(row.columns, self.name()),
            ExtractorStrategy::MessagePhrasing => row.message.and_then(from_message),
        }
    }
}

/// Run the strategies in order; first usable hit wins.
pub fn extract(row: &RowView<'_>) -> Option<Extracted> {
    ExtractorStrategy::ORDERED
        .iter()
        .find_map(|strategy| strategy.extract(row))
}

fn from_keys(map: &Map<String, Value>, strategy: &'static str) -> Option<Extracted> {
    let version_to = first_string(map, TO_KEYS)?;
    let slug = first_string(map, SLUG_KEYS)
        .map(|s| normalize_identifier(&s))
        .filter(|s| !s.is_empty())?;
    Some(Extracted {
        slug,
        version_from: first_string(map, FROM_KEYS).unwrap_or_default(),
        version_to,
        origin: EventOrigin::Structured,
        strategy,
    })
}

fn from_message(message: &str) -> Option<Extracted> {
    PHRASINGS.iter().find_map(|(name, re)| {
        let caps = re.captures(message)?;
        let group = |g: &str| {
            caps.name(g)
                .map(|m| trim_version(m.as_str()))
                .unwrap_or_default()
        };
        let version_to = group("to");
        if version_to.is_empty() {
            return None;
        }
        Some(Extracted {
            slug: caps
                .name("name")
                .map(|m| normalize_identifier(m.as_str()))
                .unwrap_or_default(),
            version_from: group("from"),
            version_to,
            origin: EventOrigin::Heuristic,
            strategy: *name,
        })
    })
}

fn first_string(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match map.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn trim_version(raw: &str) -> String {
    raw.trim().trim_end_matches(['.', ',', ';', '-']).to_string()
}

/// Normalise a component identifier as found in a log.
///
/// Path-like identifiers (`akismet/akismet.php`) reduce to their first
/// segment; everything is trimmed and lowercased.
pub fn normalize_identifier(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches(|c| c == '"' || c == '\'');
    let first = trimmed.split('/').next().unwrap_or(trimmed);
    first.trim().to_lowercase()
}

/// Lowercase, alphanumerics only, runs of anything else collapsed to `-`.
pub fn slugify(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_dash = false;
    for c in raw.trim().chars() {
        if c.is_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    out
}
