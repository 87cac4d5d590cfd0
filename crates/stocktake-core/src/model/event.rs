use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How an event's fields were recovered from the raw log row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventOrigin {
    /// Read from named structured fields
    Structured,
    /// Parsed out of a free-text message
    Heuristic,
}

/// A component update recovered from the external event log.
///
/// Consumed transiently during enrichment and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalEvent {
    /// Component identifier as found in the log (slug or display name)
    pub slug: String,
    pub version_from: String,
    pub version_to: String,
    pub occurred_at: DateTime<Utc>,
    pub origin: EventOrigin,
}

impl ExternalEvent {
    /// Key used to drop duplicate deliveries of the same event
    pub fn dedup_key(&self) -> (String, String, DateTime<Utc>) {
        (self.slug.clone(), self.version_to.clone(), self.occurred_at)
    }
}

/// Outcome of probing and querying the event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceStatus {
    /// No event log configured, or it does not exist / cannot be reached
    Unavailable,
    /// The log exists but lacks required fields
    SchemaInvalid { missing: Vec<String> },
    /// The log is usable but yielded no update events in the window
    OkEmpty,
    /// The log yielded at least one usable update event
    Ok,
}

impl SourceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceStatus::Unavailable => "unavailable",
            SourceStatus::SchemaInvalid { .. } => "schema_invalid",
            SourceStatus::OkEmpty => "ok_empty",
            SourceStatus::Ok => "ok",
        }
    }

    /// Only `Ok` results may override diff-derived transitions
    pub fn is_usable(&self) -> bool {
        matches!(self, SourceStatus::Ok)
    }
}

impl fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
