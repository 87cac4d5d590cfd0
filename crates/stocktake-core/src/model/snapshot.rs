//! Persisted snapshot types.
//!
//! A `Snapshot` is the per-period header (lock flag, summary counts); a
//! `SnapshotRow` is one component's classified state within that period.

use crate::errors::{ExError, ExErrorKind};
use crate::model::period::PeriodKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a component changed relative to the prior snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    New,
    Updated,
    Deleted,
    Unchanged,
}

impl Classification {
    pub const ALL: [Classification; 4] = [
        Classification::New,
        Classification::Updated,
        Classification::Deleted,
        Classification::Unchanged,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::New => "new",
            Classification::Updated => "updated",
            Classification::Deleted => "deleted",
            Classification::Unchanged => "unchanged",
        }
    }

    /// Whether the component was installed at the end of the period
    pub fn is_installed(&self) -> bool {
        !matches!(self, Classification::Deleted)
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Classification {
    type Err = ExError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Classification::New),
            "updated" => Ok(Classification::Updated),
            "deleted" => Ok(Classification::Deleted),
            "unchanged" => Ok(Classification::Unchanged),
            other => Err(ExError::new(ExErrorKind::Serialization)
                .with_op("parse_classification")
                .with_message(format!("unknown classification '{}'", other))),
        }
    }
}

/// Where a row's `version_from`/`version_to` pair was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionSource {
    /// Snapshot-to-snapshot comparison
    #[default]
    Diff,
    /// Recovered from a matching event in the event log
    EventLog,
}

impl TransitionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionSource::Diff => "diff",
            TransitionSource::EventLog => "event_log",
        }
    }
}

impl FromStr for TransitionSource {
    type Err = ExError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "diff" => Ok(TransitionSource::Diff),
            "event_log" => Ok(TransitionSource::EventLog),
            other => Err(ExError::new(ExErrorKind::Serialization)
                .with_op("parse_transition_source")
                .with_message(format!("unknown transition source '{}'", other))),
        }
    }
}

/// Human-entered fields. Never derived, only carried forward.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Annotations {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub comments: String,
}

impl Annotations {
    pub fn is_empty(&self) -> bool {
        self.category.is_empty() && self.notes.is_empty() && self.comments.is_empty()
    }

    /// Apply a partial edit; `None` fields are left untouched.
    pub fn apply(&mut self, patch: &AnnotationPatch) {
        if let Some(category) = &patch.category {
            self.category = category.clone();
        }
        if let Some(notes) = &patch.notes {
            self.notes = notes.clone();
        }
        if let Some(comments) = &patch.comments {
            self.comments = comments.clone();
        }
    }
}

/// Partial annotation edit submitted by an external editor.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnnotationPatch {
    pub category: Option<String>,
    pub notes: Option<String>,
    pub comments: Option<String>,
}

impl AnnotationPatch {
    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.notes.is_none() && self.comments.is_none()
    }
}

/// One component's state within a period snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRow {
    pub period_key: PeriodKey,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub classification: Classification,
    pub version_from: String,
    pub version_to: String,
    pub current_version: String,
    pub active: bool,
    pub transition_source: TransitionSource,
    pub annotations: Annotations,
}

/// Counts per classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Summary {
    pub new: u32,
    pub updated: u32,
    pub deleted: u32,
    pub unchanged: u32,
}

impl Summary {
    /// Recount from a row set
    pub fn from_rows<'a>(rows: impl IntoIterator<Item = &'a SnapshotRow>) -> Self {
        let mut summary = Summary::default();
        for row in rows {
            summary.increment(row.classification);
        }
        summary
    }

    pub fn increment(&mut self, classification: Classification) {
        match classification {
            Classification::New => self.new += 1,
            Classification::Updated => self.updated += 1,
            Classification::Deleted => self.deleted += 1,
            Classification::Unchanged => self.unchanged += 1,
        }
    }

    pub fn count(&self, classification: Classification) -> u32 {
        match classification {
            Classification::New => self.new,
            Classification::Updated => self.updated,
            Classification::Deleted => self.deleted,
            Classification::Unchanged => self.unchanged,
        }
    }

    pub fn total(&self) -> u32 {
        self.new + self.updated + self.deleted + self.unchanged
    }
}

/// Per-period snapshot header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// UUIDv7 assigned on first generation
    pub snapshot_id: String,
    pub period_key: PeriodKey,
    pub locked: bool,
    pub summary: Summary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lifecycle state derived from the lock flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotState {
    Draft,
    Locked,
}

impl SnapshotState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotState::Draft => "draft",
            SnapshotState::Locked => "locked",
        }
    }
}

impl Snapshot {
    pub fn state(&self) -> SnapshotState {
        if self.locked {
            SnapshotState::Locked
        } else {
            SnapshotState::Draft
        }
    }
}
