//! Explicit engine configuration.
//!
//! The engine never reads ambient settings; everything it needs arrives in
//! an [`EngineSettings`] value built by the caller (usually from
//! `stocktake-config`).

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which event log, if any, enrichment reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSourceKind {
    /// Enrichment disabled; diff-derived transitions only
    #[default]
    None,
    /// The store's own update history, exposed in event-log shape
    Internal,
    /// A third-party audit log table
    External,
}

/// Behaviour when another generation holds the period lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockWait {
    #[default]
    Block,
    FailFast,
    Timeout(Duration),
}

/// Exact field names of the event log. Required names are never guessed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLogSchema {
    pub timestamp_field: String,
    pub message_field: Option<String>,
    pub context_field: Option<String>,
}

impl Default for EventLogSchema {
    fn default() -> Self {
        Self {
            timestamp_field: "date".to_string(),
            message_field: Some("message".to_string()),
            context_field: Some("context".to_string()),
        }
    }
}

impl EventLogSchema {
    /// Payload fields that may satisfy the "at least one" requirement
    pub fn payload_fields(&self) -> Vec<&str> {
        self.message_field
            .iter()
            .chain(self.context_field.iter())
            .map(String::as_str)
            .collect()
    }
}

/// Scheduled generation trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSettings {
    pub enabled: bool,
    /// 1..=28 so every month has the day
    pub day_of_month: u32,
    /// 0..=23, UTC
    pub hour: u32,
    pub lock_after_generation: bool,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            day_of_month: 1,
            hour: 9,
            lock_after_generation: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub event_source: EventSourceKind,
    /// Record component updates into the internal history
    pub track_update_history: bool,
    /// Days of history to keep; 0 keeps everything
    pub history_retention_days: u32,
    pub lock_wait: LockWait,
    pub event_log_schema: EventLogSchema,
    pub schedule: ScheduleSettings,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            event_source: EventSourceKind::None,
            track_update_history: true,
            history_retention_days: 180,
            lock_wait: LockWait::Block,
            event_log_schema: EventLogSchema::default(),
            schedule: ScheduleSettings::default(),
        }
    }
}
