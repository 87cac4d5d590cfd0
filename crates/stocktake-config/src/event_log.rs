use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use stocktake_core::settings::{EventLogSchema, EventSourceKind};

use crate::ConfigError;

/// `[event_log]`: optional enrichment source.
///
/// Field names are used exactly as written; a log lacking them is reported
/// as schema-invalid and enrichment is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EventLogConfig {
    pub source: EventSourceKind,
    /// Database holding an external log; ignored for `internal`
    pub path: Option<PathBuf>,
    /// Table or view of an external log
    pub table: String,
    pub timestamp_field: String,
    /// Empty string disables the field
    pub message_field: String,
    /// Empty string disables the field
    pub context_field: String,
}

impl Default for EventLogConfig {
    fn default() -> Self {
        let schema = EventLogSchema::default();
        Self {
            source: EventSourceKind::None,
            path: None,
            table: "event_log".to_string(),
            timestamp_field: schema.timestamp_field,
            message_field: schema.message_field.unwrap_or_default(),
            context_field: schema.context_field.unwrap_or_default(),
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl EventLogConfig {
    /// # Errors
    ///
    /// `InvalidValue` when the timestamp field is blank, or when an
    /// external source has no path.
    pub fn schema(&self) -> Result<EventLogSchema, ConfigError> {
        let timestamp_field = non_empty(&self.timestamp_field)
            .ok_or_else(|| ConfigError::invalid("event_log.timestamp_field", "must not be empty"))?;
        if self.source == EventSourceKind::External && self.path.is_none() {
            return Err(ConfigError::invalid(
                "event_log.path",
                "required when source = \"external\"",
            ));
        }
        Ok(EventLogSchema {
            timestamp_field,
            message_field: non_empty(&self.message_field),
            context_field: non_empty(&self.context_field),
        })
    }
}
