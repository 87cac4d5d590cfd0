use crate::errors::Result;
use crate::model::TimeRange;
use serde_json::Value;
use std::collections::BTreeMap;

/// One raw row of the event log, keyed by column name.
pub type RawEventRow = BTreeMap<String, Value>;

/// Read access to an audit log table (or anything shaped like one).
pub trait EventLogSource: Send + Sync {
    /// Whether the log exists at all.
    ///
    /// # Errors
    ///
    /// Any I/O failure; the adapter treats it as `Unavailable`.
    fn exists(&self) -> Result<bool>;

    /// Column names exposed by the log, exactly as stored.
    ///
    /// # Errors
    ///
    /// Any I/O failure; the adapter treats it as `Unavailable`.
    fn field_names(&self) -> Result<Vec<String>>;

    /// Rows whose `timestamp_field` falls inside `window`.
    ///
    /// Implementations may over-fetch; the adapter re-checks the window.
    ///
    /// # Errors
    ///
    /// Any I/O failure; the adapter treats it as `Unavailable`.
    fn query(&self, timestamp_field: &str, window: &TimeRange) -> Result<Vec<RawEventRow>>;
}

/// In-memory event log for embedding and tests.
///
/// `fields: None` models a log that does not exist.
#[derive(Debug, Clone, Default)]
pub struct MemoryEventLog {
    fields: Option<Vec<String>>,
    rows: Vec<RawEventRow>,
}

impl MemoryEventLog {
    pub fn new(fields: &[&str]) -> Self {
        Self {
            fields: Some(fields.iter().map(|f| f.to_string()).collect()),
            rows: Vec::new(),
        }
    }

    pub fn missing() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row: RawEventRow) {
        self.rows.push(row);
    }

    pub fn with_row(mut self, row: RawEventRow) -> Self {
        self.push(row);
        self
    }
}

impl EventLogSource for MemoryEventLog {
    fn exists(&self) -> Result<bool> {
        Ok(self.fields.is_some())
    }

    fn field_names(&self) -> Result<Vec<String>> {
        Ok(self.fields.clone().unwrap_or_default())
    }

    fn query(&self, _timestamp_field: &str, _window: &TimeRange) -> Result<Vec<RawEventRow>> {
        Ok(self.rows.clone())
    }
}
