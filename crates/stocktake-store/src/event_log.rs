//! SQLite-backed event log over any table or view.

use crate::errors::{sqlite_op, Result};
use crate::history::{format_updated_on, HISTORY_EVENTS_VIEW};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use stocktake_core::errors::{ExError, StocktakeError};
use stocktake_core::eventlog::{EventLogSource, RawEventRow};
use stocktake_core::model::TimeRange;

/// Padding around the SQL pre-filter; covers any UTC offset.
fn query_slack() -> chrono::Duration {
    chrono::Duration::days(1)
}

/// Read-only view of an audit log table in a SQLite database.
///
/// Opens a fresh read-only connection per call, so a missing database file
/// simply reports `exists() == false`.
#[derive(Debug, Clone)]
pub struct SqliteEventLog {
    path: PathBuf,
    table: String,
    busy_timeout: Duration,
}

impl SqliteEventLog {
    /// # Errors
    ///
    /// `InvalidInput` when `table` is not a plain SQL identifier.
    pub fn new(path: impl Into<PathBuf>, table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        validate_identifier(&table)?;
        Ok(Self {
            path: path.into(),
            table,
            busy_timeout: crate::db::DEFAULT_BUSY_TIMEOUT,
        })
    }

    /// The store's own update history in event-log shape
    pub fn internal_history(store_path: impl Into<PathBuf>) -> Self {
        Self {
            path: store_path.into(),
            table: HISTORY_EVENTS_VIEW.to_string(),
            busy_timeout: crate::db::DEFAULT_BUSY_TIMEOUT,
        }
    }

    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(sqlite_op("open_event_log"))?;
        conn.busy_timeout(self.busy_timeout)
            .map_err(sqlite_op("open_event_log"))?;
        Ok(conn)
    }
}

fn validate_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ExError::from(StocktakeError::InvalidIdentifier {
            name: name.to_string(),
        })
        .with_op("sqlite_event_log"))
    }
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null | ValueRef::Blob(_) => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
    }
}

impl EventLogSource for SqliteEventLog {
    fn exists(&self) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        let conn = self.connect()?;
        let found: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?1",
                [&self.table],
                |row| row.get(0),
            )
            .map_err(sqlite_op("probe_event_log"))?;
        Ok(found > 0)
    }

    fn field_names(&self) -> Result<Vec<String>> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info(\"{}\")", self.table))
            .map_err(sqlite_op("event_log_fields"))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .map_err(sqlite_op("event_log_fields"))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(sqlite_op("event_log_fields"))?;
        Ok(names)
    }

    /// Text timestamps are compared on their `YYYY-MM-DD HH:MM:SS` prefix,
    /// integer timestamps as unix seconds. The prefix ignores any zone offset,
    /// so the bounds are padded by a day; callers re-check the exact
    /// window after parsing.
    fn query(&self, timestamp_field: &str, window: &TimeRange) -> Result<Vec<RawEventRow>> {
        validate_identifier(timestamp_field)?;
        let conn = self.connect()?;
        let start = window.start - query_slack();
        let end = window.end + query_slack();
        let sql = format!(
            "SELECT * FROM \"{table}\" WHERE \
             (typeof(\"{ts}\") = 'integer' AND \"{ts}\" BETWEEN ?3 AND ?4) OR \
             (typeof(\"{ts}\") = 'text' AND substr(replace(\"{ts}\", 'T', ' '), 1, 19) BETWEEN ?1 AND ?2) \
             ORDER BY \"{ts}\"",
            table = self.table,
            ts = timestamp_field
        );
        let mut stmt = conn.prepare(&sql).map_err(sqlite_op("query_event_log"))?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();

        let mut rows = stmt
            .query(rusqlite::params![
                format_updated_on(start),
                format_updated_on(end),
                start.timestamp(),
                end.timestamp()
            ])
            .map_err(sqlite_op("query_event_log"))?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(sqlite_op("query_event_log"))? {
            let mut raw = RawEventRow::new();
            for (idx, name) in columns.iter().enumerate() {
                let value = row.get_ref(idx).map_err(sqlite_op("query_event_log"))?;
                raw.insert(name.clone(), to_json(value));
            }
            out.push(raw);
        }
        Ok(out)
    }
}
