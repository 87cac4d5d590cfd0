//! Internal update history.
//!
//! A ledger of component updates observed by the host, deduplicated by
//! `(slug, new_version, updated_on)`. The `update_history_events` view
//! re-exposes it in event-log shape so it can back enrichment.

use crate::errors::{sqlite_op, Result};
use crate::snapshot::query::millis_to_datetime;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use stocktake_core::errors::{ExError, ExErrorKind};
use stocktake_core::model::{PeriodKey, TimeRange};

/// Name of the view exposing history rows as events
pub const HISTORY_EVENTS_VIEW: &str = "update_history_events";

/// Text format of `updated_on`
pub const UPDATED_ON_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One recorded update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRecord {
    pub slug: String,
    pub name: String,
    pub previous_version: String,
    pub new_version: String,
    pub updated_on: DateTime<Utc>,
    /// Free-form origin tag, e.g. `upgrader` or `manual`
    pub source: String,
}

/// A stored update with its row id and insertion time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredUpdate {
    pub id: i64,
    #[serde(flatten)]
    pub record: UpdateRecord,
    pub created_at: DateTime<Utc>,
}

pub fn format_updated_on(at: DateTime<Utc>) -> String {
    at.format(UPDATED_ON_FORMAT).to_string()
}

fn parse_updated_on(text: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(text, UPDATED_ON_FORMAT)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|e| {
            ExError::new(ExErrorKind::Serialization)
                .with_op("parse_updated_on")
                .with_message(format!("bad updated_on '{}': {}", text, e))
        })
}

struct StoredUpdateRow {
    id: i64,
    slug: String,
    name: String,
    previous_version: String,
    new_version: String,
    updated_on: String,
    source: String,
    created_at: i64,
}

const HISTORY_COLUMNS: &str =
    "id, slug, name, previous_version, new_version, updated_on, source, created_at";

fn row_to_update(row: &Row<'_>) -> rusqlite::Result<StoredUpdateRow> {
    Ok(StoredUpdateRow {
        id: row.get(0)?,
        slug: row.get(1)?,
        name: row.get(2)?,
        previous_version: row.get(3)?,
        new_version: row.get(4)?,
        updated_on: row.get(5)?,
        source: row.get(6)?,
        created_at: row.get(7)?,
    })
}

impl StoredUpdateRow {
    fn into_stored(self) -> Result<StoredUpdate> {
        Ok(StoredUpdate {
            id: self.id,
            record: UpdateRecord {
                slug: self.slug,
                name: self.name,
                previous_version: self.previous_version,
                new_version: self.new_version,
                updated_on: parse_updated_on(&self.updated_on)?,
                source: self.source,
            },
            created_at: millis_to_datetime(self.created_at)?,
        })
    }
}

/// Record one update; returns `false` when an identical entry exists.
///
/// # Errors
///
/// - `InvalidInput`: empty slug or new version
/// - `Persistence`: SQLite failure
pub fn record_update(conn: &Connection, record: &UpdateRecord, now: DateTime<Utc>) -> Result<bool> {
    if record.slug.trim().is_empty() || record.new_version.trim().is_empty() {
        return Err(ExError::new(ExErrorKind::InvalidInput)
            .with_op("record_update")
            .with_slug(record.slug.clone())
            .with_message("slug and new_version are required"));
    }

    let inserted = conn
        .execute(
            "INSERT OR IGNORE INTO update_history \
             (slug, name, previous_version, new_version, updated_on, source, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.slug,
                record.name,
                record.previous_version,
                record.new_version,
                format_updated_on(record.updated_on),
                record.source,
                now.timestamp_millis()
            ],
        )
        .map_err(sqlite_op("record_update"))?;

    if inserted == 0 {
        tracing::debug!(slug = %record.slug, new_version = %record.new_version, "Duplicate update ignored");
    }
    Ok(inserted > 0)
}

/// Most recent recorded update for a component.
///
/// # Errors
///
/// - `Persistence`: SQLite failure
pub fn latest_for_component(conn: &Connection, slug: &str) -> Result<Option<StoredUpdate>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM update_history WHERE slug = ?1 \
             ORDER BY updated_on DESC, id DESC LIMIT 1",
            HISTORY_COLUMNS
        ),
        [slug],
        row_to_update,
    )
    .optional()
    .map_err(sqlite_op("latest_for_component"))?
    .map(StoredUpdateRow::into_stored)
    .transpose()
}

/// Updates with `updated_on` inside the inclusive range, newest first.
///
/// # Errors
///
/// - `Persistence`: SQLite failure
pub fn updates_between(conn: &Connection, range: &TimeRange) -> Result<Vec<StoredUpdate>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {} FROM update_history WHERE updated_on BETWEEN ?1 AND ?2 \
             ORDER BY updated_on DESC, id DESC",
            HISTORY_COLUMNS
        ))
        .map_err(sqlite_op("updates_between"))?;
    let rows = stmt
        .query_map(
            params![format_updated_on(range.start), format_updated_on(range.end)],
            row_to_update,
        )
        .map_err(sqlite_op("updates_between"))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(sqlite_op("updates_between"))?;
    rows.into_iter().map(StoredUpdateRow::into_stored).collect()
}

/// Updates within a period's window, newest first.
///
/// # Errors
///
/// - `Persistence`: SQLite failure
pub fn updates_for_period(conn: &Connection, period_key: &PeriodKey) -> Result<Vec<StoredUpdate>> {
    updates_between(conn, &period_key.window())
}

/// Delete history older than `cutoff`, returning the number of rows removed.
///
/// # Errors
///
/// - `Persistence`: SQLite failure
pub fn prune_before(conn: &Connection, cutoff: DateTime<Utc>) -> Result<usize> {
    let removed = conn
        .execute(
            "DELETE FROM update_history WHERE updated_on < ?1",
            [format_updated_on(cutoff)],
        )
        .map_err(sqlite_op("prune_update_history"))?;
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::apply_migrations;

    fn setup() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        apply_migrations(&mut conn).unwrap();
        conn
    }

    fn record(slug: &str, from: &str, to: &str, day: u32) -> UpdateRecord {
        UpdateRecord {
            slug: slug.to_string(),
            name: slug.to_uppercase(),
            previous_version: from.to_string(),
            new_version: to.to_string(),
            updated_on: Utc.with_ymd_and_hms(2024, 1, day, 10, 0, 0).unwrap(),
            source: "upgrader".to_string(),
        }
    }

    #[test]
    fn test_record_update_deduplicates() {
        let conn = setup();
        let now = Utc::now();
        assert!(record_update(&conn, &record("a", "1.0", "1.1", 5), now).unwrap());
        assert!(!record_update(&conn, &record("a", "1.0", "1.1", 5), now).unwrap());
        assert!(record_update(&conn, &record("a", "1.1", "1.2", 6), now).unwrap());
    }

    #[test]
    fn test_latest_for_component() {
        let conn = setup();
        let now = Utc::now();
        record_update(&conn, &record("a", "1.0", "1.1", 5), now).unwrap();
        record_update(&conn, &record("a", "1.1", "1.2", 9), now).unwrap();

        let latest = latest_for_component(&conn, "a").unwrap().unwrap();
        assert_eq!(latest.record.new_version, "1.2");
        assert!(latest_for_component(&conn, "missing").unwrap().is_none());
    }

    #[test]
    fn test_empty_new_version_rejected() {
        let conn = setup();
        let err = record_update(&conn, &record("a", "1.0", " ", 5), Utc::now()).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidInput);
    }
}
