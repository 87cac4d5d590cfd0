//! Read-only snapshot query operations.

use crate::errors::{sqlite_op, Result};
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{Connection, OptionalExtension, Row};
use stocktake_core::errors::{ExError, ExErrorKind};
use stocktake_core::model::{
    Annotations, PeriodKey, Snapshot, SnapshotRow, Summary,
};

const SNAPSHOT_COLUMNS: &str = "snapshot_id, period_key, locked, count_new, count_updated, \
     count_deleted, count_unchanged, created_at, updated_at";

const ROW_COLUMNS: &str = "period_key, slug, name, description, classification, version_from, \
     version_to, current_version, active, transition_source, category, notes, comments";

/// A raw row from the `snapshots` table.
struct StoredSnapshot {
    snapshot_id: String,
    period_key: String,
    locked: bool,
    counts: [u32; 4],
    created_at: i64,
    updated_at: i64,
}

/// A raw row from the `snapshot_rows` table.
struct StoredRow {
    period_key: String,
    slug: String,
    name: String,
    description: String,
    classification: String,
    version_from: String,
    version_to: String,
    current_version: String,
    active: bool,
    transition_source: String,
    category: String,
    notes: String,
    comments: String,
}

fn row_to_snapshot(row: &Row<'_>) -> rusqlite::Result<StoredSnapshot> {
    Ok(StoredSnapshot {
        snapshot_id: row.get(0)?,
        period_key: row.get(1)?,
        locked: row.get(2)?,
        counts: [row.get(3)?, row.get(4)?, row.get(5)?, row.get(6)?],
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn row_to_stored_row(row: &Row<'_>) -> rusqlite::Result<StoredRow> {
    Ok(StoredRow {
        period_key: row.get(0)?,
        slug: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        classification: row.get(4)?,
        version_from: row.get(5)?,
        version_to: row.get(6)?,
        current_version: row.get(7)?,
        active: row.get(8)?,
        transition_source: row.get(9)?,
        category: row.get(10)?,
        notes: row.get(11)?,
        comments: row.get(12)?,
    })
}

pub(crate) fn millis_to_datetime(ms: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single().ok_or_else(|| {
        ExError::new(ExErrorKind::Serialization)
            .with_op("millis_to_datetime")
            .with_message(format!("timestamp out of range: {}", ms))
    })
}

impl StoredSnapshot {
    fn into_snapshot(self) -> Result<Snapshot> {
        let [new, updated, deleted, unchanged] = self.counts;
        Ok(Snapshot {
            snapshot_id: self.snapshot_id,
            period_key: PeriodKey::parse(&self.period_key)?,
            locked: self.locked,
            summary: Summary {
                new,
                updated,
                deleted,
                unchanged,
            },
            created_at: millis_to_datetime(self.created_at)?,
            updated_at: millis_to_datetime(self.updated_at)?,
        })
    }
}

impl StoredRow {
    fn into_row(self) -> Result<SnapshotRow> {
        Ok(SnapshotRow {
            period_key: PeriodKey::parse(&self.period_key)?,
            slug: self.slug,
            name: self.name,
            description: self.description,
            classification: self.classification.parse()?,
            version_from: self.version_from,
            version_to: self.version_to,
            current_version: self.current_version,
            active: self.active,
            transition_source: self.transition_source.parse()?,
            annotations: Annotations {
                category: self.category,
                notes: self.notes,
                comments: self.comments,
            },
        })
    }
}

/// Snapshot header for a period, if one was ever generated.
///
/// # Errors
///
/// - `Persistence`: SQLite query failed
/// - `Serialization`: stored values no longer parse
pub fn get_snapshot(conn: &Connection, period_key: &PeriodKey) -> Result<Option<Snapshot>> {
    conn.query_row(
        &format!("SELECT {} FROM snapshots WHERE period_key = ?1", SNAPSHOT_COLUMNS),
        [period_key.as_str()],
        row_to_snapshot,
    )
    .optional()
    .map_err(sqlite_op("get_snapshot"))?
    .map(StoredSnapshot::into_snapshot)
    .transpose()
}

/// All snapshot headers, newest period first.
///
/// # Errors
///
/// - `Persistence`: SQLite query failed
pub fn list_snapshots(conn: &Connection) -> Result<Vec<Snapshot>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {} FROM snapshots ORDER BY period_key DESC",
            SNAPSHOT_COLUMNS
        ))
        .map_err(sqlite_op("list_snapshots"))?;
    let stored = stmt
        .query_map([], row_to_snapshot)
        .map_err(sqlite_op("list_snapshots"))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(sqlite_op("list_snapshots"))?;
    stored.into_iter().map(StoredSnapshot::into_snapshot).collect()
}

/// Most recent snapshot strictly before `period_key`; gaps are allowed.
///
/// # Errors
///
/// - `Persistence`: SQLite query failed
pub fn find_previous_snapshot(
    conn: &Connection,
    period_key: &PeriodKey,
) -> Result<Option<Snapshot>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM snapshots WHERE period_key < ?1 ORDER BY period_key DESC LIMIT 1",
            SNAPSHOT_COLUMNS
        ),
        [period_key.as_str()],
        row_to_snapshot,
    )
    .optional()
    .map_err(sqlite_op("find_previous_snapshot"))?
    .map(StoredSnapshot::into_snapshot)
    .transpose()
}

/// Every row of a period, ordered by slug. Empty when the period has none.
///
/// # Errors
///
/// - `Persistence`: SQLite query failed
/// - `Serialization`: a stored classification or source is unknown
pub fn load_rows(conn: &Connection, period_key: &PeriodKey) -> Result<Vec<SnapshotRow>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {} FROM snapshot_rows WHERE period_key = ?1 ORDER BY slug",
            ROW_COLUMNS
        ))
        .map_err(sqlite_op("load_rows"))?;
    let stored = stmt
        .query_map([period_key.as_str()], row_to_stored_row)
        .map_err(sqlite_op("load_rows"))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(sqlite_op("load_rows"))?;
    stored.into_iter().map(StoredRow::into_row).collect()
}

/// One component's row within a period.
///
/// # Errors
///
/// - `Persistence`: SQLite query failed
pub fn get_row(conn: &Connection, period_key: &PeriodKey, slug: &str) -> Result<Option<SnapshotRow>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM snapshot_rows WHERE period_key = ?1 AND slug = ?2",
            ROW_COLUMNS
        ),
        [period_key.as_str(), slug],
        row_to_stored_row,
    )
    .optional()
    .map_err(sqlite_op("get_row"))?
    .map(StoredRow::into_row)
    .transpose()
}
