//! Snapshot write operations.
//!
//! Every write runs inside an IMMEDIATE transaction so that the lock flag
//! read and the write that depends on it cannot interleave with another
//! process.

use crate::errors::{sqlite_op, Result};
use crate::snapshot::query::{get_row, get_snapshot, load_rows};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Transaction, TransactionBehavior};
use std::collections::BTreeMap;
use stocktake_core::errors::{ExError, StocktakeError};
use stocktake_core::merge::merge_annotations;
use stocktake_core::model::{AnnotationPatch, PeriodKey, Snapshot, SnapshotRow, Summary};

/// What `commit_generation` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// First generation for the period
    Created(Snapshot),
    /// Existing snapshot replaced in place
    Refreshed(Snapshot),
    /// Snapshot is locked and the commit was not forced; nothing written
    LockedNoop(Snapshot),
}

impl CommitOutcome {
    pub fn snapshot(&self) -> &Snapshot {
        match self {
            CommitOutcome::Created(s) | CommitOutcome::Refreshed(s) | CommitOutcome::LockedNoop(s) => s,
        }
    }
}

fn begin_immediate<'c>(conn: &'c mut Connection, op: &'static str) -> Result<Transaction<'c>> {
    conn.transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(sqlite_op(op))
}

/// Atomically replace all rows of a period and recompute its summary.
///
/// Inside a single IMMEDIATE transaction:
/// 1. Re-check the lock flag; locked and not forced returns `LockedNoop`
/// 2. Carry annotations forward from the period's current rows
/// 3. Upsert the snapshot header with the recounted summary
/// 4. Delete all rows of the period and insert the new set
///
/// Forced regeneration of a locked snapshot keeps it locked.
///
/// # Errors
///
/// - `SourceUnavailable`: database busy beyond the configured timeout
/// - `Persistence`: any other SQLite failure; nothing is written
pub fn commit_generation(
    conn: &mut Connection,
    period_key: &PeriodKey,
    rows: BTreeMap<String, SnapshotRow>,
    force: bool,
    now: DateTime<Utc>,
) -> Result<CommitOutcome> {
    let op = "commit_generation";
    let tx = begin_immediate(conn, op)?;

    // 1. Lock re-check
    let existing = get_snapshot(&tx, period_key)?;
    if let Some(snapshot) = &existing {
        if snapshot.locked && !force {
            tracing::debug!(period_key = %period_key, "Snapshot locked, commit skipped");
            return Ok(CommitOutcome::LockedNoop(snapshot.clone()));
        }
    }

    // 2. Annotation carry-forward against what is stored right now
    let current_rows = load_rows(&tx, period_key)?;
    let merged = merge_annotations(period_key, rows, &current_rows);
    let summary = Summary::from_rows(merged.values());
    let now_ms = now.timestamp_millis();

    // 3. Header upsert
    let (snapshot, created) = match existing {
        Some(previous) => {
            tx.execute(
                "UPDATE snapshots SET count_new = ?1, count_updated = ?2, count_deleted = ?3, \
                 count_unchanged = ?4, updated_at = ?5 WHERE period_key = ?6",
                params![
                    summary.new,
                    summary.updated,
                    summary.deleted,
                    summary.unchanged,
                    now_ms,
                    period_key.as_str()
                ],
            )
            .map_err(sqlite_op(op))?;
            let refreshed = Snapshot {
                summary,
                updated_at: now,
                ..previous
            };
            (refreshed, false)
        }
        None => {
            let snapshot_id = uuid::Uuid::now_v7().to_string();
            tx.execute(
                "INSERT INTO snapshots (snapshot_id, period_key, locked, count_new, count_updated, \
                 count_deleted, count_unchanged, created_at, updated_at) \
                 VALUES (?1, ?2, 0, ?3, ?4, ?5, ?6, ?7, ?7)",
                params![
                    snapshot_id,
                    period_key.as_str(),
                    summary.new,
                    summary.updated,
                    summary.deleted,
                    summary.unchanged,
                    now_ms
                ],
            )
            .map_err(sqlite_op(op))?;
            let fresh = Snapshot {
                snapshot_id,
                period_key: period_key.clone(),
                locked: false,
                summary,
                created_at: now,
                updated_at: now,
            };
            (fresh, true)
        }
    };

    // 4. Replace rows
    tx.execute(
        "DELETE FROM snapshot_rows WHERE period_key = ?1",
        [period_key.as_str()],
    )
    .map_err(sqlite_op(op))?;
    {
        let mut insert = tx
            .prepare(
                "INSERT INTO snapshot_rows (period_key, slug, name, description, classification, \
                 version_from, version_to, current_version, active, transition_source, category, \
                 notes, comments) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            )
            .map_err(sqlite_op(op))?;
        for row in merged.values() {
            insert
                .execute(params![
                    period_key.as_str(),
                    row.slug,
                    row.name,
                    row.description,
                    row.classification.as_str(),
                    row.version_from,
                    row.version_to,
                    row.current_version,
                    row.active,
                    row.transition_source.as_str(),
                    row.annotations.category,
                    row.annotations.notes,
                    row.annotations.comments,
                ])
                .map_err(sqlite_op(op))?;
        }
    }

    tx.commit().map_err(sqlite_op(op))?;

    tracing::debug!(
        period_key = %period_key,
        snapshot_id = %snapshot.snapshot_id,
        row_count = merged.len(),
        "Committed snapshot generation"
    );

    if created {
        Ok(CommitOutcome::Created(snapshot))
    } else {
        Ok(CommitOutcome::Refreshed(snapshot))
    }
}

/// Set or clear the lock flag.
///
/// # Errors
///
/// - `NotFound`: no snapshot exists for the period
/// - `Persistence`: SQLite failure
pub fn set_locked(
    conn: &mut Connection,
    period_key: &PeriodKey,
    locked: bool,
    now: DateTime<Utc>,
) -> Result<Snapshot> {
    let op = if locked { "lock_snapshot" } else { "unlock_snapshot" };
    let tx = begin_immediate(conn, op)?;

    let changed = tx
        .execute(
            "UPDATE snapshots SET locked = ?1, updated_at = ?2 WHERE period_key = ?3",
            params![locked, now.timestamp_millis(), period_key.as_str()],
        )
        .map_err(sqlite_op(op))?;
    if changed == 0 {
        return Err(not_found(period_key).with_op(op));
    }

    let snapshot = get_snapshot(&tx, period_key)?.ok_or_else(|| not_found(period_key).with_op(op))?;
    tx.commit().map_err(sqlite_op(op))?;
    Ok(snapshot)
}

/// Apply a partial annotation edit to one row.
///
/// # Errors
///
/// - `NotFound`: no snapshot for the period, or no row for the slug
/// - `Locked`: the snapshot is locked
/// - `Persistence`: SQLite failure
pub fn set_annotation(
    conn: &mut Connection,
    period_key: &PeriodKey,
    slug: &str,
    patch: &AnnotationPatch,
    now: DateTime<Utc>,
) -> Result<SnapshotRow> {
    let op = "set_annotation";
    let tx = begin_immediate(conn, op)?;

    let snapshot = get_snapshot(&tx, period_key)?.ok_or_else(|| not_found(period_key).with_op(op))?;
    if snapshot.locked {
        return Err(ExError::from(StocktakeError::SnapshotLocked {
            period_key: period_key.to_string(),
        })
        .with_op(op)
        .with_slug(slug));
    }

    let mut row = get_row(&tx, period_key, slug)?.ok_or_else(|| {
        ExError::from(StocktakeError::RowNotFound {
            period_key: period_key.to_string(),
            slug: slug.to_string(),
        })
        .with_op(op)
    })?;
    row.annotations.apply(patch);

    tx.execute(
        "UPDATE snapshot_rows SET category = ?1, notes = ?2, comments = ?3 \
         WHERE period_key = ?4 AND slug = ?5",
        params![
            row.annotations.category,
            row.annotations.notes,
            row.annotations.comments,
            period_key.as_str(),
            slug
        ],
    )
    .map_err(sqlite_op(op))?;
    tx.execute(
        "UPDATE snapshots SET updated_at = ?1 WHERE period_key = ?2",
        params![now.timestamp_millis(), period_key.as_str()],
    )
    .map_err(sqlite_op(op))?;

    tx.commit().map_err(sqlite_op(op))?;
    Ok(row)
}

fn not_found(period_key: &PeriodKey) -> ExError {
    ExError::from(StocktakeError::SnapshotNotFound {
        period_key: period_key.to_string(),
    })
}
