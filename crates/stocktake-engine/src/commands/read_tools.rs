//! Read-only access for report consumers.
//!
//! Reads take no period lock; they see the last committed generation.

use rusqlite::Connection;
use serde::Serialize;
use stocktake_core::errors::{ExError, Result, StocktakeError};
use stocktake_core::model::{Classification, PeriodKey, Snapshot, SnapshotRow, SnapshotState, Summary};
use stocktake_store::snapshot::{self as store};

/// Rows of one period, optionally narrowed to a classification.
#[derive(Debug, Clone, Default)]
pub struct RowFilter {
    pub classification: Option<Classification>,
}

/// Summary counts with the header fields a report needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryResult {
    pub period_key: PeriodKey,
    pub state: SnapshotState,
    pub locked: bool,
    pub summary: Summary,
    pub total: u32,
}

/// # Errors
///
/// - `NotFound`: no snapshot exists for the period
/// - `Persistence`: store failure
pub fn get_snapshot(conn: &Connection, period_key: &PeriodKey) -> Result<Snapshot> {
    store::get_snapshot(conn, period_key)?.ok_or_else(|| {
        ExError::from(StocktakeError::SnapshotNotFound {
            period_key: period_key.to_string(),
        })
        .with_op("get_snapshot")
    })
}

/// Rows ordered by slug.
///
/// # Errors
///
/// - `NotFound`: no snapshot exists for the period
/// - `Persistence`: store failure
pub fn get_rows(conn: &Connection, period_key: &PeriodKey, filter: &RowFilter) -> Result<Vec<SnapshotRow>> {
    get_snapshot(conn, period_key)?;
    let rows = store::load_rows(conn, period_key)?;
    Ok(match filter.classification {
        Some(classification) => rows
            .into_iter()
            .filter(|row| row.classification == classification)
            .collect(),
        None => rows,
    })
}

/// # Errors
///
/// - `NotFound`: no snapshot exists for the period
/// - `Persistence`: store failure
pub fn get_summary(conn: &Connection, period_key: &PeriodKey) -> Result<SummaryResult> {
    let snapshot = get_snapshot(conn, period_key)?;
    Ok(SummaryResult {
        total: snapshot.summary.total(),
        state: snapshot.state(),
        period_key: snapshot.period_key,
        locked: snapshot.locked,
        summary: snapshot.summary,
    })
}

/// All snapshots, newest period first.
///
/// # Errors
///
/// - `Persistence`: store failure
pub fn list_snapshots(conn: &Connection) -> Result<Vec<Snapshot>> {
    store::list_snapshots(conn)
}
