//! Engine-level read-only query surface.
//!
//! `apply_engine_query` is the single entry point for reads. It takes a
//! shared connection and never writes.

use rusqlite::Connection;
use serde::Serialize;
use stocktake_core::errors::Result;
use stocktake_core::model::{PeriodKey, Snapshot, SnapshotRow};
use stocktake_core::{log_op_end, log_op_error, log_op_start};
use stocktake_store::history::{updates_for_period, StoredUpdate};

use crate::commands::read_tools::{get_rows, get_snapshot, get_summary, list_snapshots, RowFilter, SummaryResult};

/// Read-only queries supported by the engine.
#[derive(Debug, Clone)]
pub enum EngineQuery {
    SnapshotGet { period_key: PeriodKey },
    SnapshotRows { period_key: PeriodKey, filter: RowFilter },
    SnapshotSummary { period_key: PeriodKey },
    SnapshotList,
    /// Recorded updates inside the period's window, newest first
    HistoryForPeriod { period_key: PeriodKey },
}

impl EngineQuery {
    fn op(&self) -> &'static str {
        match self {
            EngineQuery::SnapshotGet { .. } => "snapshot_get",
            EngineQuery::SnapshotRows { .. } => "snapshot_rows",
            EngineQuery::SnapshotSummary { .. } => "snapshot_summary",
            EngineQuery::SnapshotList => "snapshot_list",
            EngineQuery::HistoryForPeriod { .. } => "history_for_period",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EngineQueryResult {
    Snapshot(Snapshot),
    Rows(Vec<SnapshotRow>),
    Summary(SummaryResult),
    Snapshots(Vec<Snapshot>),
    History(Vec<StoredUpdate>),
}

/// Execute a read-only query.
///
/// # Errors
///
/// - `NotFound`: the queried period has no snapshot
/// - `Persistence`: store failure
pub fn apply_engine_query(query: EngineQuery, conn: &Connection) -> Result<EngineQueryResult> {
    let op = query.op();
    log_op_start!(op);
    let start = std::time::Instant::now();

    let result = match query {
        EngineQuery::SnapshotGet { period_key } => get_snapshot(conn, &period_key).map(EngineQueryResult::Snapshot),
        EngineQuery::SnapshotRows { period_key, filter } => {
            get_rows(conn, &period_key, &filter).map(EngineQueryResult::Rows)
        }
        EngineQuery::SnapshotSummary { period_key } => get_summary(conn, &period_key).map(EngineQueryResult::Summary),
        EngineQuery::SnapshotList => list_snapshots(conn).map(EngineQueryResult::Snapshots),
        EngineQuery::HistoryForPeriod { period_key } => {
            updates_for_period(conn, &period_key).map(EngineQueryResult::History)
        }
    };

    let elapsed = start.elapsed().as_millis() as u64;
    match &result {
        Ok(_) => log_op_end!(op, duration_ms = elapsed),
        Err(e) => log_op_error!(op, e.clone(), duration_ms = elapsed),
    }
    result
}
