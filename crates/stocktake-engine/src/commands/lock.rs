//! Lock and unlock a period's snapshot.

use rusqlite::Connection;
use stocktake_core::clock::Clock;
use stocktake_core::errors::Result;
use stocktake_core::model::{PeriodKey, Snapshot};
use stocktake_core::{log_op_end, log_op_error, log_op_start};
use stocktake_store::snapshot::set_locked;

/// Freeze a snapshot: generation becomes a no-op unless forced and
/// annotation edits are rejected.
///
/// Locking an already locked snapshot succeeds and leaves it locked.
///
/// # Errors
///
/// - `NotFound`: no snapshot exists for the period
/// - `Persistence`: store failure
pub fn lock_snapshot(conn: &mut Connection, period_key: &PeriodKey, clock: &dyn Clock) -> Result<Snapshot> {
    toggle(conn, period_key, true, clock)
}

/// Return a locked snapshot to draft.
///
/// # Errors
///
/// - `NotFound`: no snapshot exists for the period
/// - `Persistence`: store failure
pub fn unlock_snapshot(conn: &mut Connection, period_key: &PeriodKey, clock: &dyn Clock) -> Result<Snapshot> {
    toggle(conn, period_key, false, clock)
}

fn toggle(conn: &mut Connection, period_key: &PeriodKey, locked: bool, clock: &dyn Clock) -> Result<Snapshot> {
    let op = if locked { "lock_snapshot" } else { "unlock_snapshot" };
    log_op_start!(op, period_key = period_key.as_str());
    let start = std::time::Instant::now();

    let result = set_locked(conn, period_key, locked, clock.now());

    let elapsed = start.elapsed().as_millis() as u64;
    match &result {
        Ok(snapshot) => log_op_end!(
            op,
            duration_ms = elapsed,
            period_key = period_key.as_str(),
            snapshot_id = %snapshot.snapshot_id
        ),
        Err(e) => log_op_error!(op, e.clone(), duration_ms = elapsed, period_key = period_key.as_str()),
    }
    result
}
