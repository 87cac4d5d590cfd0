//! Scheduled generation.
//!
//! A host calls `run_scheduled` on every tick (cron, timer, CLI). The run
//! is due only when the tick falls on the configured day of month and hour,
//! both UTC.

use chrono::{DateTime, Datelike, Timelike, Utc};
use rusqlite::Connection;
use serde::Serialize;
use stocktake_core::errors::Result;
use stocktake_core::model::{PeriodKey, Snapshot};
use stocktake_core::settings::ScheduleSettings;
use stocktake_core::{log_op_end, log_op_error, log_op_start};
use stocktake_core_types::{RequestContext, RunId};

use crate::commands::generate::{generate_or_refresh, GenerateOutcome, GenerationDeps, GenerationStatus, Trigger};
use crate::commands::lock::lock_snapshot;

/// What a due scheduled run did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduledRun {
    pub run_id: String,
    pub generation: GenerateOutcome,
    /// Snapshot after the optional lock step
    pub snapshot: Snapshot,
    pub locked_by_run: bool,
}

/// Whether `now` matches the configured day and hour.
pub fn is_due(schedule: &ScheduleSettings, now: DateTime<Utc>) -> bool {
    schedule.enabled && now.day() == schedule.day_of_month && now.hour() == schedule.hour
}

/// Generate (never forced) the period containing `now` when due, then lock
/// it if configured. Returns `None` when not due.
///
/// # Errors
///
/// Any error of `generate_or_refresh` or `lock_snapshot`.
pub fn run_scheduled(
    conn: &mut Connection,
    deps: &GenerationDeps<'_>,
    now: DateTime<Utc>,
) -> Result<Option<ScheduledRun>> {
    let schedule = &deps.settings.schedule;
    if !is_due(schedule, now) {
        tracing::debug!(
            enabled = schedule.enabled,
            day_of_month = schedule.day_of_month,
            hour = schedule.hour,
            now = %now,
            "Scheduled run not due"
        );
        return Ok(None);
    }

    let run_id = RunId::new();
    let period_key = PeriodKey::containing(now);
    log_op_start!("run_scheduled", run_id = %run_id, period_key = period_key.as_str());
    let start = std::time::Instant::now();

    let result = (|| -> Result<ScheduledRun> {
        let trigger = Trigger::new(period_key.clone(), false).with_context(RequestContext::scheduled());
        let generation = generate_or_refresh(conn, &trigger, deps)?;

        let should_lock = schedule.lock_after_generation
            && !generation.snapshot.locked
            && generation.status != GenerationStatus::SkippedLocked;
        let snapshot = if should_lock {
            lock_snapshot(conn, &period_key, deps.clock)?
        } else {
            generation.snapshot.clone()
        };

        Ok(ScheduledRun {
            run_id: run_id.to_string(),
            generation,
            snapshot,
            locked_by_run: should_lock,
        })
    })();

    let elapsed = start.elapsed().as_millis() as u64;
    match &result {
        Ok(run) => log_op_end!(
            "run_scheduled",
            duration_ms = elapsed,
            run_id = %run_id,
            period_key = period_key.as_str(),
            locked_by_run = run.locked_by_run
        ),
        Err(e) => log_op_error!(
            "run_scheduled",
            e.clone(),
            duration_ms = elapsed,
            run_id = %run_id,
            period_key = period_key.as_str()
        ),
    }
    result.map(Some)
}
