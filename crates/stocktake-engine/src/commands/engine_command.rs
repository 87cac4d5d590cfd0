//! Engine-level write commands.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;
use stocktake_core::errors::Result;
use stocktake_core::model::{AnnotationPatch, PeriodKey, Snapshot, SnapshotRow};

use crate::commands::annotate::set_annotation;
use crate::commands::generate::{generate_or_refresh, GenerateOutcome, GenerationDeps, Trigger};
use crate::commands::history::{prune_update_history, record_component_update, ComponentUpdate};
use crate::commands::lock::{lock_snapshot, unlock_snapshot};
use crate::commands::schedule::{run_scheduled, ScheduledRun};

/// Engine commands that write to the store.
#[derive(Debug, Clone)]
pub enum EngineCommand {
    /// Generate or refresh one period.
    Generate(Trigger),
    Lock { period_key: PeriodKey },
    Unlock { period_key: PeriodKey },
    SetAnnotation {
        period_key: PeriodKey,
        slug: String,
        patch: AnnotationPatch,
    },
    RecordUpdate(ComponentUpdate),
    /// Prune with the configured retention, or `retention_days` when given.
    PruneHistory { retention_days: Option<u32> },
    /// Scheduler tick at `now`.
    RunScheduled { now: DateTime<Utc> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum EngineCommandResult {
    Generated(GenerateOutcome),
    Locked(Snapshot),
    Unlocked(Snapshot),
    Annotated(SnapshotRow),
    UpdateRecorded { inserted: bool },
    HistoryPruned { removed: usize },
    /// `None` when the schedule was not due
    Scheduled { run: Option<ScheduledRun> },
}

/// Apply one write command.
///
/// # Errors
///
/// Error kinds depend on the command; see the function each variant
/// dispatches to.
pub fn apply_engine_command(
    cmd: EngineCommand,
    conn: &mut Connection,
    deps: &GenerationDeps<'_>,
) -> Result<EngineCommandResult> {
    match cmd {
        EngineCommand::Generate(trigger) => {
            generate_or_refresh(conn, &trigger, deps).map(EngineCommandResult::Generated)
        }
        EngineCommand::Lock { period_key } => {
            lock_snapshot(conn, &period_key, deps.clock).map(EngineCommandResult::Locked)
        }
        EngineCommand::Unlock { period_key } => {
            unlock_snapshot(conn, &period_key, deps.clock).map(EngineCommandResult::Unlocked)
        }
        EngineCommand::SetAnnotation {
            period_key,
            slug,
            patch,
        } => set_annotation(conn, &period_key, &slug, &patch, deps.clock).map(EngineCommandResult::Annotated),
        EngineCommand::RecordUpdate(update) => record_component_update(conn, &update, deps.settings, deps.clock)
            .map(|inserted| EngineCommandResult::UpdateRecorded { inserted }),
        EngineCommand::PruneHistory { retention_days } => {
            let days = retention_days.unwrap_or(deps.settings.history_retention_days);
            prune_update_history(conn, days, deps.clock.now())
                .map(|removed| EngineCommandResult::HistoryPruned { removed })
        }
        EngineCommand::RunScheduled { now } => {
            run_scheduled(conn, deps, now).map(|run| EngineCommandResult::Scheduled { run })
        }
    }
}
