//! Snapshot generation pipeline.
//!
//! ## Pipeline (in order):
//! 1. Acquire the in-process period lock (held until commit)
//! 2. Locked snapshot and no `force`: return it unchanged, nothing read
//! 3. Read the inventory (failure aborts, nothing written)
//! 4. Load the most recent prior snapshot's installed rows
//! 5. Diff current against prior
//! 6. Enrich `updated` rows from the event log (never aborts)
//! 7. Commit: lock re-check, annotation carry-forward, replace rows,
//!    recount summary, all in one transaction

use rusqlite::Connection;
use serde::Serialize;
use std::collections::BTreeMap;
use stocktake_core::clock::Clock;
use stocktake_core::diff::compute_diff;
use stocktake_core::errors::Result;
use stocktake_core::eventlog::{enrich_rows, fetch_events, EventLogSource};
use stocktake_core::inventory::InventorySource;
use stocktake_core::model::{PeriodKey, Snapshot, SnapshotRow, SourceStatus};
use stocktake_core::settings::{EngineSettings, EventSourceKind};
use stocktake_core::{log_op_end, log_op_error, log_op_start};
use stocktake_core_types::RequestContext;
use stocktake_store::snapshot::{
    commit_generation, find_previous_snapshot, get_snapshot, load_rows, CommitOutcome,
};

use crate::period_lock::PeriodLocks;

/// A request to generate (or refresh) one period.
#[derive(Debug, Clone)]
pub struct Trigger {
    pub period_key: PeriodKey,
    /// Regenerate even when the snapshot is locked
    pub force: bool,
    pub context: RequestContext,
}

impl Trigger {
    pub fn new(period_key: PeriodKey, force: bool) -> Self {
        Self {
            period_key,
            force,
            context: RequestContext::new(),
        }
    }

    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = context;
        self
    }
}

/// Collaborators of a generation run.
pub struct GenerationDeps<'a> {
    pub inventory: &'a dyn InventorySource,
    /// Consulted only when `settings.event_source` is not `None`
    pub event_log: Option<&'a dyn EventLogSource>,
    pub locks: &'a PeriodLocks,
    pub settings: &'a EngineSettings,
    pub clock: &'a dyn Clock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    Created,
    Refreshed,
    /// Locked and not forced; the stored snapshot is returned unchanged
    SkippedLocked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerateOutcome {
    pub snapshot: Snapshot,
    pub status: GenerationStatus,
    pub source_status: SourceStatus,
    pub enriched_rows: usize,
}

/// Generate the snapshot for `trigger.period_key`, or refresh it in place.
///
/// Either fully succeeds or leaves no visible change.
///
/// # Errors
///
/// - `ConcurrentGenerationInProgress`: period held and `LockWait` gave up
/// - `SourceUnavailable`: inventory unreadable or store busy
/// - `InvalidInput`: inventory contains empty or duplicate slugs
/// - `Persistence`: store failure
pub fn generate_or_refresh(
    conn: &mut Connection,
    trigger: &Trigger,
    deps: &GenerationDeps<'_>,
) -> Result<GenerateOutcome> {
    let period_key = trigger.period_key.as_str();
    let request_id = trigger.context.request_id.to_string();
    log_op_start!(
        "generate_or_refresh",
        period_key = period_key,
        force = trigger.force,
        trigger = trigger.context.trigger.as_str(),
        request_id = %request_id
    );
    let start = std::time::Instant::now();

    let result = generate_impl(conn, trigger, deps).map_err(|e| {
        let e = e
            .with_period_key(period_key)
            .with_request_id(trigger.context.request_id.clone());
        log_op_error!(
            "generate_or_refresh",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64,
            period_key = period_key,
            request_id = %request_id
        );
        e
    })?;

    log_op_end!(
        "generate_or_refresh",
        duration_ms = start.elapsed().as_millis() as u64,
        period_key = period_key,
        request_id = %request_id,
        snapshot_id = %result.snapshot.snapshot_id,
        status = ?result.status,
        source_status = result.source_status.as_str(),
        enriched_rows = result.enriched_rows
    );

    Ok(result)
}

fn generate_impl(
    conn: &mut Connection,
    trigger: &Trigger,
    deps: &GenerationDeps<'_>,
) -> Result<GenerateOutcome> {
    let period_key = &trigger.period_key;

    // 1. Period lock
    let _guard = deps.locks.acquire(period_key, deps.settings.lock_wait)?;

    // 2. Locked short-circuit
    if let Some(existing) = get_snapshot(conn, period_key)? {
        if existing.locked && !trigger.force {
            return Ok(skipped(existing));
        }
    }

    // 3. Inventory
    let current = deps.inventory.read_current()?;

    // 4. Prior rows (installed only)
    let previous = load_previous_inventory(conn, period_key)?;

    // 5. Diff
    let mut rows: BTreeMap<String, SnapshotRow> = compute_diff(&current, &previous)
        .into_iter()
        .map(|(slug, result)| (slug, result.into_row(period_key)))
        .collect();

    // 6. Enrichment
    let (source_status, enriched_rows) = enrich(&mut rows, period_key, deps);

    // 7. Commit
    let outcome = commit_generation(conn, period_key, rows, trigger.force, deps.clock.now())?;
    let (snapshot, status) = match outcome {
        CommitOutcome::Created(s) => (s, GenerationStatus::Created),
        CommitOutcome::Refreshed(s) => (s, GenerationStatus::Refreshed),
        // Locked by another process between step 2 and the commit
        CommitOutcome::LockedNoop(s) => return Ok(skipped(s)),
    };

    Ok(GenerateOutcome {
        snapshot,
        status,
        source_status,
        enriched_rows,
    })
}

fn skipped(snapshot: Snapshot) -> GenerateOutcome {
    tracing::info!(period_key = %snapshot.period_key, "Snapshot locked, generation skipped");
    GenerateOutcome {
        snapshot,
        status: GenerationStatus::SkippedLocked,
        source_status: SourceStatus::Unavailable,
        enriched_rows: 0,
    }
}

fn load_previous_inventory(
    conn: &Connection,
    period_key: &PeriodKey,
) -> Result<BTreeMap<String, SnapshotRow>> {
    let Some(previous) = find_previous_snapshot(conn, period_key)? else {
        return Ok(BTreeMap::new());
    };
    tracing::debug!(
        period_key = %period_key,
        previous_period = %previous.period_key,
        "Diffing against prior snapshot"
    );
    Ok(load_rows(conn, &previous.period_key)?
        .into_iter()
        .filter(|row| row.classification.is_installed())
        .map(|row| (row.slug.clone(), row))
        .collect())
}

fn enrich(
    rows: &mut BTreeMap<String, SnapshotRow>,
    period_key: &PeriodKey,
    deps: &GenerationDeps<'_>,
) -> (SourceStatus, usize) {
    let source = match (deps.settings.event_source, deps.event_log) {
        (EventSourceKind::None, _) | (_, None) => return (SourceStatus::Unavailable, 0),
        (_, Some(source)) => source,
    };

    let (events, status) = fetch_events(source, &deps.settings.event_log_schema, &period_key.window());
    let enriched = enrich_rows(rows, &events, &status);
    tracing::debug!(
        period_key = %period_key,
        source_status = status.as_str(),
        event_count = events.len(),
        enriched_rows = enriched,
        "Event log enrichment"
    );
    (status, enriched)
}
