//! Stocktake Engine - Snapshot lifecycle orchestration
//!
//! Coordinates the inventory reader, diff engine, event log enrichment and
//! the store into the `generate_or_refresh` pipeline, and exposes lock,
//! annotation, history, scheduling and read operations to callers.

pub mod commands;
pub mod period_lock;

pub use commands::annotate::set_annotation;
pub use commands::engine_command::{apply_engine_command, EngineCommand, EngineCommandResult};
pub use commands::engine_query::{apply_engine_query, EngineQuery, EngineQueryResult};
pub use commands::generate::{
    generate_or_refresh, GenerateOutcome, GenerationDeps, GenerationStatus, Trigger,
};
pub use commands::history::{prune_update_history, record_component_update, ComponentUpdate};
pub use commands::lock::{lock_snapshot, unlock_snapshot};
pub use commands::read_tools::{get_rows, get_snapshot, get_summary, list_snapshots, RowFilter, SummaryResult};
pub use commands::schedule::{is_due, run_scheduled, ScheduledRun};
pub use period_lock::{PeriodGuard, PeriodLocks};
