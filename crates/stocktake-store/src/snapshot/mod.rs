//! Snapshot persistence layer.
//!
//! ## Responsibilities
//!
//! - Atomic replace-in-place of a period's rows with summary recount
//! - Lock-flag re-check inside the write transaction (cross-process safety)
//! - Lock/unlock and annotation writes
//! - Read-only row and header queries
//!
//! ## Non-Responsibilities
//!
//! - Diffing and enrichment (handled by `stocktake-core`)
//! - Orchestration and in-process period locking (handled by `stocktake-engine`)

pub mod persist;
pub mod query;

// Re-export primary types
pub use persist::{commit_generation, set_annotation, set_locked, CommitOutcome};
pub use query::{
    find_previous_snapshot, get_row, get_snapshot, list_snapshots, load_rows,
};
