//! Stocktake Store - SQLite persistence for period snapshots
//!
//! Provides:
//! - SQLite schema with an embedded, checksummed migrations framework
//! - Transactional snapshot generation commits and lock/annotation writes
//! - Read queries for snapshots, rows and summaries
//! - The internal update history and its retention
//! - File-backed inventory and SQLite-backed event log sources

pub mod db;
pub mod errors;
pub mod event_log;
pub mod history;
pub mod inventory_file;
pub mod migrations;
pub mod snapshot;

// Re-export key types
pub use errors::Result;
pub use event_log::SqliteEventLog;
pub use inventory_file::JsonInventoryFile;
