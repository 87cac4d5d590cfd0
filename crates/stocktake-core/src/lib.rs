//! Stocktake Core - inventory snapshot semantics
//!
//! This crate holds everything about a period snapshot that does not touch
//! storage:
//! - Component, snapshot and event models, plus validated period keys
//! - The pure diff engine classifying new/updated/deleted/unchanged
//! - The event log adapter and enrichment of version transitions
//! - Annotation carry-forward across regeneration
//! - The error facility and structured logging used by every crate

pub mod clock;
pub mod diff;
pub mod errors;
pub mod eventlog;
pub mod inventory;
pub mod logging_facility;
pub mod merge;
pub mod model;
pub mod settings;

pub use stocktake_core_types::schema;

// Re-export commonly used types
pub use clock::{Clock, FixedClock, SystemClock};
pub use diff::{compute_diff, DiffResult};
pub use errors::{ExError, ExErrorKind, Result, StocktakeError};
pub use eventlog::{enrich_rows, fetch_events, EventLogSource, MemoryEventLog, RawEventRow};
pub use inventory::{InventorySource, StaticInventory};
pub use merge::merge_annotations;
pub use model::{
    AnnotationPatch, Annotations, Classification, ComponentRecord, ExternalEvent, PeriodKey,
    Snapshot, SnapshotRow, SourceStatus, Summary, TimeRange, TransitionSource,
};
pub use settings::{EngineSettings, EventLogSchema, EventSourceKind, LockWait, ScheduleSettings};
