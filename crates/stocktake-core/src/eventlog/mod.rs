//! Event Log Adapter.
//!
//! Best-effort reader of an optional external audit log. The log is probed
//! and its schema validated before any row is trusted; every failure mode
//! degrades to a [`SourceStatus`](crate::model::SourceStatus) rather than an
//! error, so enrichment can never abort a generation.

pub mod adapter;
pub mod enrich;
pub mod extractors;
pub mod source;

pub use adapter::fetch_events;
pub use enrich::enrich_rows;
pub use extractors::{normalize_identifier, slugify, Extracted, ExtractorStrategy};
pub use source::{EventLogSource, MemoryEventLog, RawEventRow};
