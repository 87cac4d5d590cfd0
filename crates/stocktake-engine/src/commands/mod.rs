//! Command orchestration layer.
//!
//! Coordinates core domain logic (diff, enrichment, merge) with the
//! persistence layer. Writes go through `engine_command`, reads through
//! `engine_query`.

pub mod annotate;
pub mod engine_command;
pub mod engine_query;
pub mod generate;
pub mod history;
pub mod lock;
pub mod read_tools;
pub mod schedule;
