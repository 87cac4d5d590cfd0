//! Inventory diff engine.
//!
//! Classifies every component of `current ∪ previous` exactly once:
//!
//! | present in          | versions | classification |
//! |---------------------|----------|----------------|
//! | current only        |          | `new`          |
//! | both                | differ   | `updated`      |
//! | both                | equal    | `unchanged`    |
//! | previous only       |          | `deleted`      |
//!
//! The engine is pure: no I/O, no clock, deterministic ordering by slug.

pub mod engine;
pub mod model;

pub use engine::compute_diff;
pub use model::DiffResult;
