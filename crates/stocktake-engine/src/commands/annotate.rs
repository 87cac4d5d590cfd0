//! Human annotation edits.

use rusqlite::Connection;
use stocktake_core::clock::Clock;
use stocktake_core::errors::{ExError, ExErrorKind, Result};
use stocktake_core::model::{AnnotationPatch, PeriodKey, SnapshotRow};
use stocktake_core::{log_op_end, log_op_error, log_op_start};

/// Apply a partial edit of `category`, `notes` and `comments` to one row.
///
/// Fields left as `None` in the patch keep their stored value. The edit
/// survives later regenerations of the same period.
///
/// # Errors
///
/// - `InvalidInput`: the patch sets no field
/// - `NotFound`: no snapshot for the period, or no row for the slug
/// - `Locked`: the snapshot is locked
/// - `Persistence`: store failure
pub fn set_annotation(
    conn: &mut Connection,
    period_key: &PeriodKey,
    slug: &str,
    patch: &AnnotationPatch,
    clock: &dyn Clock,
) -> Result<SnapshotRow> {
    log_op_start!("set_annotation", period_key = period_key.as_str(), slug = slug);
    let start = std::time::Instant::now();

    let result = if patch.is_empty() {
        Err(ExError::new(ExErrorKind::InvalidInput)
            .with_op("set_annotation")
            .with_period_key(period_key.as_str())
            .with_slug(slug)
            .with_message("annotation patch sets no field"))
    } else {
        stocktake_store::snapshot::set_annotation(conn, period_key, slug, patch, clock.now())
    };

    let elapsed = start.elapsed().as_millis() as u64;
    match &result {
        Ok(_) => log_op_end!(
            "set_annotation",
            duration_ms = elapsed,
            period_key = period_key.as_str(),
            slug = slug
        ),
        Err(e) => log_op_error!(
            "set_annotation",
            e.clone(),
            duration_ms = elapsed,
            period_key = period_key.as_str(),
            slug = slug
        ),
    }
    result
}
