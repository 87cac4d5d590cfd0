//! Annotation Merger: carry human-entered fields across regeneration.

use crate::model::{PeriodKey, SnapshotRow};
use std::collections::BTreeMap;

/// Copy `category`, `notes` and `comments` from the existing row of the same
/// period and slug onto each freshly computed row.
///
/// Existing rows belonging to another period are ignored, so annotations
/// never leak between periods. Rows without a counterpart keep empty
/// annotations.
pub fn merge_annotations<'a>(
    period_key: &PeriodKey,
    new_rows: BTreeMap<String, SnapshotRow>,
    existing: impl IntoIterator<Item = &'a SnapshotRow>,
) -> BTreeMap<String, SnapshotRow> {
    let carried: BTreeMap<&str, &SnapshotRow> = existing
        .into_iter()
        .filter(|row| &row.period_key == period_key)
        .map(|row| (row.slug.as_str(), row))
        .collect();

    new_rows
        .into_iter()
        .map(|(slug, mut row)| {
            row.annotations = carried
                .get(slug.as_str())
                .map(|old| old.annotations.clone())
                .unwrap_or_default();
            (slug, row)
        })
        .collect()
}
