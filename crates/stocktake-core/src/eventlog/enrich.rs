//! Apply event-log transitions on top of diff-derived rows.

use crate::eventlog::extractors::{normalize_identifier, slugify};
use crate::model::{Classification, ExternalEvent, SnapshotRow, SourceStatus, TransitionSource};
use std::collections::BTreeMap;

/// Replace `version_from` on `updated` rows with the one recorded by the
/// latest matching event, returning how many rows changed.
///
/// Does nothing unless `status` is `Ok`. An event matches when it resolves
/// to the row (by slug or by slugified display name) and its `version_to`
/// equals the row's. Classification is never touched.
pub fn enrich_rows(
    rows: &mut BTreeMap<String, SnapshotRow>,
    events: &[ExternalEvent],
    status: &SourceStatus,
) -> usize {
    if !status.is_usable() {
        return 0;
    }

    let mut enriched = 0;
    for row in rows.values_mut() {
        if row.classification != Classification::Updated {
            continue;
        }
        let row_slug = row.slug.to_lowercase();
        let row_name = slugify(&row.name);

        let best = events
            .iter()
            .filter(|event| !event.version_from.is_empty() && event.version_to == row.version_to)
            .filter(|event| {
                let id = normalize_identifier(&event.slug);
                id == row_slug || (!row_name.is_empty() && slugify(&id) == row_name)
            })
            .max_by_key(|event| event.occurred_at);

        if let Some(event) = best {
            row.version_from = event.version_from.clone();
            row.transition_source = TransitionSource::EventLog;
            enriched += 1;
        }
    }
    enriched
}
