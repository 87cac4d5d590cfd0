//! Diff computation.

use crate::diff::model::DiffResult;
use crate::model::{Classification, ComponentRecord, SnapshotRow};
use std::collections::BTreeMap;

/// Classify `current` against the rows of the previous snapshot.
///
/// `previous` holds only components installed at the end of the prior
/// period; callers filter out rows already classified `deleted` there.
/// An empty `previous` makes every component `new`.
pub fn compute_diff(
    current: &BTreeMap<String, ComponentRecord>,
    previous: &BTreeMap<String, SnapshotRow>,
) -> BTreeMap<String, DiffResult> {
    let mut results = BTreeMap::new();

    for (slug, record) in current {
        let result = match previous.get(slug) {
            None => DiffResult {
                slug: slug.clone(),
                name: record.name.clone(),
                description: record.description.clone(),
                classification: Classification::New,
                version_from: String::new(),
                version_to: record.current_version.clone(),
                current_version: record.current_version.clone(),
                active: record.active,
            },
            Some(prior) if prior.current_version != record.current_version => DiffResult {
                slug: slug.clone(),
                name: record.name.clone(),
                description: record.description.clone(),
                classification: Classification::Updated,
                version_from: prior.current_version.clone(),
                version_to: record.current_version.clone(),
                current_version: record.current_version.clone(),
                active: record.active,
            },
            Some(_) => DiffResult {
                slug: slug.clone(),
                name: record.name.clone(),
                description: record.description.clone(),
                classification: Classification::Unchanged,
                version_from: record.current_version.clone(),
                version_to: record.current_version.clone(),
                current_version: record.current_version.clone(),
                active: record.active,
            },
        };
        results.insert(slug.clone(), result);
    }

    for (slug, prior) in previous {
        if current.contains_key(slug) {
            continue;
        }
        results.insert(
            slug.clone(),
            DiffResult {
                slug: slug.clone(),
                name: prior.name.clone(),
                description: prior.description.clone(),
                classification: Classification::Deleted,
                version_from: prior.current_version.clone(),
                version_to: String::new(),
                current_version: String::new(),
                active: false,
            },
        );
    }

    results
}
