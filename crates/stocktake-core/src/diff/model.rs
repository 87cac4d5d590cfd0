use crate::model::{
    Annotations, Classification, PeriodKey, SnapshotRow, TransitionSource,
};
use serde::{Deserialize, Serialize};

/// Classification and version transition of one component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffResult {
    pub slug: String,
    pub name: String,
    pub description: String,
    pub classification: Classification,
    pub version_from: String,
    pub version_to: String,
    /// Installed version now; empty for deleted components
    pub current_version: String,
    pub active: bool,
}

impl DiffResult {
    /// Materialise as a snapshot row with empty annotations.
    pub fn into_row(self, period_key: &PeriodKey) -> SnapshotRow {
        SnapshotRow {
            period_key: period_key.clone(),
            slug: self.slug,
            name: self.name,
            description: self.description,
            classification: self.classification,
            version_from: self.version_from,
            version_to: self.version_to,
            current_version: self.current_version,
            active: self.active,
            transition_source: TransitionSource::Diff,
            annotations: Annotations::default(),
        }
    }
}
