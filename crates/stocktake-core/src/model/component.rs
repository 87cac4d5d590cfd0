use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Present-moment state of one monitored component.
///
/// Read fresh on every generation run and never persisted directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentRecord {
    /// Stable identifier, unique within an inventory
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub current_version: String,
    #[serde(default)]
    pub active: bool,
    pub observed_at: DateTime<Utc>,
}

impl ComponentRecord {
    pub fn new(
        slug: impl Into<String>,
        name: impl Into<String>,
        current_version: impl Into<String>,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            slug: slug.into(),
            name: name.into(),
            description: String::new(),
            current_version: current_version.into(),
            active: true,
            observed_at,
        }
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }
}
