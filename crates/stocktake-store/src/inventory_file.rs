//! Inventory read from a JSON file on disk.

use crate::errors::Result;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use stocktake_core::errors::{ExError, StocktakeError};
use stocktake_core::inventory::{index_by_slug, InventorySource};
use stocktake_core::model::ComponentRecord;

#[derive(Debug, Deserialize)]
struct InventoryEntry {
    slug: String,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(alias = "version")]
    current_version: String,
    #[serde(default = "default_active")]
    active: bool,
    #[serde(default)]
    observed_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

/// A JSON array of components:
///
/// ```json
/// [{ "slug": "akismet", "name": "Akismet", "version": "5.1", "active": true }]
/// ```
///
/// Entries without `observed_at` are stamped with the read time.
#[derive(Debug, Clone)]
pub struct JsonInventoryFile {
    path: PathBuf,
}

impl JsonInventoryFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn unavailable(&self, reason: String) -> ExError {
        ExError::from(StocktakeError::InventoryUnavailable { reason }).with_op("read_inventory")
    }
}

impl InventorySource for JsonInventoryFile {
    fn read_current(&self) -> Result<BTreeMap<String, ComponentRecord>> {
        let text = std::fs::read_to_string(&self.path)
            .map_err(|e| self.unavailable(format!("{}: {}", self.path.display(), e)))?;
        let entries: Vec<InventoryEntry> = serde_json::from_str(&text)
            .map_err(|e| self.unavailable(format!("{}: malformed inventory: {}", self.path.display(), e)))?;

        let read_at = Utc::now();
        index_by_slug(entries.into_iter().map(|entry| ComponentRecord {
            slug: entry.slug,
            name: entry.name,
            description: entry.description,
            current_version: entry.current_version,
            active: entry.active,
            observed_at: entry.observed_at.unwrap_or(read_at),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stocktake_core::errors::ExErrorKind;

    #[test]
    fn test_reads_entries() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("inventory.json");
        std::fs::write(
            &path,
            r#"[
                {"slug": "akismet", "name": "Akismet", "version": "5.1"},
                {"slug": "hello", "name": "Hello Dolly", "current_version": "1.7", "active": false}
            ]"#,
        )
        .unwrap();

        let inventory = JsonInventoryFile::new(&path).read_current().unwrap();
        assert_eq!(inventory.len(), 2);
        assert_eq!(inventory["akismet"].current_version, "5.1");
        assert!(inventory["akismet"].active);
        assert!(!inventory["hello"].active);
    }

    #[test]
    fn test_missing_file_is_source_unavailable() {
        let err = JsonInventoryFile::new("/nonexistent/inventory.json")
            .read_current()
            .unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::SourceUnavailable);
    }

    #[test]
    fn test_malformed_file_is_source_unavailable() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("inventory.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = JsonInventoryFile::new(&path).read_current().unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::SourceUnavailable);
    }
}
