//! Inventory Reader: the current set of installed components.

use crate::errors::{ExError, Result, StocktakeError};
use crate::model::ComponentRecord;
use std::collections::BTreeMap;

/// Source of the present-moment component inventory.
///
/// Implementations must be free of side effects. Any failure aborts the
/// generation that asked for the inventory.
pub trait InventorySource: Send + Sync {
    /// # Errors
    ///
    /// `SourceUnavailable` when the backing source cannot be read, and
    /// `InvalidInput` for empty or duplicate slugs.
    fn read_current(&self) -> Result<BTreeMap<String, ComponentRecord>>;
}

/// Key records by slug, rejecting empty and duplicate slugs.
///
/// # Errors
///
/// `InvalidInput` on the first empty or repeated slug.
pub fn index_by_slug(
    records: impl IntoIterator<Item = ComponentRecord>,
) -> Result<BTreeMap<String, ComponentRecord>> {
    let mut indexed = BTreeMap::new();
    for record in records {
        if record.slug.trim().is_empty() {
            return Err(ExError::from(StocktakeError::EmptySlug).with_op("read_inventory"));
        }
        if indexed.contains_key(&record.slug) {
            return Err(ExError::from(StocktakeError::DuplicateSlug {
                slug: record.slug.clone(),
            })
            .with_op("read_inventory"));
        }
        indexed.insert(record.slug.clone(), record);
    }
    Ok(indexed)
}

/// In-memory inventory for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticInventory {
    records: Vec<ComponentRecord>,
}

impl StaticInventory {
    pub fn new(records: Vec<ComponentRecord>) -> Self {
        Self { records }
    }
}

impl InventorySource for StaticInventory {
    fn read_current(&self) -> Result<BTreeMap<String, ComponentRecord>> {
        index_by_slug(self.records.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ExErrorKind;
    use chrono::Utc;

    #[test]
    fn test_static_inventory_indexes_by_slug() {
        let now = Utc::now();
        let inventory = StaticInventory::new(vec![
            ComponentRecord::new("b", "B", "2.0", now),
            ComponentRecord::new("a", "A", "1.0", now),
        ]);
        let current = inventory.read_current().unwrap();
        assert_eq!(current.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_duplicate_slug_rejected() {
        let now = Utc::now();
        let inventory = StaticInventory::new(vec![
            ComponentRecord::new("a", "A", "1.0", now),
            ComponentRecord::new("a", "A again", "1.1", now),
        ]);
        let err = inventory.read_current().unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidInput);
        assert_eq!(err.slug(), Some("a"));
    }

    #[test]
    fn test_empty_slug_rejected() {
        let inventory = StaticInventory::new(vec![ComponentRecord::new(" ", "X", "1", Utc::now())]);
        assert_eq!(
            inventory.read_current().unwrap_err().kind(),
            ExErrorKind::InvalidInput
        );
    }
}
