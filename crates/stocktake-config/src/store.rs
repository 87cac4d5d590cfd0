use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// `[store]`: where snapshots live and where the inventory is read from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StoreConfig {
    pub db_path: PathBuf,
    /// SQLite busy timeout; contention past it surfaces as `SourceUnavailable`
    pub busy_timeout_ms: u64,
    /// JSON inventory file
    pub inventory_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("stocktake.db"),
            busy_timeout_ms: 5_000,
            inventory_path: PathBuf::from("inventory.json"),
        }
    }
}

impl StoreConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}
