//! Recording and pruning the internal update history.

use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use stocktake_core::clock::Clock;
use stocktake_core::errors::Result;
use stocktake_core::settings::EngineSettings;
use stocktake_core::{log_op_end, log_op_error, log_op_start};
use stocktake_store::history::{latest_for_component, prune_before, record_update, UpdateRecord};

/// Source tag used when the caller does not name one
pub const DEFAULT_UPDATE_SOURCE: &str = "manual";

/// An update reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentUpdate {
    pub slug: String,
    #[serde(default)]
    pub name: String,
    /// Inferred from the latest recorded entry when absent
    #[serde(default)]
    pub previous_version: Option<String>,
    pub new_version: String,
    /// Defaults to the clock's now
    #[serde(default)]
    pub updated_on: Option<DateTime<Utc>>,
    #[serde(default)]
    pub source: Option<String>,
}

impl ComponentUpdate {
    pub fn new(slug: impl Into<String>, new_version: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            name: String::new(),
            previous_version: None,
            new_version: new_version.into(),
            updated_on: None,
            source: None,
        }
    }
}

/// Record a component update in the history.
///
/// Returns `false` when tracking is disabled or the same update is already
/// recorded.
///
/// # Errors
///
/// - `InvalidInput`: empty slug or new version
/// - `Persistence`: store failure
pub fn record_component_update(
    conn: &Connection,
    update: &ComponentUpdate,
    settings: &EngineSettings,
    clock: &dyn Clock,
) -> Result<bool> {
    if !settings.track_update_history {
        tracing::debug!(slug = %update.slug, "Update history disabled, update not recorded");
        return Ok(false);
    }

    log_op_start!("record_component_update", slug = %update.slug);
    let start = std::time::Instant::now();

    let result = (|| -> Result<bool> {
        let slug = update.slug.trim();
        let previous_version = match &update.previous_version {
            Some(version) => version.clone(),
            None => latest_for_component(conn, slug)?
                .map(|stored| stored.record.new_version)
                .unwrap_or_default(),
        };
        let now = clock.now();
        let record = UpdateRecord {
            slug: slug.to_string(),
            name: update.name.clone(),
            previous_version,
            new_version: update.new_version.trim().to_string(),
            updated_on: update.updated_on.unwrap_or(now),
            source: update
                .source
                .clone()
                .unwrap_or_else(|| DEFAULT_UPDATE_SOURCE.to_string()),
        };
        record_update(conn, &record, now)
    })();

    let elapsed = start.elapsed().as_millis() as u64;
    match &result {
        Ok(inserted) => log_op_end!(
            "record_component_update",
            duration_ms = elapsed,
            slug = %update.slug,
            inserted = *inserted
        ),
        Err(e) => log_op_error!(
            "record_component_update",
            e.clone(),
            duration_ms = elapsed,
            slug = %update.slug
        ),
    }
    result
}

/// Delete history entries older than `retention_days` before `now`.
///
/// `retention_days == 0` keeps everything.
///
/// # Errors
///
/// - `Persistence`: store failure
pub fn prune_update_history(conn: &Connection, retention_days: u32, now: DateTime<Utc>) -> Result<usize> {
    if retention_days == 0 {
        return Ok(0);
    }

    log_op_start!("prune_update_history", retention_days = retention_days);
    let start = std::time::Instant::now();

    let cutoff = now - Duration::days(i64::from(retention_days));
    let result = prune_before(conn, cutoff);

    let elapsed = start.elapsed().as_millis() as u64;
    match &result {
        Ok(removed) => log_op_end!(
            "prune_update_history",
            duration_ms = elapsed,
            removed = *removed,
            cutoff = %cutoff
        ),
        Err(e) => log_op_error!("prune_update_history", e.clone(), duration_ms = elapsed),
    }
    result
}
