//! Subcommand implementations and the runtime they share.

pub mod history;
pub mod report;
pub mod schedule;
pub mod snapshot;

use rusqlite::Connection;
use serde::Serialize;
use std::error::Error;
use std::path::PathBuf;
use stocktake_config::StocktakeConfig;
use stocktake_core::clock::{Clock, SystemClock};
use stocktake_core::eventlog::EventLogSource;
use stocktake_core::logging_facility;
use stocktake_core::model::PeriodKey;
use stocktake_core::settings::{EngineSettings, EventSourceKind};
use stocktake_engine::{GenerationDeps, PeriodLocks};
use stocktake_store::{JsonInventoryFile, SqliteEventLog};

pub type CliResult = Result<(), Box<dyn Error>>;

/// Flags accepted by every subcommand.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub config: Option<PathBuf>,
    pub db: Option<PathBuf>,
    pub inventory: Option<PathBuf>,
    pub json: bool,
}

/// Everything a command needs besides the connection.
pub struct Runtime {
    pub settings: EngineSettings,
    pub inventory: JsonInventoryFile,
    pub event_log: Option<SqliteEventLog>,
    pub locks: PeriodLocks,
    pub clock: SystemClock,
    pub json: bool,
}

impl Runtime {
    pub fn deps(&self) -> GenerationDeps<'_> {
        GenerationDeps {
            inventory: &self.inventory,
            event_log: self.event_log.as_ref().map(|log| log as &dyn EventLogSource),
            locks: &self.locks,
            settings: &self.settings,
            clock: &self.clock,
        }
    }

    pub fn current_period(&self) -> PeriodKey {
        PeriodKey::containing(self.clock.now())
    }

    /// `--period` when given, else the current period.
    pub fn period(&self, raw: Option<&str>) -> Result<PeriodKey, Box<dyn Error>> {
        match raw {
            Some(raw) => Ok(PeriodKey::parse(raw)?),
            None => Ok(self.current_period()),
        }
    }

    pub fn print<T: Serialize>(&self, value: &T, human: impl FnOnce(&T)) -> CliResult {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            human(value);
        }
        Ok(())
    }
}

/// Load config, initialise logging, open (and migrate) the store.
pub fn open(global: &GlobalArgs) -> Result<(Connection, Runtime), Box<dyn Error>> {
    let mut config = StocktakeConfig::load_with_dotenv(global.config.as_deref())?;
    if let Some(db) = &global.db {
        config.store.db_path = db.clone();
    }
    if let Some(inventory) = &global.inventory {
        config.store.inventory_path = inventory.clone();
    }

    logging_facility::init(config.logging.profile()?);
    let settings = config.engine_settings()?;

    if let Some(parent) = config.store.db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let busy_timeout = config.store.busy_timeout();
    let conn = stocktake_store::db::open_store(&config.store.db_path, busy_timeout)?;

    let event_log = match settings.event_source {
        EventSourceKind::None => None,
        EventSourceKind::Internal => {
            Some(SqliteEventLog::internal_history(config.store.db_path.clone()).with_busy_timeout(busy_timeout))
        }
        EventSourceKind::External => match &config.event_log.path {
            Some(path) => Some(SqliteEventLog::new(path.clone(), config.event_log.table.clone())?.with_busy_timeout(busy_timeout)),
            None => None,
        },
    };

    let runtime = Runtime {
        settings,
        inventory: JsonInventoryFile::new(config.store.inventory_path.clone()),
        event_log,
        locks: PeriodLocks::default(),
        clock: SystemClock,
        json: global.json,
    };
    Ok((conn, runtime))
}
