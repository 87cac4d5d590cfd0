//! # stocktake-config
//!
//! Layered configuration loading for Stocktake using the `config` crate.
//!
//! Sources, lowest to highest priority:
//! 1. Built-in defaults
//! 2. A TOML file: an explicit path (must exist) or `./stocktake.toml` (optional)
//! 3. Environment variables with the `STOCKTAKE__` prefix, `__` between sections
//!
//! `STOCKTAKE__STORE__DB_PATH` maps to `store.db_path`,
//! `STOCKTAKE__EVENT_LOG__SOURCE` to `event_log.source`, and so on.
//!
//! ```no_run
//! use stocktake_config::StocktakeConfig;
//!
//! let config = StocktakeConfig::load_with_dotenv(None).expect("config");
//! let settings = config.engine_settings().expect("valid settings");
//! ```

mod engine;
mod error;
mod event_log;
mod logging;
mod store;

pub use engine::{EngineConfig, LockWaitMode};
pub use error::ConfigError;
pub use event_log::EventLogConfig;
pub use logging::LoggingConfig;
pub use store::StoreConfig;

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use stocktake_core::settings::{EngineSettings, ScheduleSettings};

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "stocktake.toml";

/// Environment prefix
pub const ENV_PREFIX: &str = "STOCKTAKE";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct StocktakeConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub event_log: EventLogConfig,
    #[serde(default)]
    pub schedule: ScheduleSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl StocktakeConfig {
    /// Load from defaults, the TOML file and the process environment.
    ///
    /// Does not read `.env`; see [`StocktakeConfig::load_with_dotenv`].
    ///
    /// # Errors
    ///
    /// `FileNotFound` for a missing explicit file, `Load` for malformed
    /// sources, `InvalidValue` for out-of-range values.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_from(file, None)
    }

    /// Load `.env` from the working directory (if any), then [`load`](Self::load).
    ///
    /// # Errors
    ///
    /// As [`StocktakeConfig::load`].
    pub fn load_with_dotenv(file: Option<&Path>) -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded .env");
        }
        Self::load(file)
    }

    /// Load with an explicit environment map instead of the process
    /// environment. Keys carry the full `STOCKTAKE__` prefix.
    ///
    /// # Errors
    ///
    /// As [`StocktakeConfig::load`].
    pub fn load_from(
        file: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        builder = match file {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::FileNotFound {
                        path: path.display().to_string(),
                    });
                }
                builder.add_source(File::from(path).format(FileFormat::Toml))
            }
            None => builder.add_source(
                File::from(PathBuf::from(DEFAULT_CONFIG_FILE))
                    .format(FileFormat::Toml)
                    .required(false),
            ),
        };

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        let loaded: Self = builder.build()?.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// # Errors
    ///
    /// `InvalidValue` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.db_path.as_os_str().is_empty() {
            return Err(ConfigError::invalid("store.db_path", "must not be empty"));
        }
        if !(1..=28).contains(&self.schedule.day_of_month) {
            return Err(ConfigError::invalid(
                "schedule.day_of_month",
                format!("{} is outside 1..=28", self.schedule.day_of_month),
            ));
        }
        if self.schedule.hour > 23 {
            return Err(ConfigError::invalid(
                "schedule.hour",
                format!("{} is outside 0..=23", self.schedule.hour),
            ));
        }
        self.engine.lock_wait()?;
        self.event_log.schema()?;
        self.logging.profile()?;
        Ok(())
    }

    /// The explicit settings value the engine runs with.
    ///
    /// # Errors
    ///
    /// `InvalidValue` as in [`StocktakeConfig::validate`].
    pub fn engine_settings(&self) -> Result<EngineSettings, ConfigError> {
        Ok(EngineSettings {
            event_source: self.event_log.source,
            track_update_history: self.engine.track_update_history,
            history_retention_days: self.engine.history_retention_days,
            lock_wait: self.engine.lock_wait()?,
            event_log_schema: self.event_log.schema()?,
            schedule: self.schedule,
        })
    }
}
