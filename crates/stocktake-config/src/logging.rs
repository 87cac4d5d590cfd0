use serde::{Deserialize, Serialize};
use stocktake_core::logging_facility::Profile;

use crate::ConfigError;

/// `[logging]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// `development`, `production` or `test`
    pub profile: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            profile: "development".to_string(),
        }
    }
}

impl LoggingConfig {
    /// # Errors
    ///
    /// `InvalidValue` for an unknown profile name.
    pub fn profile(&self) -> Result<Profile, ConfigError> {
        self.profile
            .parse()
            .map_err(|reason: String| ConfigError::invalid("logging.profile", reason))
    }
}
