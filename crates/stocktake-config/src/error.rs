//! Configuration error types.

use stocktake_core::errors::{ExError, ExErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// Source merge or deserialization failure.
    #[error("Configuration error: {0}")]
    Load(#[from] config::ConfigError),

    /// An explicitly requested config file does not exist.
    #[error("Configuration file '{path}' not found")]
    FileNotFound { path: String },

    /// A configuration field has an invalid value.
    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<ConfigError> for ExError {
    fn from(err: ConfigError) -> Self {
        ExError::new(ExErrorKind::Config)
            .with_op("load_config")
            .with_message(err.to_string())
    }
}
