use serde::{Deserialize, Serialize};
use std::time::Duration;
use stocktake_core::settings::LockWait;

use crate::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LockWaitMode {
    #[default]
    Block,
    FailFast,
    /// Wait up to `lock_timeout_ms`
    Timeout,
}

/// `[engine]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EngineConfig {
    pub track_update_history: bool,
    /// 0 keeps everything
    pub history_retention_days: u32,
    pub lock_wait: LockWaitMode,
    pub lock_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            track_update_history: true,
            history_retention_days: 180,
            lock_wait: LockWaitMode::Block,
            lock_timeout_ms: 30_000,
        }
    }
}

impl EngineConfig {
    /// # Errors
    ///
    /// `InvalidValue` when `timeout` mode is configured with a zero timeout.
    pub fn lock_wait(&self) -> Result<LockWait, ConfigError> {
        match self.lock_wait {
            LockWaitMode::Block => Ok(LockWait::Block),
            LockWaitMode::FailFast => Ok(LockWait::FailFast),
            LockWaitMode::Timeout if self.lock_timeout_ms == 0 => Err(ConfigError::invalid(
                "engine.lock_timeout_ms",
                "must be positive when lock_wait = \"timeout\"",
            )),
            LockWaitMode::Timeout => Ok(LockWait::Timeout(Duration::from_millis(self.lock_timeout_ms))),
        }
    }
}
