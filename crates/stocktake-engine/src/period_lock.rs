//! In-process registry guaranteeing one generation per period at a time.

use std::collections::HashSet;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Instant;
use stocktake_core::errors::{ExError, ExErrorKind, Result, StocktakeError};
use stocktake_core::model::PeriodKey;
use stocktake_core::settings::LockWait;

/// Set of periods with a generation in flight.
///
/// Share one registry (by reference or `Arc`) between every caller that may
/// generate concurrently. Cross-process exclusion is left to the store's
/// IMMEDIATE transactions.
#[derive(Debug, Default)]
pub struct PeriodLocks {
    held: Mutex<HashSet<String>>,
    released: Condvar,
}

/// Holds a period until dropped.
#[derive(Debug)]
pub struct PeriodGuard<'a> {
    locks: &'a PeriodLocks,
    period_key: String,
}

impl PeriodLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_set(&self) -> Result<MutexGuard<'_, HashSet<String>>> {
        self.held.lock().map_err(|_| poisoned())
    }

    /// Claim `period_key`, waiting according to `wait`.
    ///
    /// # Errors
    ///
    /// `ConcurrentGenerationInProgress` when the period stays held
    /// (immediately for `FailFast`, after the bound for `Timeout`).
    pub fn acquire(&self, period_key: &PeriodKey, wait: LockWait) -> Result<PeriodGuard<'_>> {
        let key = period_key.as_str();
        let deadline = match wait {
            LockWait::Timeout(bound) => Some(Instant::now() + bound),
            _ => None,
        };

        let mut held = self.lock_set()?;
        while held.contains(key) {
            match wait {
                LockWait::FailFast => return Err(in_progress(period_key)),
                LockWait::Block => {
                    held = self.released.wait(held).map_err(|_| poisoned())?;
                }
                LockWait::Timeout(_) => {
                    let now = Instant::now();
                    let remaining = match deadline {
                        Some(deadline) if deadline > now => deadline - now,
                        _ => return Err(in_progress(period_key)),
                    };
                    held = self
                        .released
                        .wait_timeout(held, remaining)
                        .map_err(|_| poisoned())?
                        .0;
                }
            }
        }

        held.insert(key.to_string());
        Ok(PeriodGuard {
            locks: self,
            period_key: key.to_string(),
        })
    }

    pub fn is_held(&self, period_key: &PeriodKey) -> bool {
        self.lock_set()
            .map(|held| held.contains(period_key.as_str()))
            .unwrap_or(false)
    }
}

impl PeriodGuard<'_> {
    pub fn period_key(&self) -> &str {
        &self.period_key
    }
}

impl Drop for PeriodGuard<'_> {
    fn drop(&mut self) {
        let mut held = match self.locks.held.lock() {
            Ok(held) => held,
            Err(poisoned) => poisoned.into_inner(),
        };
        held.remove(&self.period_key);
        drop(held);
        self.locks.released.notify_all();
    }
}

fn in_progress(period_key: &PeriodKey) -> ExError {
    ExError::from(StocktakeError::GenerationInProgress {
        period_key: period_key.to_string(),
    })
    .with_op("acquire_period_lock")
}

fn poisoned() -> ExError {
    ExError::new(ExErrorKind::Internal)
        .with_op("acquire_period_lock")
        .with_message("period lock registry poisoned")
}
