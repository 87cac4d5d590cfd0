//! Reporting period keys and time windows.

use crate::errors::{ExError, StocktakeError};
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A validated `YYYY-MM` reporting period.
///
/// Ordering is chronological; the zero-padded textual form sorts the same
/// way, which the store relies on when looking up the previous period.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PeriodKey(String);

impl PeriodKey {
    /// Parse and validate a period key.
    ///
    /// # Errors
    ///
    /// `InvalidInput` when the value is not a real `YYYY-MM` month.
    pub fn parse(value: &str) -> Result<Self, ExError> {
        let trimmed = value.trim();
        let invalid = || {
            ExError::from(StocktakeError::InvalidPeriodKey {
                value: value.to_string(),
            })
            .with_op("parse_period_key")
        };

        let (year, month) = trimmed.split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;

        Ok(Self(format!("{:04}-{:02}", year, month)))
    }

    /// Period containing the given instant (UTC)
    pub fn containing(at: DateTime<Utc>) -> Self {
        Self(format!("{:04}-{:02}", at.year(), at.month()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn first_day(&self) -> NaiveDate {
        // Validated on construction
        let year: i32 = self.0[..4].parse().unwrap_or(1970);
        let month: u32 = self.0[5..].parse().unwrap_or(1);
        NaiveDate::from_ymd_opt(year, month, 1).unwrap_or_default()
    }

    /// Inclusive UTC window: first day 00:00:00 through last day 23:59:59.
    pub fn window(&self) -> TimeRange {
        let first = self.first_day();
        let next_first = if first.month() == 12 {
            NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
        }
        .unwrap_or(first);

        let start = Utc.from_utc_datetime(&first.and_hms_opt(0, 0, 0).unwrap_or_default());
        let end = Utc.from_utc_datetime(&next_first.and_hms_opt(0, 0, 0).unwrap_or_default())
            - Duration::seconds(1);
        TimeRange { start, end }
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PeriodKey {
    type Err = ExError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PeriodKey {
    type Error = ExError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PeriodKey> for String {
    fn from(value: PeriodKey) -> Self {
        value.0
    }
}

/// Inclusive time range in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at <= self.end
    }
}
