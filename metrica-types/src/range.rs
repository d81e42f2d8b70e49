//! Inclusive calendar date ranges.

use core::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::MetricaError;

/// Inclusive `[start, end]` range of calendar days.
///
/// Deserialization applies the same `start <= end` check as [`DateRange::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawDateRange")]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Deserialize)]
struct RawDateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<RawDateRange> for DateRange {
    type Error = MetricaError;

    fn try_from(raw: RawDateRange) -> Result<Self, Self::Error> {
        Self::new(raw.start, raw.end)
    }
}

impl DateRange {
    /// Create a range, rejecting `start > end`.
    ///
    /// # Errors
    /// Returns `InvalidArg` when the range is inverted.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, MetricaError> {
        if start > end {
            return Err(MetricaError::InvalidArg(format!(
                "range start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse two `YYYY-MM-DD` strings.
    ///
    /// # Errors
    /// Returns `InvalidArg` for unparsable dates or an inverted range.
    pub fn parse(start: &str, end: &str) -> Result<Self, MetricaError> {
        let p = |s: &str| {
            NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map_err(|e| MetricaError::InvalidArg(format!("invalid date '{s}': {e}")))
        };
        Self::new(p(start)?, p(end)?)
    }

    /// First day of the range.
    #[must_use]
    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day of the range.
    #[must_use]
    pub const fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of days covered, counting both ends.
    #[must_use]
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// True when `date` lies inside the range.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// True when `other` lies entirely inside `self`.
    #[must_use]
    pub fn covers(&self, other: &Self) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Share of `self` that `query` occupies, in `(0, 1]`, or `None` when
    /// `self` does not cover `query`.
    ///
    /// Spans are measured in whole days, inclusive, so a single-day entry
    /// covering a single-day query has coverage 1.
    #[must_use]
    pub fn coverage_of(&self, query: &Self) -> Option<f64> {
        if !self.covers(query) {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        Some(query.days() as f64 / self.days() as f64)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}
