//! Canonical data model shared by every platform.
//!
//! Records are built fresh by each normalization call and carry no identity
//! beyond it. Nothing in the crate caches them.

mod ads;
mod finance;
mod traffic;

pub use ads::{AccountSummary, CampaignMetrics, Counters, EntityIds, Ratios};
pub use finance::{RevenueSummary, Transaction, TransactionStatus};
pub use traffic::{TrafficCounters, TrafficMetrics, TrafficSummary};

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{AggregatorError, AggregatorResult};

/// Output of one normalization call: per-entity records plus their aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report<R, S> {
    pub records: Vec<R>,
    pub summary: S,
}

/// Normalized advertising performance.
pub type AdsReport = Report<CampaignMetrics, AccountSummary>;

/// Normalized web-analytics traffic.
pub type TrafficReport = Report<TrafficMetrics, TrafficSummary>;

/// Normalized financial transactions.
pub type RevenueReport = Report<Transaction, RevenueSummary>;

impl AdsReport {
    /// Fold records into a report.
    pub fn from_records(platform: &str, records: Vec<CampaignMetrics>) -> Self {
        let summary = AccountSummary::from_records(platform, &records);
        Self { records, summary }
    }

    /// A report with no data.
    pub fn empty(platform: &str) -> Self {
        Self::from_records(platform, Vec::new())
    }
}

impl TrafficReport {
    /// Fold records into a report.
    pub fn from_records(platform: &str, records: Vec<TrafficMetrics>) -> Self {
        let summary = TrafficSummary::from_records(platform, &records);
        Self { records, summary }
    }

    /// A report with no data.
    pub fn empty(platform: &str) -> Self {
        Self::from_records(platform, Vec::new())
    }
}

impl RevenueReport {
    /// Fold transactions into a report.
    pub fn from_records(platform: &str, records: Vec<Transaction>) -> Self {
        let summary = RevenueSummary::from_transactions(platform, &records);
        Self { records, summary }
    }

    /// A report with no data.
    pub fn empty(platform: &str) -> Self {
        Self::from_records(platform, Vec::new())
    }
}

/// Calendar date format used on the wire (`YYYY-MM-DD`).
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    /// First day, inclusive
    pub start: NaiveDate,
    /// Last day, inclusive
    pub end: NaiveDate,
}

impl DateRange {
    /// Create a range, rejecting `end < start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> AggregatorResult<Self> {
        if end < start {
            return Err(AggregatorError::InvalidDateRange(format!(
                "end {end} is before start {start}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse a range from ISO calendar-date strings.
    ///
    /// ```rust
    /// use admetrix::DateRange;
    ///
    /// let range = DateRange::parse("2024-03-01", "2024-03-31").unwrap();
    /// assert_eq!(range.days(), 31);
    /// assert!(DateRange::parse("2024-03-31", "2024-03-01").is_err());
    /// ```
    pub fn parse(start: &str, end: &str) -> AggregatorResult<Self> {
        let parse = |raw: &str| {
            NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|e| {
                AggregatorError::InvalidDateRange(format!("'{raw}' is not a calendar date: {e}"))
            })
        };
        Self::new(parse(start)?, parse(end)?)
    }

    /// A range covering exactly one day.
    pub fn single_day(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    /// Number of days covered, inclusive.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Check whether `day` falls inside the range.
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    /// Date marker used on records that cover the whole range.
    ///
    /// A single day renders as `YYYY-MM-DD`, anything longer as
    /// `YYYY-MM-DD..YYYY-MM-DD`.
    pub fn marker(&self) -> String {
        period_marker(self.start, self.end)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Render a period as a record date marker.
pub fn period_marker(start: NaiveDate, end: NaiveDate) -> String {
    if start == end {
        start.format(DATE_FORMAT).to_string()
    } else {
        format!(
            "{}..{}",
            start.format(DATE_FORMAT),
            end.format(DATE_FORMAT)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn test_parse_valid_range() {
        let range = DateRange::parse("2024-01-01", " 2024-01-07 ").unwrap();
        assert_eq!(range.start, day("2024-01-01"));
        assert_eq!(range.end, day("2024-01-07"));
        assert_eq!(range.days(), 7);
        assert_eq!(range.to_string(), "2024-01-01..2024-01-07");
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(matches!(
            DateRange::parse("2024-13-01", "2024-01-07"),
            Err(AggregatorError::InvalidDateRange(_))
        ));
        assert!(matches!(
            DateRange::parse("2024-01-07", "2024-01-01"),
            Err(AggregatorError::InvalidDateRange(_))
        ));
    }

    #[test]
    fn test_marker() {
        let single = DateRange::single_day(day("2024-02-29"));
        assert_eq!(single.marker(), "2024-02-29");
        assert_eq!(single.days(), 1);

        let range = DateRange::parse("2024-02-01", "2024-02-29").unwrap();
        assert_eq!(range.marker(), "2024-02-01..2024-02-29");
        assert!(range.contains(day("2024-02-10")));
        assert!(!range.contains(day("2024-03-01")));
    }
}
