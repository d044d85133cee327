//! Web-analytics traffic records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::numeric::{resolve_currency, round_to, safe_div, RATIO_PRECISION};

/// Raw traffic counters for one (date, source, medium) row.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrafficCounters {
    pub sessions: u64,
    pub engaged_sessions: u64,
    pub users: u64,
    pub new_users: u64,
    pub page_views: u64,
    pub conversions: f64,
    pub revenue: f64,
    /// Total engagement time in seconds
    pub engagement_seconds: f64,
}

impl TrafficCounters {
    fn add(&mut self, other: &TrafficCounters) {
        self.sessions = self.sessions.saturating_add(other.sessions);
        self.engaged_sessions = self.engaged_sessions.saturating_add(other.engaged_sessions);
        self.users = self.users.saturating_add(other.users);
        self.new_users = self.new_users.saturating_add(other.new_users);
        self.page_views = self.page_views.saturating_add(other.page_views);
        self.conversions += other.conversions;
        self.revenue += other.revenue;
        self.engagement_seconds += other.engagement_seconds;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct TrafficRatios {
    bounce_rate: f64,
    conversion_rate: f64,
    pages_per_session: f64,
    avg_engagement_seconds: f64,
}

impl TrafficRatios {
    fn derive(c: &TrafficCounters) -> Self {
        let sessions = c.sessions as f64;
        let bounced = c.sessions.saturating_sub(c.engaged_sessions) as f64;
        Self {
            bounce_rate: round_to(100.0 * safe_div(bounced, sessions), RATIO_PRECISION),
            conversion_rate: round_to(100.0 * safe_div(c.conversions, sessions), RATIO_PRECISION),
            pages_per_session: round_to(safe_div(c.page_views as f64, sessions), RATIO_PRECISION),
            avg_engagement_seconds: round_to(
                safe_div(c.engagement_seconds, sessions),
                RATIO_PRECISION,
            ),
        }
    }
}

/// Canonical per-row traffic record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficMetrics {
    pub platform: String,
    pub date: String,
    pub source: String,
    pub medium: String,
    pub currency: Option<String>,

    pub sessions: u64,
    pub engaged_sessions: u64,
    pub users: u64,
    pub new_users: u64,
    pub page_views: u64,
    pub conversions: f64,
    pub revenue: f64,
    pub engagement_seconds: f64,

    /// Percentage of sessions that were not engaged
    pub bounce_rate: f64,
    /// Conversions per hundred sessions
    pub conversion_rate: f64,
    pub pages_per_session: f64,
    pub avg_engagement_seconds: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segments: Option<BTreeMap<String, String>>,
}

impl TrafficMetrics {
    /// Assemble a record, deriving its ratios from `counters`.
    pub fn new(
        platform: &str,
        date: String,
        source: String,
        medium: String,
        currency: Option<String>,
        counters: TrafficCounters,
        segments: Option<BTreeMap<String, String>>,
    ) -> Self {
        let ratios = TrafficRatios::derive(&counters);
        Self {
            platform: platform.to_string(),
            date,
            source,
            medium,
            currency,
            sessions: counters.sessions,
            engaged_sessions: counters.engaged_sessions,
            users: counters.users,
            new_users: counters.new_users,
            page_views: counters.page_views,
            conversions: counters.conversions,
            revenue: counters.revenue,
            engagement_seconds: counters.engagement_seconds,
            bounce_rate: ratios.bounce_rate,
            conversion_rate: ratios.conversion_rate,
            pages_per_session: ratios.pages_per_session,
            avg_engagement_seconds: ratios.avg_engagement_seconds,
            segments: segments.filter(|s| !s.is_empty()),
        }
    }

    /// The raw counters of this record.
    pub fn counters(&self) -> TrafficCounters {
        TrafficCounters {
            sessions: self.sessions,
            engaged_sessions: self.engaged_sessions,
            users: self.users,
            new_users: self.new_users,
            page_views: self.page_views,
            conversions: self.conversions,
            revenue: self.revenue,
            engagement_seconds: self.engagement_seconds,
        }
    }
}

/// Aggregate over a batch of [`TrafficMetrics`].
///
/// `users` is a plain sum across rows, so a visitor seen on several days or
/// channels is counted once per row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficSummary {
    pub platform: String,
    pub currency: Option<String>,
    pub row_count: usize,

    pub sessions: u64,
    pub engaged_sessions: u64,
    pub users: u64,
    pub new_users: u64,
    pub page_views: u64,
    pub conversions: f64,
    pub revenue: f64,
    pub engagement_seconds: f64,

    pub bounce_rate: f64,
    pub conversion_rate: f64,
    pub pages_per_session: f64,
    pub avg_engagement_seconds: f64,
}

impl TrafficSummary {
    /// A zero summary, used when no data is available.
    pub fn empty(platform: &str) -> Self {
        Self::from_records(platform, &[])
    }

    /// Fold per-row records into an aggregate, recomputing ratios from sums.
    pub fn from_records(platform: &str, records: &[TrafficMetrics]) -> Self {
        let mut totals = TrafficCounters::default();
        for record in records {
            totals.add(&record.counters());
        }
        let ratios = TrafficRatios::derive(&totals);
        Self {
            platform: platform.to_string(),
            currency: resolve_currency(records.iter().map(|r| r.currency.as_deref())),
            row_count: records.len(),
            sessions: totals.sessions,
            engaged_sessions: totals.engaged_sessions,
            users: totals.users,
            new_users: totals.new_users,
            page_views: totals.page_views,
            conversions: totals.conversions,
            revenue: totals.revenue,
            engagement_seconds: totals.engagement_seconds,
            bounce_rate: ratios.bounce_rate,
            conversion_rate: ratios.conversion_rate,
            pages_per_session: ratios.pages_per_session,
            avg_engagement_seconds: ratios.avg_engagement_seconds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(sessions: u64, engaged: u64, conversions: f64) -> TrafficMetrics {
        TrafficMetrics::new(
            "ga4",
            "2024-01-01".to_string(),
            "google".to_string(),
            "cpc".to_string(),
            None,
            TrafficCounters {
                sessions,
                engaged_sessions: engaged,
                page_views: sessions * 3,
                conversions,
                engagement_seconds: sessions as f64 * 30.0,
                ..TrafficCounters::default()
            },
            None,
        )
    }

    #[test]
    fn test_row_ratios() {
        let metrics = row(200, 150, 4.0);
        assert_eq!(metrics.bounce_rate, 25.0);
        assert_eq!(metrics.conversion_rate, 2.0);
        assert_eq!(metrics.pages_per_session, 3.0);
        assert_eq!(metrics.avg_engagement_seconds, 30.0);
    }

    #[test]
    fn test_zero_sessions_have_zero_ratios() {
        let metrics = row(0, 0, 0.0);
        assert_eq!(metrics.bounce_rate, 0.0);
        assert_eq!(metrics.conversion_rate, 0.0);
        assert_eq!(metrics.pages_per_session, 0.0);
    }

    #[test]
    fn test_summary_weights_by_sessions() {
        // bounce rates 50% (10 sessions) and 10% (990 sessions)
        let summary = TrafficSummary::from_records("ga4", &[row(10, 5, 0.0), row(990, 891, 0.0)]);
        assert_eq!(summary.sessions, 1000);
        assert_eq!(summary.bounce_rate, 10.4);
        assert_eq!(summary.row_count, 2);
    }
}
