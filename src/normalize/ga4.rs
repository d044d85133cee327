//! Web-analytics report pages (GA4 Data API `runReport` responses).
//!
//! A page is columnar: `dimensionHeaders` and `metricHeaders` name the
//! columns, and each row holds positional `dimensionValues` and
//! `metricValues`. Values are always strings. Several metric names changed
//! between API revisions, so each canonical counter accepts a few aliases.

use std::collections::BTreeMap;

use serde_json::Value;

use super::{
    collect_segments, day_marker, flatten_all, lookup, opt_text, snake_to_camel, text,
    NormalizeContext, RawRow,
};
use crate::model::{TrafficCounters, TrafficMetrics, TrafficReport};
use crate::numeric::{row_currency, safe_amount, safe_int};

const SESSIONS: &[&str] = &["sessions"];
const ENGAGED_SESSIONS: &[&str] = &["engagedSessions"];
const USERS: &[&str] = &["totalUsers", "activeUsers"];
const NEW_USERS: &[&str] = &["newUsers"];
const PAGE_VIEWS: &[&str] = &["screenPageViews", "pageViews"];
const CONVERSIONS: &[&str] = &["conversions", "keyEvents"];
const REVENUE: &[&str] = &["totalRevenue", "purchaseRevenue"];
const ENGAGEMENT: &[&str] = &["userEngagementDuration"];

/// Normalizer for GA4 report pages.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ga4Normalizer;

/// One row of a page, keyed by header name.
struct Columns<'a> {
    dimensions: BTreeMap<&'a str, &'a Value>,
    metrics: BTreeMap<&'a str, &'a Value>,
}

impl<'a> Columns<'a> {
    fn new(dim_names: &[&'a str], metric_names: &[&'a str], row: &'a RawRow) -> Self {
        Self {
            dimensions: zip_cells(dim_names, row.get("dimensionValues")),
            metrics: zip_cells(metric_names, row.get("metricValues")),
        }
    }

    fn dimension(&self, name: &str) -> Option<&'a Value> {
        self.dimensions.get(name).copied()
    }

    fn metric(&self, aliases: &[&str]) -> Option<&'a Value> {
        aliases.iter().find_map(|name| self.metrics.get(*name).copied())
    }

    fn count(&self, aliases: &[&str]) -> u64 {
        self.metric(aliases).map(safe_int).unwrap_or(0)
    }

    fn amount(&self, aliases: &[&str]) -> f64 {
        self.metric(aliases).map(safe_amount).unwrap_or(0.0)
    }

    /// Source and medium, from split dimensions or the combined one.
    fn channel(&self) -> (String, String) {
        let source = opt_text(self.dimension("sessionSource"));
        let medium = opt_text(self.dimension("sessionMedium"));
        if source.is_some() || medium.is_some() {
            return (source.unwrap_or_default(), medium.unwrap_or_default());
        }
        let combined = text(self.dimension("sessionSourceMedium"));
        match combined.split_once(" / ") {
            Some((source, medium)) => (source.trim().to_string(), medium.trim().to_string()),
            None => (combined, String::new()),
        }
    }
}

/// Pair header names with the `value` of each positional cell.
fn zip_cells<'a>(names: &[&'a str], cells: Option<&'a Value>) -> BTreeMap<&'a str, &'a Value> {
    let cells = cells.and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[]);
    names
        .iter()
        .zip(cells)
        .filter_map(|(name, cell)| cell.get("value").map(|value| (*name, value)))
        .collect()
}

fn header_names<'a>(page: &'a RawRow, key: &str) -> Vec<&'a str> {
    page.get(key)
        .and_then(Value::as_array)
        .map(|headers| {
            headers
                .iter()
                .map(|h| h.get("name").and_then(Value::as_str).unwrap_or(""))
                .collect()
        })
        .unwrap_or_default()
}

impl Ga4Normalizer {
    /// Platform key stamped on every record.
    pub const PLATFORM: &'static str = "ga4";

    /// Breakdown dimensions a page can carry, in snake_case.
    pub const SUPPORTED_BREAKDOWNS: &'static [&'static str] = &[
        "device_category",
        "country",
        "city",
        "landing_page",
        "session_campaign_name",
        "session_default_channel_group",
    ];

    /// Flatten every page and fold all rows into one report.
    ///
    /// Pages and rows that are not JSON objects are dropped with a debug log.
    pub fn normalize(pages: &[Value], ctx: &NormalizeContext<'_>) -> TrafficReport {
        let records = flatten_all(Self::PLATFORM, pages, |page| Self::flatten_page(page, ctx))
            .into_iter()
            .flatten()
            .collect();
        TrafficReport::from_records(Self::PLATFORM, records)
    }

    /// Flatten the rows of one report page.
    pub fn flatten_page(page: &RawRow, ctx: &NormalizeContext<'_>) -> Vec<TrafficMetrics> {
        let dim_names = header_names(page, "dimensionHeaders");
        let metric_names = header_names(page, "metricHeaders");
        let page_currency = opt_text(lookup(page, &["metadata", "currencyCode"]));
        let currency = row_currency(page_currency.as_deref().or(ctx.account_currency));

        let rows: &[Value] = page
            .get("rows")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        flatten_all(Self::PLATFORM, rows, |row| {
            let columns = Columns::new(&dim_names, &metric_names, row);
            Self::flatten_row(&columns, currency.clone(), ctx)
        })
    }

    fn flatten_row(
        columns: &Columns<'_>,
        currency: Option<String>,
        ctx: &NormalizeContext<'_>,
    ) -> TrafficMetrics {
        let date = opt_text(columns.dimension("date"))
            .map(|d| day_marker(&d))
            .unwrap_or_else(|| ctx.fallback_date());
        let (source, medium) = columns.channel();

        let counters = TrafficCounters {
            sessions: columns.count(SESSIONS),
            engaged_sessions: columns.count(ENGAGED_SESSIONS),
            users: columns.count(USERS),
            new_users: columns.count(NEW_USERS),
            page_views: columns.count(PAGE_VIEWS),
            conversions: columns.amount(CONVERSIONS),
            revenue: columns.amount(REVENUE),
            engagement_seconds: columns.amount(ENGAGEMENT),
        };

        let segments = collect_segments(ctx.breakdowns, Self::SUPPORTED_BREAKDOWNS, |key| {
            columns.dimension(&snake_to_camel(key))
        });

        TrafficMetrics::new(Self::PLATFORM, date, source, medium, currency, counters, segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page() -> Value {
        json!({
            "dimensionHeaders": [{"name": "date"}, {"name": "sessionSourceMedium"}, {"name": "deviceCategory"}],
            "metricHeaders": [
                {"name": "sessions", "type": "TYPE_INTEGER"},
                {"name": "engagedSessions"},
                {"name": "activeUsers"},
                {"name": "screenPageViews"},
                {"name": "keyEvents"},
                {"name": "purchaseRevenue"}
            ],
            "rows": [
                {
                    "dimensionValues": [{"value": "20240301"}, {"value": "google / cpc"}, {"value": "mobile"}],
                    "metricValues": [
                        {"value": "200"}, {"value": "150"}, {"value": "180"},
                        {"value": "600"}, {"value": "4"}, {"value": "99.5"}
                    ]
                },
                {
                    "dimensionValues": [{"value": "20240302"}, {"value": "(direct)"}, {"value": "desktop"}],
                    "metricValues": [{"value": "100"}, {"value": "30"}]
                },
                "garbage"
            ],
            "metadata": {"currencyCode": "usd"}
        })
    }

    #[test]
    fn test_columnar_rows() {
        let breakdowns = vec!["device_category".to_string()];
        let ctx = NormalizeContext::new(&breakdowns);
        let report = Ga4Normalizer::normalize(&[page(), json!(42)], &ctx);

        assert_eq!(report.records.len(), 2);
        let first = &report.records[0];
        assert_eq!(first.date, "2024-03-01");
        assert_eq!(first.source, "google");
        assert_eq!(first.medium, "cpc");
        assert_eq!(first.users, 180);
        assert_eq!(first.page_views, 600);
        assert_eq!(first.conversions, 4.0);
        assert_eq!(first.revenue, 99.5);
        assert_eq!(first.bounce_rate, 25.0);
        assert_eq!(first.currency.as_deref(), Some("USD"));
        assert_eq!(
            first.segments.as_ref().unwrap().get("device_category").map(String::as_str),
            Some("mobile")
        );

        let second = &report.records[1];
        assert_eq!(second.source, "(direct)");
        assert_eq!(second.medium, "");
        assert_eq!(second.users, 0);
        assert_eq!(second.bounce_rate, 70.0);

        let summary = &report.summary;
        assert_eq!(summary.sessions, 300);
        assert_eq!(summary.engaged_sessions, 180);
        assert_eq!(summary.bounce_rate, 40.0);
        assert_eq!(summary.currency.as_deref(), Some("USD"));
    }

    #[test]
    fn test_split_source_medium() {
        let page = json!({
            "dimensionHeaders": [{"name": "sessionSource"}, {"name": "sessionMedium"}],
            "metricHeaders": [{"name": "sessions"}],
            "rows": [{"dimensionValues": [{"value": "newsletter"}, {"value": "email"}], "metricValues": [{"value": "5"}]}]
        });
        let records = Ga4Normalizer::flatten_page(page.as_object().unwrap(), &NormalizeContext::default());
        assert_eq!(records[0].source, "newsletter");
        assert_eq!(records[0].medium, "email");
        assert_eq!(records[0].currency, None);
    }

    #[test]
    fn test_page_without_rows() {
        let report = Ga4Normalizer::normalize(&[json!({"dimensionHeaders": []})], &NormalizeContext::default());
        assert!(report.records.is_empty());
        assert_eq!(report.summary.sessions, 0);
        assert_eq!(report.summary.bounce_rate, 0.0);
    }

    #[test]
    fn test_negative_revenue_clamps_to_zero() {
        let page = json!({
            "dimensionHeaders": [{"name": "date"}],
            "metricHeaders": [{"name": "sessions"}, {"name": "purchaseRevenue"}, {"name": "keyEvents"}],
            "rows": [{
                "dimensionValues": [{"value": "20240301"}],
                "metricValues": [{"value": "10"}, {"value": "-49.99"}, {"value": "-1"}]
            }]
        });
        let records = Ga4Normalizer::flatten_page(page.as_object().unwrap(), &NormalizeContext::default());
        assert_eq!(records[0].revenue, 0.0);
        assert_eq!(records[0].conversions, 0.0);
        assert_eq!(records[0].conversion_rate, 0.0);
    }
}
