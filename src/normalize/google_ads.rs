//! Paid-search/display platform rows (Google Ads query-language results).
//!
//! Rows nest resources (`campaign`, `adGroup`, `customer`, `segments`,
//! `metrics`) and report cost in micro-units. Field names arrive in
//! camelCase from the REST API and in snake_case from client libraries, so
//! both are accepted.

use serde_json::Value;

use super::{
    collect_segments, day_marker, first_of, lookup, opt_text, snake_to_camel, text,
    value_or_count, NormalizeContext, PlatformNormalizer, RawRow, MICROS_PER_UNIT,
};
use crate::model::{CampaignMetrics, Counters, EntityIds};
use crate::numeric::{row_currency, safe_amount, safe_amount_opt, safe_int_opt};

/// Normalizer for paid-search/display rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct GoogleAdsNormalizer;

impl GoogleAdsNormalizer {
    /// Look up a metric under `metrics`, falling back to a top-level key.
    fn metric<'a>(row: &'a RawRow, names: &[&str]) -> Option<&'a Value> {
        names
            .iter()
            .find_map(|name| first_of(row, &[&["metrics", *name], &[*name]]))
    }
}

impl PlatformNormalizer for GoogleAdsNormalizer {
    const PLATFORM: &'static str = "google_ads";
    const ROWS_CARRY_CURRENCY: bool = true;
    const SUPPORTED_BREAKDOWNS: &'static [&'static str] = &[
        "device",
        "ad_network_type",
        "day_of_week",
        "hour",
        "click_type",
        "conversion_action_name",
    ];

    fn flatten_row(row: &RawRow, ctx: &NormalizeContext<'_>) -> CampaignMetrics {
        let ids = EntityIds::campaign(
            text(lookup(row, &["campaign", "id"])),
            text(lookup(row, &["campaign", "name"])),
        )
        .with_ad_group(opt_text(first_of(
            row,
            &[&["adGroup", "id"], &["ad_group", "id"]],
        )))
        .with_ad(opt_text(first_of(
            row,
            &[&["adGroupAd", "ad", "id"], &["ad_group_ad", "ad", "id"]],
        )));

        let date = opt_text(lookup(row, &["segments", "date"]))
            .map(|d| day_marker(&d))
            .unwrap_or_else(|| ctx.fallback_date());

        let cost = safe_amount_opt(Self::metric(row, &["costMicros", "cost_micros"])) / MICROS_PER_UNIT;
        let conversions = safe_amount_opt(Self::metric(row, &["conversions"]));
        let value = Self::metric(row, &["conversionsValue", "conversions_value"]).map(safe_amount);

        let counters = Counters {
            impressions: safe_int_opt(Self::metric(row, &["impressions"])),
            clicks: safe_int_opt(Self::metric(row, &["clicks"])),
            reach: None,
            cost,
            conversions,
            conversions_value: value_or_count(Self::PLATFORM, value, conversions),
            reported_frequency: None,
        };

        let currency = opt_text(first_of(
            row,
            &[
                &["customer", "currencyCode"],
                &["customer", "currency_code"],
                &["currency"],
            ],
        ));
        let currency = row_currency(currency.as_deref().or(ctx.account_currency));

        let segments = collect_segments(ctx.breakdowns, Self::SUPPORTED_BREAKDOWNS, |key| {
            let camel = snake_to_camel(key);
            row.get("segments")
                .and_then(Value::as_object)
                .and_then(|s| s.get(key).or_else(|| s.get(&camel)))
        });

        CampaignMetrics::new(Self::PLATFORM, ids, date, currency, counters, segments)
    }
}
