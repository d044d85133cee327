//! Social ad platform rows with nested conversion-event arrays (Meta
//! Marketing API insights).
//!
//! Counters arrive as numeric strings, cost (`spend`) is already in major
//! units, and conversions are not a flat counter: they are spread over an
//! `actions` list of `{action_type, value}` events with a companion
//! `action_values` list carrying their monetary value.

use serde_json::Value;

use super::{
    collect_segments, day_marker, opt_text, parse_day, text, value_or_count, NormalizeContext,
    PlatformNormalizer, RawRow,
};
use crate::model::{period_marker, CampaignMetrics, Counters, EntityIds};
use crate::numeric::{row_currency, safe_amount, safe_amount_opt, safe_int, safe_int_opt};

/// Action types counted as conversions.
///
/// Only these exact types are summed. The platform also reports overlapping
/// aggregates of the same events (pixel-scoped and omni-channel variants),
/// which are deliberately left out to avoid counting one purchase twice.
pub const CONVERSION_ACTION_TYPES: &[&str] = &[
    "purchase",
    "lead",
    "complete_registration",
    "submit_application",
    "subscribe",
    "start_trial",
];

/// Normalizer for Meta insights rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetaNormalizer;

impl MetaNormalizer {
    /// Sum the `value` of allow-listed events in an action list.
    ///
    /// `None` when the list is absent or holds no allow-listed event, so
    /// callers can tell "no data" from "zero".
    pub fn sum_actions(actions: Option<&Value>) -> Option<f64> {
        let events = actions?.as_array()?;
        let mut matched = false;
        let mut total = 0.0;
        for event in events.iter().filter_map(Value::as_object) {
            let kind = text(event.get("action_type"));
            if CONVERSION_ACTION_TYPES.contains(&kind.as_str()) {
                matched = true;
                total += event.get("value").map(safe_amount).unwrap_or(0.0);
            }
        }
        matched.then_some(total)
    }

    fn date(row: &RawRow, ctx: &NormalizeContext<'_>) -> String {
        let start = opt_text(row.get("date_start"));
        let stop = opt_text(row.get("date_stop"));
        match (start, stop) {
            (Some(start), Some(stop)) => match (parse_day(&start), parse_day(&stop)) {
                (Some(s), Some(e)) => period_marker(s, e),
                _ => day_marker(&start),
            },
            (Some(start), None) => day_marker(&start),
            _ => ctx.fallback_date(),
        }
    }
}

impl PlatformNormalizer for MetaNormalizer {
    const PLATFORM: &'static str = "meta";
    const ROWS_CARRY_CURRENCY: bool = true;
    const SUPPORTED_BREAKDOWNS: &'static [&'static str] = &[
        "age",
        "gender",
        "country",
        "region",
        "publisher_platform",
        "platform_position",
        "device_platform",
        "impression_device",
    ];

    fn flatten_row(row: &RawRow, ctx: &NormalizeContext<'_>) -> CampaignMetrics {
        let ids = EntityIds::campaign(text(row.get("campaign_id")), text(row.get("campaign_name")))
            .with_ad_group(opt_text(row.get("adset_id")))
            .with_ad(opt_text(row.get("ad_id")));

        let conversions = Self::sum_actions(row.get("actions")).unwrap_or(0.0);
        let value = Self::sum_actions(row.get("action_values"));

        let reach = row
            .get("reach")
            .filter(|v| !v.is_null())
            .map(safe_int);
        let reported_frequency = row
            .get("frequency")
            .filter(|v| !v.is_null())
            .map(safe_amount);

        let counters = Counters {
            impressions: safe_int_opt(row.get("impressions")),
            clicks: safe_int_opt(row.get("clicks")),
            reach,
            cost: safe_amount_opt(row.get("spend")),
            conversions,
            conversions_value: value_or_count(Self::PLATFORM, value, conversions),
            reported_frequency,
        };

        let currency = opt_text(row.get("account_currency"));
        let currency = row_currency(currency.as_deref().or(ctx.account_currency));

        let segments =
            collect_segments(ctx.breakdowns, Self::SUPPORTED_BREAKDOWNS, |key| row.get(key));

        CampaignMetrics::new(
            Self::PLATFORM,
            ids,
            Self::date(row, ctx),
            currency,
            counters,
            segments,
        )
    }
}
