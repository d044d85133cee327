//! Short-video ad platform rows (TikTok Business integrated reports).
//!
//! Each row splits into a `dimensions` object (ids, day, breakdowns) and a
//! `metrics` object whose values are all numeric strings. Rows carry no
//! currency; it comes from the advertiser record.

use serde_json::Value;

use super::{
    collect_segments, day_marker, lookup, opt_text, text, value_or_count, NormalizeContext,
    PlatformNormalizer, RawRow,
};
use crate::model::{CampaignMetrics, Counters, EntityIds};
use crate::numeric::{row_currency, safe_amount, safe_amount_opt, safe_int, safe_int_opt};

/// Normalizer for TikTok report rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct TikTokNormalizer;

fn dimension<'a>(row: &'a RawRow, key: &str) -> Option<&'a Value> {
    lookup(row, &["dimensions", key])
}

fn metric<'a>(row: &'a RawRow, key: &str) -> Option<&'a Value> {
    lookup(row, &["metrics", key]).filter(|v| !v.is_null())
}

impl PlatformNormalizer for TikTokNormalizer {
    const PLATFORM: &'static str = "tiktok";
    const ROWS_CARRY_CURRENCY: bool = false;
    const SUPPORTED_BREAKDOWNS: &'static [&'static str] =
        &["country_code", "gender", "age", "platform", "placement"];

    fn flatten_row(row: &RawRow, ctx: &NormalizeContext<'_>) -> CampaignMetrics {
        let campaign_id = text(dimension(row, "campaign_id"));
        let campaign_name = opt_text(metric(row, "campaign_name"))
            .unwrap_or_else(|| ctx.entity_name(&campaign_id));
        let ids = EntityIds::campaign(campaign_id, campaign_name)
            .with_ad_group(opt_text(dimension(row, "adgroup_id")))
            .with_ad(opt_text(dimension(row, "ad_id")));

        let date = opt_text(dimension(row, "stat_time_day"))
            .map(|d| day_marker(&d))
            .unwrap_or_else(|| ctx.fallback_date());

        let conversions = safe_amount_opt(metric(row, "conversion"));
        let value = metric(row, "total_purchase_value").map(safe_amount);

        let counters = Counters {
            impressions: safe_int_opt(metric(row, "impressions")),
            clicks: safe_int_opt(metric(row, "clicks")),
            reach: metric(row, "reach").map(safe_int),
            cost: safe_amount_opt(metric(row, "spend")),
            conversions,
            conversions_value: value_or_count(Self::PLATFORM, value, conversions),
            reported_frequency: metric(row, "frequency").map(safe_amount),
        };

        let segments = collect_segments(ctx.breakdowns, Self::SUPPORTED_BREAKDOWNS, |key| {
            dimension(row, key)
        });

        CampaignMetrics::new(
            Self::PLATFORM,
            ids,
            date,
            row_currency(ctx.account_currency),
            counters,
            segments,
        )
    }
}
