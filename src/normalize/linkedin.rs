//! Social ad platform rows from a REST analytics finder (LinkedIn
//! Marketing `adAnalytics`).
//!
//! Rows identify the entity by URN in `pivotValues` and carry no display
//! name or currency; both come from account metadata. The date range is a
//! nested `{year, month, day}` structure.

use chrono::NaiveDate;
use serde_json::Value;

use super::{
    collect_segments, first_of, lookup, text, value_or_count, NormalizeContext,
    PlatformNormalizer, RawRow,
};
use crate::model::{period_marker, CampaignMetrics, Counters, EntityIds};
use crate::numeric::{row_currency, safe_amount, safe_amount_opt, safe_int, safe_int_opt};

/// Normalizer for LinkedIn ad analytics rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkedInNormalizer;

impl LinkedInNormalizer {
    /// Trailing id of a URN such as `urn:li:sponsoredCampaign:123`.
    pub fn urn_id(urn: &str) -> &str {
        urn.rsplit(':').next().unwrap_or(urn)
    }

    fn entity_urn(row: &RawRow) -> String {
        let pivot = row
            .get("pivotValues")
            .and_then(Value::as_array)
            .and_then(|values| values.first());
        text(pivot.or_else(|| row.get("pivotValue")))
    }

    fn date_part(row: &RawRow, side: &str) -> Option<NaiveDate> {
        let part = lookup(row, &["dateRange", side])?;
        let year = part.get("year")?.as_i64()?;
        let month = part.get("month")?.as_u64()?;
        let day = part.get("day")?.as_u64()?;
        NaiveDate::from_ymd_opt(
            i32::try_from(year).ok()?,
            u32::try_from(month).ok()?,
            u32::try_from(day).ok()?,
        )
    }

    fn date(row: &RawRow, ctx: &NormalizeContext<'_>) -> String {
        match (Self::date_part(row, "start"), Self::date_part(row, "end")) {
            (Some(start), Some(end)) => period_marker(start, end),
            (Some(start), None) => period_marker(start, start),
            _ => ctx.fallback_date(),
        }
    }
}

impl PlatformNormalizer for LinkedInNormalizer {
    const PLATFORM: &'static str = "linkedin";
    const ROWS_CARRY_CURRENCY: bool = false;
    const SUPPORTED_BREAKDOWNS: &'static [&'static str] = &[];

    fn flatten_row(row: &RawRow, ctx: &NormalizeContext<'_>) -> CampaignMetrics {
        let urn = Self::entity_urn(row);
        let id = Self::urn_id(&urn).to_string();
        let name = ctx.entity_name(&id);
        let ids = EntityIds::campaign(id, name);

        let conversions = safe_amount_opt(row.get("externalWebsiteConversions"))
            + safe_amount_opt(row.get("oneClickLeads"));
        let value = row
            .get("conversionValueInLocalCurrency")
            .filter(|v| !v.is_null())
            .map(safe_amount);
        let reach = first_of(row, &[&["approximateMemberReach"], &["approximateUniqueImpressions"]])
            .map(safe_int);

        let counters = Counters {
            impressions: safe_int_opt(row.get("impressions")),
            clicks: safe_int_opt(row.get("clicks")),
            reach,
            cost: safe_amount_opt(row.get("costInLocalCurrency")),
            conversions,
            conversions_value: value_or_count(Self::PLATFORM, value, conversions),
            reported_frequency: None,
        };

        let segments = collect_segments(ctx.breakdowns, Self::SUPPORTED_BREAKDOWNS, |key| row.get(key));

        CampaignMetrics::new(
            Self::PLATFORM,
            ids,
            Self::date(row, ctx),
            row_currency(ctx.account_currency),
            counters,
            segments,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn test_finder_row() {
        let names: BTreeMap<String, String> =
            [("555".to_string(), "Webinar Q2".to_string())].into();
        let ctx = NormalizeContext::default()
            .with_currency(Some("GBP"))
            .with_entity_names(&names);
        let row = json!({
            "pivotValues": ["urn:li:sponsoredCampaign:555"],
            "dateRange": {
                "start": {"year": 2024, "month": 4, "day": 1},
                "end": {"year": 2024, "month": 4, "day": 30}
            },
            "impressions": 4000,
            "clicks": 80,
            "costInLocalCurrency": "160.0",
            "externalWebsiteConversions": 3,
            "oneClickLeads": 1,
            "conversionValueInLocalCurrency": "400",
            "approximateMemberReach": 1000
        });
        let metrics = LinkedInNormalizer::flatten_row(row.as_object().unwrap(), &ctx);

        assert_eq!(metrics.campaign_id, "555");
        assert_eq!(metrics.campaign_name, "Webinar Q2");
        assert_eq!(metrics.date, "2024-04-01..2024-04-30");
        assert_eq!(metrics.currency.as_deref(), Some("GBP"));
        assert_eq!(metrics.conversions, 4.0);
        assert_eq!(metrics.cpc, 2.0);
        assert_eq!(metrics.cpa, 40.0);
        assert_eq!(metrics.roas, 2.5);
        assert_eq!(metrics.frequency, 4.0);
    }

    #[test]
    fn test_missing_pivot_and_dates() {
        let metrics =
            LinkedInNormalizer::flatten_row(json!({"clicks": 1}).as_object().unwrap(), &NormalizeContext::default());
        assert_eq!(metrics.campaign_id, "");
        assert_eq!(metrics.campaign_name, "");
        assert_eq!(metrics.date, "");
        assert_eq!(metrics.currency, None);
    }

    #[test]
    fn test_invalid_date_part_uses_fallback() {
        let row = json!({"dateRange": {"start": {"year": 2024, "month": 13, "day": 1}}});
        let metrics =
            LinkedInNormalizer::flatten_row(row.as_object().unwrap(), &NormalizeContext::default());
        assert_eq!(metrics.date, "");
    }

    #[test]
    fn test_urn_id() {
        assert_eq!(LinkedInNormalizer::urn_id("urn:li:sponsoredCampaign:42"), "42");
        assert_eq!(LinkedInNormalizer::urn_id("42"), "42");
        assert_eq!(LinkedInNormalizer::urn_id(""), "");
    }

    #[test]
    fn test_negative_cost_clamps_to_zero() {
        let row = json!({"clicks": 3, "costInLocalCurrency": "-12", "externalWebsiteConversions": -2});
        let metrics =
            LinkedInNormalizer::flatten_row(row.as_object().unwrap(), &NormalizeContext::default());
        assert_eq!(metrics.cost, 0.0);
        assert_eq!(metrics.conversions, 0.0);
        assert_eq!(metrics.cpc, 0.0);
    }
}
