//! Advertising performance records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::numeric::{resolve_currency, round_to, safe_div, MULTIPLIER_PRECISION, RATIO_PRECISION};

/// Raw counters extracted from one platform row, before any ratio is derived.
///
/// `cost` and `conversions_value` are already in major currency units.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Counters {
    pub impressions: u64,
    pub clicks: u64,
    pub reach: Option<u64>,
    pub cost: f64,
    pub conversions: f64,
    pub conversions_value: f64,
    /// Frequency as reported by the platform, used only when reach is unknown.
    pub reported_frequency: Option<f64>,
}

/// Derived KPIs.
///
/// Always computed from counters (per row, or summed for aggregates) with
/// guarded division, then rounded to the crate-wide precision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Ratios {
    /// Click-through rate, as a percentage
    pub ctr: f64,
    /// Cost per click
    pub cpc: f64,
    /// Cost per acquisition
    pub cpa: f64,
    /// Return on ad spend
    pub roas: f64,
    /// Average impressions per reached user
    pub frequency: f64,
}

impl Ratios {
    /// Derive every ratio from a set of counters.
    pub fn derive(counters: &Counters) -> Self {
        let impressions = counters.impressions as f64;
        let frequency = match counters.reach {
            Some(reach) if reach > 0 => safe_div(impressions, reach as f64),
            _ => counters.reported_frequency.unwrap_or(0.0),
        };
        Self::rounded(
            100.0 * safe_div(counters.clicks as f64, impressions),
            safe_div(counters.cost, counters.clicks as f64),
            safe_div(counters.cost, counters.conversions),
            safe_div(counters.conversions_value, counters.cost),
            frequency,
        )
    }

    fn rounded(ctr: f64, cpc: f64, cpa: f64, roas: f64, frequency: f64) -> Self {
        Self {
            ctr: round_to(ctr, RATIO_PRECISION),
            cpc: round_to(cpc, RATIO_PRECISION),
            cpa: round_to(cpa, RATIO_PRECISION),
            roas: round_to(roas, MULTIPLIER_PRECISION),
            frequency: round_to(frequency, RATIO_PRECISION),
        }
    }
}

/// Entity identifiers of one record. Missing identifiers are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityIds {
    pub campaign_id: String,
    pub campaign_name: String,
    pub ad_group_id: Option<String>,
    pub ad_id: Option<String>,
}

impl EntityIds {
    /// Campaign-level identifiers.
    pub fn campaign(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            campaign_id: id.into(),
            campaign_name: name.into(),
            ad_group_id: None,
            ad_id: None,
        }
    }

    /// Attach an ad group (ad set) id, ignoring blanks.
    pub fn with_ad_group(mut self, id: Option<String>) -> Self {
        self.ad_group_id = id.filter(|v| !v.is_empty());
        self
    }

    /// Attach an ad id, ignoring blanks.
    pub fn with_ad(mut self, id: Option<String>) -> Self {
        self.ad_id = id.filter(|v| !v.is_empty());
        self
    }
}

/// Canonical per-entity advertising record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignMetrics {
    pub platform: String,
    pub campaign_id: String,
    pub campaign_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ad_group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ad_id: Option<String>,
    /// `YYYY-MM-DD`, or `YYYY-MM-DD..YYYY-MM-DD` for range totals
    pub date: String,
    pub currency: Option<String>,

    pub impressions: u64,
    pub clicks: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reach: Option<u64>,
    pub cost: f64,
    pub conversions: f64,
    pub conversions_value: f64,

    pub ctr: f64,
    pub cpc: f64,
    pub cpa: f64,
    pub roas: f64,
    pub frequency: f64,

    /// Requested breakdown dimensions the row carried; absent when none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segments: Option<BTreeMap<String, String>>,
}

impl CampaignMetrics {
    /// Assemble a record, deriving its ratios from `counters`.
    pub fn new(
        platform: &str,
        ids: EntityIds,
        date: String,
        currency: Option<String>,
        counters: Counters,
        segments: Option<BTreeMap<String, String>>,
    ) -> Self {
        let ratios = Ratios::derive(&counters);
        Self {
            platform: platform.to_string(),
            campaign_id: ids.campaign_id,
            campaign_name: ids.campaign_name,
            ad_group_id: ids.ad_group_id,
            ad_id: ids.ad_id,
            date,
            currency,
            impressions: counters.impressions,
            clicks: counters.clicks,
            reach: counters.reach,
            cost: counters.cost,
            conversions: counters.conversions,
            conversions_value: counters.conversions_value,
            ctr: ratios.ctr,
            cpc: ratios.cpc,
            cpa: ratios.cpa,
            roas: ratios.roas,
            frequency: ratios.frequency,
            segments: segments.filter(|s| !s.is_empty()),
        }
    }

    /// The raw counters of this record.
    pub fn counters(&self) -> Counters {
        Counters {
            impressions: self.impressions,
            clicks: self.clicks,
            reach: self.reach,
            cost: self.cost,
            conversions: self.conversions,
            conversions_value: self.conversions_value,
            reported_frequency: None,
        }
    }

    /// The derived ratios of this record.
    pub fn ratios(&self) -> Ratios {
        Ratios {
            ctr: self.ctr,
            cpc: self.cpc,
            cpa: self.cpa,
            roas: self.roas,
            frequency: self.frequency,
        }
    }
}

/// Aggregate over a batch of [`CampaignMetrics`].
///
/// Ratios are recomputed from the summed counters, never averaged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub platform: String,
    /// Shared code, `"MIXED"` on disagreement, `None` when no row had one
    pub currency: Option<String>,
    pub campaign_count: usize,

    pub impressions: u64,
    pub clicks: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reach: Option<u64>,
    pub cost: f64,
    pub conversions: f64,
    pub conversions_value: f64,

    pub ctr: f64,
    pub cpc: f64,
    pub cpa: f64,
    pub roas: f64,
    pub frequency: f64,

    /// Impressions of the rows that reported reach; frequency denominator pairs with this.
    #[serde(skip)]
    reach_impressions: u64,
}

impl AccountSummary {
    /// A zero summary, used when no data is available.
    pub fn empty(platform: &str) -> Self {
        Self::from_records(platform, &[])
    }

    /// Fold per-entity records into an aggregate.
    pub fn from_records(platform: &str, records: &[CampaignMetrics]) -> Self {
        let mut totals = Totals::default();
        for record in records {
            totals.add(&record.counters(), record.impressions);
        }
        let currency = resolve_currency(records.iter().map(|r| r.currency.as_deref()));
        totals.into_summary(platform, currency, records.len())
    }

    /// Combine summaries from several platforms into one cross-platform total.
    ///
    /// Currencies follow the same rule as rows: disagreement yields `"MIXED"`.
    pub fn combine<'a, I>(label: &str, summaries: I) -> Self
    where
        I: IntoIterator<Item = &'a AccountSummary>,
    {
        let summaries: Vec<&AccountSummary> = summaries.into_iter().collect();
        let mut totals = Totals::default();
        let mut campaigns = 0;
        for summary in &summaries {
            campaigns += summary.campaign_count;
            let counters = Counters {
                impressions: summary.impressions,
                clicks: summary.clicks,
                reach: summary.reach,
                cost: summary.cost,
                conversions: summary.conversions,
                conversions_value: summary.conversions_value,
                reported_frequency: None,
            };
            totals.add(&counters, summary.reach_impressions);
        }
        let currency = resolve_currency(summaries.iter().map(|s| s.currency.as_deref()));
        totals.into_summary(label, currency, campaigns)
    }

    /// The derived ratios of this summary.
    pub fn ratios(&self) -> Ratios {
        Ratios {
            ctr: self.ctr,
            cpc: self.cpc,
            cpa: self.cpa,
            roas: self.roas,
            frequency: self.frequency,
        }
    }
}

#[derive(Default)]
struct Totals {
    impressions: u64,
    clicks: u64,
    reach: Option<u64>,
    reach_impressions: u64,
    cost: f64,
    conversions: f64,
    conversions_value: f64,
}

impl Totals {
    fn add(&mut self, counters: &Counters, reach_impressions: u64) {
        self.impressions = self.impressions.saturating_add(counters.impressions);
        self.clicks = self.clicks.saturating_add(counters.clicks);
        if let Some(r) = counters.reach {
            self.reach = Some(self.reach.unwrap_or(0).saturating_add(r));
            self.reach_impressions = self.reach_impressions.saturating_add(reach_impressions);
        }
        self.cost += counters.cost;
        self.conversions += counters.conversions;
        self.conversions_value += counters.conversions_value;
    }

    fn into_summary(self, platform: &str, currency: Option<String>, count: usize) -> AccountSummary {
        let counters = Counters {
            impressions: self.impressions,
            clicks: self.clicks,
            // frequency pairs reach with the impressions of reach-bearing rows only
            reach: None,
            cost: self.cost,
            conversions: self.conversions,
            conversions_value: self.conversions_value,
            reported_frequency: None,
        };
        let mut ratios = Ratios::derive(&counters);
        ratios.frequency = round_to(
            safe_div(self.reach_impressions as f64, self.reach.unwrap_or(0) as f64),
            RATIO_PRECISION,
        );

        AccountSummary {
            platform: platform.to_string(),
            currency,
            campaign_count: count,
            impressions: self.impressions,
            clicks: self.clicks,
            reach: self.reach,
            cost: self.cost,
            conversions: self.conversions,
            conversions_value: self.conversions_value,
            ctr: ratios.ctr,
            cpc: ratios.cpc,
            cpa: ratios.cpa,
            roas: ratios.roas,
            frequency: ratios.frequency,
            reach_impressions: self.reach_impressions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::MIXED_CURRENCY;

    fn record(cost: f64, value: f64, currency: Option<&str>) -> CampaignMetrics {
        CampaignMetrics::new(
            "test",
            EntityIds::campaign("1", "c"),
            "2024-01-01".to_string(),
            currency.map(str::to_string),
            Counters {
                impressions: 100,
                clicks: 10,
                cost,
                conversions: 1.0,
                conversions_value: value,
                ..Counters::default()
            },
            None,
        )
    }

    #[test]
    fn test_ratios_guard_zero_denominators() {
        let ratios = Ratios::derive(&Counters::default());
        assert_eq!(ratios, Ratios::default());
    }

    #[test]
    fn test_frequency_prefers_reach() {
        let with_reach = Ratios::derive(&Counters {
            impressions: 300,
            reach: Some(200),
            reported_frequency: Some(9.0),
            ..Counters::default()
        });
        assert_eq!(with_reach.frequency, 1.5);

        let reported = Ratios::derive(&Counters {
            impressions: 300,
            reach: Some(0),
            reported_frequency: Some(1.234),
            ..Counters::default()
        });
        assert_eq!(reported.frequency, 1.23);
    }

    #[test]
    fn test_empty_segments_are_omitted() {
        let metrics = CampaignMetrics::new(
            "test",
            EntityIds::default(),
            String::new(),
            None,
            Counters::default(),
            Some(BTreeMap::new()),
        );
        assert!(metrics.segments.is_none());
    }

    #[test]
    fn test_summary_roas_uses_sums_not_mean() {
        let records = vec![record(10.0, 50.0, Some("USD")), record(90.0, 90.0, Some("USD"))];
        let summary = AccountSummary::from_records("test", &records);

        // 140 / 100, while the mean of per-row roas (5.0 and 1.0) would be 3.0
        assert_eq!(summary.roas, 1.4);
        assert_eq!(summary.cost, 100.0);
        assert_eq!(summary.campaign_count, 2);
        assert_eq!(summary.currency.as_deref(), Some("USD"));
    }

    #[test]
    fn test_summary_frequency_ignores_rows_without_reach() {
        let mut with_reach = record(1.0, 1.0, None);
        with_reach.impressions = 400;
        with_reach.reach = Some(100);
        let mut without_reach = record(1.0, 1.0, None);
        without_reach.impressions = 10_000;

        let summary = AccountSummary::from_records("test", &[with_reach, without_reach]);
        assert_eq!(summary.reach, Some(100));
        assert_eq!(summary.frequency, 4.0);
    }

    #[test]
    fn test_combine_mixes_currencies() {
        let usd = AccountSummary::from_records("a", &[record(10.0, 20.0, Some("USD"))]);
        let eur = AccountSummary::from_records("b", &[record(30.0, 20.0, Some("EUR"))]);

        let combined = AccountSummary::combine("all", [&usd, &eur]);
        assert_eq!(combined.currency.as_deref(), Some(MIXED_CURRENCY));
        assert_eq!(combined.cost, 40.0);
        assert_eq!(combined.roas, 1.0);
        assert_eq!(combined.campaign_count, 2);
        assert_eq!(combined.platform, "all");
    }

    #[test]
    fn test_empty_summary() {
        let summary = AccountSummary::empty("meta");
        assert_eq!(summary.campaign_count, 0);
        assert_eq!(summary.currency, None);
        assert_eq!(summary.ratios(), Ratios::default());
    }
}
