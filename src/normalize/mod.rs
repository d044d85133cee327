//! Per-platform normalizers.
//!
//! Every platform disagrees on field names, nesting and units, so each one
//! gets its own module implementing the flatten step against its raw row
//! shape. The fold step (summing counters and recomputing ratios) is shared
//! and lives on the canonical records themselves.
//!
//! Normalizers are pure functions of their input and safe to call from any
//! number of tasks at once.

pub mod ga4;
pub mod google_ads;
pub mod linkedin;
pub mod meta;
pub mod stripe;
pub mod tiktok;

pub use ga4::Ga4Normalizer;
pub use google_ads::GoogleAdsNormalizer;
pub use linkedin::LinkedInNormalizer;
pub use meta::MetaNormalizer;
pub use stripe::StripeNormalizer;
pub use tiktok::TikTokNormalizer;

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde_json::{Map, Value};
use tracing::debug;

use crate::model::{AccountSummary, AdsReport, CampaignMetrics, DateRange, DATE_FORMAT};

/// Micro-units per major currency unit.
pub const MICROS_PER_UNIT: f64 = 1_000_000.0;

/// A raw platform row that passed the well-formedness check.
pub type RawRow = Map<String, Value>;

/// Call-scoped inputs every flatten step may consult.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizeContext<'a> {
    /// Breakdown dimensions the caller asked for
    pub breakdowns: &'a [String],
    /// Account currency, for platforms whose rows do not carry one
    pub account_currency: Option<&'a str>,
    /// Entity id to display name, for platforms whose rows carry ids only
    pub entity_names: Option<&'a BTreeMap<String, String>>,
    /// Requested range, used as the date marker when a row has none
    pub range: Option<DateRange>,
}

impl<'a> NormalizeContext<'a> {
    /// Context with breakdowns only.
    pub fn new(breakdowns: &'a [String]) -> Self {
        Self {
            breakdowns,
            ..Self::default()
        }
    }

    /// Set the account currency.
    pub fn with_currency(mut self, currency: Option<&'a str>) -> Self {
        self.account_currency = currency;
        self
    }

    /// Set the entity name lookup.
    pub fn with_entity_names(mut self, names: &'a BTreeMap<String, String>) -> Self {
        self.entity_names = Some(names);
        self
    }

    /// Set the requested range.
    pub fn with_range(mut self, range: DateRange) -> Self {
        self.range = Some(range);
        self
    }

    /// Date marker for rows that carry no date.
    pub fn fallback_date(&self) -> String {
        self.range.map(|r| r.marker()).unwrap_or_default()
    }

    /// Display name for an entity id, or empty.
    pub fn entity_name(&self, id: &str) -> String {
        self.entity_names
            .and_then(|names| names.get(id))
            .cloned()
            .unwrap_or_default()
    }
}

/// Flatten-and-fold for one advertising platform's raw rows.
pub trait PlatformNormalizer {
    /// Platform key stamped on every record.
    const PLATFORM: &'static str;

    /// Whether rows carry their own currency; if not, providers fetch
    /// account metadata before normalizing.
    const ROWS_CARRY_CURRENCY: bool;

    /// Breakdown dimensions this platform's rows can carry.
    const SUPPORTED_BREAKDOWNS: &'static [&'static str];

    /// Flatten one well-formed row into a canonical record.
    fn flatten_row(row: &RawRow, ctx: &NormalizeContext<'_>) -> CampaignMetrics;

    /// Flatten every well-formed row and fold them into a report.
    ///
    /// Rows that are not JSON objects are dropped with a debug log.
    fn normalize(rows: &[Value], ctx: &NormalizeContext<'_>) -> AdsReport {
        let records = flatten_all(Self::PLATFORM, rows, |row| Self::flatten_row(row, ctx));
        AdsReport::from_records(Self::PLATFORM, records)
    }

    /// Fold already-flattened records into an account summary.
    fn summarize(records: &[CampaignMetrics]) -> AccountSummary {
        AccountSummary::from_records(Self::PLATFORM, records)
    }
}

/// Apply `flatten` to every object row, dropping anything else.
pub(crate) fn flatten_all<T, F>(platform: &str, rows: &[Value], mut flatten: F) -> Vec<T>
where
    F: FnMut(&RawRow) -> T,
{
    rows.iter()
        .enumerate()
        .filter_map(|(index, row)| match row.as_object() {
            Some(object) => Some(flatten(object)),
            None => {
                debug!(platform, index, kind = json_kind(row), "Dropping malformed raw row");
                None
            }
        })
        .collect()
}

/// Follow a nested key path.
pub(crate) fn lookup<'a>(row: &'a RawRow, path: &[&str]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    let mut current = row.get(*first)?;
    for key in rest {
        current = current.as_object()?.get(*key)?;
    }
    Some(current)
}

/// First non-null value among alternative key paths.
pub(crate) fn first_of<'a>(row: &'a RawRow, paths: &[&[&str]]) -> Option<&'a Value> {
    paths
        .iter()
        .filter_map(|path| lookup(row, path))
        .find(|value| !value.is_null())
}

/// Render a scalar as text; anything else is empty.
pub(crate) fn text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Like [`text`], with blanks as `None`.
pub(crate) fn opt_text(value: Option<&Value>) -> Option<String> {
    Some(text(value)).filter(|s| !s.is_empty())
}

/// Collect the requested breakdown dimensions a row carries.
///
/// Returns `None` when nothing was requested or nothing requested was present,
/// so "no breakdown" and "breakdown requested" stay distinguishable.
pub(crate) fn collect_segments<'a, F>(
    breakdowns: &[String],
    supported: &[&str],
    mut resolve: F,
) -> Option<BTreeMap<String, String>>
where
    F: FnMut(&str) -> Option<&'a Value>,
{
    let segments: BTreeMap<String, String> = breakdowns
        .iter()
        .filter(|key| supported.contains(&key.as_str()))
        .filter_map(|key| opt_text(resolve(key)).map(|value| (key.clone(), value)))
        .collect();
    Some(segments).filter(|s| !s.is_empty())
}

/// Normalise a platform date (`2024-01-31`, `2024-01-31 00:00:00`,
/// `20240131`) to `YYYY-MM-DD`. Unrecognised input is returned trimmed.
pub(crate) fn day_marker(raw: &str) -> String {
    parse_day(raw)
        .map(|day| day.format(DATE_FORMAT).to_string())
        .unwrap_or_else(|| raw.trim().to_string())
}

/// Parse a platform date in any of the shapes [`day_marker`] accepts.
pub(crate) fn parse_day(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let head = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(head, DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y%m%d"))
        .ok()
}

/// Conversion value, falling back to the conversion count when the platform
/// supplied no value data at all.
///
/// The fallback is a known approximation: it treats every conversion as
/// worth one currency unit.
pub(crate) fn value_or_count(platform: &str, value: Option<f64>, conversions: f64) -> f64 {
    match value {
        Some(v) => v,
        None if conversions > 0.0 => {
            debug!(platform, conversions, "No conversion value data, using conversion count as value");
            conversions
        }
        None => 0.0,
    }
}

/// Convert `snake_case` to `camelCase` for platforms that accept either.
pub(crate) fn snake_to_camel(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper = false;
    for c in key.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> RawRow {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_lookup_and_first_of() {
        let row = object(json!({"metrics": {"costMicros": "5", "clicks": null}, "clicks": 3}));

        assert_eq!(lookup(&row, &["metrics", "costMicros"]), Some(&json!("5")));
        assert_eq!(lookup(&row, &["metrics", "missing"]), None);
        assert_eq!(lookup(&row, &["clicks", "nested"]), None);
        assert_eq!(
            first_of(&row, &[&["metrics", "clicks"], &["clicks"]]),
            Some(&json!(3))
        );
    }

    #[test]
    fn test_text() {
        assert_eq!(text(Some(&json!(" abc "))), "abc");
        assert_eq!(text(Some(&json!(123))), "123");
        assert_eq!(text(Some(&json!(null))), "");
        assert_eq!(text(None), "");
        assert_eq!(opt_text(Some(&json!(""))), None);
    }

    #[test]
    fn test_collect_segments_only_requested_and_present() {
        let row = object(json!({"age": "25-34", "gender": "female", "country": ""}));
        let requested = vec!["age".to_string(), "country".to_string(), "bogus".to_string()];

        let segments =
            collect_segments(&requested, &["age", "gender", "country"], |k| row.get(k)).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments.get("age").map(String::as_str), Some("25-34"));

        assert!(collect_segments(&[], &["age"], |k| row.get(k)).is_none());
        let absent = vec!["country".to_string()];
        assert!(collect_segments(&absent, &["country"], |k| row.get(k)).is_none());
    }

    #[test]
    fn test_day_marker() {
        assert_eq!(day_marker("2024-01-31"), "2024-01-31");
        assert_eq!(day_marker("2024-01-31 00:00:00"), "2024-01-31");
        assert_eq!(day_marker("20240131"), "2024-01-31");
        assert_eq!(day_marker(" weekly "), "weekly");
    }

    #[test]
    fn test_value_or_count() {
        assert_eq!(value_or_count("t", Some(12.5), 3.0), 12.5);
        assert_eq!(value_or_count("t", Some(0.0), 3.0), 0.0);
        assert_eq!(value_or_count("t", None, 3.0), 3.0);
        assert_eq!(value_or_count("t", None, 0.0), 0.0);
    }

    #[test]
    fn test_snake_to_camel() {
        assert_eq!(snake_to_camel("ad_network_type"), "adNetworkType");
        assert_eq!(snake_to_camel("device"), "device");
    }

    #[test]
    fn test_flatten_all_drops_non_objects() {
        let rows = vec![json!({"a": 1}), json!("oops"), json!(null), json!([1]), json!({})];
        let flattened = flatten_all("test", &rows, |row| row.len());
        assert_eq!(flattened, vec![1, 0]);
    }

    #[test]
    fn test_context_fallbacks() {
        let names: BTreeMap<String, String> = [("7".to_string(), "Brand".to_string())].into();
        let range = DateRange::parse("2024-01-01", "2024-01-31").unwrap();
        let ctx = NormalizeContext::new(&[])
            .with_entity_names(&names)
            .with_range(range);

        assert_eq!(ctx.entity_name("7"), "Brand");
        assert_eq!(ctx.entity_name("8"), "");
        assert_eq!(ctx.fallback_date(), "2024-01-01..2024-01-31");
        assert_eq!(NormalizeContext::default().fallback_date(), "");
    }
}
