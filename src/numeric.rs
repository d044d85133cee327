//! Numeric-safety helpers shared by every normalizer.
//!
//! Platform payloads mix JSON numbers, numeric strings (sometimes with
//! thousands separators), nulls and garbage. Every helper here is total:
//! it never panics and never yields NaN or infinity.

use serde_json::Value;

/// Currency sentinel for aggregates whose rows disagree on currency.
///
/// Never appears on an individual record.
pub const MIXED_CURRENCY: &str = "MIXED";

/// Decimal places for percentage and currency-denominated ratios.
pub const RATIO_PRECISION: u32 = 2;

/// Decimal places for small multipliers such as ROAS.
pub const MULTIPLIER_PRECISION: u32 = 4;

/// Coerce a JSON value to a finite `f64`.
///
/// Accepts numbers, booleans and numeric strings (`"1,234.5"`, `" 12 "`).
/// Null, objects, arrays, unparseable strings and non-finite results are `0`.
///
/// ```rust
/// use admetrix::numeric::safe_float;
/// use serde_json::json;
///
/// assert_eq!(safe_float(&json!("1,234.5")), 1234.5);
/// assert_eq!(safe_float(&json!(null)), 0.0);
/// assert_eq!(safe_float(&json!("n/a")), 0.0);
/// ```
pub fn safe_float(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => parse_numeric_str(s),
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Null | Value::Array(_) | Value::Object(_) => 0.0,
    };
    finite_or_zero(parsed)
}

/// Like [`safe_float`] for an optional value; `None` is `0`.
pub fn safe_float_opt(value: Option<&Value>) -> f64 {
    value.map(safe_float).unwrap_or(0.0)
}

/// Coerce a JSON value to a non-negative amount (cost, value, conversions).
///
/// Negative input clamps to `0` so derived ratios never turn negative.
///
/// ```rust
/// use admetrix::numeric::safe_amount;
/// use serde_json::json;
///
/// assert_eq!(safe_amount(&json!("-5")), 0.0);
/// assert_eq!(safe_amount(&json!("12.5")), 12.5);
/// ```
pub fn safe_amount(value: &Value) -> f64 {
    let v = safe_float(value);
    if v > 0.0 {
        v
    } else {
        0.0
    }
}

/// Like [`safe_amount`] for an optional value; `None` is `0`.
pub fn safe_amount_opt(value: Option<&Value>) -> f64 {
    value.map(safe_amount).unwrap_or(0.0)
}

/// Coerce a JSON value to a non-negative integer counter.
///
/// Fractional input is truncated; negative input clamps to `0`.
pub fn safe_int(value: &Value) -> u64 {
    if let Value::Number(n) = value {
        if let Some(v) = n.as_u64() {
            return v;
        }
    }
    let v = safe_float(value);
    if v <= 0.0 {
        0
    } else {
        // saturating float-to-int cast
        v.trunc() as u64
    }
}

/// Like [`safe_int`] for an optional value; `None` is `0`.
pub fn safe_int_opt(value: Option<&Value>) -> u64 {
    value.map(safe_int).unwrap_or(0)
}

/// Divide, yielding `0` when the denominator is zero or the result is not finite.
pub fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    finite_or_zero(numerator / denominator)
}

/// Round to a fixed number of decimal places.
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    let rounded = (value * factor).round() / factor;
    // normalise -0.0 so serialized output is stable
    if rounded == 0.0 {
        0.0
    } else {
        finite_or_zero(rounded)
    }
}

/// Resolve the currency of an aggregate from its rows' currencies.
///
/// Rows without a currency are ignored. All agreeing rows yield that code,
/// disagreeing rows yield [`MIXED_CURRENCY`], no currency at all yields `None`.
/// Comparison is case-insensitive; the returned code is upper-case.
pub fn resolve_currency<'a, I>(currencies: I) -> Option<String>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut resolved: Option<String> = None;
    for code in currencies.into_iter().flatten() {
        let code = code.trim();
        if code.is_empty() {
            continue;
        }
        match &resolved {
            None => resolved = Some(code.to_ascii_uppercase()),
            Some(existing) if existing.eq_ignore_ascii_case(code) => {}
            Some(_) => return Some(MIXED_CURRENCY.to_string()),
        }
    }
    resolved
}

/// Normalise a single row's currency code, rejecting blanks and the sentinel.
pub fn row_currency(code: Option<&str>) -> Option<String> {
    code.map(str::trim)
        .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case(MIXED_CURRENCY))
        .map(str::to_ascii_uppercase)
}

fn parse_numeric_str(raw: &str) -> f64 {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != ',' && *c != '_')
        .collect();
    if cleaned.is_empty() {
        return 0.0;
    }
    cleaned.parse::<f64>().unwrap_or(0.0)
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_safe_float_accepts_numbers_and_strings() {
        assert_eq!(safe_float(&json!(12)), 12.0);
        assert_eq!(safe_float(&json!(2.5)), 2.5);
        assert_eq!(safe_float(&json!("3.75")), 3.75);
        assert_eq!(safe_float(&json!(" 1,000,000 ")), 1_000_000.0);
    }

    #[test]
    fn test_safe_float_is_total() {
        assert_eq!(safe_float(&json!(null)), 0.0);
        assert_eq!(safe_float(&json!("")), 0.0);
        assert_eq!(safe_float(&json!("abc")), 0.0);
        assert_eq!(safe_float(&json!("NaN")), 0.0);
        assert_eq!(safe_float(&json!("inf")), 0.0);
        assert_eq!(safe_float(&json!([1, 2])), 0.0);
        assert_eq!(safe_float(&json!({"v": 1})), 0.0);
        assert_eq!(safe_float_opt(None), 0.0);
    }

    #[test]
    fn test_safe_amount_clamps_negatives() {
        assert_eq!(safe_amount(&json!(-5)), 0.0);
        assert_eq!(safe_amount(&json!("-0.5")), 0.0);
        assert_eq!(safe_amount(&json!("1,250.75")), 1250.75);
        assert_eq!(safe_amount_opt(None), 0.0);
        assert!(safe_amount(&json!(-0.0)).is_sign_positive());
    }

    #[test]
    fn test_safe_int() {
        assert_eq!(safe_int(&json!("1,234")), 1234);
        assert_eq!(safe_int(&json!(7.9)), 7);
        assert_eq!(safe_int(&json!(-3)), 0);
        assert_eq!(safe_int(&json!("garbage")), 0);
        assert_eq!(safe_int(&json!(u64::MAX)), u64::MAX);
        assert_eq!(safe_int_opt(None), 0);
    }

    #[test]
    fn test_safe_div_guards_zero() {
        assert_eq!(safe_div(5.0, 0.0), 0.0);
        assert_eq!(safe_div(0.0, 0.0), 0.0);
        assert_eq!(safe_div(5.0, 2.0), 2.5);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.123456, 2), 0.12);
        assert_eq!(round_to(8.00004, 4), 8.0);
        assert_eq!(round_to(1.005, 0), 1.0);
        assert_eq!(round_to(-0.0001, 2), 0.0);
        assert!(round_to(-0.0001, 2).is_sign_positive());
    }

    #[test]
    fn test_resolve_currency() {
        assert_eq!(
            resolve_currency([Some("USD"), Some("USD")]),
            Some("USD".to_string())
        );
        assert_eq!(
            resolve_currency([Some("USD"), Some("EUR")]),
            Some(MIXED_CURRENCY.to_string())
        );
        assert_eq!(resolve_currency([None, None]), None);
        assert_eq!(resolve_currency(std::iter::empty()), None);
        assert_eq!(
            resolve_currency([Some("usd"), None, Some("USD")]),
            Some("USD".to_string())
        );
    }

    #[test]
    fn test_row_currency_rejects_sentinel() {
        assert_eq!(row_currency(Some("eur")), Some("EUR".to_string()));
        assert_eq!(row_currency(Some(" ")), None);
        assert_eq!(row_currency(Some("mixed")), None);
        assert_eq!(row_currency(None), None);
    }
}
