//! Payment platform charge objects (Stripe `charges.list`).
//!
//! Amounts are integers in the currency's minor unit. Most currencies have
//! two decimals, but some have none and a few have three, so the divisor is
//! chosen per charge. `created` is a Unix timestamp in seconds.

use chrono::DateTime;
use serde_json::Value;

use super::{flatten_all, opt_text, text, NormalizeContext, RawRow};
use crate::model::{RevenueReport, Transaction, TransactionStatus, DATE_FORMAT};
use crate::numeric::{row_currency, safe_amount_opt};

/// Currencies whose minor unit is the major unit.
const ZERO_DECIMAL: &[&str] = &[
    "BIF", "CLP", "DJF", "GNF", "JPY", "KMF", "KRW", "MGA", "PYG", "RWF", "UGX", "VND", "VUV",
    "XAF", "XOF", "XPF",
];

/// Currencies with three decimal places.
const THREE_DECIMAL: &[&str] = &["BHD", "JOD", "KWD", "OMR", "TND"];

/// Normalizer for charge objects.
#[derive(Debug, Clone, Copy, Default)]
pub struct StripeNormalizer;

impl StripeNormalizer {
    /// Platform key stamped on every record.
    pub const PLATFORM: &'static str = "stripe";

    /// Minor units per major unit for a currency code.
    pub fn minor_units(currency: Option<&str>) -> f64 {
        match currency {
            Some(code) if ZERO_DECIMAL.contains(&code) => 1.0,
            Some(code) if THREE_DECIMAL.contains(&code) => 1000.0,
            _ => 100.0,
        }
    }

    /// Flatten every charge object and fold them into a report.
    pub fn normalize(rows: &[Value], ctx: &NormalizeContext<'_>) -> RevenueReport {
        let records = flatten_all(Self::PLATFORM, rows, |row| Self::flatten_row(row, ctx));
        RevenueReport::from_records(Self::PLATFORM, records)
    }

    /// Flatten one charge object.
    pub fn flatten_row(row: &RawRow, ctx: &NormalizeContext<'_>) -> Transaction {
        let currency = opt_text(row.get("currency"));
        let currency = row_currency(currency.as_deref().or(ctx.account_currency));
        let divisor = Self::minor_units(currency.as_deref());

        let amount = safe_amount_opt(row.get("amount")) / divisor;
        let amount_refunded = safe_amount_opt(row.get("amount_refunded")) / divisor;

        let date = row
            .get("created")
            .and_then(Value::as_i64)
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map(|at| at.date_naive().format(DATE_FORMAT).to_string())
            .unwrap_or_else(|| ctx.fallback_date());

        Transaction {
            platform: Self::PLATFORM.to_string(),
            id: text(row.get("id")),
            date,
            currency,
            status: Self::status(row),
            amount,
            amount_refunded,
            net: amount - amount_refunded,
            customer_id: opt_text(row.get("customer")),
            description: opt_text(row.get("description")),
        }
    }

    fn status(row: &RawRow) -> TransactionStatus {
        match opt_text(row.get("status")) {
            Some(raw) => TransactionStatus::parse(&raw),
            None if row.get("paid").and_then(Value::as_bool) == Some(true) => {
                TransactionStatus::Succeeded
            }
            None => TransactionStatus::Unknown,
        }
    }
}
