//! Financial transaction records.

use serde::{Deserialize, Serialize};

use crate::numeric::{resolve_currency, round_to, safe_div, RATIO_PRECISION};

/// Settlement state of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Succeeded,
    Pending,
    Failed,
    /// Status string the platform sent that we do not recognise
    Unknown,
}

impl TransactionStatus {
    /// Map a platform status string.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "succeeded" | "paid" | "complete" | "completed" => Self::Succeeded,
            "pending" | "processing" => Self::Pending,
            "failed" | "canceled" | "cancelled" => Self::Failed,
            _ => Self::Unknown,
        }
    }
}

/// Canonical per-transaction record. Amounts are in major currency units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub platform: String,
    pub id: String,
    pub date: String,
    pub currency: Option<String>,
    pub status: TransactionStatus,
    pub amount: f64,
    pub amount_refunded: f64,
    pub net: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Aggregate over a batch of [`Transaction`]s.
///
/// Only succeeded transactions contribute to gross, refunded and net.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueSummary {
    pub platform: String,
    pub currency: Option<String>,
    pub transaction_count: usize,
    pub succeeded_count: usize,
    pub gross: f64,
    pub refunded: f64,
    pub net: f64,
    pub average_order_value: f64,
}

impl RevenueSummary {
    /// A zero summary, used when no data is available.
    pub fn empty(platform: &str) -> Self {
        Self::from_transactions(platform, &[])
    }

    /// Fold transactions into an aggregate.
    pub fn from_transactions(platform: &str, transactions: &[Transaction]) -> Self {
        let succeeded: Vec<&Transaction> = transactions
            .iter()
            .filter(|t| t.status == TransactionStatus::Succeeded)
            .collect();
        let gross: f64 = succeeded.iter().map(|t| t.amount).sum();
        let refunded: f64 = succeeded.iter().map(|t| t.amount_refunded).sum();

        Self {
            platform: platform.to_string(),
            currency: resolve_currency(transactions.iter().map(|t| t.currency.as_deref())),
            transaction_count: transactions.len(),
            succeeded_count: succeeded.len(),
            gross,
            refunded,
            net: gross - refunded,
            average_order_value: round_to(
                safe_div(gross, succeeded.len() as f64),
                RATIO_PRECISION,
            ),
        }
    }
}
