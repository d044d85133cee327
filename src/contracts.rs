//! Capability contracts, one per domain.
//!
//! Calling code is written once against these traits and works with every
//! platform the registry discovered. Every read operation returns a list
//! (possibly empty) or a summary, never an absent value; only genuine
//! upstream failures are errors.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderResult;
use crate::model::{
    AccountSummary, AdsReport, CampaignMetrics, DateRange, RevenueReport, RevenueSummary,
    TrafficMetrics, TrafficReport, TrafficSummary, Transaction,
};
use crate::provider::Provider;

/// Capability domains, in discovery order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Advertising,
    Analytics,
    Finance,
    Notifications,
}

impl Domain {
    /// Every domain, in discovery order.
    pub const ALL: [Domain; 4] = [
        Domain::Advertising,
        Domain::Analytics,
        Domain::Finance,
        Domain::Notifications,
    ];

    /// Machine key of the domain.
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Advertising => "advertising",
            Domain::Analytics => "analytics",
            Domain::Finance => "finance",
            Domain::Notifications => "notifications",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Date range plus optional breakdown dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerformanceQuery {
    pub range: DateRange,
    pub breakdowns: Vec<String>,
}

impl PerformanceQuery {
    /// A query without breakdowns.
    pub fn new(range: DateRange) -> Self {
        Self {
            range,
            breakdowns: Vec::new(),
        }
    }

    /// Request breakdown dimensions.
    pub fn with_breakdowns<I, S>(mut self, breakdowns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.breakdowns = breakdowns.into_iter().map(Into::into).collect();
        self
    }
}

/// Advertising performance contract.
#[async_trait]
pub trait AdsProvider: Provider {
    /// Breakdown dimensions this platform can split rows by.
    fn supported_breakdowns(&self) -> &[&str] {
        &[]
    }

    /// Fetch and normalize performance for a query.
    async fn get_performance(&self, query: &PerformanceQuery) -> ProviderResult<AdsReport>;

    /// Per-campaign metrics over an inclusive date range.
    async fn get_campaign_performance(
        &self,
        range: &DateRange,
    ) -> ProviderResult<Vec<CampaignMetrics>> {
        Ok(self.get_performance(&PerformanceQuery::new(*range)).await?.records)
    }

    /// Account-level aggregate over an inclusive date range.
    async fn get_account_summary(&self, range: &DateRange) -> ProviderResult<AccountSummary> {
        Ok(self.get_performance(&PerformanceQuery::new(*range)).await?.summary)
    }
}

/// Web-analytics contract.
#[async_trait]
pub trait AnalyticsProvider: Provider {
    /// Fetch and normalize traffic for a query.
    async fn get_traffic_report(&self, query: &PerformanceQuery) -> ProviderResult<TrafficReport>;

    /// Traffic per (date, source, medium) over an inclusive date range.
    async fn get_traffic(&self, range: &DateRange) -> ProviderResult<Vec<TrafficMetrics>> {
        Ok(self.get_traffic_report(&PerformanceQuery::new(*range)).await?.records)
    }

    /// Traffic aggregate over an inclusive date range.
    async fn get_traffic_summary(&self, range: &DateRange) -> ProviderResult<TrafficSummary> {
        Ok(self.get_traffic_report(&PerformanceQuery::new(*range)).await?.summary)
    }
}

/// Financial transactions contract.
#[async_trait]
pub trait FinanceProvider: Provider {
    /// Fetch and normalize transactions created within the range.
    async fn get_revenue_report(&self, range: &DateRange) -> ProviderResult<RevenueReport>;

    /// Transactions created within an inclusive date range.
    async fn get_transactions(&self, range: &DateRange) -> ProviderResult<Vec<Transaction>> {
        Ok(self.get_revenue_report(range).await?.records)
    }

    /// Revenue aggregate over an inclusive date range.
    async fn get_revenue_summary(&self, range: &DateRange) -> ProviderResult<RevenueSummary> {
        Ok(self.get_revenue_report(range).await?.summary)
    }
}

/// Severity of an outbound notification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    #[default]
    Info,
    Warning,
    Alert,
}

/// A message for an outbound notification channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub level: NotificationLevel,
    /// Key facts rendered as a field list
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, String>,
}

impl Notification {
    /// An informational message.
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            ..Self::default()
        }
    }

    /// Set the severity.
    pub fn level(mut self, level: NotificationLevel) -> Self {
        self.level = level;
        self
    }

    /// Add a key fact.
    pub fn field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

/// Outbound notifications contract.
#[async_trait]
pub trait NotificationProvider: Provider {
    /// Deliver a notification.
    async fn send(&self, notification: &Notification) -> ProviderResult<()>;
}
