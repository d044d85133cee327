//! # Admetrix
//!
//! **Admetrix** is the data core of a multi-platform marketing aggregator.
//! It answers two questions: which integrations are usable right now, and
//! how do their wildly different payloads become one comparable shape.
//!
//! ## Overview
//!
//! - **Capability registry**: at startup every declared provider candidate
//!   is probed against configuration. Configured ones are constructed and
//!   grouped by domain (advertising, analytics, finance, notifications);
//!   failures are logged and skipped, never fatal.
//! - **Normalization engine**: per-platform normalizers flatten raw rows
//!   into canonical records and fold them into summaries with derived
//!   ratios that are always recomputed from summed counters.
//! - **Fan-out**: query every advertising provider concurrently and stream
//!   per-platform results plus a combined summary.
//!
//! ## Layout
//!
//! ```text
//! registry   - candidates, discovery, domain lookups
//! contracts  - per-domain provider traits
//! providers  - built-in platform providers
//! normalize  - raw rows to canonical records
//! model      - canonical records, summaries, date ranges
//! fetch      - raw-fetch collaborator boundary
//! stream     - event streams and cross-platform fan-out
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use admetrix::prelude::*;
//! use admetrix::providers::{default_candidates, Collaborators};
//!
//! let collaborators = Collaborators {
//!     meta: Some(Arc::new(MyMetaFetcher::new())),
//!     ..Collaborators::default()
//! };
//! let registry = default_candidates(&collaborators).discover(&EnvConfig::new());
//!
//! if let Some(ads) = registry.get::<AdsDomain>() {
//!     let range = DateRange::parse("2024-01-01", "2024-01-31")?;
//!     let summary = ads.get_account_summary(&range).await?;
//!     println!("{}: {} {:?}", summary.platform, summary.cost, summary.currency);
//! }
//! ```

mod config;
mod contracts;
mod credential;
mod error;
mod fetch;
mod provider;
mod registry;

pub mod model;
pub mod normalize;
pub mod numeric;
pub mod providers;
pub mod stream;

pub mod prelude;

// Re-export core types
pub use config::{ConfigSource, EnvConfig, StaticConfig};
pub use contracts::{
    AdsProvider, AnalyticsProvider, Domain, FinanceProvider, Notification, NotificationLevel,
    NotificationProvider, PerformanceQuery,
};
pub use credential::{CredentialCache, DEFAULT_EXPIRY_SKEW};
pub use error::{
    AggregatorError, AggregatorResult, DiscoveryError, DiscoveryResult, ProviderError,
    ProviderResult, RegistryError, RegistryResult,
};
pub use fetch::{AccountMetadata, Credential, FetchRequest, RawFetcher, WebhookTransport};
pub use model::{
    AccountSummary, AdsReport, CampaignMetrics, DateRange, Report, RevenueReport, RevenueSummary,
    TrafficMetrics, TrafficReport, TrafficSummary, Transaction, TransactionStatus,
};
pub use provider::{Discoverable, HealthState, HealthStatus, Provider, ProviderExt};
pub use registry::{
    AdsDomain, AnalyticsDomain, Candidate, CapabilityRegistry, DomainKind, FinanceDomain,
    NotificationDomain, ProviderSet, RegistryBuilder,
};
pub use stream::{fan_out_summaries, EventStream, FanOutEvent};

// Re-export async-trait for convenience
pub use async_trait::async_trait;
