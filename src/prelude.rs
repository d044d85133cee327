//! Prelude module for convenient imports.
//!
//! Re-exports the registry, the domain contracts and the canonical records
//! for glob imports.
//!
//! # Example
//!
//! ```rust
//! use admetrix::prelude::*;
//!
//! let registry = CapabilityRegistry::builder().discover(&StaticConfig::new());
//! assert!(registry.get::<AdsDomain>().is_none());
//! ```

// Configuration
pub use crate::config::{ConfigSource, EnvConfig, StaticConfig};

// Core traits
pub use crate::contracts::{
    AdsProvider, AnalyticsProvider, Domain, FinanceProvider, Notification, NotificationLevel,
    NotificationProvider, PerformanceQuery,
};
pub use crate::fetch::{AccountMetadata, Credential, FetchRequest, RawFetcher, WebhookTransport};
pub use crate::provider::{Discoverable, HealthStatus, Provider, ProviderExt};

// Registry
pub use crate::registry::{
    AdsDomain, AnalyticsDomain, Candidate, CapabilityRegistry, FinanceDomain, NotificationDomain,
    RegistryBuilder,
};

// Records
pub use crate::model::{
    AccountSummary, AdsReport, CampaignMetrics, DateRange, RevenueSummary, TrafficMetrics,
    TrafficSummary, Transaction,
};

// Streams
pub use crate::stream::{fan_out_summaries, EventStream, FanOutEvent};

// Errors
pub use crate::error::{DiscoveryError, ProviderError, ProviderResult};

// Re-export async_trait for convenience
pub use async_trait::async_trait;
