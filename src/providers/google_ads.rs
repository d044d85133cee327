use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;

use super::ProviderCore;
use crate::config::ConfigSource;
use crate::contracts::{AdsProvider, PerformanceQuery};
use crate::error::{DiscoveryError, DiscoveryResult, ProviderResult};
use crate::fetch::RawFetcher;
use crate::model::AdsReport;
use crate::normalize::{GoogleAdsNormalizer, PlatformNormalizer};
use crate::provider::{Discoverable, HealthStatus, Provider};

pub const DEVELOPER_TOKEN: &str = "GOOGLE_ADS_DEVELOPER_TOKEN";
pub const CLIENT_ID: &str = "GOOGLE_ADS_CLIENT_ID";
pub const CLIENT_SECRET: &str = "GOOGLE_ADS_CLIENT_SECRET";
pub const REFRESH_TOKEN: &str = "GOOGLE_ADS_REFRESH_TOKEN";
/// Optional; when absent the collaborator discovers the first accessible customer.
pub const CUSTOMER_ID: &str = "GOOGLE_ADS_CUSTOMER_ID";

const REQUIRED: &[&str] = &[DEVELOPER_TOKEN, CLIENT_ID, CLIENT_SECRET, REFRESH_TOKEN];

/// Paid-search/display advertising provider.
#[derive(Debug)]
pub struct GoogleAdsProvider {
    core: ProviderCore,
}

impl GoogleAdsProvider {
    /// Customer ids are written `123-456-7890` in the UI but sent as digits.
    fn customer_id(config: &dyn ConfigSource) -> DiscoveryResult<Option<String>> {
        let Some(raw) = config.get_non_empty(CUSTOMER_ID) else {
            return Ok(None);
        };
        let digits: String = raw.chars().filter(|c| *c != '-').collect();
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(DiscoveryError::InvalidConfig {
                key: CUSTOMER_ID.to_string(),
                reason: format!("'{raw}' is not a customer id"),
            });
        }
        Ok(Some(digits))
    }
}

#[async_trait]
impl Provider for GoogleAdsProvider {
    fn name(&self) -> &str {
        GoogleAdsNormalizer::PLATFORM
    }

    fn display_name(&self) -> &str {
        "Google Ads"
    }

    async fn health_check(&self) -> HealthStatus {
        self.core.health(self.name()).await
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[async_trait]
impl AdsProvider for GoogleAdsProvider {
    fn supported_breakdowns(&self) -> &[&str] {
        GoogleAdsNormalizer::SUPPORTED_BREAKDOWNS
    }

    async fn get_performance(&self, query: &PerformanceQuery) -> ProviderResult<AdsReport> {
        self.core.ads_report::<GoogleAdsNormalizer>(query).await
    }
}

impl Discoverable for GoogleAdsProvider {
    type Collaborator = dyn RawFetcher;

    fn is_configured(config: &dyn ConfigSource) -> bool {
        config.has_all(REQUIRED)
    }

    fn from_config(
        config: &dyn ConfigSource,
        collaborator: Arc<Self::Collaborator>,
    ) -> DiscoveryResult<Self> {
        let customer_id = Self::customer_id(config)?;
        Ok(Self {
            core: ProviderCore::new(GoogleAdsNormalizer::PLATFORM, collaborator, customer_id),
        })
    }
}
