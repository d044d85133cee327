use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;

use super::ProviderCore;
use crate::config::ConfigSource;
use crate::contracts::{AdsProvider, PerformanceQuery};
use crate::error::{DiscoveryResult, ProviderResult};
use crate::fetch::RawFetcher;
use crate::model::AdsReport;
use crate::normalize::{LinkedInNormalizer, PlatformNormalizer};
use crate::provider::{Discoverable, HealthStatus, Provider};

pub const CLIENT_ID: &str = "LINKEDIN_CLIENT_ID";
pub const CLIENT_SECRET: &str = "LINKEDIN_CLIENT_SECRET";
pub const REFRESH_TOKEN: &str = "LINKEDIN_REFRESH_TOKEN";
/// Optional; a bare id or a `urn:li:sponsoredAccount:` URN.
pub const AD_ACCOUNT_ID: &str = "LINKEDIN_AD_ACCOUNT_ID";

const REQUIRED: &[&str] = &[CLIENT_ID, CLIENT_SECRET, REFRESH_TOKEN];

/// Professional-network advertising provider.
///
/// Analytics rows carry neither campaign names nor currency, so every
/// non-empty fetch also pulls account metadata.
#[derive(Debug)]
pub struct LinkedInProvider {
    core: ProviderCore,
}

#[async_trait]
impl Provider for LinkedInProvider {
    fn name(&self) -> &str {
        LinkedInNormalizer::PLATFORM
    }

    fn display_name(&self) -> &str {
        "LinkedIn Ads"
    }

    async fn health_check(&self) -> HealthStatus {
        self.core.health(self.name()).await
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[async_trait]
impl AdsProvider for LinkedInProvider {
    async fn get_performance(&self, query: &PerformanceQuery) -> ProviderResult<AdsReport> {
        self.core.ads_report::<LinkedInNormalizer>(query).await
    }
}

impl Discoverable for LinkedInProvider {
    type Collaborator = dyn RawFetcher;

    fn is_configured(config: &dyn ConfigSource) -> bool {
        config.has_all(REQUIRED)
    }

    fn from_config(
        config: &dyn ConfigSource,
        collaborator: Arc<Self::Collaborator>,
    ) -> DiscoveryResult<Self> {
        let account = config
            .get_non_empty(AD_ACCOUNT_ID)
            .map(|raw| LinkedInNormalizer::urn_id(&raw).to_string());
        Ok(Self {
            core: ProviderCore::new(LinkedInNormalizer::PLATFORM, collaborator, account),
        })
    }
}
