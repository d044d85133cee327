use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;

use super::ProviderCore;
use crate::config::ConfigSource;
use crate::contracts::{AdsProvider, PerformanceQuery};
use crate::error::{DiscoveryError, DiscoveryResult, ProviderResult};
use crate::fetch::RawFetcher;
use crate::model::AdsReport;
use crate::normalize::{PlatformNormalizer, TikTokNormalizer};
use crate::provider::{Discoverable, HealthStatus, Provider};

pub const ACCESS_TOKEN: &str = "TIKTOK_ACCESS_TOKEN";
pub const ADVERTISER_ID: &str = "TIKTOK_ADVERTISER_ID";

/// Short-video advertising provider.
#[derive(Debug)]
pub struct TikTokProvider {
    core: ProviderCore,
}

#[async_trait]
impl Provider for TikTokProvider {
    fn name(&self) -> &str {
        TikTokNormalizer::PLATFORM
    }

    fn display_name(&self) -> &str {
        "TikTok Ads"
    }

    async fn health_check(&self) -> HealthStatus {
        self.core.health(self.name()).await
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[async_trait]
impl AdsProvider for TikTokProvider {
    fn supported_breakdowns(&self) -> &[&str] {
        TikTokNormalizer::SUPPORTED_BREAKDOWNS
    }

    async fn get_performance(&self, query: &PerformanceQuery) -> ProviderResult<AdsReport> {
        self.core.ads_report::<TikTokNormalizer>(query).await
    }
}

impl Discoverable for TikTokProvider {
    type Collaborator = dyn RawFetcher;

    fn is_configured(config: &dyn ConfigSource) -> bool {
        config.has_all(&[ACCESS_TOKEN, ADVERTISER_ID])
    }

    fn from_config(
        config: &dyn ConfigSource,
        collaborator: Arc<Self::Collaborator>,
    ) -> DiscoveryResult<Self> {
        let advertiser = config
            .get_non_empty(ADVERTISER_ID)
            .ok_or_else(|| DiscoveryError::MissingConfig(ADVERTISER_ID.to_string()))?;
        Ok(Self {
            core: ProviderCore::new(TikTokNormalizer::PLATFORM, collaborator, Some(advertiser)),
        })
    }
}
