use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;

use super::ProviderCore;
use crate::config::ConfigSource;
use crate::contracts::{AdsProvider, PerformanceQuery};
use crate::error::{DiscoveryResult, ProviderResult};
use crate::fetch::RawFetcher;
use crate::model::AdsReport;
use crate::normalize::{MetaNormalizer, PlatformNormalizer};
use crate::provider::{Discoverable, HealthStatus, Provider};

pub const ACCESS_TOKEN: &str = "META_ACCESS_TOKEN";
/// Optional; with or without the `act_` prefix.
pub const AD_ACCOUNT_ID: &str = "META_AD_ACCOUNT_ID";

const ACCOUNT_PREFIX: &str = "act_";

/// Social advertising provider for Meta (Facebook/Instagram) ad accounts.
#[derive(Debug)]
pub struct MetaProvider {
    core: ProviderCore,
}

fn account_id(raw: &str) -> String {
    if raw.starts_with(ACCOUNT_PREFIX) {
        raw.to_string()
    } else {
        format!("{ACCOUNT_PREFIX}{raw}")
    }
}

#[async_trait]
impl Provider for MetaProvider {
    fn name(&self) -> &str {
        MetaNormalizer::PLATFORM
    }

    fn display_name(&self) -> &str {
        "Meta Ads"
    }

    async fn health_check(&self) -> HealthStatus {
        self.core.health(self.name()).await
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[async_trait]
impl AdsProvider for MetaProvider {
    fn supported_breakdowns(&self) -> &[&str] {
        MetaNormalizer::SUPPORTED_BREAKDOWNS
    }

    async fn get_performance(&self, query: &PerformanceQuery) -> ProviderResult<AdsReport> {
        self.core.ads_report::<MetaNormalizer>(query).await
    }
}

impl Discoverable for MetaProvider {
    type Collaborator = dyn RawFetcher;

    fn is_configured(config: &dyn ConfigSource) -> bool {
        config.has(ACCESS_TOKEN)
    }

    fn from_config(
        config: &dyn ConfigSource,
        collaborator: Arc<Self::Collaborator>,
    ) -> DiscoveryResult<Self> {
        let account = config.get_non_empty(AD_ACCOUNT_ID).map(|raw| account_id(&raw));
        Ok(Self {
            core: ProviderCore::new(MetaNormalizer::PLATFORM, collaborator, account),
        })
    }
}
