use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;

use super::{filter_breakdowns, ProviderCore};
use crate::config::ConfigSource;
use crate::contracts::{AnalyticsProvider, PerformanceQuery};
use crate::error::{DiscoveryResult, ProviderResult};
use crate::fetch::RawFetcher;
use crate::model::TrafficReport;
use crate::normalize::Ga4Normalizer;
use crate::provider::{Discoverable, HealthStatus, Provider};

/// Numeric property id, optionally written `properties/123`.
pub const PROPERTY_ID: &str = "GA4_PROPERTY_ID";
/// Path to the service-account key file.
pub const APPLICATION_CREDENTIALS: &str = "GOOGLE_APPLICATION_CREDENTIALS";

const PROPERTY_PREFIX: &str = "properties/";

/// Web-analytics provider for GA4 properties.
#[derive(Debug)]
pub struct Ga4Provider {
    core: ProviderCore,
}

#[async_trait]
impl Provider for Ga4Provider {
    fn name(&self) -> &str {
        Ga4Normalizer::PLATFORM
    }

    fn display_name(&self) -> &str {
        "Google Analytics 4"
    }

    async fn health_check(&self) -> HealthStatus {
        self.core.health(self.name()).await
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[async_trait]
impl AnalyticsProvider for Ga4Provider {
    async fn get_traffic_report(&self, query: &PerformanceQuery) -> ProviderResult<TrafficReport> {
        let breakdowns = filter_breakdowns(
            Ga4Normalizer::PLATFORM,
            &query.breakdowns,
            Ga4Normalizer::SUPPORTED_BREAKDOWNS,
        );
        let batch = self.core.fetch(query.range, breakdowns.clone(), false).await?;
        Ok(match batch {
            Some(batch) => {
                Ga4Normalizer::normalize(&batch.rows, &batch.context(&breakdowns, query.range))
            }
            None => TrafficReport::empty(Ga4Normalizer::PLATFORM),
        })
    }
}

impl Discoverable for Ga4Provider {
    type Collaborator = dyn RawFetcher;

    fn is_configured(config: &dyn ConfigSource) -> bool {
        config.has_all(&[PROPERTY_ID, APPLICATION_CREDENTIALS])
    }

    fn from_config(
        config: &dyn ConfigSource,
        collaborator: Arc<Self::Collaborator>,
    ) -> DiscoveryResult<Self> {
        let property = config.get_non_empty(PROPERTY_ID).map(|raw| {
            raw.strip_prefix(PROPERTY_PREFIX)
                .map(str::to_string)
                .unwrap_or(raw)
        });
        Ok(Self {
            core: ProviderCore::new(Ga4Normalizer::PLATFORM, collaborator, property),
        })
    }
}
