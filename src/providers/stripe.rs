use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;

use super::ProviderCore;
use crate::config::ConfigSource;
use crate::contracts::FinanceProvider;
use crate::error::{DiscoveryError, DiscoveryResult, ProviderResult};
use crate::fetch::RawFetcher;
use crate::model::{DateRange, RevenueReport};
use crate::normalize::StripeNormalizer;
use crate::provider::{Discoverable, HealthStatus, Provider};

pub const SECRET_KEY: &str = "STRIPE_SECRET_KEY";
/// Optional connected account to read on behalf of.
pub const ACCOUNT_ID: &str = "STRIPE_ACCOUNT_ID";

/// Secret (`sk_`) and restricted (`rk_`) keys can read charges; publishable keys cannot.
const READ_KEY_PREFIXES: &[&str] = &["sk_", "rk_"];

/// Payments provider.
#[derive(Debug)]
pub struct StripeProvider {
    core: ProviderCore,
}

#[async_trait]
impl Provider for StripeProvider {
    fn name(&self) -> &str {
        StripeNormalizer::PLATFORM
    }

    fn display_name(&self) -> &str {
        "Stripe"
    }

    async fn health_check(&self) -> HealthStatus {
        self.core.health(self.name()).await
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[async_trait]
impl FinanceProvider for StripeProvider {
    async fn get_revenue_report(&self, range: &DateRange) -> ProviderResult<RevenueReport> {
        let batch = self.core.fetch(*range, Vec::new(), false).await?;
        Ok(match batch {
            Some(batch) => StripeNormalizer::normalize(&batch.rows, &batch.context(&[], *range)),
            None => RevenueReport::empty(StripeNormalizer::PLATFORM),
        })
    }
}

impl Discoverable for StripeProvider {
    type Collaborator = dyn RawFetcher;

    fn is_configured(config: &dyn ConfigSource) -> bool {
        config.has(SECRET_KEY)
    }

    fn from_config(
        config: &dyn ConfigSource,
        collaborator: Arc<Self::Collaborator>,
    ) -> DiscoveryResult<Self> {
        let key = config
            .get_non_empty(SECRET_KEY)
            .ok_or_else(|| DiscoveryError::MissingConfig(SECRET_KEY.to_string()))?;
        if !READ_KEY_PREFIXES.iter().any(|prefix| key.starts_with(prefix)) {
            return Err(DiscoveryError::InvalidConfig {
                key: SECRET_KEY.to_string(),
                reason: "expected a secret or restricted key".to_string(),
            });
        }
        Ok(Self {
            core: ProviderCore::new(
                StripeNormalizer::PLATFORM,
                collaborator,
                config.get_non_empty(ACCOUNT_ID),
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticConfig;
    use crate::fetch::{Credential, FetchRequest};
    use serde_json::Value;

    #[derive(Debug)]
    struct NoFetch;

    #[async_trait]
    impl RawFetcher for NoFetch {
        async fn mint_credential(&self) -> ProviderResult<Credential> {
            Ok(Credential::long_lived("t"))
        }

        async fn fetch_rows(&self, _: &Credential, _: &FetchRequest) -> ProviderResult<Vec<Value>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_key_kind_is_checked() {
        for key in ["sk_live_1", "rk_test_2"] {
            let config = StaticConfig::new().with(SECRET_KEY, key);
            assert!(StripeProvider::from_config(&config, Arc::new(NoFetch)).is_ok());
        }
        let config = StaticConfig::new().with(SECRET_KEY, "pk_live_3");
        assert!(matches!(
            StripeProvider::from_config(&config, Arc::new(NoFetch)),
            Err(DiscoveryError::InvalidConfig { .. })
        ));
    }

    #[tokio::test]
    async fn test_no_account_is_empty_report() {
        let config = StaticConfig::new().with(SECRET_KEY, "sk_test_1");
        let provider = StripeProvider::from_config(&config, Arc::new(NoFetch)).unwrap();
        let range = DateRange::parse("2024-01-01", "2024-01-31").unwrap();

        let summary = provider.get_revenue_summary(&range).await.unwrap();
        assert_eq!(summary.transaction_count, 0);
        assert_eq!(summary.platform, "stripe");
    }
}
