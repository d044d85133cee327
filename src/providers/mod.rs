//! Concrete platform providers and their candidate declarations.
//!
//! Every data provider follows the same pipeline: obtain a credential from
//! its cache, resolve the account, fetch raw rows, fetch account metadata
//! when rows lack currency or names, normalize. [`ProviderCore`] owns that
//! pipeline; the platform modules add configuration and the normalizer.
//! Each platform module exports the environment keys it reads.

pub mod ga4;
pub mod google_ads;
pub mod linkedin;
pub mod meta;
pub mod slack;
pub mod stripe;
pub mod tiktok;

pub use ga4::Ga4Provider;
pub use google_ads::GoogleAdsProvider;
pub use linkedin::LinkedInProvider;
pub use meta::MetaProvider;
pub use slack::SlackProvider;
pub use stripe::StripeProvider;
pub use tiktok::TikTokProvider;

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, instrument};

use crate::contracts::PerformanceQuery;
use crate::credential::CredentialCache;
use crate::error::{ProviderError, ProviderResult};
use crate::fetch::{AccountMetadata, Credential, FetchRequest, RawFetcher, WebhookTransport};
use crate::model::{AdsReport, DateRange};
use crate::normalize::{NormalizeContext, PlatformNormalizer};
use crate::provider::HealthStatus;
use crate::registry::{
    AdsDomain, AnalyticsDomain, Candidate, FinanceDomain, NotificationDomain, RegistryBuilder,
};

/// Collaborators wired in by the host application, one per platform.
///
/// A platform whose configuration is present but whose collaborator is
/// missing fails construction and is skipped during discovery.
#[derive(Debug, Clone, Default)]
pub struct Collaborators {
    pub google_ads: Option<Arc<dyn RawFetcher>>,
    pub meta: Option<Arc<dyn RawFetcher>>,
    pub linkedin: Option<Arc<dyn RawFetcher>>,
    pub tiktok: Option<Arc<dyn RawFetcher>>,
    pub ga4: Option<Arc<dyn RawFetcher>>,
    pub stripe: Option<Arc<dyn RawFetcher>>,
    pub webhook: Option<Arc<dyn WebhookTransport>>,
}

/// Builder declaring every built-in provider, in preference order.
///
/// ```rust
/// use admetrix::providers::{default_candidates, Collaborators};
/// use admetrix::{Domain, StaticConfig};
///
/// let registry = default_candidates(&Collaborators::default()).discover(&StaticConfig::new());
/// assert!(registry.is_empty());
/// assert_eq!(registry.status().len(), 4);
/// ```
pub fn default_candidates(collaborators: &Collaborators) -> RegistryBuilder {
    let c = collaborators.clone();
    RegistryBuilder::new()
        .candidate::<AdsDomain>(Candidate::ads::<GoogleAdsProvider>(c.google_ads))
        .candidate::<AdsDomain>(Candidate::ads::<MetaProvider>(c.meta))
        .candidate::<AdsDomain>(Candidate::ads::<LinkedInProvider>(c.linkedin))
        .candidate::<AdsDomain>(Candidate::ads::<TikTokProvider>(c.tiktok))
        .candidate::<AnalyticsDomain>(Candidate::analytics::<Ga4Provider>(c.ga4))
        .candidate::<FinanceDomain>(Candidate::finance::<StripeProvider>(c.stripe))
        .candidate::<NotificationDomain>(Candidate::notifications::<SlackProvider>(c.webhook))
}

/// Raw rows plus the account metadata needed to normalize them.
#[derive(Debug, Default)]
pub(crate) struct Batch {
    pub(crate) rows: Vec<Value>,
    pub(crate) metadata: AccountMetadata,
}

impl Batch {
    pub(crate) fn context<'a>(
        &'a self,
        breakdowns: &'a [String],
        range: DateRange,
    ) -> NormalizeContext<'a> {
        NormalizeContext::new(breakdowns)
            .with_currency(self.metadata.currency.as_deref())
            .with_entity_names(&self.metadata.entity_names)
            .with_range(range)
    }
}

/// Shared fetch pipeline of one data provider instance.
#[derive(Debug)]
pub(crate) struct ProviderCore {
    platform: &'static str,
    fetcher: Arc<dyn RawFetcher>,
    credentials: CredentialCache,
    account_id: Option<String>,
}

impl ProviderCore {
    pub(crate) fn new(
        platform: &'static str,
        fetcher: Arc<dyn RawFetcher>,
        account_id: Option<String>,
    ) -> Self {
        Self {
            platform,
            fetcher,
            credentials: CredentialCache::new(),
            account_id,
        }
    }

    async fn credential(&self) -> ProviderResult<Credential> {
        self.credentials
            .get_or_refresh(|| self.fetcher.mint_credential())
            .await
    }

    /// Live probe: a credential can be obtained.
    pub(crate) async fn health(&self, provider: &str) -> HealthStatus {
        match self.credential().await {
            Ok(_) => HealthStatus::ok(provider),
            Err(e) => HealthStatus::error(provider, e.to_string()),
        }
    }

    /// Fetch raw rows for `range`.
    ///
    /// `Ok(None)` means no account is configured or discoverable, which
    /// callers turn into an empty result.
    #[instrument(level = "debug", skip_all, fields(platform = self.platform, %range))]
    pub(crate) async fn fetch(
        &self,
        range: DateRange,
        breakdowns: Vec<String>,
        with_metadata: bool,
    ) -> ProviderResult<Option<Batch>> {
        let credential = self.credential().await?;
        let resolved = self
            .fetcher
            .resolve_account(&credential, self.account_id.as_deref())
            .await?;
        let Some(account_id) = resolved else {
            debug!("No account configured or discoverable, returning empty result");
            return Ok(None);
        };

        let request = FetchRequest {
            account_id,
            range,
            breakdowns,
        };
        let rows = match self.fetcher.fetch_rows(&credential, &request).await {
            Ok(rows) => rows,
            Err(e @ ProviderError::Authentication(_)) => {
                // rejected credential must not be served again
                self.credentials.invalidate_rejected(&credential).await;
                return Err(e);
            }
            Err(e) => return Err(e),
        };
        debug!(rows = rows.len(), "Fetched raw rows");

        let metadata = if with_metadata && !rows.is_empty() {
            self.fetcher
                .account_metadata(&credential, &request.account_id)
                .await?
        } else {
            AccountMetadata::default()
        };
        Ok(Some(Batch { rows, metadata }))
    }

    /// Fetch and normalize advertising rows with normalizer `N`.
    pub(crate) async fn ads_report<N: PlatformNormalizer>(
        &self,
        query: &PerformanceQuery,
    ) -> ProviderResult<AdsReport> {
        let breakdowns = filter_breakdowns(N::PLATFORM, &query.breakdowns, N::SUPPORTED_BREAKDOWNS);
        let batch = self
            .fetch(query.range, breakdowns.clone(), !N::ROWS_CARRY_CURRENCY)
            .await?;
        Ok(match batch {
            Some(batch) => N::normalize(&batch.rows, &batch.context(&breakdowns, query.range)),
            None => AdsReport::empty(N::PLATFORM),
        })
    }
}

/// Keep the requested breakdowns a platform supports, dropping the rest
/// with a debug log.
pub(crate) fn filter_breakdowns(
    platform: &str,
    requested: &[String],
    supported: &[&str],
) -> Vec<String> {
    requested
        .iter()
        .filter(|key| {
            let ok = supported.contains(&key.as_str());
            if !ok {
                debug!(platform, breakdown = %key, "Ignoring unsupported breakdown");
            }
            ok
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_breakdowns() {
        let requested = vec!["age".to_string(), "device".to_string(), "gender".to_string()];
        let kept = filter_breakdowns("meta", &requested, &["age", "gender"]);
        assert_eq!(kept, vec!["age".to_string(), "gender".to_string()]);
        assert!(filter_breakdowns("linkedin", &requested, &[]).is_empty());
    }
}
