//! Raw-fetch collaborator boundary.
//!
//! Each platform integration is backed by a collaborator that owns
//! authentication, pagination, HTTP and retry policy. This crate only
//! consumes what those collaborators return: a short-lived credential,
//! platform-native rows as JSON values, and account metadata.

use std::collections::BTreeMap;
use std::fmt::{self, Debug};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ProviderResult;
use crate::model::DateRange;

/// A freshly minted access credential and its lifetime.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub ttl: Duration,
}

impl Credential {
    /// Create a credential valid for `ttl`.
    pub fn new(token: impl Into<String>, ttl: Duration) -> Self {
        Self {
            token: token.into(),
            ttl,
        }
    }

    /// A credential that never needs refreshing within a process lifetime,
    /// for platforms authenticated by a long-lived static token.
    pub fn long_lived(token: impl Into<String>) -> Self {
        Self::new(token, Duration::from_secs(365 * 24 * 60 * 60))
    }
}

impl Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Parameters for one raw-row fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub account_id: String,
    pub range: DateRange,
    /// Breakdown dimensions the collaborator should split rows by
    pub breakdowns: Vec<String>,
}

/// Account-level metadata not present on every row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountMetadata {
    pub currency: Option<String>,
    /// Entity id to display name, for platforms whose rows carry ids only
    pub entity_names: BTreeMap<String, String>,
}

impl AccountMetadata {
    /// Metadata carrying only a currency.
    pub fn with_currency(currency: impl Into<String>) -> Self {
        Self {
            currency: Some(currency.into()),
            entity_names: BTreeMap::new(),
        }
    }
}

/// Platform raw-fetch collaborator.
///
/// Errors are genuine upstream failures and are propagated unchanged.
#[async_trait]
pub trait RawFetcher: Send + Sync + Debug {
    /// Mint a short-lived credential.
    async fn mint_credential(&self) -> ProviderResult<Credential>;

    /// Resolve the account to query.
    ///
    /// `configured` is the account id from configuration, if any. Returns
    /// `None` when no account is configured and none can be discovered.
    async fn resolve_account(
        &self,
        credential: &Credential,
        configured: Option<&str>,
    ) -> ProviderResult<Option<String>> {
        let _ = credential;
        Ok(configured.map(str::to_string))
    }

    /// Fetch every raw row for the request, pagination already resolved.
    async fn fetch_rows(
        &self,
        credential: &Credential,
        request: &FetchRequest,
    ) -> ProviderResult<Vec<Value>>;

    /// Fetch account-level metadata.
    async fn account_metadata(
        &self,
        credential: &Credential,
        account_id: &str,
    ) -> ProviderResult<AccountMetadata> {
        let _ = (credential, account_id);
        Ok(AccountMetadata::default())
    }
}

/// Outbound webhook delivery collaborator for notification providers.
#[async_trait]
pub trait WebhookTransport: Send + Sync + Debug {
    /// Deliver `payload` to `url`.
    async fn deliver(&self, url: &str, payload: &Value) -> ProviderResult<()>;
}
