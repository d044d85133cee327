//! Per-provider cache for short-lived access credentials.
//!
//! Readers of a still-valid credential take a brief read lock and never wait
//! on a refresh in progress. Callers that find the credential missing or
//! expired serialize on a refresh mutex, so concurrent expiry triggers a
//! single mint whose result every waiting caller then reuses.

use std::future::Future;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::debug;

use crate::error::ProviderResult;
use crate::fetch::Credential;

/// Credentials are treated as expired this long before their real expiry.
pub const DEFAULT_EXPIRY_SKEW: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct Cached {
    credential: Credential,
    expires_at: Instant,
}

/// Single-flight credential cache owned by one provider instance.
#[derive(Debug)]
pub struct CredentialCache {
    current: RwLock<Option<Cached>>,
    refresh: Mutex<()>,
    skew: Duration,
}

impl CredentialCache {
    /// Create an empty cache with the default expiry skew.
    pub fn new() -> Self {
        Self::with_skew(DEFAULT_EXPIRY_SKEW)
    }

    /// Create an empty cache that refreshes `skew` before expiry.
    pub fn with_skew(skew: Duration) -> Self {
        Self {
            current: RwLock::new(None),
            refresh: Mutex::new(()),
            skew,
        }
    }

    /// Return the cached credential if it is still valid.
    pub async fn valid(&self) -> Option<Credential> {
        let guard = self.current.read().await;
        guard
            .as_ref()
            .filter(|cached| Instant::now() < cached.expires_at)
            .map(|cached| cached.credential.clone())
    }

    /// Return a valid credential, minting a new one with `mint` if needed.
    ///
    /// At most one `mint` runs at a time per cache. A failed mint leaves the
    /// cache untouched and its error is returned to the caller that ran it;
    /// the next caller tries again.
    pub async fn get_or_refresh<F, Fut>(&self, mint: F) -> ProviderResult<Credential>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ProviderResult<Credential>>,
    {
        if let Some(credential) = self.valid().await {
            return Ok(credential);
        }

        let _refreshing = self.refresh.lock().await;

        // another caller may have refreshed while we waited
        if let Some(credential) = self.valid().await {
            return Ok(credential);
        }

        let credential = mint().await?;
        // short-lived tokens keep at least half their lifetime
        let skew = self.skew.min(credential.ttl / 2);
        let lifetime = credential.ttl.saturating_sub(skew);
        debug!(ttl_secs = credential.ttl.as_secs(), "Minted new access credential");

        *self.current.write().await = Some(Cached {
            credential: credential.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(credential)
    }

    /// Drop the cached credential, forcing the next caller to mint.
    pub async fn invalidate(&self) {
        *self.current.write().await = None;
    }

    /// Drop the cached credential only if it is still `rejected`.
    ///
    /// A credential minted by another caller after `rejected` was handed
    /// out is kept. Returns whether anything was dropped.
    pub async fn invalidate_rejected(&self, rejected: &Credential) -> bool {
        let mut guard = self.current.write().await;
        match guard.as_ref() {
            Some(cached) if cached.credential.token == rejected.token => {
                *guard = None;
                true
            }
            _ => false,
        }
    }
}

impl Default for CredentialCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn credential(token: &str, secs: u64) -> Credential {
        Credential::new(token, Duration::from_secs(secs))
    }

    #[tokio::test(start_paused = true)]
    async fn test_reuses_valid_credential() {
        let cache = CredentialCache::with_skew(Duration::ZERO);
        let mints = AtomicUsize::new(0);

        for _ in 0..3 {
            let token = cache
                .get_or_refresh(|| async {
                    mints.fetch_add(1, Ordering::SeqCst);
                    Ok(credential("a", 300))
                })
                .await
                .unwrap();
            assert_eq!(token.token, "a");
        }
        assert_eq!(mints.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refreshes_after_expiry() {
        let cache = CredentialCache::with_skew(Duration::from_secs(10));

        let first = cache
            .get_or_refresh(|| async { Ok(credential("first", 100)) })
            .await
            .unwrap();
        assert_eq!(first.token, "first");

        tokio::time::advance(Duration::from_secs(89)).await;
        assert!(cache.valid().await.is_some());

        // skew makes the credential stale at 90s
        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.valid().await.is_none());

        let second = cache
            .get_or_refresh(|| async { Ok(credential("second", 100)) })
            .await
            .unwrap();
        assert_eq!(second.token, "second");
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_refresh_is_single_flight() {
        let cache = Arc::new(CredentialCache::with_skew(Duration::ZERO));
        let mints = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let mints = Arc::clone(&mints);
                tokio::spawn(async move {
                    cache
                        .get_or_refresh(|| async move {
                            mints.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            Ok(credential("shared", 600))
                        })
                        .await
                })
            })
            .collect();

        for task in tasks {
            let token = task.await.unwrap().unwrap();
            assert_eq!(token.token, "shared");
        }
        assert_eq!(mints.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_lived_credential_is_shared_under_default_skew() {
        let cache = Arc::new(CredentialCache::new());
        let mints = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let mints = Arc::clone(&mints);
                tokio::spawn(async move {
                    cache
                        .get_or_refresh(|| async move {
                            mints.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(20)).await;
                            Ok(credential("brief", 30))
                        })
                        .await
                })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap().token, "brief");
        }
        assert_eq!(mints.load(Ordering::SeqCst), 1);

        // stale once half the lifetime has passed
        tokio::time::advance(Duration::from_secs(14)).await;
        assert!(cache.valid().await.is_some());
        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.valid().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_mint_leaves_cache_empty() {
        let cache = CredentialCache::new();

        let err = cache
            .get_or_refresh(|| async { Err(ProviderError::Authentication("revoked".into())) })
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Authentication(_)));
        assert!(cache.valid().await.is_none());

        let token = cache
            .get_or_refresh(|| async { Ok(credential("retry", 600)) })
            .await
            .unwrap();
        assert_eq!(token.token, "retry");
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate() {
        let cache = CredentialCache::new();
        cache
            .get_or_refresh(|| async { Ok(credential("a", 600)) })
            .await
            .unwrap();
        cache.invalidate().await;
        assert!(cache.valid().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_rejected_keeps_newer_credential() {
        let cache = CredentialCache::new();
        let old = cache
            .get_or_refresh(|| async { Ok(credential("old", 600)) })
            .await
            .unwrap();

        // another caller replaced the credential in the meantime
        cache.invalidate().await;
        cache
            .get_or_refresh(|| async { Ok(credential("new", 600)) })
            .await
            .unwrap();

        assert!(!cache.invalidate_rejected(&old).await);
        assert_eq!(cache.valid().await.unwrap().token, "new");

        let current = cache.valid().await.unwrap();
        assert!(cache.invalidate_rejected(&current).await);
        assert!(cache.valid().await.is_none());
    }
}
