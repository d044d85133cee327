//! Async event streams and cross-platform fan-out.
//!
//! Long-running multi-provider operations report progress as a stream of
//! events rather than a single future, so callers can render per-platform
//! results as they arrive.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;

use futures_core::Stream;
use tokio::sync::mpsc;
use tokio::task::{self, JoinSet};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

use crate::contracts::AdsProvider;
use crate::error::ProviderError;
use crate::model::{AccountSummary, DateRange};

/// Platform label of the combined cross-platform summary.
pub const COMBINED_PLATFORM: &str = "all";

/// Type alias for a boxed async stream of events.
pub type EventStream<T> = Pin<Box<dyn Stream<Item = T> + Send>>;

/// Producer half of an [`EventStream`].
#[derive(Debug)]
pub(crate) struct EventSender<T> {
    tx: mpsc::Sender<T>,
}

impl<T> EventSender<T> {
    /// Send an event.
    ///
    /// Returns `Err(event)` if the receiver was dropped.
    pub(crate) async fn send(&self, event: T) -> Result<(), T> {
        self.tx.send(event).await.map_err(|e| e.0)
    }
}

/// Create a bounded event stream. A zero buffer is bumped to one.
pub(crate) fn event_channel<T: Send + 'static>(
    buffer_size: usize,
) -> (EventSender<T>, EventStream<T>) {
    let (tx, rx) = mpsc::channel(buffer_size.max(1));
    let stream: EventStream<T> = Box::pin(ReceiverStream::new(rx));
    (EventSender { tx }, stream)
}

/// Progress of a cross-platform summary fan-out.
#[derive(Debug, Clone, PartialEq)]
pub enum FanOutEvent {
    /// Fan-out began for these providers
    Started { providers: Vec<String> },
    /// One provider answered
    Summary {
        provider: String,
        summary: AccountSummary,
    },
    /// One provider failed; the others are unaffected
    Failed {
        provider: String,
        error: ProviderError,
    },
    /// Every provider finished. `combined` folds the successful summaries.
    Complete {
        combined: AccountSummary,
        failed: Vec<String>,
    },
}

impl FanOutEvent {
    /// Check if this is the final event.
    pub fn is_complete(&self) -> bool {
        matches!(self, FanOutEvent::Complete { .. })
    }
}

/// Fetch the account summary of every provider concurrently.
///
/// Per-provider results are emitted in completion order, followed by one
/// [`FanOutEvent::Complete`] carrying the combined summary. A failing
/// provider yields a [`FanOutEvent::Failed`] event and is left out of the
/// combination; a provider whose fetch panics is reported the same way.
/// Dropping the stream aborts any outstanding fetches.
///
/// Must be called from within a tokio runtime.
pub fn fan_out_summaries(
    providers: Vec<Arc<dyn AdsProvider>>,
    range: DateRange,
) -> EventStream<FanOutEvent> {
    let (sender, stream) = event_channel(providers.len() + 2);

    tokio::spawn(async move {
        let names: Vec<String> = providers.iter().map(|p| p.name().to_string()).collect();
        if sender.send(FanOutEvent::Started { providers: names }).await.is_err() {
            return;
        }

        let mut tasks = JoinSet::new();
        let mut task_names: HashMap<task::Id, String> = HashMap::new();
        for provider in providers {
            let name = provider.name().to_string();
            let handle = tasks.spawn(async move { provider.get_account_summary(&range).await });
            task_names.insert(handle.id(), name);
        }

        let mut summaries = Vec::new();
        let mut failed = Vec::new();
        while let Some(joined) = tasks.join_next_with_id().await {
            let (id, result) = match joined {
                Ok((id, result)) => (id, result),
                Err(e) => {
                    let error = ProviderError::Panicked(e.to_string());
                    (e.id(), Err(error))
                }
            };
            let provider = task_names.remove(&id).unwrap_or_default();
            let event = match result {
                Ok(summary) => {
                    summaries.push(summary.clone());
                    FanOutEvent::Summary { provider, summary }
                }
                Err(error) => {
                    warn!(provider = %provider, error = %error, "Account summary failed");
                    failed.push(provider.clone());
                    FanOutEvent::Failed { provider, error }
                }
            };
            if sender.send(event).await.is_err() {
                debug!("Fan-out receiver dropped, aborting outstanding fetches");
                return;
            }
        }

        let combined = AccountSummary::combine(COMBINED_PLATFORM, &summaries);
        let _ = sender.send(FanOutEvent::Complete { combined, failed }).await;
    });

    stream
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::PerformanceQuery;
    use crate::error::ProviderResult;
    use crate::model::{AdsReport, CampaignMetrics, Counters, EntityIds};
    use crate::provider::Provider;
    use async_trait::async_trait;
    use futures::StreamExt;
    use std::any::Any;

    #[derive(Debug)]
    struct FixedAds {
        name: &'static str,
        cost: f64,
        currency: &'static str,
        fail: bool,
    }

    #[async_trait]
    impl Provider for FixedAds {
        fn name(&self) -> &str {
            self.name
        }

        fn display_name(&self) -> &str {
            self.name
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[async_trait]
    impl AdsProvider for FixedAds {
        async fn get_performance(&self, _query: &PerformanceQuery) -> ProviderResult<AdsReport> {
            if self.fail {
                return Err(ProviderError::RateLimited {
                    retry_after_secs: Some(30),
                });
            }
            let record = CampaignMetrics::new(
                self.name,
                EntityIds::campaign("1", "c"),
                "2024-01-01".to_string(),
                Some(self.currency.to_string()),
                Counters {
                    impressions: 100,
                    clicks: 10,
                    cost: self.cost,
                    conversions: 1.0,
                    conversions_value: 20.0,
                    ..Counters::default()
                },
                None,
            );
            Ok(AdsReport::from_records(self.name, vec![record]))
        }
    }

    fn fixed(name: &'static str, cost: f64, currency: &'static str, fail: bool) -> Arc<dyn AdsProvider> {
        Arc::new(FixedAds {
            name,
            cost,
            currency,
            fail,
        })
    }

    fn range() -> DateRange {
        DateRange::parse("2024-01-01", "2024-01-31").unwrap()
    }

    #[tokio::test]
    async fn test_event_channel() {
        let (sender, stream) = event_channel::<u32>(0);

        let producer = tokio::spawn(async move {
            sender.send(1).await.unwrap();
            sender.send(2).await.unwrap();
        });

        let events: Vec<_> = stream.collect().await;
        producer.await.unwrap();
        assert_eq!(events, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_send_after_receiver_dropped() {
        let (sender, stream) = event_channel::<u32>(4);
        drop(stream);
        assert_eq!(sender.send(3).await, Err(3));
    }

    #[tokio::test]
    async fn test_fan_out_combines_successes() {
        let providers = vec![
            fixed("google_ads", 10.0, "USD", false),
            fixed("meta", 30.0, "USD", false),
            fixed("tiktok", 99.0, "USD", true),
        ];
        let events: Vec<FanOutEvent> = fan_out_summaries(providers, range()).collect().await;

        assert_eq!(
            events.first(),
            Some(&FanOutEvent::Started {
                providers: vec!["google_ads".into(), "meta".into(), "tiktok".into()]
            })
        );
        let summaries = events
            .iter()
            .filter(|e| matches!(e, FanOutEvent::Summary { .. }))
            .count();
        assert_eq!(summaries, 2);
        assert!(events
            .iter()
            .any(|e| matches!(e, FanOutEvent::Failed { provider, .. } if provider == "tiktok")));

        match events.last() {
            Some(FanOutEvent::Complete { combined, failed }) => {
                assert_eq!(combined.platform, COMBINED_PLATFORM);
                assert_eq!(combined.cost, 40.0);
                assert_eq!(combined.conversions_value, 40.0);
                assert_eq!(combined.roas, 1.0);
                assert_eq!(combined.currency.as_deref(), Some("USD"));
                assert_eq!(failed, &vec!["tiktok".to_string()]);
            }
            other => panic!("expected completion, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fan_out_mixed_currency() {
        let providers = vec![fixed("a", 10.0, "USD", false), fixed("b", 10.0, "EUR", false)];
        let events: Vec<FanOutEvent> = fan_out_summaries(providers, range()).collect().await;
        let last = events.last().unwrap();
        assert!(last.is_complete());
        if let FanOutEvent::Complete { combined, .. } = last {
            assert_eq!(combined.currency.as_deref(), Some("MIXED"));
        }
    }

    #[tokio::test]
    async fn test_fan_out_without_providers() {
        let events: Vec<FanOutEvent> = fan_out_summaries(Vec::new(), range()).collect().await;
        assert_eq!(events.len(), 2);
        match &events[1] {
            FanOutEvent::Complete { combined, failed } => {
                assert_eq!(combined.campaign_count, 0);
                assert_eq!(combined.currency, None);
                assert!(failed.is_empty());
            }
            other => panic!("expected completion, got {other:?}"),
        }
    }
}
