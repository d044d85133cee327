use std::any::Any;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::ConfigSource;
use crate::contracts::{Notification, NotificationLevel, NotificationProvider};
use crate::error::{DiscoveryError, DiscoveryResult, ProviderResult};
use crate::fetch::WebhookTransport;
use crate::provider::{Discoverable, Provider};

pub const WEBHOOK_URL: &str = "SLACK_WEBHOOK_URL";

/// Incoming-webhook chat notifications.
pub struct SlackProvider {
    webhook_url: String,
    transport: Arc<dyn WebhookTransport>,
}

impl SlackProvider {
    /// Block Kit payload for a notification, with a plain-text fallback.
    pub fn payload(notification: &Notification) -> Value {
        let marker = match notification.level {
            NotificationLevel::Info => ":information_source:",
            NotificationLevel::Warning => ":warning:",
            NotificationLevel::Alert => ":rotating_light:",
        };
        let headline = format!("{marker} {}", notification.title);

        let mut blocks = vec![
            json!({"type": "header", "text": {"type": "plain_text", "text": headline}}),
            json!({"type": "section", "text": {"type": "mrkdwn", "text": notification.body}}),
        ];
        if !notification.fields.is_empty() {
            let fields: Vec<Value> = notification
                .fields
                .iter()
                .map(|(key, value)| json!({"type": "mrkdwn", "text": format!("*{key}*\n{value}")}))
                .collect();
            blocks.push(json!({"type": "section", "fields": fields}));
        }

        json!({
            "text": format!("{headline}\n{}", notification.body),
            "blocks": blocks,
        })
    }
}

impl fmt::Debug for SlackProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlackProvider")
            .field("webhook_url", &"<redacted>")
            .field("transport", &self.transport)
            .finish()
    }
}

#[async_trait]
impl Provider for SlackProvider {
    fn name(&self) -> &str {
        "slack"
    }

    fn display_name(&self) -> &str {
        "Slack"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[async_trait]
impl NotificationProvider for SlackProvider {
    async fn send(&self, notification: &Notification) -> ProviderResult<()> {
        debug!(title = %notification.title, level = ?notification.level, "Sending notification");
        self.transport
            .deliver(&self.webhook_url, &Self::payload(notification))
            .await
    }
}

impl Discoverable for SlackProvider {
    type Collaborator = dyn WebhookTransport;

    fn is_configured(config: &dyn ConfigSource) -> bool {
        config.has(WEBHOOK_URL)
    }

    fn from_config(
        config: &dyn ConfigSource,
        collaborator: Arc<Self::Collaborator>,
    ) -> DiscoveryResult<Self> {
        let url = config
            .get_non_empty(WEBHOOK_URL)
            .ok_or_else(|| DiscoveryError::MissingConfig(WEBHOOK_URL.to_string()))?;
        if !url.starts_with("https://") {
            return Err(DiscoveryError::InvalidConfig {
                key: WEBHOOK_URL.to_string(),
                reason: "webhook URL must use https".to_string(),
            });
        }
        Ok(Self {
            webhook_url: url,
            transport: collaborator,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticConfig;
    use tokio::sync::Mutex;

    #[derive(Debug, Default)]
    struct Recorder {
        sent: Mutex<Vec<(String, Value)>>,
    }

    #[async_trait]
    impl WebhookTransport for Recorder {
        async fn deliver(&self, url: &str, payload: &Value) -> ProviderResult<()> {
            self.sent.lock().await.push((url.to_string(), payload.clone()));
            Ok(())
        }
    }

    #[test]
    fn test_payload_shape() {
        let note = Notification::new("Spend alert", "Meta spend is 40% over budget")
            .level(NotificationLevel::Alert)
            .field("platform", "meta");
        let payload = SlackProvider::payload(&note);

        assert_eq!(payload["blocks"].as_array().unwrap().len(), 3);
        assert_eq!(payload["blocks"][0]["text"]["text"], ":rotating_light: Spend alert");
        assert_eq!(payload["blocks"][2]["fields"][0]["text"], "*platform*\nmeta");
        assert!(payload["text"].as_str().unwrap().contains("40% over budget"));

        let plain = SlackProvider::payload(&Notification::new("t", "b"));
        assert_eq!(plain["blocks"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_send_delivers_to_configured_url() {
        let recorder = Arc::new(Recorder::default());
        let config = StaticConfig::new().with(WEBHOOK_URL, "https://hooks.example.com/T/B/X");
        let provider = SlackProvider::from_config(&config, recorder.clone()).unwrap();

        provider.send(&Notification::new("hi", "there")).await.unwrap();

        let sent = recorder.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "https://hooks.example.com/T/B/X");
        assert!(!format!("{provider:?}").contains("hooks.example.com"));
    }

    #[test]
    fn test_plain_http_is_rejected() {
        let config = StaticConfig::new().with(WEBHOOK_URL, "http://hooks.example.com/x");
        let result = SlackProvider::from_config(&config, Arc::new(Recorder::default()));
        assert!(matches!(result, Err(DiscoveryError::InvalidConfig { .. })));
    }
}
