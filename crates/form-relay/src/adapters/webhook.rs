//! Webhook delivery over HTTP(S).

use crate::domain::config::WebhookConfig;
use crate::domain::error::{DeliveryError, ServerError};
use crate::domain::payload::NotificationPayload;
use crate::ports::DeliveryChannel;
use async_trait::async_trait;
use reqwest::Client;
use std::fmt;
use tracing::debug;

/// Posts payloads as JSON to a single webhook URL.
#[derive(Clone)]
pub struct WebhookChannel {
    url: String,
    client: Client,
}

impl WebhookChannel {
    /// Build a channel with its own connection pool.
    pub fn new(url: impl Into<String>, config: &WebhookConfig) -> Result<Self, ServerError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ServerError::Client(e.to_string()))?;

        Ok(Self::with_client(url, client))
    }

    /// Build a channel around an existing client.
    pub fn with_client(url: impl Into<String>, client: Client) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }

    /// Build a channel from config, or `None` when no URL is configured.
    pub fn from_config(config: &WebhookConfig) -> Result<Option<Self>, ServerError> {
        config
            .url
            .as_deref()
            .map(|url| Self::new(url, config))
            .transpose()
    }
}

// The URL embeds the webhook token; keep it out of debug output
impl fmt::Debug for WebhookChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookChannel")
            .field("url", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl DeliveryChannel for WebhookChannel {
    async fn deliver(&self, payload: &NotificationPayload) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(&self.url)
            .json(payload)
            .send()
            .await?
            .error_for_status()?;

        debug!(status = response.status().as_u16(), "Webhook accepted payload");
        Ok(())
    }
}
