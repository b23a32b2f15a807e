//! Outbound summary hand-off.
//!
//! After an order or custom request is stored, a plain-text summary is handed
//! to the shop owner. Two channels exist:
//! - [`WhatsAppLink`] builds a `wa.me` deep link the client opens
//! - [`WebhookChannel`] POSTs the summary as JSON to a configured URL
//!
//! Delivery never rolls anything back. Callers log failures and move on.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::config::MessagingConfig;

/// Outcome of a successful hand-off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Handoff {
    /// The client should open this URL to send the message.
    Link { url: String },
    /// The message was delivered server-side.
    Sent,
}

/// Errors that can occur while delivering a summary.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint returned an error response.
    #[error("webhook error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The destination can't be used by this channel.
    #[error("invalid destination: {0}")]
    InvalidDestination(String),
}

/// A way of getting a summary to the shop owner.
#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// Deliver `text` to `destination`.
    async fn deliver_summary(&self, destination: &str, text: &str)
    -> Result<Handoff, DeliveryError>;
}

/// Build a `https://wa.me/{number}?text=...` link.
#[must_use]
pub fn whatsapp_url(number: &str, text: &str) -> String {
    format!("https://wa.me/{number}?text={}", urlencoding::encode(text))
}

/// WhatsApp click-to-chat link. Sending is left to the client.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhatsAppLink;

#[async_trait]
impl MessageChannel for WhatsAppLink {
    async fn deliver_summary(
        &self,
        destination: &str,
        text: &str,
    ) -> Result<Handoff, DeliveryError> {
        if destination.is_empty() || !destination.chars().all(|c| c.is_ascii_digit()) {
            return Err(DeliveryError::InvalidDestination(destination.to_string()));
        }
        Ok(Handoff::Link {
            url: whatsapp_url(destination, text),
        })
    }
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    destination: &'a str,
    text: &'a str,
}

/// Server-side delivery through an HTTP webhook.
#[derive(Debug, Clone)]
pub struct WebhookChannel {
    client: reqwest::Client,
    url: Url,
}

impl WebhookChannel {
    /// Create a webhook channel.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(url: Url) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl MessageChannel for WebhookChannel {
    async fn deliver_summary(
        &self,
        destination: &str,
        text: &str,
    ) -> Result<Handoff, DeliveryError> {
        let response = self
            .client
            .post(self.url.clone())
            .json(&WebhookPayload { destination, text })
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(Handoff::Sent)
    }
}

/// The configured channel plus its destination.
#[derive(Clone)]
pub struct Messenger {
    channel: Arc<dyn MessageChannel>,
    destination: String,
}

impl Messenger {
    #[must_use]
    pub fn new(channel: Arc<dyn MessageChannel>, destination: impl Into<String>) -> Self {
        Self {
            channel,
            destination: destination.into(),
        }
    }

    /// Pick the webhook channel when a URL is configured, otherwise WhatsApp
    /// links.
    ///
    /// # Errors
    ///
    /// Returns error if the webhook HTTP client fails to build.
    pub fn from_config(config: &MessagingConfig) -> Result<Self, DeliveryError> {
        let channel: Arc<dyn MessageChannel> = match &config.webhook_url {
            Some(url) => Arc::new(WebhookChannel::new(url.clone())?),
            None => Arc::new(WhatsAppLink),
        };
        Ok(Self::new(channel, config.whatsapp_number.clone()))
    }

    /// Deliver a summary to the configured destination.
    ///
    /// # Errors
    ///
    /// Returns the channel's delivery error.
    pub async fn deliver(&self, text: &str) -> Result<Handoff, DeliveryError> {
        self.channel.deliver_summary(&self.destination, text).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_whatsapp_url_encodes_text() {
        let url = whatsapp_url("18172989961", "*NEW STUDIO ORDER*\n\nTotal: $25.50");
        assert_eq!(
            url,
            "https://wa.me/18172989961?text=%2ANEW%20STUDIO%20ORDER%2A%0A%0ATotal%3A%20%2425.50"
        );
    }

    #[tokio::test]
    async fn test_whatsapp_channel_returns_link() {
        let handoff = WhatsAppLink
            .deliver_summary("18172989961", "hello")
            .await
            .unwrap();
        assert_eq!(
            handoff,
            Handoff::Link {
                url: "https://wa.me/18172989961?text=hello".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_whatsapp_channel_rejects_bad_number() {
        assert!(matches!(
            WhatsAppLink.deliver_summary("+1 817", "hi").await,
            Err(DeliveryError::InvalidDestination(_))
        ));
    }

    #[tokio::test]
    async fn test_messenger_defaults_to_whatsapp() {
        let messenger = Messenger::from_config(&MessagingConfig::default()).unwrap();
        let handoff = messenger.deliver("hi").await.unwrap();
        assert!(matches!(handoff, Handoff::Link { url } if url.starts_with("https://wa.me/18172989961")));
    }

    #[test]
    fn test_handoff_json_shape() {
        let json = serde_json::to_value(Handoff::Sent).unwrap();
        assert_eq!(json["kind"], "sent");
    }
}
