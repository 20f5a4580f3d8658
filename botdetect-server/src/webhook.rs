//! Discord broadcast of prediction feedback

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use botdetect_core::FeedbackEmbed;
use reqwest::Client;
use serde::Serialize;

use crate::config::WebhookSettings;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Webhook error
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("webhook request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Destination for feedback announcements
#[async_trait]
pub trait FeedbackBroadcaster: Send + Sync {
    async fn broadcast(&self, embed: FeedbackEmbed) -> Result<(), WebhookError>;
}

/// Broadcaster for the configured webhook; a no-op when none is set.
pub fn from_settings(settings: &WebhookSettings) -> Result<Arc<dyn FeedbackBroadcaster>, WebhookError> {
    match &settings.feedback_url {
        Some(url) => Ok(Arc::new(DiscordWebhook::new(url.clone())?)),
        None => {
            tracing::info!("No feedback webhook configured, broadcasts disabled");
            Ok(Arc::new(Disabled))
        }
    }
}

#[derive(Serialize)]
struct WebhookBody {
    embeds: Vec<FeedbackEmbed>,
}

/// Discord incoming webhook
pub struct DiscordWebhook {
    client: Client,
    url: String,
}

impl DiscordWebhook {
    pub fn new(url: String) -> Result<Self, WebhookError> {
        let client = Client::builder().timeout(WEBHOOK_TIMEOUT).build()?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl FeedbackBroadcaster for DiscordWebhook {
    async fn broadcast(&self, embed: FeedbackEmbed) -> Result<(), WebhookError> {
        self.client
            .post(&self.url)
            .json(&WebhookBody {
                embeds: vec![embed],
            })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Drops every announcement
pub struct Disabled;

#[async_trait]
impl FeedbackBroadcaster for Disabled {
    async fn broadcast(&self, _embed: FeedbackEmbed) -> Result<(), WebhookError> {
        Ok(())
    }
}
