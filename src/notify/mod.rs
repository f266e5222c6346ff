//! Notification sinks for chat announcements.
//!
//! The rating engine only needs "post this message to that channel"; how the
//! message reaches the chat platform is up to the sink.

use crate::error::{RatingError, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

/// Something that can post a message to a named channel.
pub trait Notifier {
    /// Post `message` to `channel`.
    ///
    /// Returns a link to the posted message when the sink knows one.
    fn notify(&self, channel: &str, message: &str)
        -> impl Future<Output = Result<Option<String>>> + Send;
}

/// Writes announcements to the log instead of a chat channel.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    async fn notify(&self, channel: &str, message: &str) -> Result<Option<String>> {
        if channel.trim().is_empty() {
            return Err(RatingError::MissingCollaboratorChannel(channel.to_string()));
        }
        info!("[#{}] {}", channel, message);
        Ok(None)
    }
}

/// Webhook settings for [`WebhookNotifier`].
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Webhook URL of the announcement channel.
    pub url: Option<String>,
    /// Guild ID used to build message links.
    pub guild_id: Option<String>,
    pub timeout_seconds: u64,
}

#[derive(Debug, Serialize)]
struct WebhookMessage<'a> {
    content: &'a str,
}

/// The subset of the posted-message object we read back.
#[derive(Debug, Deserialize)]
struct PostedMessage {
    id: String,
    channel_id: String,
}

/// Posts announcements to a chat channel webhook.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    config: WebhookConfig,
    http_client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(config: WebhookConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| RatingError::Notification(e.to_string()))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn message_link(&self, posted: &PostedMessage) -> Option<String> {
        self.config.guild_id.as_ref().map(|guild| {
            format!(
                "https://discord.com/channels/{}/{}/{}",
                guild, posted.channel_id, posted.id
            )
        })
    }
}

impl Notifier for WebhookNotifier {
    async fn notify(&self, channel: &str, message: &str) -> Result<Option<String>> {
        let url = self
            .config
            .url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| RatingError::MissingCollaboratorChannel(channel.to_string()))?;

        debug!("Posting announcement to #{} via webhook", channel);

        let response = self
            .http_client
            .post(url)
            .query(&[("wait", "true")])
            .json(&WebhookMessage { content: message })
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| RatingError::Notification(e.to_string()))?;

        let posted: PostedMessage = response
            .json()
            .await
            .map_err(|e| RatingError::Notification(e.to_string()))?;

        Ok(self.message_link(&posted))
    }
}

/// The sinks selectable from configuration.
#[derive(Debug, Clone)]
pub enum AnyNotifier {
    Log(LogNotifier),
    Webhook(WebhookNotifier),
}

impl Notifier for AnyNotifier {
    async fn notify(&self, channel: &str, message: &str) -> Result<Option<String>> {
        match self {
            AnyNotifier::Log(n) => n.notify(channel, message).await,
            AnyNotifier::Webhook(n) => n.notify(channel, message).await,
        }
    }
}
