//! Webhook-style chat channels: Slack and Discord.

use super::channel::{Channel, ChannelError};
use super::event::NotificationEvent;
use async_trait::async_trait;
use std::time::Duration;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

async fn post_json(
    client: &reqwest::Client,
    url: &str,
    payload: &serde_json::Value,
) -> Result<(), ChannelError> {
    let response = client
        .post(url)
        .json(payload)
        .timeout(WEBHOOK_TIMEOUT)
        .send()
        .await
        .map_err(|err| ChannelError::Transport(err.to_string()))?;
    if !response.status().is_success() {
        return Err(ChannelError::Transport(format!(
            "webhook returned {}",
            response.status()
        )));
    }
    Ok(())
}

/// Slack incoming-webhook channel.
#[derive(Debug, Clone)]
pub struct SlackChannel {
    url: String,
    client: reqwest::Client,
}

impl SlackChannel {
    /// Creates a new Slack channel posting to the given webhook URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Channel for SlackChannel {
    fn name(&self) -> &str {
        "slack"
    }

    async fn deliver(&self, event: &NotificationEvent) -> Result<(), ChannelError> {
        let payload = serde_json::json!({
            "text": format!("*{}*\n{}", event.subject(), event.body()),
        });
        post_json(&self.client, &self.url, &payload).await
    }
}

/// Discord webhook channel.
#[derive(Debug, Clone)]
pub struct DiscordChannel {
    url: String,
    client: reqwest::Client,
}

impl DiscordChannel {
    /// Creates a new Discord channel posting to the given webhook URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Channel for DiscordChannel {
    fn name(&self) -> &str {
        "discord"
    }

    async fn deliver(&self, event: &NotificationEvent) -> Result<(), ChannelError> {
        let payload = serde_json::json!({
            "content": format!("**{}**\n{}", event.subject(), event.body()),
        });
        post_json(&self.client, &self.url, &payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::EventKind;
    use crate::pipeline::RunSummary;

    #[tokio::test]
    async fn test_unreachable_webhook_is_transport_error() {
        let channel = SlackChannel::new("http://127.0.0.1:9/unroutable");
        let event = NotificationEvent::new(
            EventKind::PipelineFailure,
            None,
            "failed",
            RunSummary::begin(),
        );
        let err = channel.deliver(&event).await.unwrap_err();
        assert!(matches!(err, ChannelError::Transport(_)));
    }

    #[test]
    fn test_channel_names() {
        assert_eq!(SlackChannel::new("u").name(), "slack");
        assert_eq!(DiscordChannel::new("u").name(), "discord");
    }
}
