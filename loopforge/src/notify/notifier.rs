//! Best-effort fan-out across configured channels.

use super::channel::{Channel, DeliveryOutcome};
use super::email::EmailChannel;
use super::event::NotificationEvent;
use super::webhook::{DiscordChannel, SlackChannel};
use crate::config::NotificationsConfig;
use std::sync::Arc;
use tracing::{info, warn};

/// Dispatches one event to every configured channel in turn.
///
/// A failing channel is logged and does not block the others, and nothing
/// here ever alters the pipeline's status.
#[derive(Clone, Default)]
pub struct Notifier {
    channels: Vec<Arc<dyn Channel>>,
}

impl Notifier {
    /// Creates a notifier over the given channels.
    #[must_use]
    pub fn new(channels: Vec<Arc<dyn Channel>>) -> Self {
        Self { channels }
    }

    /// Creates a notifier with no channels; every notify is a no-op.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(Vec::new())
    }

    /// Builds channels from configuration, honoring per-channel enable
    /// flags. A channel that fails to construct is logged and left out.
    #[must_use]
    pub fn from_config(config: &NotificationsConfig) -> Self {
        let mut channels: Vec<Arc<dyn Channel>> = Vec::new();
        if config.email.enabled {
            match EmailChannel::new(config.email.clone()) {
                Ok(channel) => channels.push(Arc::new(channel)),
                Err(err) => warn!(error = %err, "email channel unavailable, skipping"),
            }
        }
        if config.slack.enabled {
            channels.push(Arc::new(SlackChannel::new(config.slack.webhook_url.clone())));
        }
        if config.discord.enabled {
            channels.push(Arc::new(DiscordChannel::new(
                config.discord.webhook_url.clone(),
            )));
        }
        Self::new(channels)
    }

    /// Returns the number of active channels.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Delivers the event to each channel sequentially and independently.
    pub async fn notify(&self, event: &NotificationEvent) -> Vec<DeliveryOutcome> {
        let mut outcomes = Vec::with_capacity(self.channels.len());
        for channel in &self.channels {
            let result = channel.deliver(event).await;
            match &result {
                Ok(()) => info!(
                    channel = channel.name(),
                    kind = %event.kind,
                    "notification delivered"
                ),
                Err(err) => warn!(
                    channel = channel.name(),
                    kind = %event.kind,
                    error = %err,
                    "notification delivery failed"
                ),
            }
            outcomes.push(DeliveryOutcome {
                channel: channel.name().to_string(),
                result,
            });
        }
        outcomes
    }
}
