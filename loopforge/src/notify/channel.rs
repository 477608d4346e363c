//! The channel capability trait and per-channel delivery outcomes.

use super::event::NotificationEvent;
use async_trait::async_trait;
use thiserror::Error;

/// Why a channel failed to deliver.
#[derive(Debug, Clone, Error)]
pub enum ChannelError {
    /// The transport failed (unreachable webhook, SMTP refusal, timeout).
    #[error("transport error: {0}")]
    Transport(String),

    /// The channel itself is misconfigured (bad address, bad relay).
    #[error("channel misconfigured: {0}")]
    Config(String),
}

/// The result of attempting delivery on one channel.
#[derive(Debug)]
pub struct DeliveryOutcome {
    /// Channel name.
    pub channel: String,
    /// Delivery result.
    pub result: Result<(), ChannelError>,
}

impl DeliveryOutcome {
    /// Returns true if the channel delivered the event.
    #[must_use]
    pub fn delivered(&self) -> bool {
        self.result.is_ok()
    }
}

/// A single notification channel.
///
/// Implementations render the event in a channel-appropriate shape but must
/// preserve its information content. `deliver` reports failure through its
/// return value only; it must not panic or block other channels.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Stable channel name used in logs and outcomes.
    fn name(&self) -> &str;

    /// Delivers one event.
    async fn deliver(&self, event: &NotificationEvent) -> Result<(), ChannelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_delivered() {
        let ok = DeliveryOutcome {
            channel: "slack".to_string(),
            result: Ok(()),
        };
        assert!(ok.delivered());

        let failed = DeliveryOutcome {
            channel: "email".to_string(),
            result: Err(ChannelError::Transport("connection refused".to_string())),
        };
        assert!(!failed.delivered());
    }

    #[test]
    fn test_channel_error_display() {
        let err = ChannelError::Config("invalid sender address".to_string());
        assert_eq!(err.to_string(), "channel misconfigured: invalid sender address");
    }
}
