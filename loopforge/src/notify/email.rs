//! SMTP mail channel.

use super::channel::{Channel, ChannelError};
use super::event::NotificationEvent;
use crate::config::EmailConfig;
use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

/// Mail channel delivering over STARTTLS SMTP.
pub struct EmailChannel {
    config: EmailConfig,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl EmailChannel {
    /// Creates a new mail channel from configuration.
    pub fn new(config: EmailConfig) -> Result<Self, ChannelError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_server)
            .map_err(|err| ChannelError::Config(err.to_string()))?
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.smtp_user.clone(),
                config.smtp_password.clone(),
            ))
            .build();
        Ok(Self { config, transport })
    }

    fn build_message(&self, event: &NotificationEvent) -> Result<Message, ChannelError> {
        let from: Mailbox = self
            .config
            .from
            .parse()
            .map_err(|err| ChannelError::Config(format!("invalid sender address: {err}")))?;
        let mut builder = Message::builder().from(from).subject(event.subject());
        for recipient in &self.config.to {
            let to: Mailbox = recipient
                .parse()
                .map_err(|err| ChannelError::Config(format!("invalid recipient address: {err}")))?;
            builder = builder.to(to);
        }
        builder
            .body(event.body())
            .map_err(|err| ChannelError::Config(err.to_string()))
    }
}

#[async_trait]
impl Channel for EmailChannel {
    fn name(&self) -> &str {
        "email"
    }

    async fn deliver(&self, event: &NotificationEvent) -> Result<(), ChannelError> {
        if self.config.to.is_empty() {
            return Err(ChannelError::Config("no recipients configured".to_string()));
        }
        let message = self.build_message(event)?;
        self.transport
            .send(message)
            .await
            .map(|_| ())
            .map_err(|err| ChannelError::Transport(err.to_string()))
    }
}
