//! Multi-channel operational alerts.
//!
//! One [`NotificationEvent`] fans out to every enabled channel through the
//! [`Channel`] capability trait; adding a channel means adding an
//! implementation, not branching logic. Delivery is best-effort and never
//! escalates past the notifier boundary.

mod channel;
mod email;
mod event;
mod notifier;
mod webhook;

pub use channel::{Channel, ChannelError, DeliveryOutcome};
pub use email::EmailChannel;
pub use event::{EventKind, NotificationEvent};
pub use notifier::Notifier;
pub use webhook::{DiscordChannel, SlackChannel};
