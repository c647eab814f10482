// crates/barbot-broker/src/hub.rs
// ============================================================================
// Module: Barbot Channel Hub
// Description: In-process fan-out for the status and job channels.
// Purpose: Deliver each published message to every current subscriber.
// Dependencies: barbot-core, tokio
// ============================================================================

//! ## Overview
//! [`ChannelHub`] keeps one `tokio::sync::broadcast` channel per logical
//! [`Channel`]. Messages are serialized once and shared as `Arc<str>`.
//! Delivery is at-most-effort: a subscriber that falls more than the channel
//! capacity behind skips the oldest messages, and publishing with nobody
//! listening succeeds with zero receivers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use barbot_core::Channel;
use barbot_core::PublishError;
use serde_json::Value;
use tokio::sync::broadcast;

// ============================================================================
// SECTION: Hub
// ============================================================================

/// Serialized channel message.
pub type HubMessage = Arc<str>;

/// In-process broadcast hub.
#[derive(Debug, Clone)]
pub struct ChannelHub {
    /// Sender for the `status` channel.
    status: broadcast::Sender<HubMessage>,
    /// Sender for the `job` channel.
    job: broadcast::Sender<HubMessage>,
}

impl ChannelHub {
    /// Creates a hub buffering up to `capacity` messages per channel.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (status, _) = broadcast::channel(capacity);
        let (job, _) = broadcast::channel(capacity);
        Self {
            status,
            job,
        }
    }

    /// Returns the sender for `channel`.
    const fn sender(&self, channel: Channel) -> &broadcast::Sender<HubMessage> {
        match channel {
            Channel::Status => &self.status,
            Channel::Job => &self.job,
        }
    }

    /// Subscribes to messages published on `channel` from now on.
    #[must_use]
    pub fn subscribe(&self, channel: Channel) -> broadcast::Receiver<HubMessage> {
        self.sender(channel).subscribe()
    }

    /// Returns the number of live subscribers on `channel`.
    #[must_use]
    pub fn subscriber_count(&self, channel: Channel) -> usize {
        self.sender(channel).receiver_count()
    }

    /// Publishes a JSON message; returns how many subscribers were reached.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Encode`] when the message cannot be serialized.
    pub fn publish(&self, channel: Channel, message: &Value) -> Result<usize, PublishError> {
        let text =
            serde_json::to_string(message).map_err(|err| PublishError::Encode(err.to_string()))?;
        Ok(self.publish_text(channel, Arc::from(text)))
    }

    /// Publishes pre-serialized text; returns how many subscribers were reached.
    #[must_use = "the subscriber count is the only delivery signal"]
    pub fn publish_text(&self, channel: Channel, text: HubMessage) -> usize {
        self.sender(channel).send(text).unwrap_or(0)
    }
}

impl Default for ChannelHub {
    fn default() -> Self {
        Self::new(64)
    }
}
