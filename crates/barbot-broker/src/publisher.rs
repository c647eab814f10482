// crates/barbot-broker/src/publisher.rs
// ============================================================================
// Module: Barbot Channel Publishers
// Description: ChannelPublisher implementations for hub, remote, and log.
// Purpose: Let the dispatcher publish without knowing the deployment.
// Dependencies: barbot-core, reqwest, serde_json, url
// ============================================================================

//! ## Overview
//! - [`HubPublisher`] fans out through the in-process [`ChannelHub`].
//! - [`HttpPublisher`] posts to another deployment's hub REST endpoint.
//! - [`LogPublisher`] writes one JSON line per message and delivers nothing.
//!
//! Payloads are validated before fan-out: status messages must parse as a
//! heartbeat and job messages as a full duration vector.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use barbot_core::Channel;
use barbot_core::ChannelPublisher;
use barbot_core::JobMessage;
use barbot_core::PublishError;
use barbot_core::PublishReceipt;
use barbot_core::StatusMessage;
use reqwest::Client;
use reqwest::header::AUTHORIZATION;
use reqwest::redirect::Policy;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;
use url::Url;

use crate::hub::ChannelHub;
use crate::token::AccessKey;
use crate::token::unix_millis;

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Checks that `message` is acceptable on `channel`.
///
/// # Errors
///
/// Returns [`PublishError::Rejected`] for malformed status heartbeats and
/// for job messages that do not carry one finite, non-negative duration per
/// slot.
pub fn validate_channel_payload(channel: Channel, message: &Value) -> Result<(), PublishError> {
    match channel {
        Channel::Status => StatusMessage::from_value(message)
            .map(|_| ())
            .map_err(|err| PublishError::Rejected(err.to_string())),
        Channel::Job => JobMessage::deserialize(message)
            .map(|_| ())
            .map_err(|err| PublishError::Rejected(format!("invalid job message: {err}"))),
    }
}

// ============================================================================
// SECTION: Hub Publisher
// ============================================================================

/// Publishes through the in-process hub.
#[derive(Debug, Clone)]
pub struct HubPublisher {
    /// Shared hub.
    hub: Arc<ChannelHub>,
}

impl HubPublisher {
    /// Creates a publisher over `hub`.
    #[must_use]
    pub const fn new(hub: Arc<ChannelHub>) -> Self {
        Self {
            hub,
        }
    }
}

#[async_trait]
impl ChannelPublisher for HubPublisher {
    async fn publish(
        &self,
        channel: Channel,
        message: &Value,
    ) -> Result<PublishReceipt, PublishError> {
        validate_channel_payload(channel, message)?;
        let subscribers = self.hub.publish(channel, message)?;
        Ok(PublishReceipt {
            channel,
            subscribers: Some(subscribers),
        })
    }
}

// ============================================================================
// SECTION: HTTP Publisher
// ============================================================================

/// Publishes by calling a remote hub's REST endpoint.
#[derive(Debug, Clone)]
pub struct HttpPublisher {
    /// HTTP client.
    client: Client,
    /// Remote hub base URL.
    endpoint: Url,
    /// Remote access key.
    access_key: AccessKey,
}

impl HttpPublisher {
    /// Builds a publisher with a default client.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Transport`] when the endpoint is not an
    /// `http(s)` URL or the client cannot be built.
    pub fn new(endpoint: &str, access_key: AccessKey) -> Result<Self, PublishError> {
        let client = Client::builder()
            .redirect(Policy::none())
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|err| PublishError::Transport(err.to_string()))?;
        Self::with_client(client, endpoint, access_key)
    }

    /// Builds a publisher with a preconfigured client.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Transport`] when the endpoint is not an
    /// `http(s)` URL.
    pub fn with_client(
        client: Client,
        endpoint: &str,
        access_key: AccessKey,
    ) -> Result<Self, PublishError> {
        let endpoint = parse_http_endpoint(endpoint).map_err(PublishError::Transport)?;
        Ok(Self {
            client,
            endpoint,
            access_key,
        })
    }
}

#[async_trait]
impl ChannelPublisher for HttpPublisher {
    async fn publish(
        &self,
        channel: Channel,
        message: &Value,
    ) -> Result<PublishReceipt, PublishError> {
        validate_channel_payload(channel, message)?;
        let url = hub_url(&self.endpoint, channel, "send").map_err(PublishError::Transport)?;
        let response = self
            .client
            .post(url)
            .header(AUTHORIZATION, format!("Bearer {}", self.access_key.expose()))
            .json(message)
            .send()
            .await
            .map_err(|err| PublishError::Transport(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(PublishError::Transport(format!("hub responded with http status {status}")));
        }
        let subscribers = response
            .json::<PublishReceipt>()
            .await
            .ok()
            .and_then(|receipt| receipt.subscribers);
        Ok(PublishReceipt {
            channel,
            subscribers,
        })
    }
}

// ============================================================================
// SECTION: Log Publisher
// ============================================================================

/// Writes messages as JSON lines without delivering them.
pub struct LogPublisher<W: Write + Send> {
    /// Output writer.
    writer: Mutex<W>,
}

impl<W: Write + Send> LogPublisher<W> {
    /// Creates a log publisher over `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Consumes the publisher and returns its writer.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Transport`] when the writer lock is poisoned.
    pub fn into_inner(self) -> Result<W, PublishError> {
        self.writer
            .into_inner()
            .map_err(|_| PublishError::Transport("log writer mutex poisoned".to_string()))
    }
}

#[async_trait]
impl<W: Write + Send> ChannelPublisher for LogPublisher<W> {
    async fn publish(
        &self,
        channel: Channel,
        message: &Value,
    ) -> Result<PublishReceipt, PublishError> {
        validate_channel_payload(channel, message)?;
        let record = json!({
            "event": "channel_publish",
            "channel": channel.as_str(),
            "message": message,
            "published_at_ms": unix_millis(),
        });
        let mut guard = self
            .writer
            .lock()
            .map_err(|_| PublishError::Transport("log writer mutex poisoned".to_string()))?;
        serde_json::to_writer(&mut *guard, &record)
            .map_err(|err| PublishError::Transport(err.to_string()))?;
        guard.write_all(b"\n").map_err(|err| PublishError::Transport(err.to_string()))?;
        drop(guard);
        Ok(PublishReceipt {
            channel,
            subscribers: None,
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses and checks an `http(s)` base URL.
pub(crate) fn parse_http_endpoint(endpoint: &str) -> Result<Url, String> {
    let url = Url::parse(endpoint.trim()).map_err(|err| format!("invalid hub endpoint: {err}"))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(format!("unsupported hub endpoint scheme: {scheme}")),
    }
}

/// Builds `{endpoint}/api/hubs/{channel}/{action}`.
pub(crate) fn hub_url(endpoint: &Url, channel: Channel, action: &str) -> Result<Url, String> {
    let mut url = endpoint.clone();
    url.path_segments_mut()
        .map_err(|()| "hub endpoint cannot be a base url".to_string())?
        .pop_if_empty()
        .extend(["api", "hubs", channel.as_str(), action]);
    Ok(url)
}
