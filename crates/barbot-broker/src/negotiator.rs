// crates/barbot-broker/src/negotiator.rs
// ============================================================================
// Module: Barbot Negotiators
// Description: ChannelNegotiator implementations for embedded and remote hubs.
// Purpose: Exchange a caller identity for a short-lived connection URL.
// Dependencies: barbot-core, reqwest, url
// ============================================================================

//! ## Overview
//! The embedded negotiator mints a token locally and points the caller at
//! this deployment's websocket endpoint. The remote negotiator asks another
//! deployment's hub for a grant. Neither returns a URL it could not back
//! with a valid token.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use barbot_core::CallerId;
use barbot_core::Channel;
use barbot_core::ChannelNegotiator;
use barbot_core::ConnectionGrant;
use barbot_core::NegotiateError;
use reqwest::Client;
use reqwest::header::AUTHORIZATION;
use reqwest::redirect::Policy;
use url::Url;

use crate::publisher::hub_url;
use crate::publisher::parse_http_endpoint;
use crate::token::AccessKey;
use crate::token::TokenError;
use crate::token::TokenIssuer;

// ============================================================================
// SECTION: Embedded Negotiator
// ============================================================================

/// Issues tokens for this deployment's hub.
#[derive(Debug, Clone)]
pub struct EmbeddedNegotiator {
    /// Token issuer shared with the websocket endpoint.
    issuer: Arc<TokenIssuer>,
    /// Websocket base URL.
    base_url: Url,
}

impl EmbeddedNegotiator {
    /// Creates a negotiator that issues URLs under `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`NegotiateError::Configuration`] when `base_url` is not a
    /// `ws(s)` URL.
    pub fn new(issuer: Arc<TokenIssuer>, base_url: &str) -> Result<Self, NegotiateError> {
        let base_url = Url::parse(base_url.trim())
            .map_err(|err| NegotiateError::Configuration(format!("invalid public url: {err}")))?;
        if !matches!(base_url.scheme(), "ws" | "wss") {
            return Err(NegotiateError::Configuration(
                "public url must use ws or wss".to_string(),
            ));
        }
        Ok(Self {
            issuer,
            base_url,
        })
    }

    /// Builds the connection URL for `channel` carrying `token`.
    fn connection_url(&self, channel: Channel, token: &str) -> Result<Url, NegotiateError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| NegotiateError::Configuration("public url cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["client", "hubs", channel.as_str()]);
        url.query_pairs_mut().clear().append_pair("access_token", token);
        Ok(url)
    }
}

#[async_trait]
impl ChannelNegotiator for EmbeddedNegotiator {
    async fn negotiate(
        &self,
        caller: &CallerId,
        channel: Channel,
    ) -> Result<ConnectionGrant, NegotiateError> {
        let issued = self.issuer.issue(caller, channel).map_err(|err| match err {
            TokenError::Capacity | TokenError::Unavailable => {
                NegotiateError::Transport(err.to_string())
            }
            other => NegotiateError::Configuration(other.to_string()),
        })?;
        let url = self.connection_url(channel, &issued.token)?;
        Ok(ConnectionGrant {
            url: url.into(),
            channel,
            expires_at_ms: issued.expires_at_ms,
        })
    }
}

// ============================================================================
// SECTION: Remote Negotiator
// ============================================================================

/// Requests grants from another deployment's hub.
#[derive(Debug, Clone)]
pub struct RemoteNegotiator {
    /// HTTP client.
    client: Client,
    /// Remote hub base URL.
    endpoint: Url,
    /// Remote access key.
    access_key: AccessKey,
}

impl RemoteNegotiator {
    /// Builds a negotiator with a default client.
    ///
    /// # Errors
    ///
    /// Returns [`NegotiateError::Configuration`] when the endpoint is invalid
    /// and [`NegotiateError::Transport`] when the client cannot be built.
    pub fn new(endpoint: &str, access_key: AccessKey) -> Result<Self, NegotiateError> {
        let client = Client::builder()
            .redirect(Policy::none())
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|err| NegotiateError::Transport(err.to_string()))?;
        let endpoint = parse_http_endpoint(endpoint).map_err(NegotiateError::Configuration)?;
        Ok(Self {
            client,
            endpoint,
            access_key,
        })
    }
}

#[async_trait]
impl ChannelNegotiator for RemoteNegotiator {
    async fn negotiate(
        &self,
        caller: &CallerId,
        channel: Channel,
    ) -> Result<ConnectionGrant, NegotiateError> {
        let mut url =
            hub_url(&self.endpoint, channel, "token").map_err(NegotiateError::Configuration)?;
        url.query_pairs_mut().append_pair("user_id", caller.as_str());
        let response = self
            .client
            .post(url)
            .header(AUTHORIZATION, format!("Bearer {}", self.access_key.expose()))
            .send()
            .await
            .map_err(|err| NegotiateError::Transport(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(NegotiateError::Transport(format!(
                "hub responded with http status {status}"
            )));
        }
        let grant: ConnectionGrant = response
            .json()
            .await
            .map_err(|err| NegotiateError::Transport(format!("invalid grant: {err}")))?;
        if grant.channel != channel || grant.url.trim().is_empty() {
            return Err(NegotiateError::Transport("hub returned an unusable grant".to_string()));
        }
        Ok(grant)
    }
}
