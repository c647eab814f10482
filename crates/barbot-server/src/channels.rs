// crates/barbot-server/src/channels.rs
// ============================================================================
// Module: Embedded Hub Endpoints
// Description: Websocket subscription plus the send and token REST calls.
// Purpose: Let this server act as the managed broadcast transport.
// Dependencies: axum, barbot-broker, tokio-stream
// ============================================================================

//! ## Overview
//! - `GET /client/hubs/{channel}?access_token=T` upgrades to a websocket that
//!   forwards every message published on the token's channel.
//! - `POST /api/hubs/{channel}/send` publishes a JSON message.
//! - `POST /api/hubs/{channel}/token?user_id=U` issues a connection grant.
//!
//! The REST calls require `Authorization: Bearer <access_key>`. Without a
//! configured access key they reject every request.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::body::Bytes;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::extract::ws::Message;
use axum::extract::ws::WebSocket;
use axum::extract::ws::WebSocketUpgrade;
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::response::IntoResponse;
use axum::response::Response;
use barbot_broker::HubMessage;
use barbot_core::CallerId;
use barbot_core::Channel;
use barbot_core::ChannelNegotiator;
use barbot_core::ChannelPublisher;
use barbot_core::ErrorKind;
use barbot_core::PublishError;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;

use crate::audit::AuditEvent;
use crate::audit::NegotiateAuditEvent;
use crate::audit::now_millis;
use crate::error::ApiError;
use crate::routes::finish;
use crate::routes::parse_body;
use crate::server::AppState;
use crate::server::EmbeddedHub;

// ============================================================================
// SECTION: Query Parameters
// ============================================================================

/// Websocket subscription query.
#[derive(Debug, Deserialize)]
pub(crate) struct SubscribeQuery {
    /// Connection token from negotiation.
    #[serde(default)]
    access_token: Option<String>,
}

/// Token issuance query.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenQuery {
    /// Caller the grant is issued to.
    #[serde(default)]
    user_id: Option<String>,
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Upgrades to a websocket subscribed to `channel`.
pub(crate) async fn subscribe(
    State(state): State<Arc<AppState>>,
    Path(channel): Path<String>,
    Query(query): Query<SubscribeQuery>,
    upgrade: WebSocketUpgrade,
) -> Response {
    let started = Instant::now();
    let result = authorize_subscription(&state, &channel, query.access_token.as_deref());
    let (caller, result) = match result {
        Ok((caller, receiver)) => (
            Some(caller.to_string()),
            Ok(upgrade.on_upgrade(move |socket| forward(socket, receiver))),
        ),
        Err(err) => (None, Err(err)),
    };
    finish(&state, "hub_subscribe", caller, 0, started, result)
}

/// Publishes a JSON message to every subscriber of `channel`.
pub(crate) async fn send(
    State(state): State<Arc<AppState>>,
    Path(channel): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let started = Instant::now();
    let result = match authorize_service(&state, &headers) {
        Ok(hub) => publish(hub, &channel, &body).await,
        Err(err) => Err(err),
    };
    finish(&state, "hub_send", None, body.len(), started, result)
}

/// Issues a connection grant for `user_id` on `channel`.
pub(crate) async fn token(
    State(state): State<Arc<AppState>>,
    Path(channel): Path<String>,
    Query(query): Query<TokenQuery>,
    headers: HeaderMap,
) -> Response {
    let started = Instant::now();
    let caller = query.user_id.as_deref().map(str::trim).filter(|id| !id.is_empty());
    let result = match authorize_service(&state, &headers) {
        Ok(hub) => issue(&state, hub, &channel, caller).await,
        Err(err) => Err(err),
    };
    finish(&state, "hub_token", caller.map(str::to_string), 0, started, result)
}

// ============================================================================
// SECTION: Operations
// ============================================================================

/// Validates a subscription token and subscribes to its channel.
fn authorize_subscription(
    state: &AppState,
    channel: &str,
    token: Option<&str>,
) -> Result<(CallerId, broadcast::Receiver<HubMessage>), ApiError> {
    let hub = embedded(state)?;
    let channel = parse_channel(channel)?;
    let token = token.ok_or_else(|| ApiError::unauthorized("access_token is required"))?;
    let grant = hub
        .issuer
        .validate(token, channel)
        .map_err(|err| ApiError::unauthorized(err.to_string()))?;
    Ok((grant.caller, hub.hub.subscribe(channel)))
}

/// Publishes a request body through the hub publisher.
async fn publish(hub: &EmbeddedHub, channel: &str, body: &[u8]) -> Result<Response, ApiError> {
    let channel = parse_channel(channel)?;
    let message: Value = parse_body(body, "a JSON message")?;
    match hub.publisher.publish(channel, &message).await {
        Ok(receipt) => Ok(Json(receipt).into_response()),
        Err(PublishError::Rejected(detail)) => Err(ApiError::validation(detail)),
        Err(err) => Err(ApiError::from_kind(ErrorKind::Dependency, err.to_string())),
    }
}

/// Issues a grant through the embedded negotiator.
async fn issue(
    state: &AppState,
    hub: &EmbeddedHub,
    channel: &str,
    caller: Option<&str>,
) -> Result<Response, ApiError> {
    let channel = parse_channel(channel)?;
    let caller = CallerId::new(caller.ok_or_else(|| ApiError::validation("user_id is required"))?);
    let grant = hub.negotiator.negotiate(&caller, channel).await.map_err(ApiError::from)?;
    state.audit.record(&AuditEvent::Negotiate(NegotiateAuditEvent {
        timestamp_ms: now_millis(),
        caller: caller.to_string(),
        channel,
        expires_at_ms: grant.expires_at_ms,
    }));
    Ok(Json(grant).into_response())
}

/// Forwards hub messages to the socket until either side closes.
async fn forward(mut socket: WebSocket, receiver: broadcast::Receiver<HubMessage>) {
    let mut messages = BroadcastStream::new(receiver);
    loop {
        tokio::select! {
            next = messages.next() => match next {
                Some(Ok(text)) => {
                    if socket.send(Message::Text(text.to_string().into())).await.is_err() {
                        break;
                    }
                }
                // Lagged subscribers skip ahead.
                Some(Err(_)) => {}
                None => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the embedded hub or a configuration failure.
fn embedded(state: &AppState) -> Result<&EmbeddedHub, ApiError> {
    state
        .hub
        .as_ref()
        .ok_or_else(|| ApiError::from_kind(ErrorKind::Configuration, "embedded hub is disabled"))
}

/// Checks the bearer access key for the hub REST calls.
fn authorize_service<'a>(state: &'a AppState, headers: &HeaderMap) -> Result<&'a EmbeddedHub, ApiError> {
    let hub = embedded(state)?;
    let key = hub
        .access_key
        .as_ref()
        .ok_or_else(|| ApiError::unauthorized("hub access key is not configured"))?;
    let header = headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok());
    if key.verify_bearer(header) {
        Ok(hub)
    } else {
        Err(ApiError::unauthorized("invalid hub access key"))
    }
}

/// Parses a channel path segment.
fn parse_channel(channel: &str) -> Result<Channel, ApiError> {
    channel.parse::<Channel>().map_err(|err| ApiError::validation(err.to_string()))
}
