// crates/barbot-client/src/feed.rs
// ============================================================================
// Module: Status Feed
// Description: Websocket subscription to the status channel.
// Purpose: Deliver heartbeats from the broadcast transport to the monitor.
// Dependencies: async-tungstenite, futures
// ============================================================================

//! ## Overview
//! [`StatusFeed`] connects to a negotiated URL and hands each text frame to
//! a [`LivenessMonitor`]. Disconnects are not surfaced as state: the online
//! watchdog expires on its own once heartbeats stop. Only `ws://` URLs are
//! supported.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use async_tungstenite::WebSocketStream;
use async_tungstenite::tokio::ConnectStream;
use async_tungstenite::tokio::connect_async;
use async_tungstenite::tungstenite::Message;
use futures::StreamExt;

use crate::error::ClientError;
use crate::liveness::LivenessMonitor;
use crate::log::ClientEvent;
use crate::log::ClientLog;

// ============================================================================
// SECTION: Feed
// ============================================================================

/// Open websocket subscription to the status channel.
pub struct StatusFeed {
    /// Websocket stream.
    socket: WebSocketStream<ConnectStream>,
    /// Event sink for disconnects.
    log: Arc<dyn ClientLog>,
}

impl StatusFeed {
    /// Connects to a negotiated connection URL.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Feed`] when the handshake fails.
    pub async fn connect(url: &str, log: Arc<dyn ClientLog>) -> Result<Self, ClientError> {
        let (socket, _response) =
            connect_async(url).await.map_err(|err| ClientError::Feed(err.to_string()))?;
        Ok(Self {
            socket,
            log,
        })
    }

    /// Returns the next text frame, or `None` once the feed closes.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Feed`] when the transport fails.
    pub async fn next_text(&mut self) -> Result<Option<String>, ClientError> {
        while let Some(frame) = self.socket.next().await {
            match frame {
                Ok(Message::Text(text)) => return Ok(Some(text.as_str().to_string())),
                Ok(Message::Close(frame)) => {
                    let reason =
                        frame.map_or_else(|| "closed".to_string(), |frame| frame.reason.to_string());
                    self.log.record(&ClientEvent::feed_disconnected(reason));
                    return Ok(None);
                }
                Ok(_) => {}
                Err(err) => {
                    self.log.record(&ClientEvent::feed_disconnected(err.to_string()));
                    return Err(ClientError::Feed(err.to_string()));
                }
            }
        }
        self.log.record(&ClientEvent::feed_disconnected("stream ended"));
        Ok(None)
    }

    /// Feeds every heartbeat into `monitor` until the feed closes.
    ///
    /// Malformed heartbeats are logged by the monitor and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Feed`] when the transport fails.
    pub async fn run(mut self, monitor: &LivenessMonitor) -> Result<(), ClientError> {
        while let Some(text) = self.next_text().await? {
            let _ = monitor.handle_text(&text);
        }
        Ok(())
    }
}

impl std::fmt::Debug for StatusFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusFeed").finish_non_exhaustive()
    }
}
