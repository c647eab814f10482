// crates/barbot-client/src/log.rs
// ============================================================================
// Module: Client Log
// Description: Structured client-side events and their sinks.
// Purpose: Record discarded heartbeats, feed disconnects, and cache resets.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Client events share the JSON-line shape of the server audit log. None of
//! them is an error the caller must handle; they exist so an operator can see
//! why the display changed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

// ============================================================================
// SECTION: Events
// ============================================================================

/// Client-side event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClientEvent {
    /// A status message could not be parsed and was dropped.
    MalformedStatus {
        /// Event timestamp (milliseconds since epoch).
        timestamp_ms: u128,
        /// Parse failure.
        error: String,
    },
    /// The status feed closed or failed.
    FeedDisconnected {
        /// Event timestamp (milliseconds since epoch).
        timestamp_ms: u128,
        /// Close reason or transport error.
        reason: String,
    },
    /// The session cache could not be read and defaults were used.
    SessionCacheReset {
        /// Event timestamp (milliseconds since epoch).
        timestamp_ms: u128,
        /// Read or decode failure.
        error: String,
    },
    /// The session cache could not be written.
    SessionSaveFailed {
        /// Event timestamp (milliseconds since epoch).
        timestamp_ms: u128,
        /// Write failure.
        error: String,
    },
}

impl ClientEvent {
    /// Builds a malformed-status event.
    #[must_use]
    pub fn malformed_status(error: impl Into<String>) -> Self {
        Self::MalformedStatus {
            timestamp_ms: now_millis(),
            error: error.into(),
        }
    }

    /// Builds a feed-disconnected event.
    #[must_use]
    pub fn feed_disconnected(reason: impl Into<String>) -> Self {
        Self::FeedDisconnected {
            timestamp_ms: now_millis(),
            reason: reason.into(),
        }
    }

    /// Builds a cache-reset event.
    #[must_use]
    pub fn session_cache_reset(error: impl Into<String>) -> Self {
        Self::SessionCacheReset {
            timestamp_ms: now_millis(),
            error: error.into(),
        }
    }

    /// Builds a save-failed event.
    #[must_use]
    pub fn session_save_failed(error: impl Into<String>) -> Self {
        Self::SessionSaveFailed {
            timestamp_ms: now_millis(),
            error: error.into(),
        }
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Sink for client events.
pub trait ClientLog: Send + Sync {
    /// Records an event.
    fn record(&self, event: &ClientEvent);
}

/// Writes events as JSON lines to stderr.
pub struct StderrClientLog;

impl ClientLog for StderrClientLog {
    fn record(&self, event: &ClientEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Discards events.
pub struct NoopClientLog;

impl ClientLog for NoopClientLog {
    fn record(&self, _event: &ClientEvent) {}
}

/// Keeps events in memory.
#[derive(Default)]
pub struct MemoryClientLog {
    /// Recorded events in arrival order.
    events: Mutex<Vec<ClientEvent>>,
}

impl MemoryClientLog {
    /// Returns a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<ClientEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }
}

impl ClientLog for MemoryClientLog {
    fn record(&self, event: &ClientEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Returns the current unix time in milliseconds.
fn now_millis() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis()).unwrap_or(0)
}
