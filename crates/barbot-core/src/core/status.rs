// crates/barbot-core/src/core/status.rs
// ============================================================================
// Module: Barbot Status Heartbeats
// Description: Heartbeat payload published by the pump controller.
// Purpose: Parse `status` channel messages into a normalized form.
// Dependencies: serde, serde_json, time
// ============================================================================

//! ## Overview
//! The controller broadcasts a [`StatusMessage`] every couple of seconds and
//! right after accepting a job. Its `timestamp` comes from the controller's
//! clock and arrives either as epoch milliseconds or as an RFC 3339 string
//! with offset; both normalize to epoch milliseconds here. Messages carry no
//! version field.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Malformed heartbeat payloads.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatusParseError {
    /// Payload is not a JSON object with the expected fields.
    #[error("malformed status message: {0}")]
    Json(String),
    /// Timestamp is neither epoch milliseconds nor RFC 3339.
    #[error("invalid status timestamp: {0}")]
    Timestamp(String),
    /// A numeric field is NaN or infinite.
    #[error("status field {0} is not a finite number")]
    NotFinite(&'static str),
}

// ============================================================================
// SECTION: Status Message
// ============================================================================

/// Heartbeat reported by the pump controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawStatusMessage")]
pub struct StatusMessage {
    /// Controller clock at send time, epoch milliseconds.
    #[serde(rename = "timestamp")]
    pub timestamp_ms: i64,
    /// Seconds left in the running job; zero or less when idle.
    #[serde(rename = "remainingJobTime")]
    pub remaining_job_time: f64,
}

impl StatusMessage {
    /// Creates a heartbeat from already-normalized values.
    #[must_use]
    pub const fn new(timestamp_ms: i64, remaining_job_time: f64) -> Self {
        Self {
            timestamp_ms,
            remaining_job_time,
        }
    }

    /// Parses a heartbeat from its JSON text form.
    ///
    /// # Errors
    ///
    /// Returns [`StatusParseError`] when the payload is malformed.
    pub fn parse(text: &str) -> Result<Self, StatusParseError> {
        let raw: RawStatusMessage =
            serde_json::from_str(text).map_err(|err| StatusParseError::Json(err.to_string()))?;
        Self::try_from(raw)
    }

    /// Parses a heartbeat from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`StatusParseError`] when the payload is malformed.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, StatusParseError> {
        let raw = RawStatusMessage::deserialize(value)
            .map_err(|err| StatusParseError::Json(err.to_string()))?;
        Self::try_from(raw)
    }

    /// Returns how old the heartbeat is relative to `now_ms`.
    #[must_use]
    pub const fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms.saturating_sub(self.timestamp_ms)
    }

    /// Returns true when the controller reports a job in progress.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.remaining_job_time > 0.0
    }
}

// ============================================================================
// SECTION: Wire Form
// ============================================================================

/// Heartbeat as it appears on the wire.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStatusMessage {
    /// Epoch milliseconds or RFC 3339 text.
    timestamp: RawTimestamp,
    /// Seconds remaining.
    remaining_job_time: f64,
}

/// Accepted timestamp encodings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    /// Epoch milliseconds.
    Millis(f64),
    /// RFC 3339 text.
    Text(String),
}

impl TryFrom<RawStatusMessage> for StatusMessage {
    type Error = StatusParseError;

    fn try_from(raw: RawStatusMessage) -> Result<Self, Self::Error> {
        if !raw.remaining_job_time.is_finite() {
            return Err(StatusParseError::NotFinite("remainingJobTime"));
        }
        let timestamp_ms = match raw.timestamp {
            RawTimestamp::Millis(value) => millis_from_number(value)?,
            RawTimestamp::Text(text) => millis_from_rfc3339(&text)?,
        };
        Ok(Self {
            timestamp_ms,
            remaining_job_time: raw.remaining_job_time,
        })
    }
}

/// Converts a JSON number of milliseconds into an integer timestamp.
#[allow(
    clippy::cast_possible_truncation,
    reason = "Value is finite and range-checked against i64 bounds before the cast."
)]
fn millis_from_number(value: f64) -> Result<i64, StatusParseError> {
    // 2^63 as f64; anything at or beyond cannot round-trip into i64.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if !value.is_finite() {
        return Err(StatusParseError::NotFinite("timestamp"));
    }
    if value >= LIMIT || value < -LIMIT {
        return Err(StatusParseError::Timestamp(format!("{value} is out of range")));
    }
    Ok(value.round() as i64)
}

/// Parses an RFC 3339 timestamp into epoch milliseconds.
fn millis_from_rfc3339(text: &str) -> Result<i64, StatusParseError> {
    let parsed = OffsetDateTime::parse(text, &Rfc3339)
        .map_err(|err| StatusParseError::Timestamp(err.to_string()))?;
    i64::try_from(parsed.unix_timestamp_nanos() / 1_000_000)
        .map_err(|_| StatusParseError::Timestamp(format!("{text} is out of range")))
}
