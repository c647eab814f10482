// crates/barbot-core/src/core/channel.rs
// ============================================================================
// Module: Barbot Broadcast Channels
// Description: The two logical broadcast channels.
// Purpose: Name channels consistently across hub, publisher, and client.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! `status` carries controller heartbeats to every listener; `job` carries
//! actuation commands from the dispatcher to the pump controller.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Channel
// ============================================================================

/// Logical broadcast channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Hardware heartbeats.
    Status,
    /// Actuation commands.
    Job,
}

impl Channel {
    /// All channels in a stable order.
    pub const ALL: [Self; 2] = [Self::Status, Self::Job];

    /// Returns the stable wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Job => "job",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a channel name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown channel: {0}")]
pub struct UnknownChannel(pub String);

impl FromStr for Channel {
    type Err = UnknownChannel;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "status" => Ok(Self::Status),
            "job" => Ok(Self::Job),
            other => Err(UnknownChannel(other.to_string())),
        }
    }
}
