// crates/barbot-core/src/interfaces/mod.rs
// ============================================================================
// Module: Barbot Interfaces
// Description: Backend-agnostic interfaces for storage and broadcast transport.
// Purpose: Define the contract surfaces used by the Barbot runtime.
// Dependencies: crate::core, async-trait
// ============================================================================

//! ## Overview
//! Interfaces define how Barbot reaches its external collaborators: the
//! recipe/config store (read-only from the core's perspective) and the
//! managed broadcast transport (publish plus caller-scoped negotiation).
//! Implementations must fail closed and never report success for a publish
//! the transport rejected.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::Channel;
use crate::core::identifiers::CallerId;
use crate::core::identifiers::RecipeId;
use crate::core::pump::PumpConfig;
use crate::core::recipe::Recipe;

// ============================================================================
// SECTION: Recipe Store
// ============================================================================

/// Recipe store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("recipe store io error: {0}")]
    Io(String),
    /// Stored document is corrupted or cannot be decoded.
    #[error("recipe store corruption: {0}")]
    Corrupt(String),
    /// Stored data is invalid.
    #[error("recipe store invalid data: {0}")]
    Invalid(String),
    /// Store reported an error.
    #[error("recipe store error: {0}")]
    Store(String),
}

/// Read-only view of recipes and the singleton pump configuration.
pub trait RecipeStore {
    /// Lists every stored recipe.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be read.
    fn list_recipes(&self) -> Result<Vec<Recipe>, StoreError>;

    /// Loads a recipe by identifier; `Ok(None)` when absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be read.
    fn load_recipe(&self, id: &RecipeId) -> Result<Option<Recipe>, StoreError>;

    /// Loads the singleton pump configuration; `Ok(None)` when absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be read.
    fn load_config(&self) -> Result<Option<PumpConfig>, StoreError>;
}

// ============================================================================
// SECTION: Channel Publisher
// ============================================================================

/// Broadcast publish errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Payload could not be encoded.
    #[error("publish encode failed: {0}")]
    Encode(String),
    /// Transport rejected or failed the publish call.
    #[error("publish transport failed: {0}")]
    Transport(String),
    /// Payload is not acceptable on the target channel.
    #[error("publish rejected: {0}")]
    Rejected(String),
}

/// Result of a completed publish call.
///
/// # Invariants
/// - Returned only when the transport accepted the message; delivery to any
///   particular subscriber is not implied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishReceipt {
    /// Channel the message was published on.
    pub channel: Channel,
    /// Subscribers connected at publish time, when the transport reports it.
    pub subscribers: Option<usize>,
}

/// Fan-out publisher for the broadcast transport.
#[async_trait]
pub trait ChannelPublisher: Send + Sync {
    /// Publishes `message` to every current subscriber of `channel`.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError`] when the transport call fails.
    async fn publish(&self, channel: Channel, message: &Value)
    -> Result<PublishReceipt, PublishError>;
}

// ============================================================================
// SECTION: Channel Negotiator
// ============================================================================

/// Negotiation errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum NegotiateError {
    /// Transport configuration is missing or unusable.
    #[error("negotiation misconfigured: {0}")]
    Configuration(String),
    /// Transport call failed.
    #[error("negotiation transport failed: {0}")]
    Transport(String),
}

/// Short-lived, caller-scoped connection grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionGrant {
    /// Connection URL including its access token.
    pub url: String,
    /// Channel the URL subscribes to.
    pub channel: Channel,
    /// Expiry, epoch milliseconds.
    pub expires_at_ms: i64,
}

/// Issues caller-scoped connection URLs for the broadcast transport.
#[async_trait]
pub trait ChannelNegotiator: Send + Sync {
    /// Exchanges a caller identity for a connection URL to `channel`.
    ///
    /// # Errors
    ///
    /// Returns [`NegotiateError`] when no usable URL can be produced.
    async fn negotiate(
        &self,
        caller: &CallerId,
        channel: Channel,
    ) -> Result<ConnectionGrant, NegotiateError>;
}
