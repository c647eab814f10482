// crates/barbot-broker/src/lib.rs
// ============================================================================
// Module: Barbot Broker Library
// Description: Broadcast hub, connection tokens, publishers, and negotiators.
// Purpose: Provide the transport side of the status and job channels.
// Dependencies: barbot-core, reqwest, tokio
// ============================================================================

//! ## Overview
//! The broker crate implements the broadcast transport behind
//! [`barbot_core::ChannelPublisher`] and [`barbot_core::ChannelNegotiator`].
//! An embedded deployment pairs [`ChannelHub`] with [`HubPublisher`] and
//! [`EmbeddedNegotiator`]; a deployment that relays to another hub uses
//! [`HttpPublisher`] and [`RemoteNegotiator`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod hub;
pub mod negotiator;
pub mod publisher;
pub mod token;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use hub::ChannelHub;
pub use hub::HubMessage;
pub use negotiator::EmbeddedNegotiator;
pub use negotiator::RemoteNegotiator;
pub use publisher::HttpPublisher;
pub use publisher::HubPublisher;
pub use publisher::LogPublisher;
pub use publisher::validate_channel_payload;
pub use token::AccessKey;
pub use token::IssuedToken;
pub use token::MAX_LIVE_TOKENS;
pub use token::TokenError;
pub use token::TokenGrant;
pub use token::TokenIssuer;
