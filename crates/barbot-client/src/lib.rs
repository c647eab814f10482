// crates/barbot-client/src/lib.rs
// ============================================================================
// Module: Barbot Client Library
// Description: Display-side controller, liveness monitor, and server client.
// Purpose: Drive a drink-selection display against a Barbot server.
// Dependencies: barbot-core, reqwest, async-tungstenite, tokio
// ============================================================================

//! ## Overview
//! A display wires three pieces together:
//!
//! - [`ApiClient`] for the REST surface (recipes, config, mix, negotiate).
//! - [`StatusFeed`] feeding heartbeats from the negotiated websocket URL into
//!   a [`LivenessMonitor`].
//! - [`DrinkController`] holding the recipe list and selection, persisted
//!   through a [`SessionCache`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod api;
pub mod controller;
pub mod error;
pub mod feed;
pub mod liveness;
pub mod log;
pub mod session;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use api::ApiClient;
pub use api::BarbotApi;
pub use api::JobConfirmation;
pub use controller::DrinkController;
pub use error::ClientError;
pub use error::ControllerError;
pub use feed::StatusFeed;
pub use liveness::Clock;
pub use liveness::LivenessMonitor;
pub use liveness::LivenessPhase;
pub use liveness::LivenessState;
pub use liveness::ONLINE_WINDOW_MS;
pub use liveness::SystemClock;
pub use liveness::TokioClock;
pub use log::ClientEvent;
pub use log::ClientLog;
pub use log::MemoryClientLog;
pub use log::NoopClientLog;
pub use log::StderrClientLog;
pub use session::SessionCache;
pub use session::SessionState;
