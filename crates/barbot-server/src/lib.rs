// crates/barbot-server/src/lib.rs
// ============================================================================
// Module: Barbot Server Library
// Description: HTTP surface for drinks, negotiation, mixing, and the hub.
// Purpose: Expose the core operations over axum with audited error mapping.
// Dependencies: axum, barbot-broker, barbot-config, barbot-core
// ============================================================================

//! ## Overview
//! The server exposes the recipe list, negotiation, mix, and manual
//! actuation operations, plus the embedded hub endpoints when this
//! deployment hosts the broadcast transport. All failures are mapped to
//! status codes at the request boundary; see [`error::status_for_kind`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
mod channels;
pub mod error;
mod routes;
pub mod server;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditEvent;
pub use audit::AuditSink;
pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use error::ApiError;
pub use error::ServerError;
pub use error::status_for_kind;
pub use routes::ANONYMOUS_CALLER;
pub use server::BarbotServer;
pub use server::ServerBuilder;
pub use server::build_store;
