// crates/barbot-core/src/lib.rs
// ============================================================================
// Module: Barbot Core Library
// Description: Public API surface for the Barbot core.
// Purpose: Expose the recipe model, compiler, filter, dispatcher, and interfaces.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Barbot core turns abstract cocktail recipes into hardware-addressed pump
//! actuation jobs. It owns the data model, the deterministic recipe compiler,
//! the availability filter, and the job dispatcher. Storage and the broadcast
//! transport are reached only through the traits in [`interfaces`], so hosts
//! can wire SQLite, an in-process hub, or a remote pub/sub service.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::ChannelNegotiator;
pub use interfaces::ChannelPublisher;
pub use interfaces::ConnectionGrant;
pub use interfaces::NegotiateError;
pub use interfaces::PublishError;
pub use interfaces::PublishReceipt;
pub use interfaces::RecipeStore;
pub use interfaces::StoreError;
pub use runtime::CatalogError;
pub use runtime::CompileError;
pub use runtime::DEFAULT_MAX_DURATION_MS;
pub use runtime::DispatchError;
pub use runtime::DispatchOrigin;
pub use runtime::DispatchOutcome;
pub use runtime::DispatchPolicy;
pub use runtime::ErrorKind;
pub use runtime::InMemoryRecipeStore;
pub use runtime::JobDispatcher;
pub use runtime::SharedRecipeStore;
pub use runtime::available_recipes;
pub use runtime::compile;
pub use runtime::filter_available;
pub use runtime::is_mixable;
