// crates/barbot-core/src/core/mod.rs
// ============================================================================
// Module: Barbot Core Types
// Description: Canonical recipe, pump, actuation, and channel message types.
// Purpose: Provide stable, serializable types shared by server and client.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Core types define recipes, the singleton pump configuration, actuation
//! durations, and the two broadcast channel payloads. They are the canonical
//! source of truth for the HTTP surface and the wire formats.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod actuation;
pub mod channel;
pub mod identifiers;
pub mod pump;
pub mod recipe;
pub mod status;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use actuation::ActuationDurations;
pub use actuation::DurationError;
pub use actuation::JobMessage;
pub use channel::Channel;
pub use channel::UnknownChannel;
pub use identifiers::CallerId;
pub use identifiers::RecipeId;
pub use pump::PumpCalibration;
pub use pump::PumpConfig;
pub use pump::PumpConfigError;
pub use pump::SLOT_COUNT;
pub use recipe::Recipe;
pub use recipe::RecipeIngredient;
pub use status::StatusMessage;
pub use status::StatusParseError;
