// crates/barbot-config/src/lib.rs
// ============================================================================
// Module: Barbot Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for barbot.toml semantics.
// Dependencies: barbot-core, serde, toml
// ============================================================================

//! ## Overview
//! `barbot-config` defines the configuration model shared by the server, the
//! client, and the CLI. It provides strict, fail-closed validation and a
//! canonical example file.
//!
//! Security posture: config inputs are untrusted.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;
