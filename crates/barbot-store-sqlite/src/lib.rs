// crates/barbot-store-sqlite/src/lib.rs
// ============================================================================
// Module: Barbot SQLite Store Library
// Description: SQLite-backed recipe store and seed loading.
// Purpose: Provide durable recipe and pump configuration storage.
// Dependencies: barbot-core, rusqlite, serde, serde_json
// ============================================================================

//! ## Overview
//! `barbot-store-sqlite` implements [`barbot_core::RecipeStore`] over `SQLite`.
//! Recipes and the singleton pump configuration are stored as JSON documents.
//! The [`seed`] module reads a directory of JSON documents for import.
//! Security posture: database and seed contents are untrusted.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod seed;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use seed::CONFIG_FILE_NAME;
pub use seed::SeedData;
pub use seed::SeedError;
pub use seed::load_seed_dir;
pub use store::*;
