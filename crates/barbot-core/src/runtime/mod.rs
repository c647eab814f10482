// crates/barbot-core/src/runtime/mod.rs
// ============================================================================
// Module: Barbot Runtime
// Description: Compiler, availability filter, dispatcher, and default store.
// Purpose: Implement the request-path logic shared by every Barbot host.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime code is deterministic apart from the transport call at the end of
//! a dispatch. Hosts construct a [`JobDispatcher`] once and share it.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod compiler;
pub mod dispatcher;
pub mod filter;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use compiler::CompileError;
pub use compiler::compile;
pub use dispatcher::DEFAULT_MAX_DURATION_MS;
pub use dispatcher::DispatchError;
pub use dispatcher::DispatchOrigin;
pub use dispatcher::DispatchOutcome;
pub use dispatcher::DispatchPolicy;
pub use dispatcher::ErrorKind;
pub use dispatcher::JobDispatcher;
pub use filter::CatalogError;
pub use filter::available_recipes;
pub use filter::filter_available;
pub use filter::is_mixable;
pub use store::InMemoryRecipeStore;
pub use store::SharedRecipeStore;
