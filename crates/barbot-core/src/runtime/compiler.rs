// crates/barbot-core/src/runtime/compiler.rs
// ============================================================================
// Module: Barbot Recipe Compiler
// Description: Converts a recipe into per-pump run durations.
// Purpose: Produce the only durations the rig ever receives for a mix.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! For every slot, the compiler looks up the slot's ingredient in the recipe
//! (first matching line wins) and converts the amount into a run time:
//! `(amount / flow_rate) * 1000 + time_offset`. Unmatched and empty slots run
//! for zero milliseconds. The function is pure and total over well-formed
//! inputs; a matched slot with a missing or non-positive flow rate is rejected
//! instead of producing `inf`/`NaN`.
//! Invariants:
//! - The output always has exactly [`SLOT_COUNT`] entries.
//! - Recipe ingredient order never affects the output.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::ActuationDurations;
use crate::core::DurationError;
use crate::core::PumpConfig;
use crate::core::PumpConfigError;
use crate::core::Recipe;
use crate::core::SLOT_COUNT;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Compilation failures; all are configuration or recipe data defects.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// A slot the recipe uses has no calibration entry.
    #[error("pump slot {0} is used by the recipe but has no calibration")]
    MissingCalibration(usize),
    /// A slot the recipe uses has an unusable calibration.
    #[error(transparent)]
    Calibration(#[from] PumpConfigError),
    /// A recipe amount is negative or not finite.
    #[error("ingredient {ingredient} has invalid amount {amount}")]
    InvalidAmount {
        /// Ingredient name.
        ingredient: String,
        /// Offending amount.
        amount: f64,
    },
    /// The computed durations are not acceptable to the rig.
    #[error(transparent)]
    Durations(#[from] DurationError),
}

// ============================================================================
// SECTION: Compiler
// ============================================================================

/// Compiles `recipe` against `config` into per-slot run durations.
///
/// # Errors
///
/// Returns [`CompileError`] when a slot used by the recipe is not calibrated
/// or an amount cannot be converted into a finite duration.
pub fn compile(config: &PumpConfig, recipe: &Recipe) -> Result<ActuationDurations, CompileError> {
    let mut durations = [0.0; SLOT_COUNT];
    for (slot, duration) in durations.iter_mut().enumerate() {
        let Some(name) = config.ingredient_at(slot) else {
            continue;
        };
        let Some(line) = recipe.find_ingredient(name) else {
            continue;
        };
        if !line.amount.is_finite() || line.amount < 0.0 {
            return Err(CompileError::InvalidAmount {
                ingredient: line.ingredient.clone(),
                amount: line.amount,
            });
        }
        let calibration =
            config.calibration(slot).ok_or(CompileError::MissingCalibration(slot))?;
        calibration.validate(slot)?;
        *duration = (line.amount / calibration.flow_rate) * 1000.0 + calibration.time_offset;
    }
    Ok(ActuationDurations::new(durations)?)
}
