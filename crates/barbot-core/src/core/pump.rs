// crates/barbot-core/src/core/pump.rs
// ============================================================================
// Module: Barbot Pump Configuration
// Description: Singleton mapping of pump slots to ingredients and calibration.
// Purpose: Describe the physical bar the compiler targets.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! The rig has exactly [`SLOT_COUNT`] pumps. [`PumpConfig`] maps each slot
//! index to an ingredient name (or nothing) and to its calibration: a flow rate
//! in volume per second and a fixed startup latency in milliseconds.
//! Slot keys serialize as the strings `"0"` through `"6"`, matching the stored
//! configuration documents.
//! Invariants:
//! - Slot indices are `0..SLOT_COUNT`.
//! - An ingredient should occupy at most one slot; this is reported by
//!   [`PumpConfig::duplicate_assignments`] and never enforced by the compiler.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Number of physical pumps on the rig.
pub const SLOT_COUNT: usize = 7;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Pump configuration defects.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PumpConfigError {
    /// A slot key lies outside `0..SLOT_COUNT`.
    #[error("pump slot {0} is out of range (0..{slots})", slots = SLOT_COUNT)]
    SlotOutOfRange(u8),
    /// A slot has no calibration entry.
    #[error("pump slot {0} has no calibration")]
    MissingCalibration(usize),
    /// A slot flow rate is zero, negative, or not finite.
    #[error("pump slot {slot} has invalid flow rate {value}")]
    InvalidFlowRate {
        /// Slot index.
        slot: usize,
        /// Offending flow rate.
        value: f64,
    },
    /// A slot time offset is negative or not finite.
    #[error("pump slot {slot} has invalid time offset {value}")]
    InvalidTimeOffset {
        /// Slot index.
        slot: usize,
        /// Offending time offset.
        value: f64,
    },
}

// ============================================================================
// SECTION: Types
// ============================================================================

/// Calibration for a single pump.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PumpCalibration {
    /// Flow rate in volume units per second.
    pub flow_rate: f64,
    /// Startup latency in milliseconds added to every non-zero run.
    #[serde(default)]
    pub time_offset: f64,
}

impl PumpCalibration {
    /// Creates a calibration entry.
    #[must_use]
    pub const fn new(flow_rate: f64, time_offset: f64) -> Self {
        Self {
            flow_rate,
            time_offset,
        }
    }

    /// Checks that the calibration can be used as a divisor and offset.
    ///
    /// # Errors
    ///
    /// Returns [`PumpConfigError`] when the flow rate is not strictly positive
    /// or the offset is negative or not finite.
    pub fn validate(&self, slot: usize) -> Result<(), PumpConfigError> {
        if !self.flow_rate.is_finite() || self.flow_rate <= 0.0 {
            return Err(PumpConfigError::InvalidFlowRate {
                slot,
                value: self.flow_rate,
            });
        }
        if !self.time_offset.is_finite() || self.time_offset < 0.0 {
            return Err(PumpConfigError::InvalidTimeOffset {
                slot,
                value: self.time_offset,
            });
        }
        Ok(())
    }
}

/// Singleton pump configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PumpConfig {
    /// Ingredient assigned to each slot; `None` or `""` leaves the slot empty.
    #[serde(default)]
    pub ingredients: BTreeMap<u8, Option<String>>,
    /// Calibration for each slot.
    #[serde(default)]
    pub pump_configs: BTreeMap<u8, PumpCalibration>,
}

impl PumpConfig {
    /// Creates an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns an ingredient and calibration to a slot.
    #[must_use]
    pub fn with_slot(
        mut self,
        slot: u8,
        ingredient: impl Into<String>,
        flow_rate: f64,
        time_offset: f64,
    ) -> Self {
        self.ingredients.insert(slot, Some(ingredient.into()));
        self.pump_configs.insert(slot, PumpCalibration::new(flow_rate, time_offset));
        self
    }

    /// Returns the ingredient at `slot`, treating empty names as unassigned.
    #[must_use]
    pub fn ingredient_at(&self, slot: usize) -> Option<&str> {
        let key = u8::try_from(slot).ok()?;
        self.ingredients
            .get(&key)
            .and_then(Option::as_deref)
            .filter(|name| !name.is_empty())
    }

    /// Returns the calibration at `slot`.
    #[must_use]
    pub fn calibration(&self, slot: usize) -> Option<&PumpCalibration> {
        let key = u8::try_from(slot).ok()?;
        self.pump_configs.get(&key)
    }

    /// Returns the set of ingredient names currently loaded on the rig.
    #[must_use]
    pub fn available_ingredients(&self) -> BTreeSet<&str> {
        (0 .. SLOT_COUNT).filter_map(|slot| self.ingredient_at(slot)).collect()
    }

    /// Returns ingredients assigned to more than one slot, with their slots.
    #[must_use]
    pub fn duplicate_assignments(&self) -> Vec<(String, Vec<usize>)> {
        let mut slots_by_name: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for slot in 0 .. SLOT_COUNT {
            if let Some(name) = self.ingredient_at(slot) {
                slots_by_name.entry(name).or_default().push(slot);
            }
        }
        slots_by_name
            .into_iter()
            .filter(|(_, slots)| slots.len() > 1)
            .map(|(name, slots)| (name.to_string(), slots))
            .collect()
    }

    /// Validates slot keys and every calibration entry present.
    ///
    /// # Errors
    ///
    /// Returns [`PumpConfigError`] on the first defect found.
    pub fn validate(&self) -> Result<(), PumpConfigError> {
        for key in self.ingredients.keys().chain(self.pump_configs.keys()) {
            if usize::from(*key) >= SLOT_COUNT {
                return Err(PumpConfigError::SlotOutOfRange(*key));
            }
        }
        for (key, calibration) in &self.pump_configs {
            calibration.validate(usize::from(*key))?;
        }
        Ok(())
    }
}
