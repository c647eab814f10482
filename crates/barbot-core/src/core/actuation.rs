// crates/barbot-core/src/core/actuation.rs
// ============================================================================
// Module: Barbot Actuation
// Description: Per-pump run durations and the `job` channel payload.
// Purpose: Guarantee that only well-formed duration vectors reach the rig.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! [`ActuationDurations`] is exactly [`SLOT_COUNT`] milliseconds values,
//! index-aligned to pump slots. Construction always validates; there is no
//! unchecked constructor, so a value of this type is always finite and
//! non-negative. Durations are built per request, published once, and
//! discarded.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::pump::SLOT_COUNT;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Duration vector validation failures.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DurationError {
    /// The vector does not have one entry per slot.
    #[error("expected {slots} durations, got {0}", slots = SLOT_COUNT)]
    WrongSlotCount(usize),
    /// A single-slot request names a slot that does not exist.
    #[error("pump slot {0} is out of range (0..{slots})", slots = SLOT_COUNT)]
    SlotOutOfRange(usize),
    /// A duration is NaN or infinite.
    #[error("duration for slot {0} is not a finite number")]
    NotFinite(usize),
    /// A duration is negative.
    #[error("duration for slot {slot} is negative ({value})")]
    Negative {
        /// Slot index.
        slot: usize,
        /// Offending value.
        value: f64,
    },
    /// A duration exceeds the rig's encodable maximum.
    #[error("duration for slot {slot} exceeds {max_ms} ms ({value})")]
    ExceedsCeiling {
        /// Slot index.
        slot: usize,
        /// Offending value.
        value: f64,
        /// Configured ceiling in milliseconds.
        max_ms: f64,
    },
}

// ============================================================================
// SECTION: Durations
// ============================================================================

/// Validated pump run durations in milliseconds, one per slot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct ActuationDurations([f64; SLOT_COUNT]);

impl ActuationDurations {
    /// Validates and wraps a duration array.
    ///
    /// # Errors
    ///
    /// Returns [`DurationError`] when any value is negative or not finite.
    pub fn new(values: [f64; SLOT_COUNT]) -> Result<Self, DurationError> {
        for (slot, value) in values.iter().enumerate() {
            if !value.is_finite() {
                return Err(DurationError::NotFinite(slot));
            }
            if *value < 0.0 {
                return Err(DurationError::Negative {
                    slot,
                    value: *value,
                });
            }
        }
        Ok(Self(values))
    }

    /// Returns a vector that runs only `slot` for `duration_ms`.
    ///
    /// # Errors
    ///
    /// Returns [`DurationError`] when the slot is out of range or the
    /// duration is invalid.
    pub fn single_slot(slot: usize, duration_ms: f64) -> Result<Self, DurationError> {
        if slot >= SLOT_COUNT {
            return Err(DurationError::SlotOutOfRange(slot));
        }
        let mut values = [0.0; SLOT_COUNT];
        values[slot] = duration_ms;
        Self::new(values)
    }

    /// Rejects durations above `max_ms`.
    ///
    /// # Errors
    ///
    /// Returns [`DurationError::ExceedsCeiling`] for the first offending slot.
    pub fn check_ceiling(&self, max_ms: f64) -> Result<(), DurationError> {
        match self.0.iter().enumerate().find(|(_, value)| **value > max_ms) {
            Some((slot, value)) => Err(DurationError::ExceedsCeiling {
                slot,
                value: *value,
                max_ms,
            }),
            None => Ok(()),
        }
    }

    /// Returns the durations as a slice.
    #[must_use]
    pub const fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Returns the duration at `slot`.
    #[must_use]
    pub fn get(&self, slot: usize) -> Option<f64> {
        self.0.get(slot).copied()
    }

    /// Returns the sum of all durations in milliseconds.
    #[must_use]
    pub fn total_ms(&self) -> f64 {
        self.0.iter().sum()
    }
}

impl TryFrom<Vec<f64>> for ActuationDurations {
    type Error = DurationError;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        let count = values.len();
        let array: [f64; SLOT_COUNT] =
            values.try_into().map_err(|_| DurationError::WrongSlotCount(count))?;
        Self::new(array)
    }
}

impl From<ActuationDurations> for Vec<f64> {
    fn from(durations: ActuationDurations) -> Self {
        durations.0.to_vec()
    }
}

// ============================================================================
// SECTION: Job Message
// ============================================================================

/// Payload published on the `job` channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JobMessage {
    /// Pump run durations, index-aligned to slots.
    pub durations: ActuationDurations,
}
