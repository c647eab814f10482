// crates/barbot-core/src/core/recipe.rs
// ============================================================================
// Module: Barbot Recipes
// Description: Recipe documents as read from the recipe store.
// Purpose: Describe drinks as ordered ingredient/amount pairs.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`Recipe`] is immutable once read. Amounts are volumes in the same unit
//! as pump flow rates (millilitres in every deployment so far).

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::RecipeId;

// ============================================================================
// SECTION: Recipe Types
// ============================================================================

/// One ingredient line of a recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeIngredient {
    /// Ingredient name, matched verbatim against pump slot assignments.
    pub ingredient: String,
    /// Volume to pour.
    pub amount: f64,
}

impl RecipeIngredient {
    /// Creates a new ingredient line.
    #[must_use]
    pub fn new(ingredient: impl Into<String>, amount: f64) -> Self {
        Self {
            ingredient: ingredient.into(),
            amount,
        }
    }
}

/// Cocktail recipe.
///
/// # Invariants
/// - `id` is unique within the store.
/// - Ingredient names are expected (not enforced) to be unique per recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    /// Stable recipe identifier.
    pub id: RecipeId,
    /// Display name.
    pub name: String,
    /// Ordered ingredient lines.
    #[serde(default)]
    pub ingredients: Vec<RecipeIngredient>,
}

impl Recipe {
    /// Creates a recipe.
    #[must_use]
    pub fn new(
        id: impl Into<RecipeId>,
        name: impl Into<String>,
        ingredients: Vec<RecipeIngredient>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ingredients,
        }
    }

    /// Returns the first ingredient line with the given name.
    #[must_use]
    pub fn find_ingredient(&self, name: &str) -> Option<&RecipeIngredient> {
        self.ingredients.iter().find(|line| line.ingredient == name)
    }
}
