// crates/barbot-core/src/runtime/filter.rs
// ============================================================================
// Module: Barbot Availability Filter
// Description: Hides recipes the current bar cannot make.
// Purpose: Build the recipe list shown to users.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! A recipe is available when every one of its ingredient names is loaded in
//! some pump slot. Filtering is presentational only: the compiler never
//! consults it and still handles filtered-out recipes (unloaded ingredients
//! simply get no pump time).

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::PumpConfig;
use crate::core::Recipe;
use crate::interfaces::RecipeStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Filter
// ============================================================================

/// Returns true when every ingredient of `recipe` is loaded on the rig.
#[must_use]
pub fn is_mixable(config: &PumpConfig, recipe: &Recipe) -> bool {
    let available = config.available_ingredients();
    recipe.ingredients.iter().all(|line| available.contains(line.ingredient.as_str()))
}

/// Returns the available recipes in their original order.
#[must_use]
pub fn filter_available(config: &PumpConfig, recipes: &[Recipe]) -> Vec<Recipe> {
    let available = config.available_ingredients();
    recipes
        .iter()
        .filter(|recipe| {
            recipe.ingredients.iter().all(|line| available.contains(line.ingredient.as_str()))
        })
        .cloned()
        .collect()
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Errors raised while building the available recipe list.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Store read failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// No pump configuration is stored.
    #[error("pump configuration not found")]
    MissingConfig,
}

/// Reads recipes and configuration from `store` and applies the filter.
///
/// # Errors
///
/// Returns [`CatalogError`] when the store fails or holds no configuration.
pub fn available_recipes(store: &dyn RecipeStore) -> Result<Vec<Recipe>, CatalogError> {
    let recipes = store.list_recipes()?;
    let config = store.load_config()?.ok_or(CatalogError::MissingConfig)?;
    Ok(filter_available(&config, &recipes))
}
