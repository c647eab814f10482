// crates/barbot-core/src/runtime/store.rs
// ============================================================================
// Module: Barbot In-Memory Store
// Description: In-memory recipe store and shared store wrapper.
// Purpose: Provide a default store for tests and local runs.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! [`InMemoryRecipeStore`] keeps recipes in insertion order plus at most one
//! pump configuration. [`SharedRecipeStore`] wraps any store behind an `Arc`
//! so handlers and dispatchers can hold it cheaply.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;

use crate::core::PumpConfig;
use crate::core::Recipe;
use crate::core::RecipeId;
use crate::interfaces::RecipeStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// Mutable contents of the in-memory store.
#[derive(Debug, Default)]
struct MemoryState {
    /// Recipes in insertion order; identifiers are unique.
    recipes: Vec<Recipe>,
    /// Singleton pump configuration.
    config: Option<PumpConfig>,
}

/// In-memory recipe store.
///
/// # Invariants
/// - Recipe identifiers are unique; inserting an existing id replaces it in
///   place.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRecipeStore {
    /// Shared state.
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryRecipeStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `config` and `recipes`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store lock is poisoned.
    pub fn with_data(
        config: Option<PumpConfig>,
        recipes: impl IntoIterator<Item = Recipe>,
    ) -> Result<Self, StoreError> {
        let store = Self::new();
        if let Some(config) = config {
            store.set_config(config)?;
        }
        for recipe in recipes {
            store.insert_recipe(recipe)?;
        }
        Ok(store)
    }

    /// Inserts or replaces a recipe.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store lock is poisoned.
    pub fn insert_recipe(&self, recipe: Recipe) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        if let Some(existing) = guard.recipes.iter_mut().find(|item| item.id == recipe.id) {
            *existing = recipe;
        } else {
            guard.recipes.push(recipe);
        }
        drop(guard);
        Ok(())
    }

    /// Replaces the pump configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store lock is poisoned.
    pub fn set_config(&self, config: PumpConfig) -> Result<(), StoreError> {
        self.lock()?.config = Some(config);
        Ok(())
    }

    /// Locks the shared state.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>, StoreError> {
        self.state.lock().map_err(|_| StoreError::Store("recipe store mutex poisoned".to_string()))
    }
}

impl RecipeStore for InMemoryRecipeStore {
    fn list_recipes(&self) -> Result<Vec<Recipe>, StoreError> {
        Ok(self.lock()?.recipes.clone())
    }

    fn load_recipe(&self, id: &RecipeId) -> Result<Option<Recipe>, StoreError> {
        Ok(self.lock()?.recipes.iter().find(|recipe| &recipe.id == id).cloned())
    }

    fn load_config(&self) -> Result<Option<PumpConfig>, StoreError> {
        Ok(self.lock()?.config.clone())
    }
}

// ============================================================================
// SECTION: Shared Store
// ============================================================================

/// Shared recipe store wrapper.
#[derive(Clone)]
pub struct SharedRecipeStore {
    /// Inner store implementation.
    inner: Arc<dyn RecipeStore + Send + Sync>,
}

impl SharedRecipeStore {
    /// Wraps a recipe store in a shared, thread-safe wrapper.
    #[must_use]
    pub fn from_store(store: impl RecipeStore + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }

    /// Wraps an existing shared store.
    #[must_use]
    pub const fn new(store: Arc<dyn RecipeStore + Send + Sync>) -> Self {
        Self {
            inner: store,
        }
    }

    /// Returns the wrapped store.
    #[must_use]
    pub fn as_store(&self) -> &(dyn RecipeStore + Send + Sync) {
        self.inner.as_ref()
    }
}

impl std::fmt::Debug for SharedRecipeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedRecipeStore").finish_non_exhaustive()
    }
}

impl RecipeStore for SharedRecipeStore {
    fn list_recipes(&self) -> Result<Vec<Recipe>, StoreError> {
        self.inner.list_recipes()
    }

    fn load_recipe(&self, id: &RecipeId) -> Result<Option<Recipe>, StoreError> {
        self.inner.load_recipe(id)
    }

    fn load_config(&self) -> Result<Option<PumpConfig>, StoreError> {
        self.inner.load_config()
    }
}
