// crates/barbot-client/src/controller.rs
// ============================================================================
// Module: Drink Controller
// Description: Recipe list, selection, and mix orchestration for a display.
// Purpose: Hold UI state and call the server on refresh and confirm.
// Dependencies: barbot-core, tokio
// ============================================================================

//! ## Overview
//! [`DrinkController`] owns the display session. Server data is
//! authoritative: the cache only paints the first frame, and every
//! [`DrinkController::refresh`] replaces it. Liveness comes from a
//! [`LivenessState`] watch receiver and is read, never written.
//!
//! `confirm` is not gated on liveness; [`DrinkController::can_mix`] is the
//! display hint for whether the button should be enabled.

// ============================================================================
// SECTION: Imports
// ============================================================================

use barbot_core::PumpConfig;
use barbot_core::Recipe;
use barbot_core::RecipeId;
use tokio::sync::watch;

use crate::api::BarbotApi;
use crate::api::JobConfirmation;
use crate::error::ControllerError;
use crate::liveness::LivenessState;
use crate::log::ClientEvent;
use crate::session::SessionCache;
use crate::session::SessionState;

// ============================================================================
// SECTION: Controller
// ============================================================================

/// Drink-selection controller.
pub struct DrinkController<A: BarbotApi> {
    /// Server API.
    api: A,
    /// Current display session.
    session: SessionState,
    /// Optional local persistence.
    cache: Option<SessionCache>,
    /// Liveness observer.
    liveness: watch::Receiver<LivenessState>,
}

impl<A: BarbotApi> DrinkController<A> {
    /// Creates a controller, rehydrating from `cache` when given.
    pub fn new(
        api: A,
        cache: Option<SessionCache>,
        liveness: watch::Receiver<LivenessState>,
    ) -> Self {
        let session = cache.as_ref().map(SessionCache::load).unwrap_or_default();
        Self {
            api,
            session,
            cache,
            liveness,
        }
    }

    /// Returns the API client.
    pub const fn api(&self) -> &A {
        &self.api
    }

    /// Returns the recipes currently offered.
    #[must_use]
    pub fn recipe_options(&self) -> &[Recipe] {
        &self.session.recipe_options
    }

    /// Returns the current selection.
    #[must_use]
    pub const fn selected(&self) -> Option<&RecipeId> {
        self.session.selected_recipe.as_ref()
    }

    /// Returns the last pump configuration snapshot.
    #[must_use]
    pub const fn pump_config(&self) -> Option<&PumpConfig> {
        self.session.config.as_ref()
    }

    /// Returns the current liveness facets.
    #[must_use]
    pub fn liveness(&self) -> LivenessState {
        *self.liveness.borrow()
    }

    /// Returns true when a drink is selected and the rig is online and idle.
    #[must_use]
    pub fn can_mix(&self) -> bool {
        let liveness = self.liveness();
        self.session.selected_recipe.is_some() && liveness.online && !liveness.busy
    }

    /// Reloads recipes and the configuration snapshot from the server.
    ///
    /// A selection that is no longer offered is cleared.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Client`] when a server call fails; the
    /// session is left unchanged.
    pub async fn refresh(&mut self) -> Result<(), ControllerError> {
        let recipes = self.api.drinks().await?;
        let config = self.api.pump_config().await?;
        let still_offered = self
            .session
            .selected_recipe
            .as_ref()
            .is_some_and(|id| recipes.iter().any(|recipe| &recipe.id == id));
        if !still_offered {
            self.session.selected_recipe = None;
        }
        self.session.recipe_options = recipes;
        self.session.config = Some(config);
        self.persist();
        Ok(())
    }

    /// Toggles the selection of `id`.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::UnknownRecipe`] when `id` is not offered.
    pub fn select(&mut self, id: &RecipeId) -> Result<Option<&RecipeId>, ControllerError> {
        if self.session.selected_recipe.as_ref() == Some(id) {
            self.session.selected_recipe = None;
        } else if self.session.recipe_options.iter().any(|recipe| &recipe.id == id) {
            self.session.selected_recipe = Some(id.clone());
        } else {
            return Err(ControllerError::UnknownRecipe(id.clone()));
        }
        self.persist();
        Ok(self.session.selected_recipe.as_ref())
    }

    /// Requests a mix of the selection and clears it on success.
    ///
    /// Returns `Ok(None)` without calling the server when nothing is selected.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Client`] when the request fails; the
    /// selection is kept.
    pub async fn confirm(&mut self) -> Result<Option<JobConfirmation>, ControllerError> {
        let Some(recipe_id) = self.session.selected_recipe.clone() else {
            return Ok(None);
        };
        let confirmation = self.api.mix(&recipe_id).await?;
        self.session.selected_recipe = None;
        self.persist();
        Ok(Some(confirmation))
    }

    /// Writes the session to the cache, logging failures.
    fn persist(&self) {
        if let Some(cache) = &self.cache
            && let Err(err) = cache.save(&self.session)
        {
            cache.log_event(&ClientEvent::session_save_failed(err.to_string()));
        }
    }
}
