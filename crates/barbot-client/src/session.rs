// crates/barbot-client/src/session.rs
// ============================================================================
// Module: Session Cache
// Description: Local JSON persistence of the controller's display state.
// Purpose: Paint the last known recipe list and selection before refresh.
// Dependencies: barbot-core, serde, serde_json
// ============================================================================

//! ## Overview
//! The cache is a JSON object with the keys `recipeOptions`,
//! `selectedRecipe`, and `config`. It is a display cache only: every value is
//! replaced by the next refresh from the server. Missing files and missing
//! keys load as neutral defaults; an unreadable or corrupt file loads as
//! defaults and is logged, never raised.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use barbot_core::PumpConfig;
use barbot_core::Recipe;
use barbot_core::RecipeId;
use serde::Deserialize;
use serde::Serialize;

use crate::error::ClientError;
use crate::log::ClientEvent;
use crate::log::ClientLog;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Largest cache file read back.
const MAX_SESSION_BYTES: u64 = 4 * 1024 * 1024;

// ============================================================================
// SECTION: Session State
// ============================================================================

/// Persisted controller state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionState {
    /// Recipes the server last reported as mixable.
    pub recipe_options: Vec<Recipe>,
    /// Current selection.
    pub selected_recipe: Option<RecipeId>,
    /// Last pump configuration snapshot.
    pub config: Option<PumpConfig>,
}

// ============================================================================
// SECTION: Cache
// ============================================================================

/// File-backed session cache.
#[derive(Clone)]
pub struct SessionCache {
    /// Cache file path.
    path: PathBuf,
    /// Event sink for resets and failed writes.
    log: Arc<dyn ClientLog>,
}

impl SessionCache {
    /// Creates a cache stored at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, log: Arc<dyn ClientLog>) -> Self {
        Self {
            path: path.into(),
            log,
        }
    }

    /// Returns the cache file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records `event` on the cache's event sink.
    pub fn log_event(&self, event: &ClientEvent) {
        self.log.record(event);
    }

    /// Loads the cached state, falling back to defaults.
    #[must_use]
    pub fn load(&self) -> SessionState {
        match self.try_load() {
            Ok(state) => state,
            Err(err) => {
                self.log.record(&ClientEvent::session_cache_reset(err.to_string()));
                SessionState::default()
            }
        }
    }

    /// Writes `state`, replacing the previous file.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Io`] when the file cannot be written.
    pub fn save(&self, state: &SessionState) -> Result<(), ClientError> {
        let bytes =
            serde_json::to_vec_pretty(state).map_err(|err| ClientError::Io(err.to_string()))?;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|err| ClientError::Io(err.to_string()))?;
        }
        let temp = self.path.with_extension("json.tmp");
        fs::write(&temp, bytes).map_err(|err| ClientError::Io(err.to_string()))?;
        fs::rename(&temp, &self.path).map_err(|err| ClientError::Io(err.to_string()))
    }

    /// Reads the file; a missing file is an empty state.
    fn try_load(&self) -> Result<SessionState, ClientError> {
        match fs::metadata(&self.path) {
            Ok(meta) if meta.len() > MAX_SESSION_BYTES => {
                return Err(ClientError::Io("session cache exceeds size limit".to_string()));
            }
            Ok(_) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(SessionState::default()),
            Err(err) => return Err(ClientError::Io(err.to_string())),
        }
        let bytes = fs::read(&self.path).map_err(|err| ClientError::Io(err.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|err| ClientError::Decode(err.to_string()))
    }
}

impl std::fmt::Debug for SessionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCache").field("path", &self.path).finish_non_exhaustive()
    }
}
