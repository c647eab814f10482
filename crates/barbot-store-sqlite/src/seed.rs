// crates/barbot-store-sqlite/src/seed.rs
// ============================================================================
// Module: Seed Directory Loader
// Description: Reads recipe and pump configuration documents from disk.
// Purpose: Populate stores from a directory of JSON files.
// Dependencies: barbot-core, serde_json
// ============================================================================

//! ## Overview
//! A seed directory holds one recipe per `*.json` file plus an optional
//! `config.json` with the pump configuration. Files are read in name order so
//! imports are deterministic. Every document is size-limited and validated
//! before it is returned.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use barbot_core::PumpConfig;
use barbot_core::Recipe;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// File name of the pump configuration document.
pub const CONFIG_FILE_NAME: &str = "config.json";
/// Maximum size of a single seed document.
pub const MAX_SEED_FILE_BYTES: u64 = 256 * 1024;
/// Maximum number of documents in a seed directory.
pub const MAX_SEED_FILES: usize = 4096;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Seed loading errors.
#[derive(Debug, Error)]
pub enum SeedError {
    /// File system error.
    #[error("seed io error at {path}: {message}")]
    Io {
        /// Offending path.
        path: PathBuf,
        /// Error text.
        message: String,
    },
    /// A document failed to parse or validate.
    #[error("invalid seed document {path}: {message}")]
    Invalid {
        /// Offending path.
        path: PathBuf,
        /// Error text.
        message: String,
    },
}

/// Documents read from a seed directory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeedData {
    /// Pump configuration, when `config.json` is present.
    pub config: Option<PumpConfig>,
    /// Recipes in file name order.
    pub recipes: Vec<Recipe>,
}

// ============================================================================
// SECTION: Loader
// ============================================================================

/// Loads every seed document in `dir`.
///
/// # Errors
///
/// Returns [`SeedError`] when the directory cannot be read, a document is
/// oversized or malformed, or two recipes share an id.
pub fn load_seed_dir(dir: &Path) -> Result<SeedData, SeedError> {
    let io_error = |path: &Path, err: std::io::Error| SeedError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    };
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(|err| io_error(dir, err))? {
        let path = entry.map_err(|err| io_error(dir, err))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }
    if paths.len() > MAX_SEED_FILES {
        return Err(SeedError::Invalid {
            path: dir.to_path_buf(),
            message: format!("more than {MAX_SEED_FILES} documents"),
        });
    }
    paths.sort();

    let mut seed = SeedData::default();
    let mut seen = BTreeSet::new();
    for path in paths {
        let bytes = read_limited(&path)?;
        let invalid = |message: String| SeedError::Invalid {
            path: path.clone(),
            message,
        };
        if path.file_name().is_some_and(|name| name == CONFIG_FILE_NAME) {
            let config: PumpConfig =
                serde_json::from_slice(&bytes).map_err(|err| invalid(err.to_string()))?;
            config.validate().map_err(|err| invalid(err.to_string()))?;
            seed.config = Some(config);
            continue;
        }
        let recipe: Recipe =
            serde_json::from_slice(&bytes).map_err(|err| invalid(err.to_string()))?;
        if recipe.id.is_blank() {
            return Err(invalid("recipe id must be non-empty".to_string()));
        }
        if !seen.insert(recipe.id.clone()) {
            return Err(invalid(format!("duplicate recipe id {}", recipe.id)));
        }
        seed.recipes.push(recipe);
    }
    Ok(seed)
}

/// Reads a file after checking its size.
fn read_limited(path: &Path) -> Result<Vec<u8>, SeedError> {
    let metadata = fs::metadata(path).map_err(|err| SeedError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    if metadata.len() > MAX_SEED_FILE_BYTES {
        return Err(SeedError::Invalid {
            path: path.to_path_buf(),
            message: format!("document exceeds {MAX_SEED_FILE_BYTES} bytes"),
        });
    }
    fs::read(path).map_err(|err| SeedError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}
