// crates/barbot-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Recipe Store
// Description: Durable RecipeStore backed by SQLite.
// Purpose: Persist recipes and the pump configuration as JSON documents.
// Dependencies: barbot-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! This module implements a durable [`RecipeStore`] using `SQLite`. Recipes
//! keep their insertion position so listings are stable. The pump
//! configuration lives in a single row keyed `default`. Loads check document
//! size and key/payload agreement and fail closed on mismatch.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use barbot_core::PumpConfig;
use barbot_core::Recipe;
use barbot_core::RecipeId;
use barbot_core::RecipeStore;
use barbot_core::StoreError;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;
use serde::Deserialize;
use thiserror::Error;

use crate::seed::SeedData;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Key of the singleton pump configuration row.
pub const DEFAULT_CONFIG_ID: &str = "default";
/// Maximum stored document size.
pub const MAX_DOCUMENT_BYTES: usize = 256 * 1024;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode.
    #[default]
    Wal,
    /// Delete journal mode.
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// Configuration for the `SQLite` recipe store.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
}

impl SqliteStoreConfig {
    /// Creates a configuration with default pragmas for `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Stored document does not match its key.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// Document exceeded the size limit.
    #[error("sqlite store document too large: {actual_bytes} bytes (max {max_bytes})")]
    TooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual document size in bytes.
        actual_bytes: usize,
    },
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::Corrupt(message) | SqliteStoreError::VersionMismatch(message) => {
                Self::Corrupt(message)
            }
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            SqliteStoreError::TooLarge {
                max_bytes,
                actual_bytes,
            } => Self::Invalid(format!(
                "document exceeds size limit: {actual_bytes} bytes (max {max_bytes})"
            )),
        }
    }
}

/// Maps an engine error into a store error.
#[allow(clippy::needless_pass_by_value, reason = "Used directly as a map_err callback.")]
fn db_error(err: rusqlite::Error) -> SqliteStoreError {
    SqliteStoreError::Db(err.to_string())
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Counts of documents written by [`SqliteRecipeStore::import`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportSummary {
    /// Recipes inserted or replaced.
    pub recipes: usize,
    /// Whether the pump configuration was replaced.
    pub config: bool,
}

/// `SQLite`-backed recipe store.
#[derive(Clone)]
pub struct SqliteRecipeStore {
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteRecipeStore {
    /// Opens an `SQLite`-backed recipe store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Inserts or replaces a recipe, keeping the position of an existing id.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the write fails.
    pub fn upsert_recipe(&self, recipe: &Recipe) -> Result<(), SqliteStoreError> {
        let doc = encode_document(recipe)?;
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO recipes (recipe_id, position, doc_json, updated_at)
                 VALUES (?1, (SELECT COALESCE(MAX(position), 0) + 1 FROM recipes), ?2, ?3)
                 ON CONFLICT(recipe_id) DO UPDATE SET
                    doc_json = excluded.doc_json,
                    updated_at = excluded.updated_at",
                params![recipe.id.as_str(), doc, unix_millis()],
            )
            .map_err(db_error)?;
        drop(guard);
        Ok(())
    }

    /// Deletes a recipe; returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the write fails.
    pub fn delete_recipe(&self, id: &RecipeId) -> Result<bool, SqliteStoreError> {
        let guard = self.lock()?;
        let removed = guard
            .execute("DELETE FROM recipes WHERE recipe_id = ?1", params![id.as_str()])
            .map_err(db_error)?;
        drop(guard);
        Ok(removed > 0)
    }

    /// Replaces the singleton pump configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the configuration is invalid or the
    /// write fails.
    pub fn save_config(&self, config: &PumpConfig) -> Result<(), SqliteStoreError> {
        config.validate().map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        let doc = encode_document(config)?;
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO pump_configs (config_id, doc_json, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(config_id) DO UPDATE SET
                    doc_json = excluded.doc_json,
                    updated_at = excluded.updated_at",
                params![DEFAULT_CONFIG_ID, doc, unix_millis()],
            )
            .map_err(db_error)?;
        drop(guard);
        Ok(())
    }

    /// Writes seed documents in a single transaction.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when any write fails; nothing is written
    /// in that case.
    pub fn import(&self, seed: &SeedData) -> Result<ImportSummary, SqliteStoreError> {
        let mut encoded = Vec::with_capacity(seed.recipes.len());
        for recipe in &seed.recipes {
            encoded.push((recipe.id.as_str(), encode_document(recipe)?));
        }
        let config_doc = match &seed.config {
            Some(config) => {
                config.validate().map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
                Some(encode_document(config)?)
            }
            None => None,
        };
        let saved_at = unix_millis();
        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(db_error)?;
        for (id, doc) in &encoded {
            tx.execute(
                "INSERT INTO recipes (recipe_id, position, doc_json, updated_at)
                 VALUES (?1, (SELECT COALESCE(MAX(position), 0) + 1 FROM recipes), ?2, ?3)
                 ON CONFLICT(recipe_id) DO UPDATE SET
                    doc_json = excluded.doc_json,
                    updated_at = excluded.updated_at",
                params![id, doc, saved_at],
            )
            .map_err(db_error)?;
        }
        if let Some(doc) = &config_doc {
            tx.execute(
                "INSERT INTO pump_configs (config_id, doc_json, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(config_id) DO UPDATE SET
                    doc_json = excluded.doc_json,
                    updated_at = excluded.updated_at",
                params![DEFAULT_CONFIG_ID, doc, saved_at],
            )
            .map_err(db_error)?;
        }
        tx.commit().map_err(db_error)?;
        drop(guard);
        Ok(ImportSummary {
            recipes: encoded.len(),
            config: config_doc.is_some(),
        })
    }

    /// Locks the shared connection.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection.lock().map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))
    }

    /// Reads every recipe in position order.
    fn read_recipes(&self) -> Result<Vec<Recipe>, SqliteStoreError> {
        let rows: Vec<(String, Vec<u8>)> = {
            let guard = self.lock()?;
            let mut statement = guard
                .prepare("SELECT recipe_id, doc_json FROM recipes ORDER BY position ASC")
                .map_err(db_error)?;
            let rows = statement
                .query_map(params![], |row| Ok((row.get(0)?, row.get(1)?)))
                .map_err(db_error)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(db_error)?;
            rows
        };
        rows.into_iter().map(|(id, bytes)| decode_recipe(&id, &bytes)).collect()
    }

    /// Reads a recipe by identifier.
    fn read_recipe(&self, id: &RecipeId) -> Result<Option<Recipe>, SqliteStoreError> {
        let bytes: Option<Vec<u8>> = {
            let guard = self.lock()?;
            guard
                .query_row(
                    "SELECT doc_json FROM recipes WHERE recipe_id = ?1",
                    params![id.as_str()],
                    |row| row.get(0),
                )
                .optional()
                .map_err(db_error)?
        };
        bytes.map(|bytes| decode_recipe(id.as_str(), &bytes)).transpose()
    }

    /// Reads the singleton pump configuration.
    fn read_config(&self) -> Result<Option<PumpConfig>, SqliteStoreError> {
        let bytes: Option<Vec<u8>> = {
            let guard = self.lock()?;
            guard
                .query_row(
                    "SELECT doc_json FROM pump_configs WHERE config_id = ?1",
                    params![DEFAULT_CONFIG_ID],
                    |row| row.get(0),
                )
                .optional()
                .map_err(db_error)?
        };
        let Some(bytes) = bytes else {
            return Ok(None);
        };
        check_size(bytes.len())?;
        let config: PumpConfig = serde_json::from_slice(&bytes)
            .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        Ok(Some(config))
    }
}

impl RecipeStore for SqliteRecipeStore {
    fn list_recipes(&self) -> Result<Vec<Recipe>, StoreError> {
        self.read_recipes().map_err(StoreError::from)
    }

    fn load_recipe(&self, id: &RecipeId) -> Result<Option<Recipe>, StoreError> {
        self.read_recipe(id).map_err(StoreError::from)
    }

    fn load_config(&self) -> Result<Option<PumpConfig>, StoreError> {
        self.read_config().map_err(StoreError::from)
    }
}

// ============================================================================
// SECTION: Documents
// ============================================================================

/// Serializes a document and enforces the size limit.
fn encode_document<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, SqliteStoreError> {
    let bytes =
        serde_json::to_vec(value).map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
    check_size(bytes.len())?;
    Ok(bytes)
}

/// Decodes a recipe row and checks it against its key.
fn decode_recipe(key: &str, bytes: &[u8]) -> Result<Recipe, SqliteStoreError> {
    check_size(bytes.len())?;
    let recipe: Recipe =
        serde_json::from_slice(bytes).map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
    if recipe.id.as_str() != key {
        return Err(SqliteStoreError::Corrupt(format!(
            "recipe id mismatch between key {key} and payload {}",
            recipe.id
        )));
    }
    Ok(recipe)
}

/// Rejects documents over [`MAX_DOCUMENT_BYTES`].
const fn check_size(actual_bytes: usize) -> Result<(), SqliteStoreError> {
    if actual_bytes > MAX_DOCUMENT_BYTES {
        return Err(SqliteStoreError::TooLarge {
            max_bytes: MAX_DOCUMENT_BYTES,
            actual_bytes,
        });
    }
    Ok(())
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Ensures the parent directory exists for the store path.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))?;
    }
    Ok(())
}

/// Validates the store path against length limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    let path_string = path.to_string_lossy();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with the configured pragmas.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags).map_err(db_error)?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(db_error)?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(db_error)?;
    Ok(connection)
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(db_error)?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(db_error)?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(db_error)?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(db_error)?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS recipes (
                    recipe_id TEXT PRIMARY KEY,
                    position INTEGER NOT NULL,
                    doc_json BLOB NOT NULL,
                    updated_at INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_recipes_position ON recipes (position);
                CREATE TABLE IF NOT EXISTS pump_configs (
                    config_id TEXT PRIMARY KEY,
                    doc_json BLOB NOT NULL,
                    updated_at INTEGER NOT NULL
                );",
            )
            .map_err(db_error)?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(db_error)?;
    Ok(())
}

/// Returns the current unix epoch in milliseconds.
fn unix_millis() -> i64 {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}
