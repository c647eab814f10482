// crates/barbot-store-sqlite/tests/sqlite_store.rs
// ============================================================================
// Module: SQLite Store Tests
// Description: Validate SQLite RecipeStore behavior and seed import.
// Purpose: Ensure durable persistence and integrity checks.
// Dependencies: barbot-store-sqlite, barbot-core, rusqlite, tempfile
// ============================================================================

//! ## Overview
//! Conformance tests for the SQLite-backed recipe store. Exercises ordering,
//! persistence across reopen, integrity checks on tampered rows, and seed
//! directory import.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;

use barbot_core::PumpConfig;
use barbot_core::Recipe;
use barbot_core::RecipeId;
use barbot_core::RecipeIngredient;
use barbot_core::RecipeStore;
use barbot_core::StoreError;
use barbot_core::available_recipes;
use barbot_store_sqlite::SeedError;
use barbot_store_sqlite::SqliteRecipeStore;
use barbot_store_sqlite::SqliteStoreConfig;
use barbot_store_sqlite::load_seed_dir;
use rusqlite::Connection;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn open(dir: &TempDir) -> SqliteRecipeStore {
    SqliteRecipeStore::new(&SqliteStoreConfig::new(dir.path().join("barbot.db"))).unwrap()
}

fn recipe(id: &str, names: &[(&str, f64)]) -> Recipe {
    Recipe::new(
        id,
        id.replace('_', " "),
        names.iter().map(|(name, amount)| RecipeIngredient::new(*name, *amount)).collect(),
    )
}

fn write(dir: &Path, name: &str, body: &str) {
    fs::write(dir.join(name), body).unwrap();
}

// ============================================================================
// SECTION: Store Tests
// ============================================================================

/// Tests an empty store reports no recipes and no configuration.
#[test]
fn sqlite_store_starts_empty() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    assert!(store.list_recipes().unwrap().is_empty());
    assert!(store.load_config().unwrap().is_none());
    assert!(store.load_recipe(&RecipeId::new("gin_tonic")).unwrap().is_none());
}

/// Tests recipes list in insertion order and upserts keep their position.
#[test]
fn sqlite_store_preserves_insertion_order() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    store.upsert_recipe(&recipe("negroni", &[("gin", 30.0)])).unwrap();
    store.upsert_recipe(&recipe("gin_tonic", &[("gin", 50.0)])).unwrap();
    store.upsert_recipe(&recipe("negroni", &[("gin", 35.0)])).unwrap();
    let recipes = store.list_recipes().unwrap();
    let ids: Vec<&str> = recipes.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["negroni", "gin_tonic"]);
    assert_eq!(recipes[0].ingredients[0].amount, 35.0);
}

/// Tests data survives reopening the database.
#[test]
fn sqlite_store_persists_across_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let store = open(&dir);
        store.upsert_recipe(&recipe("gin_tonic", &[("gin", 50.0)])).unwrap();
        store.save_config(&PumpConfig::new().with_slot(0, "gin", 20.0, 500.0)).unwrap();
    }
    let store = open(&dir);
    assert!(store.load_recipe(&RecipeId::new("gin_tonic")).unwrap().is_some());
    assert_eq!(store.load_config().unwrap().unwrap().ingredient_at(0), Some("gin"));
    assert_eq!(available_recipes(&store).unwrap().len(), 1);
}

/// Tests deleting a recipe reports whether it existed.
#[test]
fn sqlite_store_delete_recipe() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    store.upsert_recipe(&recipe("gin_tonic", &[])).unwrap();
    assert!(store.delete_recipe(&RecipeId::new("gin_tonic")).unwrap());
    assert!(!store.delete_recipe(&RecipeId::new("gin_tonic")).unwrap());
}

/// Tests invalid pump configurations are refused on write.
#[test]
fn sqlite_store_rejects_invalid_config() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    assert!(store.save_config(&PumpConfig::new().with_slot(0, "gin", -1.0, 0.0)).is_err());
}

/// Tests a row whose payload id disagrees with its key is reported corrupt.
#[test]
fn sqlite_store_detects_key_mismatch() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    store.upsert_recipe(&recipe("gin_tonic", &[])).unwrap();
    let connection = Connection::open(dir.path().join("barbot.db")).unwrap();
    connection
        .execute(
            "UPDATE recipes SET doc_json = ?1 WHERE recipe_id = 'gin_tonic'",
            [br#"{"id":"other","name":"x","ingredients":[]}"#.to_vec()],
        )
        .unwrap();
    let err = store.load_recipe(&RecipeId::new("gin_tonic")).unwrap_err();
    assert!(matches!(err, StoreError::Corrupt(_)));
}

/// Tests an unknown schema version fails closed.
#[test]
fn sqlite_store_rejects_unknown_schema_version() {
    let dir = TempDir::new().unwrap();
    drop(open(&dir));
    let connection = Connection::open(dir.path().join("barbot.db")).unwrap();
    connection.execute("UPDATE store_meta SET version = 99", []).unwrap();
    drop(connection);
    assert!(SqliteRecipeStore::new(&SqliteStoreConfig::new(dir.path().join("barbot.db"))).is_err());
}

// ============================================================================
// SECTION: Seed Tests
// ============================================================================

/// Tests a seed directory imports recipes in file order plus the config.
#[test]
fn seed_import_round_trip() {
    let seed_dir = TempDir::new().unwrap();
    write(
        seed_dir.path(),
        "b_gin_tonic.json",
        r#"{"id":"gin_tonic","name":"Gin Tonic","ingredients":[{"ingredient":"gin","amount":50}]}"#,
    );
    write(
        seed_dir.path(),
        "a_negroni.json",
        r#"{"id":"negroni","name":"Negroni","ingredients":[{"ingredient":"gin","amount":30}]}"#,
    );
    write(
        seed_dir.path(),
        "config.json",
        r#"{"id":"default","ingredients":{"0":"gin"},"pump_configs":{"0":{"flow_rate":20,"time_offset":500}}}"#,
    );
    write(seed_dir.path(), "notes.txt", "ignored");

    let seed = load_seed_dir(seed_dir.path()).unwrap();
    assert_eq!(seed.recipes.len(), 2);
    assert_eq!(seed.recipes[0].id.as_str(), "negroni");

    let db_dir = TempDir::new().unwrap();
    let store = open(&db_dir);
    let summary = store.import(&seed).unwrap();
    assert_eq!(summary.recipes, 2);
    assert!(summary.config);
    assert_eq!(store.list_recipes().unwrap(), seed.recipes);
    assert_eq!(store.load_config().unwrap(), seed.config);
}

/// Tests duplicate recipe ids across seed files are rejected.
#[test]
fn seed_rejects_duplicate_ids() {
    let seed_dir = TempDir::new().unwrap();
    write(seed_dir.path(), "a.json", r#"{"id":"gin_tonic","name":"A"}"#);
    write(seed_dir.path(), "b.json", r#"{"id":"gin_tonic","name":"B"}"#);
    assert!(matches!(load_seed_dir(seed_dir.path()), Err(SeedError::Invalid { .. })));
}

/// Tests malformed seed documents name the offending file.
#[test]
fn seed_reports_malformed_document() {
    let seed_dir = TempDir::new().unwrap();
    write(seed_dir.path(), "broken.json", "{not json");
    let err = load_seed_dir(seed_dir.path()).unwrap_err();
    assert!(err.to_string().contains("broken.json"));
}

/// Tests a missing seed directory is an I/O error.
#[test]
fn seed_missing_dir_is_io_error() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(load_seed_dir(&dir.path().join("absent")), Err(SeedError::Io { .. })));
}
