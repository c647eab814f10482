// crates/barbot-core/tests/filter.rs
// ============================================================================
// Module: Availability Filter Tests
// Description: Coverage for recipe availability filtering and the catalog.
// Purpose: Ensure users only see recipes the bar can make.
// ============================================================================

//! Availability filter tests.

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

use barbot_core::CatalogError;
use barbot_core::InMemoryRecipeStore;
use barbot_core::PumpConfig;
use barbot_core::Recipe;
use barbot_core::RecipeIngredient;
use barbot_core::available_recipes;
use barbot_core::filter_available;
use barbot_core::is_mixable;

fn bar() -> PumpConfig {
    PumpConfig::new().with_slot(0, "gin", 20.0, 0.0).with_slot(1, "tonic", 40.0, 0.0)
}

fn recipe(id: &str, names: &[&str]) -> Recipe {
    Recipe::new(id, id, names.iter().map(|name| RecipeIngredient::new(*name, 10.0)).collect())
}

/// Tests recipes with unloaded ingredients are hidden and order is kept.
#[test]
fn filter_hides_unmakeable_and_preserves_order() {
    let recipes = vec![
        recipe("gt", &["gin", "tonic"]),
        recipe("negroni", &["gin", "campari", "vermouth"]),
        recipe("neat", &["gin"]),
    ];
    let ids: Vec<String> =
        filter_available(&bar(), &recipes).into_iter().map(|r| r.id.to_string()).collect();
    assert_eq!(ids, vec!["gt".to_string(), "neat".to_string()]);
}

/// Tests filtering an empty recipe list yields an empty list.
#[test]
fn filter_empty_list_is_empty() {
    assert!(filter_available(&bar(), &[]).is_empty());
}

/// Tests filtering an already filtered list changes nothing.
#[test]
fn filter_twice_matches_once() {
    let recipes = vec![recipe("gt", &["gin", "tonic"]), recipe("mule", &["vodka", "ginger beer"])];
    let once = filter_available(&bar(), &recipes);
    assert_eq!(filter_available(&bar(), &once), once);
}

/// Tests a recipe with no ingredients is always available.
#[test]
fn filter_keeps_empty_recipe() {
    assert!(is_mixable(&PumpConfig::new(), &recipe("water", &[])));
}

/// Tests empty slot names do not make an empty-named ingredient available.
#[test]
fn filter_ignores_empty_slot_names() {
    let mut config = bar();
    config.ingredients.insert(2, Some(String::new()));
    assert!(!is_mixable(&config, &recipe("odd", &[""])));
}

/// Tests ingredient names match case-sensitively.
#[test]
fn filter_is_case_sensitive() {
    assert!(!is_mixable(&bar(), &recipe("loud", &["GIN"])));
}

/// Tests the catalog reads the store and applies the filter.
#[test]
fn catalog_filters_store_contents() {
    let store = InMemoryRecipeStore::with_data(
        Some(bar()),
        vec![recipe("gt", &["gin", "tonic"]), recipe("mojito", &["rum", "mint"])],
    )
    .unwrap();
    let recipes = available_recipes(&store).unwrap();
    assert_eq!(recipes.len(), 1);
    assert_eq!(recipes[0].id.as_str(), "gt");
}

/// Tests the catalog reports a missing configuration.
#[test]
fn catalog_requires_config() {
    let store = InMemoryRecipeStore::with_data(None, vec![recipe("gt", &["gin"])]).unwrap();
    assert!(matches!(available_recipes(&store), Err(CatalogError::MissingConfig)));
}
