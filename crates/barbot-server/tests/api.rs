// crates/barbot-server/tests/api.rs
// ============================================================================
// Module: API Route Tests
// Description: End-to-end tests for drinks, negotiate, mix, pump, and config.
// Purpose: Pin status codes, bodies, and audit records at the HTTP boundary.
// Dependencies: barbot-server, barbot-core, reqwest, tokio
// ============================================================================
//! ## Overview
//! Each test binds a server on `127.0.0.1:0` and drives it with `reqwest`.

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
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use axum::http::StatusCode;
use barbot_core::Channel;
use barbot_core::ErrorKind;
use barbot_core::InMemoryRecipeStore;
use barbot_core::SharedRecipeStore;
use barbot_server::status_for_kind;
use reqwest::Client;
use serde_json::Value;
use serde_json::json;

use crate::common::EMBEDDED;
use crate::common::gin_store;
use crate::common::spawn;

// ============================================================================
// SECTION: Status Mapping
// ============================================================================

/// Tests caller failures map to 400 and deployment failures to 500.
#[test]
fn error_kinds_map_to_status_codes() {
    assert_eq!(status_for_kind(ErrorKind::Validation), StatusCode::BAD_REQUEST);
    assert_eq!(status_for_kind(ErrorKind::NotFound), StatusCode::BAD_REQUEST);
    assert_eq!(status_for_kind(ErrorKind::Dependency), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(status_for_kind(ErrorKind::Configuration), StatusCode::INTERNAL_SERVER_ERROR);
}

// ============================================================================
// SECTION: Drinks and Config
// ============================================================================

/// Tests the drinks list only includes recipes the pumps can make.
#[tokio::test]
async fn drinks_lists_mixable_recipes() {
    let server = spawn(EMBEDDED, gin_store()).await;
    let response = reqwest::get(server.url("/api/drinks")).await.unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    let ids: Vec<&str> = body.as_array().unwrap().iter().map(|r| r["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["gin_shot", "flood"]);
}

/// Tests a store without configuration fails the drinks list with 500.
#[tokio::test]
async fn drinks_without_config_is_server_error() {
    let server = spawn(EMBEDDED, SharedRecipeStore::from_store(InMemoryRecipeStore::new())).await;
    let response = reqwest::get(server.url("/api/drinks")).await.unwrap();
    assert_eq!(response.status(), 500);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Failed to fetch data from the recipe store");
    let requests = server.audit.events("request");
    assert_eq!(requests.last().unwrap()["error_kind"], "dependency");
}

/// Tests the config snapshot endpoint returns the stored configuration.
#[tokio::test]
async fn config_endpoint_returns_snapshot() {
    let server = spawn(EMBEDDED, gin_store()).await;
    let body: Value =
        reqwest::get(server.url("/api/config")).await.unwrap().json().await.unwrap();
    assert_eq!(body["ingredients"]["0"], "gin");
    assert_eq!(body["pump_configs"]["0"]["flow_rate"], 20.0);

    let empty = spawn(EMBEDDED, SharedRecipeStore::from_store(InMemoryRecipeStore::new())).await;
    let response = reqwest::get(empty.url("/api/config")).await.unwrap();
    assert_eq!(response.status(), 400);
}

// ============================================================================
// SECTION: Mix
// ============================================================================

/// Tests mixing publishes the compiled durations on the job channel.
#[tokio::test]
async fn mix_publishes_compiled_job() {
    let server = spawn(EMBEDDED, gin_store()).await;
    let mut jobs = server.hub.as_ref().unwrap().subscribe(Channel::Job);

    let response = Client::new()
        .post(server.url("/api/mix"))
        .json(&json!({"recipeId": "gin_shot"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["recipeId"], "gin_shot");
    assert_eq!(body["subscribers"], 1);

    let published: Value = serde_json::from_str(&jobs.recv().await.unwrap()).unwrap();
    assert_eq!(published, json!({"durations": [3500.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]}));

    let jobs = server.audit.events("job_published");
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0]["origin"], "mix");
    assert_eq!(jobs[0]["recipe_id"], "gin_shot");
}

/// Tests malformed mix bodies are validation failures.
#[tokio::test]
async fn mix_rejects_malformed_requests() {
    let server = spawn(EMBEDDED, gin_store()).await;
    let client = Client::new();
    for body in ["", "{not json", "{}", r#"{"recipeId": ""}"#, r#"{"recipeId": 7}"#] {
        let response = client.post(server.url("/api/mix")).body(body).send().await.unwrap();
        assert_eq!(response.status(), 400, "body {body}");
        let payload: Value = response.json().await.unwrap();
        assert!(payload["message"].is_string());
    }
    assert!(server.audit.events("job_published").is_empty());
}

/// Tests an unknown recipe is a not-found failure.
#[tokio::test]
async fn mix_unknown_recipe_is_bad_request() {
    let server = spawn(EMBEDDED, gin_store()).await;
    let response = Client::new()
        .post(server.url("/api/mix"))
        .json(&json!({"recipeId": "deleted_recipe"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Recipe not found in database");
}

/// Tests a recipe compiling past the duration ceiling is a server error.
#[tokio::test]
async fn mix_over_ceiling_is_server_error() {
    let server = spawn(EMBEDDED, gin_store()).await;
    let response = Client::new()
        .post(server.url("/api/mix"))
        .json(&json!({"recipeId": "flood"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 500);
}

/// Tests mixing without a configured transport fails loudly.
#[tokio::test]
async fn mix_without_transport_is_configuration_error() {
    let server = spawn("", gin_store()).await;
    let response = Client::new()
        .post(server.url("/api/mix"))
        .json(&json!({"recipeId": "gin_shot"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 500);
    let requests = server.audit.events("request");
    assert_eq!(requests.last().unwrap()["error_kind"], "configuration");
    assert!(!server.audit.events("security").is_empty());
}

// ============================================================================
// SECTION: Manual Actuation
// ============================================================================

/// Tests manual durations are published as given on both routes.
#[tokio::test]
async fn pump_publishes_manual_durations() {
    let server = spawn(EMBEDDED, gin_store()).await;
    let mut jobs = server.hub.as_ref().unwrap().subscribe(Channel::Job);
    let durations = json!([0.0, 0.0, 2000.0, 0.0, 0.0, 0.0, 0.0]);
    for route in ["/api/pump", "/api/job"] {
        let response = Client::new()
            .post(server.url(route))
            .json(&json!({"durations": durations}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        let published: Value = serde_json::from_str(&jobs.recv().await.unwrap()).unwrap();
        assert_eq!(published["durations"], durations);
    }
    let jobs = server.audit.events("job_published");
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0]["origin"], "manual");
}

/// Tests invalid manual durations are validation failures.
#[tokio::test]
async fn pump_rejects_invalid_durations() {
    let server = spawn(EMBEDDED, gin_store()).await;
    let client = Client::new();
    let bodies = [
        json!({}),
        json!({"durations": [1.0, 2.0]}),
        json!({"durations": [0.0, -1.0, 0.0, 0.0, 0.0, 0.0, 0.0]}),
        json!({"durations": [40_000.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]}),
        json!({"durations": "fast"}),
    ];
    for body in bodies {
        let response = client.post(server.url("/api/pump")).json(&body).send().await.unwrap();
        assert_eq!(response.status(), 400, "body {body}");
    }
}

/// Tests bodies over the configured limit are refused.
#[tokio::test]
async fn pump_rejects_oversized_body() {
    let server = spawn(EMBEDDED, gin_store()).await;
    let huge = "x".repeat(128 * 1024);
    let response =
        Client::new().post(server.url("/api/pump")).body(huge).send().await.unwrap();
    assert_eq!(response.status(), 413);
}

// ============================================================================
// SECTION: Negotiate
// ============================================================================

/// Tests negotiation returns a status channel URL for the caller.
#[tokio::test]
async fn negotiate_returns_connection_url() {
    let server = spawn(EMBEDDED, gin_store()).await;
    let response = Client::new()
        .get(server.url("/api/negotiate"))
        .header("x-ms-client-principal-name", "guest@example.com")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let text = response.text().await.unwrap();
    let url = url::Url::parse(&text).unwrap();
    assert_eq!(url.scheme(), "ws");
    assert_eq!(url.path(), "/client/hubs/status");
    assert!(url.query_pairs().any(|(key, _)| key == "access_token"));

    let grants = server.audit.events("negotiate");
    assert_eq!(grants[0]["caller"], "guest@example.com");
    assert_eq!(grants[0]["channel"], "status");
}

/// Tests negotiation without a transport is a 500.
#[tokio::test]
async fn negotiate_without_transport_is_server_error() {
    let server = spawn("", gin_store()).await;
    let response = Client::new().post(server.url("/api/negotiate")).send().await.unwrap();
    assert_eq!(response.status(), 500);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "pubsub transport is not configured");
}
