// crates/barbot-server/tests/hub.rs
// ============================================================================
// Module: Embedded Hub Tests
// Description: Tests for the websocket, send, and token hub endpoints.
// Purpose: Ensure the embedded transport fans out and enforces credentials.
// Dependencies: barbot-server, async-tungstenite, futures, reqwest, tokio
// ============================================================================
//! ## Overview
//! Exercises the hub surface the pump controller and display clients use.

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

use std::time::Duration;

use async_tungstenite::tokio::connect_async;
use async_tungstenite::tungstenite::Message;
use barbot_core::Channel;
use futures::StreamExt;
use reqwest::Client;
use serde_json::Value;
use serde_json::json;

use crate::common::EMBEDDED;
use crate::common::gin_store;
use crate::common::spawn;

// ============================================================================
// SECTION: Send
// ============================================================================

/// Tests the send endpoint requires the bearer access key.
#[tokio::test]
async fn send_requires_access_key() {
    let server = spawn(EMBEDDED, gin_store()).await;
    let client = Client::new();
    let message = json!({"timestamp": 1_700_000_000_000_i64, "remainingJobTime": 0});

    let missing =
        client.post(server.url("/api/hubs/status/send")).json(&message).send().await.unwrap();
    assert_eq!(missing.status(), 401);
    let wrong = client
        .post(server.url("/api/hubs/status/send"))
        .bearer_auth("nope")
        .json(&message)
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status(), 401);
}

/// Tests sent status heartbeats reach subscribers and malformed ones do not.
#[tokio::test]
async fn send_fans_out_valid_status() {
    let server = spawn(EMBEDDED, gin_store()).await;
    let mut status = server.hub.as_ref().unwrap().subscribe(Channel::Status);
    let client = Client::new();

    let message = json!({"timestamp": "2024-05-01T20:15:00.123+02:00", "remainingJobTime": 4.5});
    let response = client
        .post(server.url("/api/hubs/status/send"))
        .bearer_auth("hub-key")
        .json(&message)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let receipt: Value = response.json().await.unwrap();
    assert_eq!(receipt["subscribers"], 1);
    let delivered: Value = serde_json::from_str(&status.recv().await.unwrap()).unwrap();
    assert_eq!(delivered, message);

    let malformed = client
        .post(server.url("/api/hubs/status/send"))
        .bearer_auth("hub-key")
        .json(&json!({"remainingJobTime": 1}))
        .send()
        .await
        .unwrap();
    assert_eq!(malformed.status(), 400);
    assert!(status.try_recv().is_err());
}

/// Tests job sends must carry a full, valid duration vector.
#[tokio::test]
async fn send_rejects_malformed_job() {
    let server = spawn(EMBEDDED, gin_store()).await;
    let mut job = server.hub.as_ref().unwrap().subscribe(Channel::Job);
    let client = Client::new();

    let oversized = client
        .post(server.url("/api/hubs/job/send"))
        .bearer_auth("hub-key")
        .json(&json!({"durations": [1e9]}))
        .send()
        .await
        .unwrap();
    assert_eq!(oversized.status(), 400);
    assert!(job.try_recv().is_err());

    let message = json!({"durations": [0.0, 2000.0, 0.0, 0.0, 0.0, 0.0, 0.0]});
    let accepted = client
        .post(server.url("/api/hubs/job/send"))
        .bearer_auth("hub-key")
        .json(&message)
        .send()
        .await
        .unwrap();
    assert_eq!(accepted.status(), 200);
    let delivered: Value = serde_json::from_str(&job.recv().await.unwrap()).unwrap();
    assert_eq!(delivered, message);
}

/// Tests unknown channels are validation failures.
#[tokio::test]
async fn send_rejects_unknown_channel() {
    let server = spawn(EMBEDDED, gin_store()).await;
    let response = Client::new()
        .post(server.url("/api/hubs/lights/send"))
        .bearer_auth("hub-key")
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

/// Tests a hub without an access key rejects service calls and says so at startup.
#[tokio::test]
async fn hub_without_access_key_fails_closed() {
    let server = spawn("[pubsub]\nmode = \"embedded\"\n", gin_store()).await;
    let response = Client::new()
        .post(server.url("/api/hubs/job/token?user_id=pump"))
        .bearer_auth("anything")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
    let security = server.audit.events("security");
    assert!(security.iter().any(|event| event["kind"] == "hub_without_access_key"));
}

// ============================================================================
// SECTION: Token
// ============================================================================

/// Tests the token endpoint issues job-channel grants for the pump controller.
#[tokio::test]
async fn token_issues_grant_for_channel() {
    let server = spawn(EMBEDDED, gin_store()).await;
    let client = Client::new();
    let response = client
        .post(server.url("/api/hubs/job/token?user_id=pump-controller"))
        .bearer_auth("hub-key")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let grant: Value = response.json().await.unwrap();
    assert_eq!(grant["channel"], "job");
    assert!(grant["url"].as_str().unwrap().contains("/client/hubs/job?access_token="));

    let missing_user = client
        .post(server.url("/api/hubs/job/token"))
        .bearer_auth("hub-key")
        .send()
        .await
        .unwrap();
    assert_eq!(missing_user.status(), 400);
}

/// Tests hub routes are absent when this server does not host the hub.
#[tokio::test]
async fn hub_routes_absent_without_embedded_mode() {
    let server = spawn("", gin_store()).await;
    let response = Client::new()
        .post(server.url("/api/hubs/status/send"))
        .bearer_auth("hub-key")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

// ============================================================================
// SECTION: Websocket
// ============================================================================

/// Tests a negotiated websocket receives published status heartbeats.
#[tokio::test(flavor = "multi_thread")]
async fn websocket_receives_status_after_negotiate() {
    let server = spawn(EMBEDDED, gin_store()).await;
    let client = Client::new();
    let url = client
        .get(server.url("/api/negotiate"))
        .header("x-ms-client-principal-name", "display")
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    let (mut socket, _response) = connect_async(url.as_str()).await.unwrap();

    let message = json!({"timestamp": 1_700_000_000_000_i64, "remainingJobTime": 3});
    let response = client
        .post(server.url("/api/hubs/status/send"))
        .bearer_auth("hub-key")
        .json(&message)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let frame = tokio::time::timeout(Duration::from_secs(5), socket.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let Message::Text(text) = frame else {
        panic!("expected text frame, got {frame:?}");
    };
    let received: Value = serde_json::from_str(text.as_str()).unwrap();
    assert_eq!(received, message);
}

/// Tests a websocket upgrade with a forged token is refused.
#[tokio::test(flavor = "multi_thread")]
async fn websocket_rejects_forged_token() {
    let server = spawn(EMBEDDED, gin_store()).await;
    let url = server.url("/client/hubs/status?access_token=forged").replace("http://", "ws://");
    assert!(connect_async(url.as_str()).await.is_err());
}
