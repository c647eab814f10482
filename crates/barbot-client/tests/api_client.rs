// crates/barbot-client/tests/api_client.rs
// ============================================================================
// Module: API Client Tests
// Description: Request shapes and error mapping of the HTTP client.
// Purpose: Check each call against a one-shot fake server.
// Dependencies: barbot-client, tiny_http, tokio
// ============================================================================

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

use std::io::Read;
use std::thread::JoinHandle;

use barbot_client::ApiClient;
use barbot_client::BarbotApi;
use barbot_client::ClientError;
use barbot_core::RecipeId;
use serde_json::Value;
use serde_json::json;
use tiny_http::Header;
use tiny_http::Response;
use tiny_http::Server;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Request observed by the fake server.
struct Observed {
    method: String,
    url: String,
    caller: Option<String>,
    body: String,
}

/// Serves one request with `status` and `body`, returning what it saw.
fn one_shot(
    status: u16,
    content_type: &'static str,
    body: &'static str,
) -> (String, JoinHandle<Observed>) {
    let server = Server::http("127.0.0.1:0").expect("http server");
    let addr = server.server_addr();
    let handle = std::thread::spawn(move || {
        let mut request = server.recv().expect("request");
        let caller = request
            .headers()
            .iter()
            .find(|header| header.field.equiv("X-Ms-Client-Principal-Name"))
            .map(|header| header.value.as_str().to_string());
        let mut text = String::new();
        request.as_reader().read_to_string(&mut text).expect("body");
        let observed = Observed {
            method: request.method().as_str().to_string(),
            url: request.url().to_string(),
            caller,
            body: text,
        };
        let response = Response::from_string(body)
            .with_status_code(status)
            .with_header(Header::from_bytes("Content-Type", content_type).unwrap());
        request.respond(response).expect("respond");
        observed
    });
    (format!("http://{addr}"), handle)
}

const JSON: &str = "application/json";

// ============================================================================
// SECTION: Tests
// ============================================================================

/// Tests the recipe list is fetched and decoded.
#[tokio::test]
async fn drinks_decodes_recipes() {
    let body = r#"[{"id":"gin_shot","name":"Gin Shot","ingredients":[{"ingredient":"gin","amount":60}]}]"#;
    let (base, server) = one_shot(200, JSON, body);
    let client = ApiClient::new(&base).unwrap();

    let recipes = client.drinks().await.unwrap();
    let observed = server.join().unwrap();
    assert_eq!(observed.method, "GET");
    assert_eq!(observed.url, "/api/drinks");
    assert_eq!(recipes.len(), 1);
    assert_eq!(recipes[0].id, RecipeId::new("gin_shot"));
}

/// Tests the pump configuration snapshot is decoded.
#[tokio::test]
async fn pump_config_decodes() {
    let body = r#"{"ingredients":{"0":"gin","1":null},"pump_configs":{"0":{"flow_rate":20,"time_offset":500}}}"#;
    let (base, server) = one_shot(200, JSON, body);
    let client = ApiClient::new(&base).unwrap();

    let config = client.pump_config().await.unwrap();
    assert_eq!(server.join().unwrap().url, "/api/config");
    assert_eq!(config.ingredient_at(0), Some("gin"));
    assert_eq!(config.ingredient_at(1), None);
}

/// Tests mix posts the recipe id and returns the confirmation.
#[tokio::test]
async fn mix_posts_recipe_id() {
    let body = r#"{"recipeId":"gin_shot","durations":[3500,0,0,0,0,0,0],"subscribers":2}"#;
    let (base, server) = one_shot(200, JSON, body);
    let client = ApiClient::new(&base).unwrap();

    let confirmation = client.mix(&RecipeId::new("gin_shot")).await.unwrap();
    let observed = server.join().unwrap();
    assert_eq!(observed.method, "POST");
    assert_eq!(observed.url, "/api/mix");
    let sent: Value = serde_json::from_str(&observed.body).unwrap();
    assert_eq!(sent, json!({"recipeId": "gin_shot"}));
    assert_eq!(confirmation.durations[0], 3_500.0);
    assert_eq!(confirmation.subscribers, Some(2));
}

/// Tests manual actuation posts the durations array.
#[tokio::test]
async fn actuate_posts_durations() {
    let body = r#"{"durations":[100,0,0,0,0,0,0]}"#;
    let (base, server) = one_shot(200, JSON, body);
    let client = ApiClient::new(&base).unwrap();

    let confirmation = client.actuate(&[100.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]).await.unwrap();
    let observed = server.join().unwrap();
    assert_eq!(observed.url, "/api/pump");
    let sent: Value = serde_json::from_str(&observed.body).unwrap();
    assert_eq!(sent["durations"][0], json!(100.0));
    assert!(confirmation.recipe_id.is_none());
    assert!(confirmation.subscribers.is_none());
}

/// Tests failure statuses surface the server message.
#[tokio::test]
async fn error_body_message_is_surfaced() {
    let (base, server) = one_shot(400, JSON, r#"{"message":"Recipe not found in database"}"#);
    let client = ApiClient::new(&base).unwrap();

    let err = client.mix(&RecipeId::new("nope")).await.unwrap_err();
    server.join().unwrap();
    assert_eq!(
        err,
        ClientError::Api {
            status: 400,
            message: "Recipe not found in database".to_string(),
        }
    );
    assert!(err.is_client_error());
}

/// Tests non-JSON failure bodies are passed through as text.
#[tokio::test]
async fn plain_error_body_is_kept() {
    let (base, server) = one_shot(502, "text/plain", "bad gateway");
    let client = ApiClient::new(&base).unwrap();

    let err = client.drinks().await.unwrap_err();
    server.join().unwrap();
    assert_eq!(
        err,
        ClientError::Api {
            status: 502,
            message: "bad gateway".to_string(),
        }
    );
    assert!(!err.is_client_error());
}

/// Tests negotiate returns the trimmed URL and sends the identity header.
#[tokio::test]
async fn negotiate_returns_url_with_identity() {
    let (base, server) =
        one_shot(200, "text/plain", "ws://bar.local/client/hubs/status?access_token=abc\n");
    let client = ApiClient::new(&base).unwrap().with_identity("x-ms-client-principal-name", "kiosk-1");

    let url = client.negotiate().await.unwrap();
    let observed = server.join().unwrap();
    assert_eq!(url, "ws://bar.local/client/hubs/status?access_token=abc");
    assert_eq!(observed.url, "/api/negotiate");
    assert_eq!(observed.caller.as_deref(), Some("kiosk-1"));
}

/// Tests an empty negotiate body is rejected.
#[tokio::test]
async fn negotiate_empty_body_rejected() {
    let (base, server) = one_shot(200, "text/plain", "  ");
    let client = ApiClient::new(&base).unwrap();

    let err = client.negotiate().await.unwrap_err();
    server.join().unwrap();
    assert!(matches!(err, ClientError::Decode(_)));
}

/// Tests a malformed success body is a decode error.
#[tokio::test]
async fn malformed_success_body_is_decode_error() {
    let (base, server) = one_shot(200, JSON, r#"{"not":"a list"}"#);
    let client = ApiClient::new(&base).unwrap();

    let err = client.drinks().await.unwrap_err();
    server.join().unwrap();
    assert!(matches!(err, ClientError::Decode(_)));
}

/// Tests non-http base URLs are rejected.
#[test]
fn non_http_base_rejected() {
    assert!(matches!(ApiClient::new("ws://localhost:1"), Err(ClientError::Url(_))));
    assert!(matches!(ApiClient::new("not a url"), Err(ClientError::Url(_))));
}
