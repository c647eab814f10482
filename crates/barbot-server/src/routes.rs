// crates/barbot-server/src/routes.rs
// ============================================================================
// Module: API Routes
// Description: Router assembly and the drinks, negotiate, mix, pump, and
//              config handlers.
// Purpose: Translate HTTP requests into core operations at one boundary.
// Dependencies: axum, barbot-core, serde
// ============================================================================

//! ## Overview
//! Every handler parses its own body from raw bytes so malformed input maps
//! to a validation failure (400) with the standard `{"message": ...}` body,
//! then records exactly one `request` audit event. Successful dispatches also
//! record a `job_published` event, and negotiations a `negotiate` event.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::DefaultBodyLimit;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use barbot_core::CallerId;
use barbot_core::Channel;
use barbot_core::DispatchError;
use barbot_core::DispatchOutcome;
use barbot_core::ErrorKind;
use barbot_core::RecipeId;
use barbot_core::RecipeStore;
use barbot_core::available_recipes;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::audit::AuditEvent;
use crate::audit::JobAuditEvent;
use crate::audit::NegotiateAuditEvent;
use crate::audit::RequestAuditEvent;
use crate::audit::RequestOutcome;
use crate::audit::now_millis;
use crate::channels;
use crate::error::ApiError;
use crate::server::AppState;

// ============================================================================
// SECTION: Router
// ============================================================================

/// Caller identity used when the identity header is absent.
pub const ANONYMOUS_CALLER: &str = "anonymous";

/// Builds the full router over `state`.
pub(crate) fn build_router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    let mut router = Router::new()
        .route("/api/drinks", get(drinks))
        .route("/api/negotiate", get(negotiate).post(negotiate))
        .route("/api/mix", post(mix))
        .route("/api/pump", post(pump))
        .route("/api/job", post(pump))
        .route("/api/config", get(pump_config));
    if state.hub.is_some() {
        router = router
            .route("/client/hubs/{channel}", get(channels::subscribe))
            .route("/api/hubs/{channel}/send", post(channels::send))
            .route("/api/hubs/{channel}/token", post(channels::token));
    }
    router.layer(DefaultBodyLimit::max(max_body_bytes)).with_state(state)
}

// ============================================================================
// SECTION: Request Bodies
// ============================================================================

/// Mix request body.
#[derive(Debug, Deserialize)]
struct MixRequest {
    /// Recipe to compile and dispatch.
    #[serde(rename = "recipeId", default)]
    recipe_id: Option<String>,
}

/// Manual actuation request body.
#[derive(Debug, Deserialize)]
struct PumpRequest {
    /// Per-slot durations in milliseconds.
    #[serde(default)]
    durations: Option<Vec<f64>>,
}

/// Dispatch confirmation body.
#[derive(Debug, Serialize)]
struct DispatchResponse {
    /// Recipe that was compiled, for mix requests.
    #[serde(rename = "recipeId", skip_serializing_if = "Option::is_none")]
    recipe_id: Option<String>,
    /// Durations published on the job channel.
    durations: Vec<f64>,
    /// Subscribers reached, when the transport reports it.
    subscribers: Option<usize>,
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Lists the recipes the current pump configuration can make.
async fn drinks(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let started = Instant::now();
    let result = available_recipes(state.dispatcher.store())
        .map(|recipes| Json(recipes).into_response())
        .map_err(ApiError::from);
    finish(&state, "drinks", caller_of(&state, &headers), 0, started, result)
}

/// Returns the stored pump configuration.
async fn pump_config(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let started = Instant::now();
    let result = match state.dispatcher.store().load_config() {
        Ok(Some(config)) => Ok(Json(config).into_response()),
        Ok(None) => Err(ApiError::from(DispatchError::ConfigNotFound)),
        Err(err) => Err(ApiError::from(err)),
    };
    finish(&state, "config", caller_of(&state, &headers), 0, started, result)
}

/// Issues a caller-scoped connection URL for the status channel.
async fn negotiate(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let started = Instant::now();
    let caller = caller_of(&state, &headers);
    let caller_id = CallerId::new(caller.clone().unwrap_or_else(|| ANONYMOUS_CALLER.to_string()));
    let result = match &state.negotiator {
        None => Err(ApiError::from_kind(
            ErrorKind::Configuration,
            "pubsub transport is not configured",
        )),
        Some(negotiator) => match negotiator.negotiate(&caller_id, Channel::Status).await {
            Ok(grant) => {
                state.audit.record(&AuditEvent::Negotiate(NegotiateAuditEvent {
                    timestamp_ms: now_millis(),
                    caller: caller_id.to_string(),
                    channel: grant.channel,
                    expires_at_ms: grant.expires_at_ms,
                }));
                Ok(([(CONTENT_TYPE, "text/plain; charset=utf-8")], grant.url).into_response())
            }
            Err(err) => Err(ApiError::from(err)),
        },
    };
    finish(&state, "negotiate", caller, 0, started, result)
}

/// Compiles a stored recipe and publishes the job.
async fn mix(State(state): State<Arc<AppState>>, headers: HeaderMap, body: Bytes) -> Response {
    let started = Instant::now();
    let result = match parse_body::<MixRequest>(&body, "a JSON object with recipeId") {
        Ok(request) => {
            let recipe_id = RecipeId::new(request.recipe_id.unwrap_or_default());
            state
                .dispatcher
                .dispatch(&recipe_id)
                .await
                .map(|outcome| dispatched(&state, outcome))
                .map_err(ApiError::from)
        }
        Err(err) => Err(err),
    };
    finish(&state, "mix", caller_of(&state, &headers), body.len(), started, result)
}

/// Publishes caller-supplied durations.
async fn pump(State(state): State<Arc<AppState>>, headers: HeaderMap, body: Bytes) -> Response {
    let started = Instant::now();
    let result = match parse_body::<PumpRequest>(&body, "a JSON object with durations") {
        Ok(PumpRequest {
            durations: Some(durations),
        }) => state
            .dispatcher
            .actuate(&durations)
            .await
            .map(|outcome| dispatched(&state, outcome))
            .map_err(ApiError::from),
        Ok(PumpRequest {
            durations: None,
        }) => Err(ApiError::validation("durations is required")),
        Err(err) => Err(err),
    };
    finish(&state, "pump", caller_of(&state, &headers), body.len(), started, result)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Audits a published job and builds its confirmation.
fn dispatched(state: &AppState, outcome: DispatchOutcome) -> Response {
    let durations: Vec<f64> = outcome.durations.into();
    let recipe_id = outcome.recipe_id.map(|id| id.to_string());
    state.audit.record(&AuditEvent::JobPublished(JobAuditEvent::new(
        outcome.origin,
        recipe_id.clone(),
        durations.clone(),
        outcome.receipt.subscribers,
    )));
    Json(DispatchResponse {
        recipe_id,
        durations,
        subscribers: outcome.receipt.subscribers,
    })
    .into_response()
}

/// Parses a JSON body, mapping any failure to a validation error.
pub(crate) fn parse_body<T: DeserializeOwned>(body: &[u8], expected: &str) -> Result<T, ApiError> {
    if body.is_empty() {
        return Err(ApiError::validation(format!("request body must be {expected}")));
    }
    serde_json::from_slice(body).map_err(|err| {
        ApiError::validation(format!("invalid request body: {err}"))
            .with_message(format!("request body must be {expected}"))
    })
}

/// Reads the caller identity header.
pub(crate) fn caller_of(state: &AppState, headers: &HeaderMap) -> Option<String> {
    headers
        .get(state.identity_header.as_str())
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Records the request audit event and renders the response.
pub(crate) fn finish(
    state: &AppState,
    route: &'static str,
    caller: Option<String>,
    request_bytes: usize,
    started: Instant,
    result: Result<Response, ApiError>,
) -> Response {
    let latency_ms = started.elapsed().as_millis();
    let (response, status, error_kind, error) = match result {
        Ok(response) => {
            let status = response.status();
            (response, status, None, None)
        }
        Err(err) => {
            let status = err.status;
            let kind = err.kind_label();
            let detail = err.detail.clone();
            (err.into_response(), status, Some(kind), Some(detail))
        }
    };
    let outcome = if error.is_some() { RequestOutcome::Error } else { RequestOutcome::Ok };
    state.audit.record(&AuditEvent::Request(RequestAuditEvent {
        timestamp_ms: now_millis(),
        route,
        outcome,
        status: status.as_u16(),
        error_kind,
        error,
        caller,
        request_bytes,
        latency_ms,
    }));
    response
}
