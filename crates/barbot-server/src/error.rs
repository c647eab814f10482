// crates/barbot-server/src/error.rs
// ============================================================================
// Module: Server Errors
// Description: Request-boundary error mapping and startup failures.
// Purpose: Convert every handler failure into one status code and body shape.
// Dependencies: axum, barbot-core, thiserror
// ============================================================================

//! ## Overview
//! Handlers return [`ApiError`]. Its status code comes from a single mapping
//! over [`ErrorKind`]: validation and not-found failures are the caller's
//! (400), dependency and configuration failures are the deployment's (500).
//! Dependency bodies carry a generic message; the detail goes to the audit
//! log only.

// ============================================================================
// SECTION: Imports
// ============================================================================

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use barbot_core::CatalogError;
use barbot_core::DispatchError;
use barbot_core::ErrorKind;
use barbot_core::NegotiateError;
use barbot_core::StoreError;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Status Mapping
// ============================================================================

/// Maps an error kind to its HTTP status.
#[must_use]
pub const fn status_for_kind(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation | ErrorKind::NotFound => StatusCode::BAD_REQUEST,
        ErrorKind::Dependency | ErrorKind::Configuration => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// ============================================================================
// SECTION: API Error
// ============================================================================

/// Failure returned from a request handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// Response status.
    pub status: StatusCode,
    /// Error kind label for audit, when the failure has one.
    pub kind: Option<ErrorKind>,
    /// Message placed in the response body.
    pub message: String,
    /// Detail recorded in the audit log.
    pub detail: String,
}

impl ApiError {
    /// Builds an error for a classified failure.
    #[must_use]
    pub fn from_kind(kind: ErrorKind, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        let message = match kind {
            ErrorKind::Validation | ErrorKind::NotFound | ErrorKind::Configuration => {
                detail.clone()
            }
            ErrorKind::Dependency => "upstream dependency failed".to_string(),
        };
        Self {
            status: status_for_kind(kind),
            kind: Some(kind),
            message,
            detail,
        }
    }

    /// Builds a validation failure.
    #[must_use]
    pub fn validation(detail: impl Into<String>) -> Self {
        Self::from_kind(ErrorKind::Validation, detail)
    }

    /// Builds a rejected-credentials failure.
    #[must_use]
    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            kind: None,
            message: "unauthorized".to_string(),
            detail: detail.into(),
        }
    }

    /// Replaces the public message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Returns the kind label used in audit records.
    #[must_use]
    pub fn kind_label(&self) -> &'static str {
        self.kind.map_or("unauthorized", ErrorKind::as_str)
    }
}

/// JSON error body.
#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    /// Human-readable message.
    message: &'a str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            message: &self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        Self::from_kind(err.kind(), err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::from_kind(ErrorKind::Dependency, err.to_string())
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        Self::from_kind(ErrorKind::Dependency, err.to_string())
            .with_message("Failed to fetch data from the recipe store")
    }
}

impl From<NegotiateError> for ApiError {
    fn from(err: NegotiateError) -> Self {
        let kind = match err {
            NegotiateError::Configuration(_) => ErrorKind::Configuration,
            NegotiateError::Transport(_) => ErrorKind::Dependency,
        };
        Self::from_kind(kind, err.to_string())
    }
}

// ============================================================================
// SECTION: Server Error
// ============================================================================

/// Server startup and transport failures.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration is invalid.
    #[error("server config error: {0}")]
    Config(String),
    /// A backend could not be initialized.
    #[error("server init error: {0}")]
    Init(String),
    /// Listener or connection handling failed.
    #[error("server transport error: {0}")]
    Transport(String),
}
