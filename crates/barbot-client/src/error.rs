// crates/barbot-client/src/error.rs
// ============================================================================
// Module: Client Errors
// Description: Failures raised by the HTTP client, status feed, and controller.
// Purpose: Give callers stable variants to branch on.
// Dependencies: barbot-core, thiserror
// ============================================================================

use barbot_core::RecipeId;
use thiserror::Error;

/// HTTP, websocket, and cache failures.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The base URL or a derived URL is invalid.
    #[error("invalid client url: {0}")]
    Url(String),
    /// The request could not be sent or the response not read.
    #[error("http transport failed: {0}")]
    Http(String),
    /// The server answered with a failure status.
    #[error("server returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message from the `{"message": ...}` body.
        message: String,
    },
    /// The response body did not match the expected shape.
    #[error("invalid response body: {0}")]
    Decode(String),
    /// The websocket feed failed.
    #[error("status feed failed: {0}")]
    Feed(String),
    /// Local session cache I/O failed.
    #[error("session cache io error: {0}")]
    Io(String),
}

impl ClientError {
    /// Returns true when the server classified the failure as the caller's.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::Api { status, .. } if *status >= 400 && *status < 500)
    }
}

/// Controller failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    /// The selected recipe is not among the current options.
    #[error("recipe {0} is not available")]
    UnknownRecipe(RecipeId),
    /// The server call failed.
    #[error(transparent)]
    Client(#[from] ClientError),
}
