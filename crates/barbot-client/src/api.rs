// crates/barbot-client/src/api.rs
// ============================================================================
// Module: Barbot API Client
// Description: Typed HTTP client for the Barbot server surface.
// Purpose: Fetch recipes and configuration, request mixes, and negotiate.
// Dependencies: barbot-core, reqwest, serde, url
// ============================================================================

//! ## Overview
//! [`BarbotApi`] is the seam the controller talks through; [`ApiClient`] is
//! its `reqwest` implementation. Failure responses carry the server's
//! `{"message": ...}` text in [`ClientError::Api`]. No call is retried.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use barbot_core::PumpConfig;
use barbot_core::Recipe;
use barbot_core::RecipeId;
use reqwest::Client;
use reqwest::RequestBuilder;
use reqwest::Response;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use url::Url;

use crate::error::ClientError;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Server confirmation of a published job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobConfirmation {
    /// Recipe that was compiled, for mix requests.
    #[serde(rename = "recipeId", default)]
    pub recipe_id: Option<RecipeId>,
    /// Durations published on the job channel.
    pub durations: Vec<f64>,
    /// Subscribers reached, when the transport reports it.
    #[serde(default)]
    pub subscribers: Option<usize>,
}

/// Error body returned by the server.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    /// Human-readable message.
    message: String,
}

/// Operations the controller and CLI need from the server.
#[async_trait]
pub trait BarbotApi: Send + Sync {
    /// Lists mixable recipes.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the call fails.
    async fn drinks(&self) -> Result<Vec<Recipe>, ClientError>;

    /// Fetches the pump configuration snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the call fails.
    async fn pump_config(&self) -> Result<PumpConfig, ClientError>;

    /// Requests a mix of `recipe_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the call fails.
    async fn mix(&self, recipe_id: &RecipeId) -> Result<JobConfirmation, ClientError>;

    /// Sends caller-supplied durations.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the call fails.
    async fn actuate(&self, durations: &[f64]) -> Result<JobConfirmation, ClientError>;

    /// Exchanges the caller identity for a status connection URL.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the call fails.
    async fn negotiate(&self) -> Result<String, ClientError>;
}

// ============================================================================
// SECTION: HTTP Client
// ============================================================================

/// `reqwest` implementation of [`BarbotApi`].
#[derive(Debug, Clone)]
pub struct ApiClient {
    /// HTTP client.
    client: Client,
    /// Server base URL.
    base: Url,
    /// Identity header name and value sent with negotiation.
    identity: Option<(String, String)>,
}

impl ApiClient {
    /// Creates a client for the server at `base`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the URL is not `http(s)` or the client
    /// cannot be built.
    pub fn new(base: &str) -> Result<Self, ClientError> {
        let base = Url::parse(base.trim()).map_err(|err| ClientError::Url(err.to_string()))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ClientError::Url(format!("unsupported scheme: {}", base.scheme())));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|err| ClientError::Http(err.to_string()))?;
        Ok(Self {
            client,
            base,
            identity: None,
        })
    }

    /// Sends `value` in `header` to identify the caller.
    #[must_use]
    pub fn with_identity(mut self, header: impl Into<String>, value: impl Into<String>) -> Self {
        self.identity = Some((header.into(), value.into()));
        self
    }

    /// Resolves `path` against the base URL.
    fn url(&self, path: &str) -> Result<Url, ClientError> {
        self.base.join(path).map_err(|err| ClientError::Url(err.to_string()))
    }

    /// Adds the identity header when configured.
    fn identify(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.identity {
            Some((header, value)) => request.header(header.as_str(), value.as_str()),
            None => request,
        }
    }

    /// Sends a request and returns the response when it succeeded.
    async fn send(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let response =
            self.identify(request).send().await.map_err(|err| ClientError::Http(err.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text).map_or(text, |body| body.message);
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    /// Sends a request and decodes its JSON body.
    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ClientError> {
        self.send(request).await?.json().await.map_err(|err| ClientError::Decode(err.to_string()))
    }
}

#[async_trait]
impl BarbotApi for ApiClient {
    async fn drinks(&self) -> Result<Vec<Recipe>, ClientError> {
        self.send_json(self.client.get(self.url("/api/drinks")?)).await
    }

    async fn pump_config(&self) -> Result<PumpConfig, ClientError> {
        self.send_json(self.client.get(self.url("/api/config")?)).await
    }

    async fn mix(&self, recipe_id: &RecipeId) -> Result<JobConfirmation, ClientError> {
        let body = json!({ "recipeId": recipe_id });
        self.send_json(self.client.post(self.url("/api/mix")?).json(&body)).await
    }

    async fn actuate(&self, durations: &[f64]) -> Result<JobConfirmation, ClientError> {
        let body = json!({ "durations": durations });
        self.send_json(self.client.post(self.url("/api/pump")?).json(&body)).await
    }

    async fn negotiate(&self) -> Result<String, ClientError> {
        let response = self.send(self.client.get(self.url("/api/negotiate")?)).await?;
        let text = response.text().await.map_err(|err| ClientError::Decode(err.to_string()))?;
        let url = text.trim();
        if url.is_empty() {
            return Err(ClientError::Decode("empty connection url".to_string()));
        }
        Ok(url.to_string())
    }
}
