// crates/barbot-core/src/runtime/dispatcher.rs
// ============================================================================
// Module: Barbot Job Dispatcher
// Description: Turns mix and manual pump requests into published jobs.
// Purpose: Single entry point for everything that makes the pumps move.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! The dispatcher resolves a recipe and the pump configuration from the
//! store, compiles durations, enforces the duration ceiling, and publishes a
//! [`JobMessage`] on the `job` channel. Manual actuation skips the recipe
//! steps and publishes caller-supplied durations after validation.
//! Security posture: request bodies are untrusted; every duration is checked
//! before it reaches the transport.
//! Invariants:
//! - Nothing is published unless every prior step succeeded.
//! - A failed publish is always reported to the caller.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::core::ActuationDurations;
use crate::core::Channel;
use crate::core::DurationError;
use crate::core::JobMessage;
use crate::core::RecipeId;
use crate::interfaces::ChannelPublisher;
use crate::interfaces::PublishError;
use crate::interfaces::PublishReceipt;
use crate::interfaces::RecipeStore;
use crate::interfaces::StoreError;
use crate::runtime::compiler::CompileError;
use crate::runtime::compiler::compile;
use crate::runtime::store::SharedRecipeStore;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Longest single-slot run the controller can encode, in milliseconds.
pub const DEFAULT_MAX_DURATION_MS: f64 = 39_000.0;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Coarse failure classes used to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Caller sent an invalid request.
    Validation,
    /// A referenced record does not exist.
    NotFound,
    /// A downstream dependency failed.
    Dependency,
    /// Deployment or stored configuration is unusable.
    Configuration,
}

impl ErrorKind {
    /// Returns the stable label used in audit records.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Dependency => "dependency",
            Self::Configuration => "configuration",
        }
    }
}

/// Dispatch failures.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Request is missing required data.
    #[error("{0}")]
    InvalidRequest(String),
    /// Caller-supplied durations are unacceptable.
    #[error("invalid durations: {0}")]
    InvalidDurations(DurationError),
    /// Recipe does not exist.
    #[error("Recipe not found in database")]
    RecipeNotFound(RecipeId),
    /// No pump configuration is stored.
    #[error("Config not found in database")]
    ConfigNotFound,
    /// Store read failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Recipe could not be compiled against the stored configuration.
    #[error("recipe cannot be compiled: {0}")]
    Compile(#[from] CompileError),
    /// Broadcast transport is not configured.
    #[error("broadcast transport is not configured")]
    TransportNotConfigured,
    /// Broadcast transport failed.
    #[error(transparent)]
    Publish(#[from] PublishError),
}

impl DispatchError {
    /// Returns the failure class.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest(_) | Self::InvalidDurations(_) => ErrorKind::Validation,
            Self::RecipeNotFound(_) | Self::ConfigNotFound => ErrorKind::NotFound,
            Self::Store(_) | Self::Publish(_) => ErrorKind::Dependency,
            Self::Compile(_) | Self::TransportNotConfigured => ErrorKind::Configuration,
        }
    }
}

// ============================================================================
// SECTION: Dispatch Types
// ============================================================================

/// Where a published job came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchOrigin {
    /// Compiled from a stored recipe.
    Mix,
    /// Supplied directly by an operator.
    Manual,
}

impl DispatchOrigin {
    /// Returns the stable label used in audit records.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mix => "mix",
            Self::Manual => "manual",
        }
    }
}

/// Dispatch limits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispatchPolicy {
    /// Per-slot ceiling in milliseconds.
    pub max_duration_ms: f64,
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self {
            max_duration_ms: DEFAULT_MAX_DURATION_MS,
        }
    }
}

/// Successful dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOutcome {
    /// Request kind.
    pub origin: DispatchOrigin,
    /// Recipe that was compiled, for mix requests.
    pub recipe_id: Option<RecipeId>,
    /// Durations that were published.
    pub durations: ActuationDurations,
    /// Transport receipt.
    pub receipt: PublishReceipt,
}

// ============================================================================
// SECTION: Dispatcher
// ============================================================================

/// Publishes pump jobs.
#[derive(Clone)]
pub struct JobDispatcher {
    /// Recipe and configuration source.
    store: SharedRecipeStore,
    /// Broadcast transport; `None` when not configured.
    publisher: Option<Arc<dyn ChannelPublisher>>,
    /// Dispatch limits.
    policy: DispatchPolicy,
}

impl JobDispatcher {
    /// Creates a dispatcher.
    #[must_use]
    pub fn new(
        store: SharedRecipeStore,
        publisher: Option<Arc<dyn ChannelPublisher>>,
        policy: DispatchPolicy,
    ) -> Self {
        Self {
            store,
            publisher,
            policy,
        }
    }

    /// Returns the backing store.
    #[must_use]
    pub const fn store(&self) -> &SharedRecipeStore {
        &self.store
    }

    /// Returns the active policy.
    #[must_use]
    pub const fn policy(&self) -> DispatchPolicy {
        self.policy
    }

    /// Compiles and publishes the recipe identified by `recipe_id`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] when the request is invalid, a record is
    /// missing, compilation fails, or the transport fails.
    pub async fn dispatch(&self, recipe_id: &RecipeId) -> Result<DispatchOutcome, DispatchError> {
        if recipe_id.is_blank() {
            return Err(DispatchError::InvalidRequest("recipeId is required".to_string()));
        }
        let config = self.store.load_config()?.ok_or(DispatchError::ConfigNotFound)?;
        let recipe = self
            .store
            .load_recipe(recipe_id)?
            .ok_or_else(|| DispatchError::RecipeNotFound(recipe_id.clone()))?;
        let durations = compile(&config, &recipe)?;
        durations
            .check_ceiling(self.policy.max_duration_ms)
            .map_err(|err| DispatchError::Compile(CompileError::Durations(err)))?;
        let receipt = self.publish(durations).await?;
        Ok(DispatchOutcome {
            origin: DispatchOrigin::Mix,
            recipe_id: Some(recipe.id),
            durations,
            receipt,
        })
    }

    /// Validates and publishes caller-supplied durations.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidDurations`] when the list has the wrong
    /// length or holds a negative, non-finite, or over-ceiling value, and
    /// transport errors otherwise.
    pub async fn actuate(&self, durations: &[f64]) -> Result<DispatchOutcome, DispatchError> {
        let durations = ActuationDurations::try_from(durations.to_vec())
            .map_err(DispatchError::InvalidDurations)?;
        durations
            .check_ceiling(self.policy.max_duration_ms)
            .map_err(DispatchError::InvalidDurations)?;
        let receipt = self.publish(durations).await?;
        Ok(DispatchOutcome {
            origin: DispatchOrigin::Manual,
            recipe_id: None,
            durations,
            receipt,
        })
    }

    /// Publishes a job message on the job channel.
    async fn publish(&self, durations: ActuationDurations) -> Result<PublishReceipt, DispatchError> {
        let publisher = self.publisher.as_ref().ok_or(DispatchError::TransportNotConfigured)?;
        let payload = serde_json::to_value(JobMessage {
            durations,
        })
        .map_err(|err| PublishError::Encode(err.to_string()))?;
        Ok(publisher.publish(Channel::Job, &payload).await?)
    }
}

impl std::fmt::Debug for JobDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobDispatcher")
            .field("publisher_configured", &self.publisher.is_some())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
