// crates/barbot-config/src/config.rs
// ============================================================================
// Module: Barbot Configuration
// Description: Configuration loading and validation for Barbot.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: barbot-core, serde, toml, url
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every section has defaults, so an empty file is a valid local setup with an
//! in-memory store and no broadcast transport. Missing transport settings are
//! not a load error: negotiate and dispatch fail at request time instead.
//! Security posture: config inputs are untrusted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use barbot_core::DEFAULT_MAX_DURATION_MS;
use barbot_core::DispatchPolicy;
use barbot_core::SLOT_COUNT;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "barbot.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "BARBOT_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Largest accepted request body limit.
pub(crate) const MAX_BODY_BYTES_LIMIT: usize = 16 * 1024 * 1024;
/// Longest accepted access token lifetime.
pub(crate) const MAX_TOKEN_TTL_SECONDS: u64 = 86_400;
/// Largest per-channel broadcast buffer.
pub(crate) const MAX_CHANNEL_CAPACITY: usize = 65_536;
/// Maximum length of the hub access key.
pub(crate) const MAX_ACCESS_KEY_LENGTH: usize = 256;
/// Longest accepted online window.
pub(crate) const MAX_ONLINE_WINDOW_MS: u64 = 60_000;

// ============================================================================
// SECTION: Root Config
// ============================================================================

/// Complete Barbot configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BarbotConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Broadcast transport settings; `None` leaves it unconfigured.
    #[serde(default)]
    pub pubsub: Option<PubSubConfig>,
    /// Recipe store settings.
    #[serde(default)]
    pub store: StoreConfig,
    /// Pump rig limits.
    #[serde(default)]
    pub pumps: PumpsConfig,
    /// Client liveness settings.
    #[serde(default)]
    pub liveness: LivenessConfig,
}

impl BarbotConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved)
            .map_err(|err| ConfigError::Io(format!("{}: {err}", resolved.display())))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        if let Some(pubsub) = &self.pubsub {
            pubsub.validate()?;
        }
        self.store.validate()?;
        self.pumps.validate()?;
        self.liveness.validate()?;
        Ok(())
    }

    /// Returns the dispatch limits derived from `[pumps]`.
    #[must_use]
    pub const fn dispatch_policy(&self) -> DispatchPolicy {
        DispatchPolicy {
            max_duration_ms: self.pumps.max_duration_ms,
        }
    }
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Header carrying the caller identity.
    #[serde(default = "default_identity_header")]
    pub identity_header: String,
    /// Audit logging configuration.
    #[serde(default)]
    pub audit: ServerAuditConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
            identity_header: default_identity_header(),
            audit: ServerAuditConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Returns the parsed bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the bind address is not a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("invalid bind address: {}", self.bind)))
    }

    /// Validates server configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_body_bytes must be greater than zero".to_string(),
            ));
        }
        if self.max_body_bytes > MAX_BODY_BYTES_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "max_body_bytes must be at most {MAX_BODY_BYTES_LIMIT}"
            )));
        }
        let header = self.identity_header.trim();
        if header.is_empty()
            || !header.bytes().all(|byte| byte.is_ascii_alphanumeric() || byte == b'-')
        {
            return Err(ConfigError::Invalid(
                "identity_header must be a non-empty http header name".to_string(),
            ));
        }
        self.audit.validate()
    }
}

/// Audit logging configuration for server requests.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerAuditConfig {
    /// Enable structured audit logging.
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,
    /// Optional audit log path (JSON lines); stderr when unset.
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for ServerAuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            path: None,
        }
    }
}

impl ServerAuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("audit.path", path)?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Broadcast Transport
// ============================================================================

/// Broadcast transport deployment mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PubSubMode {
    /// This server hosts the hub.
    #[default]
    Embedded,
    /// Another deployment hosts the hub.
    Remote,
}

/// Broadcast transport configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PubSubConfig {
    /// Deployment mode.
    #[serde(default)]
    pub mode: PubSubMode,
    /// Base URL placed in issued connection URLs.
    #[serde(default)]
    pub public_url: Option<String>,
    /// Service key guarding the hub REST endpoints.
    #[serde(default)]
    pub access_key: Option<String>,
    /// Connection token lifetime in seconds.
    #[serde(default = "default_token_ttl_seconds")]
    pub token_ttl_seconds: u64,
    /// Per-channel broadcast buffer size.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Remote hub base URL (`http(s)://`).
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl PubSubConfig {
    /// Returns the websocket base URL for issued connections.
    ///
    /// Falls back to `ws://{bind}` for an embedded hub without `public_url`.
    #[must_use]
    pub fn connection_base(&self, bind: &str) -> String {
        self.public_url.as_deref().map_or_else(
            || format!("ws://{}", bind.trim()),
            |url| url.trim_end_matches('/').to_string(),
        )
    }

    /// Validates transport configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.token_ttl_seconds == 0 || self.token_ttl_seconds > MAX_TOKEN_TTL_SECONDS {
            return Err(ConfigError::Invalid(format!(
                "pubsub.token_ttl_seconds must be in 1..={MAX_TOKEN_TTL_SECONDS}"
            )));
        }
        if self.channel_capacity == 0 || self.channel_capacity > MAX_CHANNEL_CAPACITY {
            return Err(ConfigError::Invalid(format!(
                "pubsub.channel_capacity must be in 1..={MAX_CHANNEL_CAPACITY}"
            )));
        }
        if let Some(key) = &self.access_key
            && (key.trim().is_empty() || key.len() > MAX_ACCESS_KEY_LENGTH)
        {
            return Err(ConfigError::Invalid(format!(
                "pubsub.access_key must be 1..={MAX_ACCESS_KEY_LENGTH} bytes"
            )));
        }
        if let Some(url) = &self.public_url {
            validate_url("pubsub.public_url", url, &["ws", "wss"])?;
        }
        match self.mode {
            PubSubMode::Embedded => {
                if self.endpoint.is_some() {
                    return Err(ConfigError::Invalid(
                        "embedded pubsub must not set endpoint".to_string(),
                    ));
                }
            }
            PubSubMode::Remote => {
                let endpoint = self.endpoint.as_deref().ok_or_else(|| {
                    ConfigError::Invalid("remote pubsub requires endpoint".to_string())
                })?;
                validate_url("pubsub.endpoint", endpoint, &["http", "https"])?;
                if self.access_key.is_none() {
                    return Err(ConfigError::Invalid(
                        "remote pubsub requires access_key".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Recipe store backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    /// In-process store, optionally seeded from a directory.
    #[default]
    Memory,
    /// `SQLite` database.
    Sqlite,
}

/// Recipe store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Store backend type.
    #[serde(rename = "type", default)]
    pub store_type: StoreType,
    /// `SQLite` database path when using the sqlite backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_store_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// Seed directory for the memory store.
    #[serde(default)]
    pub seed_dir: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_type: StoreType::default(),
            path: None,
            busy_timeout_ms: default_store_busy_timeout_ms(),
            seed_dir: None,
        }
    }
}

impl StoreConfig {
    /// Validates store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(seed_dir) = &self.seed_dir {
            validate_path(seed_dir)?;
        }
        match self.store_type {
            StoreType::Memory => {
                if self.path.is_some() {
                    return Err(ConfigError::Invalid("memory store must not set path".to_string()));
                }
                Ok(())
            }
            StoreType::Sqlite => {
                let path = self.path.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("sqlite store requires path".to_string())
                })?;
                validate_path(path)?;
                if self.seed_dir.is_some() {
                    return Err(ConfigError::Invalid(
                        "sqlite store is seeded with `store import`, not seed_dir".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }
}

// ============================================================================
// SECTION: Pumps
// ============================================================================

/// Pump rig limits.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PumpsConfig {
    /// Number of pump slots; must match the rig.
    #[serde(default = "default_slot_count")]
    pub slot_count: usize,
    /// Per-slot duration ceiling in milliseconds.
    #[serde(default = "default_max_duration_ms")]
    pub max_duration_ms: f64,
}

impl Default for PumpsConfig {
    fn default() -> Self {
        Self {
            slot_count: default_slot_count(),
            max_duration_ms: default_max_duration_ms(),
        }
    }
}

impl PumpsConfig {
    /// Validates pump limits.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.slot_count != SLOT_COUNT {
            return Err(ConfigError::Invalid(format!("pumps.slot_count must be {SLOT_COUNT}")));
        }
        if !self.max_duration_ms.is_finite()
            || self.max_duration_ms <= 0.0
            || self.max_duration_ms > DEFAULT_MAX_DURATION_MS
        {
            return Err(ConfigError::Invalid(format!(
                "pumps.max_duration_ms must be in (0, {DEFAULT_MAX_DURATION_MS}]"
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Liveness
// ============================================================================

/// Client liveness settings.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LivenessConfig {
    /// Heartbeat age below which the rig counts as online.
    #[serde(default = "default_online_window_ms")]
    pub online_window_ms: u64,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            online_window_ms: default_online_window_ms(),
        }
    }
}

impl LivenessConfig {
    /// Validates liveness settings.
    fn validate(self) -> Result<(), ConfigError> {
        if self.online_window_ms == 0 || self.online_window_ms > MAX_ONLINE_WINDOW_MS {
            return Err(ConfigError::Invalid(format!(
                "liveness.online_window_ms must be in 1..={MAX_ONLINE_WINDOW_MS}"
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates a path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.trim().is_empty() {
        return Err(ConfigError::Invalid("path must be non-empty".to_string()));
    }
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string field.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    validate_path(Path::new(trimmed)).map_err(|err| ConfigError::Invalid(format!("{field}: {err}")))
}

/// Validates a URL field and its scheme.
fn validate_url(field: &str, value: &str, schemes: &[&str]) -> Result<(), ConfigError> {
    let url = Url::parse(value.trim())
        .map_err(|err| ConfigError::Invalid(format!("{field} is not a valid url: {err}")))?;
    if !schemes.contains(&url.scheme()) {
        return Err(ConfigError::Invalid(format!(
            "{field} must use one of: {}",
            schemes.join(", ")
        )));
    }
    if url.host_str().is_none() {
        return Err(ConfigError::Invalid(format!("{field} must include a host")));
    }
    Ok(())
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default bind address.
fn default_bind() -> String {
    "127.0.0.1:7071".to_string()
}

/// Default request body limit.
pub(crate) const fn default_max_body_bytes() -> usize {
    64 * 1024
}

/// Default identity header.
fn default_identity_header() -> String {
    "x-ms-client-principal-name".to_string()
}

/// Default audit toggle.
pub(crate) const fn default_audit_enabled() -> bool {
    true
}

/// Default token lifetime.
pub(crate) const fn default_token_ttl_seconds() -> u64 {
    3600
}

/// Default broadcast buffer.
pub(crate) const fn default_channel_capacity() -> usize {
    64
}

/// Default `SQLite` busy timeout.
pub(crate) const fn default_store_busy_timeout_ms() -> u64 {
    5_000
}

/// Default slot count.
pub(crate) const fn default_slot_count() -> usize {
    SLOT_COUNT
}

/// Default per-slot ceiling.
pub(crate) const fn default_max_duration_ms() -> f64 {
    DEFAULT_MAX_DURATION_MS
}

/// Default online window.
pub(crate) const fn default_online_window_ms() -> u64 {
    4_000
}
