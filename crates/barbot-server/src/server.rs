// crates/barbot-server/src/server.rs
// ============================================================================
// Module: Barbot Server
// Description: Server assembly from configuration and the HTTP listener.
// Purpose: Wire the store, broadcast transport, dispatcher, and audit sink.
// Dependencies: axum, barbot-broker, barbot-config, barbot-core, tokio
// ============================================================================

//! ## Overview
//! [`ServerBuilder`] turns a validated [`BarbotConfig`] into a
//! [`BarbotServer`]: it opens the recipe store, builds the publisher and
//! negotiator for the configured pub/sub mode, and injects them into the
//! [`JobDispatcher`]. Nothing is read from the process environment per
//! request. Startup posture warnings (missing transport, hub without access
//! key, duplicate pump assignments) are emitted as security audit events.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use barbot_broker::AccessKey;
use barbot_broker::ChannelHub;
use barbot_broker::EmbeddedNegotiator;
use barbot_broker::HttpPublisher;
use barbot_broker::HubPublisher;
use barbot_broker::RemoteNegotiator;
use barbot_broker::TokenIssuer;
use barbot_config::BarbotConfig;
use barbot_config::PubSubConfig;
use barbot_config::PubSubMode;
use barbot_config::StoreConfig;
use barbot_config::StoreType;
use barbot_core::ChannelNegotiator;
use barbot_core::ChannelPublisher;
use barbot_core::InMemoryRecipeStore;
use barbot_core::JobDispatcher;
use barbot_core::RecipeStore;
use barbot_core::SharedRecipeStore;
use barbot_store_sqlite::SqliteRecipeStore;
use barbot_store_sqlite::SqliteStoreConfig;
use barbot_store_sqlite::load_seed_dir;
use tokio::net::TcpListener;

use crate::audit::AuditEvent;
use crate::audit::AuditSink;
use crate::audit::FileAuditSink;
use crate::audit::NoopAuditSink;
use crate::audit::SecurityAuditEvent;
use crate::audit::StderrAuditSink;
use crate::error::ServerError;
use crate::routes::build_router;

// ============================================================================
// SECTION: Shared State
// ============================================================================

/// Embedded hub components.
pub(crate) struct EmbeddedHub {
    /// In-process fan-out.
    pub(crate) hub: Arc<ChannelHub>,
    /// Publisher over `hub`, used by the send endpoint.
    pub(crate) publisher: HubPublisher,
    /// Token issuer shared with the websocket endpoint.
    pub(crate) issuer: Arc<TokenIssuer>,
    /// Negotiator used by the token endpoint.
    pub(crate) negotiator: EmbeddedNegotiator,
    /// Service key for the hub REST endpoints; `None` rejects every call.
    pub(crate) access_key: Option<AccessKey>,
}

/// State shared by every request handler.
pub(crate) struct AppState {
    /// Job dispatcher with its store and publisher.
    pub(crate) dispatcher: JobDispatcher,
    /// Connection negotiator, when pub/sub is configured.
    pub(crate) negotiator: Option<Arc<dyn ChannelNegotiator>>,
    /// Embedded hub, when this server hosts it.
    pub(crate) hub: Option<EmbeddedHub>,
    /// Audit sink.
    pub(crate) audit: Arc<dyn AuditSink>,
    /// Lower-cased header carrying the caller identity.
    pub(crate) identity_header: String,
}

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Assembles a [`BarbotServer`] with optional overrides.
pub struct ServerBuilder {
    /// Server configuration.
    config: BarbotConfig,
    /// Store override.
    store: Option<SharedRecipeStore>,
    /// Job publisher override.
    publisher: Option<Arc<dyn ChannelPublisher>>,
    /// Audit sink override.
    audit: Option<Arc<dyn AuditSink>>,
}

impl ServerBuilder {
    /// Starts a builder from configuration.
    #[must_use]
    pub fn new(config: BarbotConfig) -> Self {
        Self {
            config,
            store: None,
            publisher: None,
            audit: None,
        }
    }

    /// Uses `store` instead of the configured one.
    #[must_use]
    pub fn store(mut self, store: SharedRecipeStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Publishes jobs through `publisher` instead of the configured transport.
    #[must_use]
    pub fn publisher(mut self, publisher: Arc<dyn ChannelPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Records audit events through `audit` instead of the configured sink.
    #[must_use]
    pub fn audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Builds the server.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when configuration is invalid or a backend
    /// cannot be initialized.
    pub fn build(self) -> Result<BarbotServer, ServerError> {
        let config = self.config;
        config.validate().map_err(|err| ServerError::Config(err.to_string()))?;
        let audit = match self.audit {
            Some(audit) => audit,
            None => build_audit_sink(&config)?,
        };
        let store = match self.store {
            Some(store) => store,
            None => build_store(&config.store)?,
        };

        let transport = match &config.pubsub {
            Some(pubsub) => build_transport(pubsub, &config.server.bind)?,
            None => Transport::default(),
        };
        let publisher = self.publisher.or(transport.publisher);

        emit_posture_warnings(&config, &store, transport.hub.as_ref(), audit.as_ref());

        let dispatcher = JobDispatcher::new(store, publisher, config.dispatch_policy());
        let state = AppState {
            dispatcher,
            negotiator: transport.negotiator,
            hub: transport.hub,
            audit,
            identity_header: config.server.identity_header.trim().to_ascii_lowercase(),
        };
        Ok(BarbotServer {
            config,
            state: Arc::new(state),
        })
    }
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// Barbot HTTP server instance.
pub struct BarbotServer {
    /// Validated configuration.
    config: BarbotConfig,
    /// Handler state.
    state: Arc<AppState>,
}

impl BarbotServer {
    /// Builds a server from configuration with no overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when initialization fails.
    pub fn from_config(config: BarbotConfig) -> Result<Self, ServerError> {
        ServerBuilder::new(config).build()
    }

    /// Returns the embedded hub, when this server hosts one.
    #[must_use]
    pub fn hub(&self) -> Option<Arc<ChannelHub>> {
        self.state.hub.as_ref().map(|embedded| Arc::clone(&embedded.hub))
    }

    /// Returns the axum router for this server.
    #[must_use]
    pub fn router(&self) -> Router {
        build_router(Arc::clone(&self.state), self.config.server.max_body_bytes)
    }

    /// Binds the configured address and serves until the listener fails.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), ServerError> {
        let addr: SocketAddr =
            self.config.server.bind_addr().map_err(|err| ServerError::Config(err.to_string()))?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|err| ServerError::Transport(format!("http bind failed: {err}")))?;
        self.serve_on(listener).await
    }

    /// Serves on an already-bound listener.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when serving fails.
    pub async fn serve_on(self, listener: TcpListener) -> Result<(), ServerError> {
        let app = self.router();
        axum::serve(listener, app)
            .await
            .map_err(|err| ServerError::Transport(format!("http server failed: {err}")))
    }
}

// ============================================================================
// SECTION: Backends
// ============================================================================

/// Broadcast transport components for one pub/sub mode.
#[derive(Default)]
struct Transport {
    /// Job publisher.
    publisher: Option<Arc<dyn ChannelPublisher>>,
    /// Connection negotiator.
    negotiator: Option<Arc<dyn ChannelNegotiator>>,
    /// Embedded hub components.
    hub: Option<EmbeddedHub>,
}

/// Builds the audit sink from `[server.audit]`.
fn build_audit_sink(config: &BarbotConfig) -> Result<Arc<dyn AuditSink>, ServerError> {
    let audit = &config.server.audit;
    if !audit.enabled {
        return Ok(Arc::new(NoopAuditSink));
    }
    match &audit.path {
        Some(path) => {
            let sink = FileAuditSink::new(Path::new(path))
                .map_err(|err| ServerError::Init(format!("audit log open failed: {err}")))?;
            Ok(Arc::new(sink))
        }
        None => Ok(Arc::new(StderrAuditSink)),
    }
}

/// Opens the configured recipe store.
///
/// # Errors
///
/// Returns [`ServerError::Init`] when the store or its seed cannot be loaded.
pub fn build_store(config: &StoreConfig) -> Result<SharedRecipeStore, ServerError> {
    match config.store_type {
        StoreType::Memory => {
            let store = match &config.seed_dir {
                Some(dir) => {
                    let seed =
                        load_seed_dir(dir).map_err(|err| ServerError::Init(err.to_string()))?;
                    InMemoryRecipeStore::with_data(seed.config, seed.recipes)
                        .map_err(|err| ServerError::Init(err.to_string()))?
                }
                None => InMemoryRecipeStore::new(),
            };
            Ok(SharedRecipeStore::from_store(store))
        }
        StoreType::Sqlite => {
            let path = config
                .path
                .as_ref()
                .ok_or_else(|| ServerError::Config("sqlite store requires path".to_string()))?;
            let mut sqlite_config = SqliteStoreConfig::new(path.clone());
            sqlite_config.busy_timeout_ms = config.busy_timeout_ms;
            let store = SqliteRecipeStore::new(&sqlite_config)
                .map_err(|err| ServerError::Init(err.to_string()))?;
            Ok(SharedRecipeStore::from_store(store))
        }
    }
}

/// Builds the publisher, negotiator, and hub for the pub/sub mode.
fn build_transport(pubsub: &PubSubConfig, bind: &str) -> Result<Transport, ServerError> {
    match pubsub.mode {
        PubSubMode::Embedded => {
            let hub = Arc::new(ChannelHub::new(pubsub.channel_capacity));
            let issuer = Arc::new(TokenIssuer::new(Duration::from_secs(pubsub.token_ttl_seconds)));
            let negotiator =
                EmbeddedNegotiator::new(Arc::clone(&issuer), &pubsub.connection_base(bind))
                    .map_err(|err| ServerError::Config(err.to_string()))?;
            let publisher = HubPublisher::new(Arc::clone(&hub));
            let embedded = EmbeddedHub {
                hub,
                publisher: publisher.clone(),
                issuer,
                negotiator: negotiator.clone(),
                access_key: pubsub.access_key.clone().map(AccessKey::new),
            };
            Ok(Transport {
                publisher: Some(Arc::new(publisher)),
                negotiator: Some(Arc::new(negotiator)),
                hub: Some(embedded),
            })
        }
        PubSubMode::Remote => {
            let endpoint = pubsub
                .endpoint
                .as_deref()
                .ok_or_else(|| ServerError::Config("remote pubsub requires endpoint".to_string()))?;
            let key = pubsub.access_key.clone().ok_or_else(|| {
                ServerError::Config("remote pubsub requires access_key".to_string())
            })?;
            let publisher = HttpPublisher::new(endpoint, AccessKey::new(key.clone()))
                .map_err(|err| ServerError::Init(err.to_string()))?;
            let negotiator = RemoteNegotiator::new(endpoint, AccessKey::new(key))
                .map_err(|err| ServerError::Init(err.to_string()))?;
            Ok(Transport {
                publisher: Some(Arc::new(publisher)),
                negotiator: Some(Arc::new(negotiator)),
                hub: None,
            })
        }
    }
}

/// Records startup security posture warnings.
fn emit_posture_warnings(
    config: &BarbotConfig,
    store: &SharedRecipeStore,
    hub: Option<&EmbeddedHub>,
    audit: &dyn AuditSink,
) {
    if config.pubsub.is_none() {
        audit.record(&AuditEvent::Security(SecurityAuditEvent::new(
            "pubsub_unconfigured",
            "no [pubsub] section; negotiate and mix will fail with a configuration error",
        )));
    }
    if hub.is_some_and(|embedded| embedded.access_key.is_none()) {
        audit.record(&AuditEvent::Security(SecurityAuditEvent::new(
            "hub_without_access_key",
            "embedded hub has no access_key; hub send and token endpoints reject every call",
        )));
    }
    match store.load_config() {
        Ok(Some(pump_config)) => {
            for (ingredient, slots) in pump_config.duplicate_assignments() {
                let slots = slots.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
                audit.record(&AuditEvent::Security(SecurityAuditEvent::new(
                    "duplicate_pump_assignment",
                    format!("ingredient {ingredient} is loaded in slots {slots}; the first slot wins"),
                )));
            }
        }
        Ok(None) => audit.record(&AuditEvent::Security(SecurityAuditEvent::new(
            "pump_config_missing",
            "no pump configuration stored; drinks and mix will fail until one is imported",
        ))),
        Err(err) => audit.record(&AuditEvent::Security(SecurityAuditEvent::new(
            "store_unreadable",
            err.to_string(),
        ))),
    }
}
