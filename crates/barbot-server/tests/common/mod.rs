// crates/barbot-server/tests/common/mod.rs
// ============================================================================
// Module: Server Test Helpers
// Description: Spawn a server on an ephemeral port with a recording audit sink.
// Purpose: Share fixtures across server integration suites.
// ============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use std::sync::Arc;
use std::sync::Mutex;

use barbot_broker::ChannelHub;
use barbot_config::BarbotConfig;
use barbot_core::InMemoryRecipeStore;
use barbot_core::PumpConfig;
use barbot_core::Recipe;
use barbot_core::RecipeIngredient;
use barbot_core::SharedRecipeStore;
use barbot_server::AuditEvent;
use barbot_server::AuditSink;
use barbot_server::ServerBuilder;
use serde_json::Value;
use tokio::net::TcpListener;

/// Audit sink that keeps every event as JSON.
#[derive(Default)]
pub struct RecordingAudit {
    events: Mutex<Vec<Value>>,
}

impl RecordingAudit {
    /// Returns recorded events with the given `event` label.
    pub fn events(&self, label: &str) -> Vec<Value> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|event| event["event"] == label)
            .cloned()
            .collect()
    }
}

impl AuditSink for RecordingAudit {
    fn record(&self, event: &AuditEvent) {
        self.events.lock().unwrap().push(serde_json::to_value(event).unwrap());
    }
}

/// Running server under test.
pub struct TestServer {
    /// Base HTTP URL.
    pub base: String,
    /// Embedded hub, when configured.
    pub hub: Option<Arc<ChannelHub>>,
    /// Recorded audit events.
    pub audit: Arc<RecordingAudit>,
}

impl TestServer {
    /// Returns the absolute URL for `path`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }
}

/// Store with gin on slot 0 and two recipes, one of which needs vermouth.
pub fn gin_store() -> SharedRecipeStore {
    let config = PumpConfig::new().with_slot(0, "gin", 20.0, 500.0);
    let recipes = vec![
        Recipe::new("gin_shot", "Gin Shot", vec![RecipeIngredient::new("gin", 60.0)]),
        Recipe::new(
            "martini",
            "Martini",
            vec![RecipeIngredient::new("gin", 60.0), RecipeIngredient::new("vermouth", 10.0)],
        ),
        Recipe::new("flood", "Flood", vec![RecipeIngredient::new("gin", 1_000.0)]),
    ];
    SharedRecipeStore::from_store(InMemoryRecipeStore::with_data(Some(config), recipes).unwrap())
}

/// Embedded pub/sub with a service key.
pub const EMBEDDED: &str = "[pubsub]\nmode = \"embedded\"\naccess_key = \"hub-key\"\n";

/// Spawns a server bound to an ephemeral port with `extra` appended to its config.
pub async fn spawn(extra: &str, store: SharedRecipeStore) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let toml = format!("[server]\nbind = \"{addr}\"\n{extra}");
    let config = BarbotConfig::from_toml(&toml).unwrap();
    let audit = Arc::new(RecordingAudit::default());
    let server = ServerBuilder::new(config)
        .store(store)
        .audit_sink(Arc::clone(&audit) as Arc<dyn AuditSink>)
        .build()
        .unwrap();
    let hub = server.hub();
    tokio::spawn(server.serve_on(listener));
    TestServer {
        base: format!("http://{addr}"),
        hub,
        audit,
    }
}
