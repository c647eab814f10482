// crates/barbot-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payload.
// Purpose: Deterministic example for docs and `barbot config check`.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical example `barbot.toml`. Kept valid by the crate's tests.

/// Returns a canonical example `barbot.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[server]
bind = "127.0.0.1:7071"
max_body_bytes = 65536
identity_header = "x-ms-client-principal-name"

[server.audit]
enabled = true
# path = "barbot-audit.jsonl"

[pubsub]
mode = "embedded"
public_url = "ws://127.0.0.1:7071"
access_key = "change-me-to-a-long-random-string"
token_ttl_seconds = 3600
channel_capacity = 64

[store]
type = "sqlite"
path = "barbot.db"
busy_timeout_ms = 5000

[pumps]
slot_count = 7
max_duration_ms = 39000

[liveness]
online_window_ms = 4000
"#,
    )
}
