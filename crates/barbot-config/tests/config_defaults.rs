//! Config defaults and loading tests for barbot-config.
// crates/barbot-config/tests/config_defaults.rs
// =============================================================================
// Module: Config Defaults and Loading Tests
// Description: Validate default behavior and file loading rules.
// Purpose: Ensure an empty config is usable and loading fails closed.
// =============================================================================

use std::fs;

use barbot_config::BarbotConfig;
use barbot_config::ConfigError;
use barbot_config::PubSubMode;
use barbot_config::StoreType;
use barbot_config::config_toml_example;

mod common;

type TestResult = Result<(), String>;

/// Tests an empty file yields the documented defaults.
#[test]
fn default_config_validates() -> TestResult {
    let config = common::minimal_config().map_err(|err| err.to_string())?;
    config.validate().map_err(|err| err.to_string())?;
    if config.server.bind != "127.0.0.1:7071" {
        return Err(format!("unexpected bind {}", config.server.bind));
    }
    if config.server.max_body_bytes != 64 * 1024 {
        return Err("max_body_bytes should default to 64 KiB".to_string());
    }
    if config.server.identity_header != "x-ms-client-principal-name" {
        return Err("identity header default changed".to_string());
    }
    if config.pubsub.is_some() {
        return Err("pubsub should be absent by default".to_string());
    }
    if config.store.store_type != StoreType::Memory {
        return Err("store should default to memory".to_string());
    }
    if config.liveness.online_window_ms != 4000 {
        return Err("online window should default to 4000 ms".to_string());
    }
    if (config.dispatch_policy().max_duration_ms - 39_000.0).abs() > f64::EPSILON {
        return Err("max duration should default to 39000 ms".to_string());
    }
    Ok(())
}

/// Tests pubsub defaults apply when only the section header is present.
#[test]
fn pubsub_section_defaults() -> TestResult {
    let config = BarbotConfig::from_toml("[pubsub]\n").map_err(|err| err.to_string())?;
    let pubsub = config.pubsub.ok_or("pubsub missing")?;
    if pubsub.mode != PubSubMode::Embedded
        || pubsub.token_ttl_seconds != 3600
        || pubsub.channel_capacity != 64
    {
        return Err("unexpected pubsub defaults".to_string());
    }
    if pubsub.connection_base("127.0.0.1:7071") != "ws://127.0.0.1:7071" {
        return Err("embedded connection base should follow bind".to_string());
    }
    Ok(())
}

/// Tests the canonical example parses and validates.
#[test]
fn example_config_validates() -> TestResult {
    let config =
        BarbotConfig::from_toml(&config_toml_example()).map_err(|err| err.to_string())?;
    if config.store.store_type != StoreType::Sqlite {
        return Err("example should use sqlite".to_string());
    }
    Ok(())
}

/// Tests loading reads an explicit path.
#[test]
fn load_reads_explicit_path() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("barbot.toml");
    fs::write(&path, "[liveness]\nonline_window_ms = 2500\n").map_err(|err| err.to_string())?;
    let config = BarbotConfig::load(Some(&path)).map_err(|err| err.to_string())?;
    if config.liveness.online_window_ms != 2500 {
        return Err("online window not loaded".to_string());
    }
    Ok(())
}

/// Tests a missing file is an I/O error.
#[test]
fn load_missing_file_is_io_error() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    match BarbotConfig::load(Some(&dir.path().join("absent.toml"))) {
        Err(ConfigError::Io(_)) => Ok(()),
        other => Err(format!("expected io error, got {other:?}")),
    }
}

/// Tests oversized files are rejected before parsing.
#[test]
fn load_rejects_oversized_file() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("big.toml");
    let padding = format!("# {}\n", "x".repeat(1024 * 1024));
    fs::write(&path, padding).map_err(|err| err.to_string())?;
    common::assert_invalid(BarbotConfig::load(Some(&path)).map(|_| ()), "size limit")
}

/// Tests non-UTF-8 files are rejected.
#[test]
fn load_rejects_non_utf8() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("bad.toml");
    fs::write(&path, [0xff, 0xfe, 0x00]).map_err(|err| err.to_string())?;
    common::assert_invalid(BarbotConfig::load(Some(&path)).map(|_| ()), "utf-8")
}

/// Tests unknown enum values are parse errors.
#[test]
fn unknown_store_type_is_parse_error() -> TestResult {
    match BarbotConfig::from_toml("[store]\ntype = \"cosmos\"\n") {
        Err(ConfigError::Parse(_)) => Ok(()),
        other => Err(format!("expected parse error, got {other:?}")),
    }
}
