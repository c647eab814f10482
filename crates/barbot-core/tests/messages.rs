// crates/barbot-core/tests/messages.rs
// ============================================================================
// Module: Wire Message Tests
// Description: Coverage for status heartbeats, jobs, and config documents.
// Purpose: Pin the JSON shapes exchanged with the controller and the store.
// ============================================================================

//! Wire message tests.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use barbot_core::ActuationDurations;
use barbot_core::Channel;
use barbot_core::DurationError;
use barbot_core::JobMessage;
use barbot_core::PumpConfig;
use barbot_core::PumpConfigError;
use barbot_core::StatusMessage;
use barbot_core::StatusParseError;
use serde_json::json;

/// Tests epoch-millisecond heartbeats parse directly.
#[test]
fn status_parses_epoch_millis() {
    let status = StatusMessage::parse(r#"{"timestamp":1700000000000,"remainingJobTime":0}"#).unwrap();
    assert_eq!(status.timestamp_ms, 1_700_000_000_000);
    assert!(!status.is_busy());
}

/// Tests RFC 3339 heartbeats normalize to epoch milliseconds.
#[test]
fn status_parses_rfc3339() {
    let status =
        StatusMessage::parse(r#"{"timestamp":"2023-11-14T22:13:20.250Z","remainingJobTime":3.5}"#)
            .unwrap();
    assert_eq!(status.timestamp_ms, 1_700_000_000_250);
    assert!(status.is_busy());
    assert_eq!(status.age_ms(1_700_000_001_250), 1000);
}

/// Tests a negative remaining time reads as idle.
#[test]
fn status_negative_remaining_is_idle() {
    let status = StatusMessage::new(0, -0.2);
    assert!(!status.is_busy());
}

/// Tests malformed heartbeats are rejected with a parse error.
#[test]
fn status_rejects_malformed_payloads() {
    assert!(matches!(StatusMessage::parse("not json"), Err(StatusParseError::Json(_))));
    assert!(matches!(
        StatusMessage::parse(r#"{"timestamp":"yesterday","remainingJobTime":0}"#),
        Err(StatusParseError::Timestamp(_))
    ));
    assert!(StatusMessage::parse(r#"{"remainingJobTime":0}"#).is_err());
    assert!(StatusMessage::from_value(&json!({"timestamp": 1, "remainingJobTime": "x"})).is_err());
}

/// Tests job messages serialize with a seven-entry durations array.
#[test]
fn job_message_wire_shape() {
    let job = JobMessage {
        durations: ActuationDurations::single_slot(2, 1500.0).unwrap(),
    };
    assert_eq!(
        serde_json::to_value(job).unwrap(),
        json!({"durations": [0.0, 0.0, 1500.0, 0.0, 0.0, 0.0, 0.0]})
    );
}

/// Tests job messages with the wrong arity do not deserialize.
#[test]
fn job_message_rejects_wrong_arity() {
    let result: Result<JobMessage, _> = serde_json::from_value(json!({"durations": [1, 2, 3]}));
    assert!(result.is_err());
}

/// Tests single-slot construction rejects a slot past the rig.
#[test]
fn single_slot_rejects_out_of_range() {
    assert_eq!(ActuationDurations::single_slot(7, 10.0), Err(DurationError::SlotOutOfRange(7)));
}

/// Tests the stored configuration document shape, including null slots.
#[test]
fn pump_config_document_parses() {
    let config: PumpConfig = serde_json::from_value(json!({
        "id": "default",
        "ingredients": {"0": "gin", "1": "", "2": null},
        "pump_configs": {"0": {"flow_rate": 20, "time_offset": 500}}
    }))
    .unwrap();
    assert_eq!(config.ingredient_at(0), Some("gin"));
    assert_eq!(config.ingredient_at(1), None);
    assert_eq!(config.ingredient_at(2), None);
    assert!(config.validate().is_ok());
}

/// Tests validation catches slot keys past the rig.
#[test]
fn pump_config_rejects_out_of_range_slot() {
    let config = PumpConfig::new().with_slot(9, "gin", 20.0, 0.0);
    assert_eq!(config.validate(), Err(PumpConfigError::SlotOutOfRange(9)));
}

/// Tests channel names round-trip through their wire form.
#[test]
fn channel_names_parse() {
    for channel in Channel::ALL {
        assert_eq!(channel.as_str().parse::<Channel>().unwrap(), channel);
    }
    assert!("jobs".parse::<Channel>().is_err());
}
