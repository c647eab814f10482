// crates/barbot-server/src/audit.rs
// ============================================================================
// Module: Server Audit Logging
// Description: Structured audit events for requests, jobs, and negotiation.
// Purpose: Emit JSON-line audit records without hard logging dependencies.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Audit events are serialized as one JSON object per line with an `event`
//! discriminator. Sinks are chosen from `[server.audit]`: stderr by default,
//! an append-only file when a path is set, or nothing when disabled.
//! Security posture: events carry caller identities and error text but never
//! access keys or connection tokens.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use barbot_core::Channel;
use barbot_core::DispatchOrigin;
use serde::Serialize;

// ============================================================================
// SECTION: Events
// ============================================================================

/// Request outcome label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestOutcome {
    /// Request succeeded.
    Ok,
    /// Request failed.
    Error,
}

/// One audited HTTP request.
#[derive(Debug, Clone, Serialize)]
pub struct RequestAuditEvent {
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Route label, e.g. `mix`.
    pub route: &'static str,
    /// Outcome label.
    pub outcome: RequestOutcome,
    /// HTTP status code returned.
    pub status: u16,
    /// Error kind label when the request failed.
    pub error_kind: Option<&'static str>,
    /// Error text when the request failed.
    pub error: Option<String>,
    /// Caller identity when supplied.
    pub caller: Option<String>,
    /// Request body size in bytes.
    pub request_bytes: usize,
    /// Handling latency in milliseconds.
    pub latency_ms: u128,
}

/// One job published on the job channel.
#[derive(Debug, Clone, Serialize)]
pub struct JobAuditEvent {
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Channel the job went out on.
    pub channel: Channel,
    /// Whether the job came from a recipe or manual actuation.
    pub origin: &'static str,
    /// Recipe identifier for mix jobs.
    pub recipe_id: Option<String>,
    /// Published durations in milliseconds.
    pub durations: Vec<f64>,
    /// Subscribers reached, when the transport reports it.
    pub subscribers: Option<usize>,
}

impl JobAuditEvent {
    /// Builds a job event stamped with the current time.
    #[must_use]
    pub fn new(
        origin: DispatchOrigin,
        recipe_id: Option<String>,
        durations: Vec<f64>,
        subscribers: Option<usize>,
    ) -> Self {
        Self {
            timestamp_ms: now_millis(),
            channel: Channel::Job,
            origin: origin.as_str(),
            recipe_id,
            durations,
            subscribers,
        }
    }
}

/// One issued connection grant.
#[derive(Debug, Clone, Serialize)]
pub struct NegotiateAuditEvent {
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Caller the grant was issued to.
    pub caller: String,
    /// Channel the grant subscribes to.
    pub channel: Channel,
    /// Grant expiry, epoch milliseconds.
    pub expires_at_ms: i64,
}

/// Security posture warning.
#[derive(Debug, Clone, Serialize)]
pub struct SecurityAuditEvent {
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Stable warning kind.
    pub kind: &'static str,
    /// Human-readable detail.
    pub message: String,
}

impl SecurityAuditEvent {
    /// Builds a security event stamped with the current time.
    #[must_use]
    pub fn new(kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            timestamp_ms: now_millis(),
            kind,
            message: message.into(),
        }
    }
}

/// Audit record as written by sinks.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    /// HTTP request.
    Request(RequestAuditEvent),
    /// Published job.
    JobPublished(JobAuditEvent),
    /// Issued connection grant.
    Negotiate(NegotiateAuditEvent),
    /// Security posture warning.
    Security(SecurityAuditEvent),
}

impl AuditEvent {
    /// Returns the `event` label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Request(_) => "request",
            Self::JobPublished(_) => "job_published",
            Self::Negotiate(_) => "negotiate",
            Self::Security(_) => "security",
        }
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink for server events.
pub trait AuditSink: Send + Sync {
    /// Records an audit event.
    fn record(&self, event: &AuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl AuditSink for StderrAuditSink {
    fn record(&self, event: &AuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that appends JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl AuditSink for FileAuditSink {
    fn record(&self, event: &AuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _event: &AuditEvent) {}
}

/// Returns the current unix time in milliseconds.
pub(crate) fn now_millis() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis()).unwrap_or(0)
}
