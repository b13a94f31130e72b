// crates/issuance-provisioner/src/audit.rs
// ============================================================================
// Module: Provisioner Audit Logging
// Description: Structured audit events for provisioner lifecycle and signing.
// Purpose: Emit redacted JSON-line audit logs without hard dependencies.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Audit events record provisioner initialization and sign authorization.
//! Sinks are pluggable so deployments can route events to their preferred
//! logging pipeline. Events never carry challenge secrets or tokens.

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

use serde::Serialize;

use crate::provisioner::ProvisionerType;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Event name for provisioner initialization.
pub const EVENT_PROVISIONER_INIT: &str = "provisioner_init";
/// Event name for sign authorization.
pub const EVENT_PROVISIONER_AUTHORIZE_SIGN: &str = "provisioner_authorize_sign";

/// Audit outcome label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionerAuditOutcome {
    /// Operation succeeded.
    Success,
    /// Operation failed.
    Failure,
}

/// Provisioner audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionerAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Provisioner identifier.
    pub provisioner_id: String,
    /// Provisioner kind.
    pub provisioner_type: ProvisionerType,
    /// Provisioner name.
    pub provisioner_name: String,
    /// Operation outcome.
    pub outcome: ProvisionerAuditOutcome,
    /// Failure message when present.
    pub message: Option<String>,
}

/// Inputs required to construct a provisioner audit event.
pub struct ProvisionerAuditEventParams {
    /// Provisioner identifier.
    pub provisioner_id: String,
    /// Provisioner kind.
    pub provisioner_type: ProvisionerType,
    /// Provisioner name.
    pub provisioner_name: String,
    /// Operation outcome.
    pub outcome: ProvisionerAuditOutcome,
    /// Failure message when present.
    pub message: Option<String>,
}

impl ProvisionerAuditEvent {
    /// Creates a new audit event with a consistent timestamp.
    #[must_use]
    pub fn new(event: &'static str, params: ProvisionerAuditEventParams) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event,
            timestamp_ms,
            provisioner_id: params.provisioner_id,
            provisioner_type: params.provisioner_type,
            provisioner_name: params.provisioner_name,
            outcome: params.outcome,
            message: params.message,
        }
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for provisioner events.
pub trait ProvisionerAuditSink: Send + Sync {
    /// Record an audit event.
    fn record(&self, event: &ProvisionerAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl ProvisionerAuditSink for StderrAuditSink {
    fn record(&self, event: &ProvisionerAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
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

impl ProvisionerAuditSink for FileAuditSink {
    fn record(&self, event: &ProvisionerAuditEvent) {
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

impl ProvisionerAuditSink for NoopAuditSink {
    fn record(&self, _event: &ProvisionerAuditEvent) {}
}
