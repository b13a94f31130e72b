// crates/issuance-provisioner/tests/common/mod.rs
// =============================================================================
// Module: Provisioner Test Helpers
// Description: Shared fixtures for provisioner integration tests.
// Purpose: Reduce duplication across integration tests for issuance-provisioner.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use std::sync::Mutex;

use issuance_provisioner::CertificateTemplate;
use issuance_provisioner::InitConfig;
use issuance_provisioner::ProvisionerAuditEvent;
use issuance_provisioner::ProvisionerAuditSink;
use issuance_provisioner::ProvisionerInterface;
use issuance_provisioner::PublicKeyInfo;
use issuance_provisioner::ScepProvisioner;
use issuance_provisioner::SignRequest;
use serde_json::Value;
use serde_json::json;
use time::OffsetDateTime;

/// Fixed evaluation time used by pipeline tests.
pub const FIXED_UNIX_SECONDS: i64 = 1_700_000_000;

/// Returns a minimal SCEP provisioner document.
pub fn scep_document(name: &str) -> Value {
    json!({
        "type": "SCEP",
        "name": name,
        "challenge": "s3cret",
    })
}

/// Decodes a SCEP provisioner document.
pub fn decode_scep(document: Value) -> Result<ScepProvisioner, String> {
    serde_json::from_value(document).map_err(|err| err.to_string())
}

/// Decodes and initializes a SCEP provisioner with global default claims.
pub fn initialized_scep(document: Value) -> Result<ScepProvisioner, String> {
    let mut provisioner = decode_scep(document)?;
    provisioner.init(&InitConfig::default()).map_err(|err| err.to_string())?;
    Ok(provisioner)
}

/// Returns the fixed evaluation time.
pub fn fixed_now() -> Result<OffsetDateTime, String> {
    OffsetDateTime::from_unix_timestamp(FIXED_UNIX_SECONDS).map_err(|err| err.to_string())
}

/// Returns a sign request evaluated at the fixed time.
pub fn fixed_request() -> Result<SignRequest, String> {
    Ok(SignRequest::at(fixed_now()?))
}

/// Returns a template with one DNS name and an RSA key of `bits`.
pub fn rsa_template(bits: u32) -> CertificateTemplate {
    CertificateTemplate {
        dns_names: vec!["device.example.com".to_string()],
        public_key: Some(PublicKeyInfo::Rsa {
            bits,
        }),
        ..CertificateTemplate::default()
    }
}

/// Audit sink that keeps events in memory.
#[derive(Default)]
pub struct RecordingAuditSink {
    /// Recorded events.
    events: Mutex<Vec<ProvisionerAuditEvent>>,
}

impl RecordingAuditSink {
    /// Returns a snapshot of recorded events.
    pub fn events(&self) -> Vec<ProvisionerAuditEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }
}

impl ProvisionerAuditSink for RecordingAuditSink {
    fn record(&self, event: &ProvisionerAuditEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
