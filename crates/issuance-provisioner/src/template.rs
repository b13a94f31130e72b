// crates/issuance-provisioner/src/template.rs
// ============================================================================
// Module: Certificate Template Model
// Description: The certificate fields that sign policy elements read and write.
// Purpose: Give modifiers and validators a concrete, encoding-free subject.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! [`CertificateTemplate`] is the pre-signing view of a certificate request.
//! It carries only the fields the policy pipeline acts on; encoding and
//! signing belong to the signing engine. [`SignRequest`] carries the
//! per-request inputs (evaluation time and requested validity bounds).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::IpAddr;

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

use crate::provisioner::ProvisionerType;

// ============================================================================
// SECTION: Template
// ============================================================================

/// Certificate subject.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// Subject common name.
    #[serde(default)]
    pub common_name: String,
}

/// Public key presented in the certificate request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "snake_case")]
pub enum PublicKeyInfo {
    /// RSA key with its modulus length in bits.
    Rsa {
        /// Modulus length in bits.
        bits: u32,
    },
    /// ECDSA key on a named curve.
    Ecdsa {
        /// Curve name (for example `P-256`).
        curve: String,
    },
    /// Ed25519 key.
    Ed25519,
}

/// Extension identifying the provisioner that authorized a certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionerExtension {
    /// Provisioner kind.
    pub kind: ProvisionerType,
    /// Provisioner name.
    pub name: String,
    /// Credential identifier (empty when the kind has none).
    pub credential_id: String,
}

/// Certificate template shaped by the sign policy pipeline.
///
/// # Invariants
/// - Validity bounds stay unset until a modifier or the caller fills them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificateTemplate {
    /// Certificate subject.
    pub subject: Subject,
    /// DNS subject alternative names.
    pub dns_names: Vec<String>,
    /// Email subject alternative names.
    pub email_addresses: Vec<String>,
    /// IP subject alternative names.
    pub ip_addresses: Vec<IpAddr>,
    /// URI subject alternative names.
    pub uris: Vec<String>,
    /// Start of the validity window.
    pub not_before: Option<OffsetDateTime>,
    /// End of the validity window.
    pub not_after: Option<OffsetDateTime>,
    /// Requested public key.
    pub public_key: Option<PublicKeyInfo>,
    /// Provisioner extension attached by the pipeline.
    pub provisioner_extension: Option<ProvisionerExtension>,
}

impl CertificateTemplate {
    /// Returns the first subject alternative name in DNS, email, IP, URI order.
    #[must_use]
    pub fn first_san(&self) -> Option<String> {
        self.dns_names
            .first()
            .cloned()
            .or_else(|| self.email_addresses.first().cloned())
            .or_else(|| self.ip_addresses.first().map(ToString::to_string))
            .or_else(|| self.uris.first().cloned())
    }
}

// ============================================================================
// SECTION: Sign Request
// ============================================================================

/// Per-request inputs consumed by modifiers and validators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignRequest {
    /// Evaluation time for defaults and validity checks.
    pub now: OffsetDateTime,
    /// Requested start of validity, if any.
    pub not_before: Option<OffsetDateTime>,
    /// Requested end of validity, if any.
    pub not_after: Option<OffsetDateTime>,
}

impl SignRequest {
    /// Creates a request evaluated at `now` with no requested bounds.
    #[must_use]
    pub const fn at(now: OffsetDateTime) -> Self {
        Self {
            now,
            not_before: None,
            not_after: None,
        }
    }

    /// Creates a request evaluated at the current UTC time.
    #[must_use]
    pub fn now() -> Self {
        Self::at(OffsetDateTime::now_utc())
    }
}
