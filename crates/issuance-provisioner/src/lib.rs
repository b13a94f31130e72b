// crates/issuance-provisioner/src/lib.rs
// ============================================================================
// Module: Issuance Provisioner Library
// Description: Provisioner configuration, initialization, and sign policy.
// Purpose: Turn configured enrollment channels into per-request policy pipelines.
// Dependencies: humantime, serde, serde_json, subtle, thiserror, time, toml
// ============================================================================

//! ## Overview
//! `issuance-provisioner` models the authorities that may request certificate
//! issuance. A provisioner is validated and normalized once by `init`; each
//! issuance request then asks it for an ordered list of policy elements that
//! modify and validate the certificate template before signing.
//!
//! The SCEP provisioner is the implemented kind. Its challenge password is a
//! secret that never leaves the process through serialization or logs.
//!
//! Security posture: configuration documents are untrusted and fail closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod claims;
pub mod collection;
pub mod config;
pub mod policy;
pub mod provisioner;
pub mod scep;
pub mod template;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::ProvisionerAuditEvent;
pub use audit::ProvisionerAuditOutcome;
pub use audit::ProvisionerAuditSink;
pub use audit::StderrAuditSink;
pub use claims::Claimer;
pub use claims::Claims;
pub use claims::ClaimsError;
pub use collection::ProvisionerCollection;
pub use config::AuthorityConfig;
pub use config::ConfigError;
pub use policy::CertificateModifier;
pub use policy::CertificateValidator;
pub use policy::PolicyElement;
pub use policy::PolicyElementKind;
pub use policy::PolicyElementSummary;
pub use policy::PolicyViolation;
pub use policy::apply_policy;
pub use provisioner::InitConfig;
pub use provisioner::Provisioner;
pub use provisioner::ProvisionerError;
pub use provisioner::ProvisionerInterface;
pub use provisioner::ProvisionerType;
pub use scep::ContentEncryptionAlgorithm;
pub use scep::ScepProvisioner;
pub use template::CertificateTemplate;
pub use template::ProvisionerExtension;
pub use template::PublicKeyInfo;
pub use template::SignRequest;
pub use template::Subject;
