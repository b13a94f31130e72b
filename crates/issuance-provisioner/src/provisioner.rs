// crates/issuance-provisioner/src/provisioner.rs
// ============================================================================
// Module: Provisioner Kinds and Contract
// Description: Closed provisioner enumeration and the shared capability trait.
// Purpose: Select provisioner kinds at configuration time without type registries.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Every provisioner kind implements [`ProvisionerInterface`]: identity
//! accessors, one-time [`ProvisionerInterface::init`], and per-request
//! [`ProvisionerInterface::authorize_sign`]. [`Provisioner`] is the closed
//! set of kinds this build implements; documents are decoded by reading the
//! `type` field first and then the kind-specific body.
//! Invariants:
//! - `init` runs exactly once, before any concurrent read access.
//! - `authorize_sign` is read-only over the initialized configuration.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::claims::Claims;
use crate::claims::ClaimsError;
use crate::policy::PolicyElement;
use crate::scep::ScepProvisioner;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Provisioner errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - Messages never include challenge secrets.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProvisionerError {
    /// Invalid or missing provisioner configuration.
    #[error("{0}")]
    Config(String),
    /// Claim resolution failed in the claimer.
    #[error(transparent)]
    Claims(#[from] ClaimsError),
    /// Operation or kind not implemented.
    #[error("{0}")]
    Unsupported(String),
    /// Provisioner document could not be decoded.
    #[error("invalid provisioner document: {0}")]
    Decode(String),
    /// No provisioner matches the requested identifier.
    #[error("provisioner {0:?} not found")]
    NotFound(String),
}

// ============================================================================
// SECTION: Provisioner Types
// ============================================================================

/// Provisioner kinds with their stable extension codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProvisionerType {
    /// Placeholder kind.
    Noop,
    /// JSON Web Key provisioner.
    Jwk,
    /// OpenID Connect provisioner.
    Oidc,
    /// Google Cloud identity provisioner.
    Gcp,
    /// AWS identity provisioner.
    Aws,
    /// Azure identity provisioner.
    Azure,
    /// ACME provisioner.
    Acme,
    /// X.509 certificate provisioner.
    X5c,
    /// Kubernetes service account provisioner.
    K8sSa,
    /// SSH proof-of-possession provisioner.
    SshPop,
    /// SCEP provisioner.
    Scep,
    /// Nebula provisioner.
    Nebula,
}

impl ProvisionerType {
    /// All kinds in code order.
    pub const ALL: [Self; 12] = [
        Self::Noop,
        Self::Jwk,
        Self::Oidc,
        Self::Gcp,
        Self::Aws,
        Self::Azure,
        Self::Acme,
        Self::X5c,
        Self::K8sSa,
        Self::SshPop,
        Self::Scep,
        Self::Nebula,
    ];

    /// Returns the numeric code recorded in the provisioner extension.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Noop => 0,
            Self::Jwk => 1,
            Self::Oidc => 2,
            Self::Gcp => 3,
            Self::Aws => 4,
            Self::Azure => 5,
            Self::Acme => 6,
            Self::X5c => 7,
            Self::K8sSa => 8,
            Self::SshPop => 9,
            Self::Scep => 10,
            Self::Nebula => 11,
        }
    }

    /// Returns the canonical upper-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Noop => "NOOP",
            Self::Jwk => "JWK",
            Self::Oidc => "OIDC",
            Self::Gcp => "GCP",
            Self::Aws => "AWS",
            Self::Azure => "AZURE",
            Self::Acme => "ACME",
            Self::X5c => "X5C",
            Self::K8sSa => "K8SSA",
            Self::SshPop => "SSHPOP",
            Self::Scep => "SCEP",
            Self::Nebula => "NEBULA",
        }
    }
}

impl fmt::Display for ProvisionerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProvisionerType {
    type Err = ProvisionerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(value))
            .ok_or_else(|| {
                ProvisionerError::Unsupported(format!("unsupported provisioner type {value:?}"))
            })
    }
}

impl Serialize for ProvisionerType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ProvisionerType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// SECTION: Init Configuration
// ============================================================================

/// Process-wide inputs to provisioner initialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitConfig {
    /// Global claims merged under each provisioner's overrides.
    pub claims: Claims,
}

impl Default for InitConfig {
    fn default() -> Self {
        Self {
            claims: Claims::global_defaults(),
        }
    }
}

// ============================================================================
// SECTION: Provisioner Contract
// ============================================================================

/// Capability set shared by every provisioner kind.
pub trait ProvisionerInterface {
    /// Returns the unique identifier, synthesized from kind and name when unset.
    fn id(&self) -> String;

    /// Returns the identifier used to look the provisioner up from a token.
    fn id_for_token(&self) -> String;

    /// Returns the provisioner name.
    fn name(&self) -> &str;

    /// Returns the provisioner kind.
    fn provisioner_type(&self) -> ProvisionerType;

    /// Returns `(key id, encrypted key)` when the kind carries one.
    fn encrypted_key(&self) -> Option<(&str, &str)> {
        None
    }

    /// Extracts the token identifier from a one-time token.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionerError`] when the kind does not use tokens or the
    /// token is invalid.
    fn token_id(&self, token: &str) -> Result<String, ProvisionerError>;

    /// Returns the default TLS certificate duration.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionerError::Config`] when called before `init`.
    fn default_tls_cert_duration(&self) -> Result<Duration, ProvisionerError>;

    /// Validates and normalizes the configuration. Must run exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionerError`] when the configuration is invalid or the
    /// claimer rejects the claims.
    fn init(&mut self, config: &InitConfig) -> Result<(), ProvisionerError>;

    /// Produces the ordered policy pipeline for one issuance request.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionerError`] when the request is not authorized.
    fn authorize_sign(&self, token: &str) -> Result<Vec<PolicyElement>, ProvisionerError>;
}

// ============================================================================
// SECTION: Provisioner Enumeration
// ============================================================================

/// Provisioner kinds implemented by this build.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Provisioner {
    /// SCEP provisioner.
    Scep(ScepProvisioner),
}

impl Provisioner {
    /// Decodes a provisioner document, dispatching on its `type` field.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionerError`] when the type is missing, unknown, or not
    /// implemented, or when the body does not decode.
    pub fn from_value(value: Value) -> Result<Self, ProvisionerError> {
        let raw_type = value.get("type").and_then(Value::as_str).unwrap_or_default();
        if raw_type.is_empty() {
            return Err(ProvisionerError::Config("provisioner type cannot be empty".to_string()));
        }
        match raw_type.parse::<ProvisionerType>()? {
            ProvisionerType::Scep => serde_json::from_value(value)
                .map(Self::Scep)
                .map_err(|err| ProvisionerError::Decode(err.to_string())),
            other => Err(ProvisionerError::Unsupported(format!(
                "provisioner type {:?} is not supported",
                other.as_str()
            ))),
        }
    }

    /// Returns the SCEP provisioner when this is one.
    #[must_use]
    pub const fn as_scep(&self) -> Option<&ScepProvisioner> {
        match self {
            Self::Scep(scep) => Some(scep),
        }
    }

    /// Returns the provisioner as its capability trait.
    fn inner(&self) -> &dyn ProvisionerInterface {
        match self {
            Self::Scep(scep) => scep,
        }
    }

    /// Returns the provisioner as its mutable capability trait.
    fn inner_mut(&mut self) -> &mut dyn ProvisionerInterface {
        match self {
            Self::Scep(scep) => scep,
        }
    }
}

impl<'de> Deserialize<'de> for Provisioner {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
    }
}

impl ProvisionerInterface for Provisioner {
    fn id(&self) -> String {
        self.inner().id()
    }

    fn id_for_token(&self) -> String {
        self.inner().id_for_token()
    }

    fn name(&self) -> &str {
        self.inner().name()
    }

    fn provisioner_type(&self) -> ProvisionerType {
        self.inner().provisioner_type()
    }

    fn encrypted_key(&self) -> Option<(&str, &str)> {
        self.inner().encrypted_key()
    }

    fn token_id(&self, token: &str) -> Result<String, ProvisionerError> {
        self.inner().token_id(token)
    }

    fn default_tls_cert_duration(&self) -> Result<Duration, ProvisionerError> {
        self.inner().default_tls_cert_duration()
    }

    fn init(&mut self, config: &InitConfig) -> Result<(), ProvisionerError> {
        self.inner_mut().init(config)
    }

    fn authorize_sign(&self, token: &str) -> Result<Vec<PolicyElement>, ProvisionerError> {
        self.inner().authorize_sign(token)
    }
}
