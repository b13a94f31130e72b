// crates/issuance-provisioner/src/scep.rs
// ============================================================================
// Module: SCEP Provisioner
// Description: Configuration, init-time validation, and sign policy for SCEP.
// Purpose: Resolve SCEP settings once and hand out a fixed policy per request.
// Dependencies: serde, serde_json, subtle
// ============================================================================

//! ## Overview
//! The SCEP provisioner performs no request-time authentication: the SCEP
//! protocol layer verifies the challenge password before calling
//! [`ScepProvisioner::authorize_sign`]. `init` validates the configuration,
//! resolves claims, and moves the challenge secret out of the serializable
//! record. Afterwards the provisioner is read-only and safe to share.
//!
//! Security posture: the challenge is a secret. It is never serialized,
//! never printed by `Debug`, and compared in constant time.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use serde::Serializer;
use serde_json::Value;
use subtle::ConstantTimeEq;

use crate::claims::Claimer;
use crate::claims::Claims;
use crate::policy::PolicyElement;
use crate::provisioner::InitConfig;
use crate::provisioner::ProvisionerError;
use crate::provisioner::ProvisionerInterface;
use crate::provisioner::ProvisionerType;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Placeholder written in place of the challenge secret.
pub const REDACTED_CHALLENGE: &str = "*** redacted ***";
/// Minimum public key length applied when none is configured.
pub const DEFAULT_MINIMUM_PUBLIC_KEY_LENGTH: u32 = 2048;

// ============================================================================
// SECTION: Content Encryption
// ============================================================================

/// PKCS#7 content-encryption algorithms, keyed by their numeric identifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING-KEBAB-CASE")]
pub enum ContentEncryptionAlgorithm {
    /// DES in CBC mode (identifier 0).
    DesCbc,
    /// AES-128 in CBC mode (identifier 1).
    Aes128Cbc,
    /// AES-256 in CBC mode (identifier 2).
    #[default]
    Aes256Cbc,
    /// AES-128 in GCM mode (identifier 3).
    Aes128Gcm,
    /// AES-256 in GCM mode (identifier 4).
    Aes256Gcm,
}

impl ContentEncryptionAlgorithm {
    /// Resolves a configured identifier; `None` when outside `0..=4`.
    #[must_use]
    pub const fn from_identifier(identifier: i64) -> Option<Self> {
        match identifier {
            0 => Some(Self::DesCbc),
            1 => Some(Self::Aes128Cbc),
            2 => Some(Self::Aes256Cbc),
            3 => Some(Self::Aes128Gcm),
            4 => Some(Self::Aes256Gcm),
            _ => None,
        }
    }

    /// Returns the numeric identifier.
    #[must_use]
    pub const fn identifier(self) -> u8 {
        match self {
            Self::DesCbc => 0,
            Self::Aes128Cbc => 1,
            Self::Aes256Cbc => 2,
            Self::Aes128Gcm => 3,
            Self::Aes256Gcm => 4,
        }
    }
}

// ============================================================================
// SECTION: Challenge Secret
// ============================================================================

/// Challenge password held outside the serializable record.
///
/// # Invariants
/// - Implements neither `Serialize` nor a revealing `Debug`.
#[derive(Clone, Default, PartialEq, Eq)]
struct ChallengeSecret(String);

impl fmt::Debug for ChallengeSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED_CHALLENGE)
    }
}

/// State resolved by `init`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ScepState {
    /// Resolved claims.
    claimer: Claimer,
    /// Plaintext challenge password.
    secret: ChallengeSecret,
    /// Resolved content-encryption algorithm.
    encryption_algorithm: ContentEncryptionAlgorithm,
}

// ============================================================================
// SECTION: SCEP Provisioner
// ============================================================================

/// SCEP provisioner configuration.
///
/// # Invariants
/// - After `init`, `challenge_password` equals [`REDACTED_CHALLENGE`] and the
///   real secret lives only in internal state.
/// - After `init`, `minimum_public_key_length` is a non-zero multiple of 8.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ScepProvisioner {
    /// Explicit unique identifier; synthesized from kind and name when empty.
    #[serde(skip)]
    pub id: String,
    /// Provisioner type name.
    #[serde(rename = "type", default)]
    pub provisioner_type: String,
    /// Provisioner name.
    #[serde(default)]
    pub name: String,
    /// Copy the first SAN into an empty common name.
    #[serde(rename = "forceCN", default, skip_serializing_if = "is_false")]
    pub force_cn: bool,
    /// Challenge password; holds the placeholder once initialized.
    #[serde(
        rename = "challenge",
        default,
        serialize_with = "serialize_redacted",
        skip_serializing_if = "String::is_empty"
    )]
    pub challenge_password: String,
    /// SCEP capabilities advertised to clients.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capabilities: Vec<String>,
    /// Return the CA roots alongside the intermediate in `GetCACerts`.
    #[serde(rename = "includeRoots", default, skip_serializing_if = "is_false")]
    pub include_roots: bool,
    /// Minimum public key length in bits; 0 selects the default.
    #[serde(rename = "minimumPublicKeyLength", default, skip_serializing_if = "is_zero")]
    pub minimum_public_key_length: u32,
    /// PKCS#7 content-encryption algorithm identifier (0 to 4).
    #[serde(
        rename = "encryptionAlgorithmIdentifier",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub encryption_algorithm_identifier: Option<i64>,
    /// Opaque provisioner options consumed by template collaborators.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
    /// Claim overrides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claims: Option<Claims>,
    /// State resolved by `init`.
    #[serde(skip)]
    state: Option<ScepState>,
}

impl fmt::Debug for ScepProvisioner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let challenge = if self.challenge_password.is_empty() { "" } else { REDACTED_CHALLENGE };
        f.debug_struct("ScepProvisioner")
            .field("id", &self.id)
            .field("provisioner_type", &self.provisioner_type)
            .field("name", &self.name)
            .field("force_cn", &self.force_cn)
            .field("challenge_password", &challenge)
            .field("capabilities", &self.capabilities)
            .field("include_roots", &self.include_roots)
            .field("minimum_public_key_length", &self.minimum_public_key_length)
            .field("encryption_algorithm_identifier", &self.encryption_algorithm_identifier)
            .field("options", &self.options)
            .field("claims", &self.claims)
            .field("state", &self.state)
            .finish()
    }
}

impl ScepProvisioner {
    /// Creates an uninitialized SCEP provisioner with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            provisioner_type: ProvisionerType::Scep.as_str().to_string(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns true once `init` has completed.
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    /// Returns the opaque provisioner options.
    #[must_use]
    pub const fn options(&self) -> Option<&Value> {
        self.options.as_ref()
    }

    /// Returns the resolved claimer once initialized.
    #[must_use]
    pub fn claimer(&self) -> Option<&Claimer> {
        self.state.as_ref().map(|state| &state.claimer)
    }

    /// Returns the plaintext challenge password once initialized.
    ///
    /// Only for challenge verification by the protocol layer; never log it.
    #[must_use]
    pub fn challenge_password(&self) -> Option<&str> {
        self.state.as_ref().map(|state| state.secret.0.as_str())
    }

    /// Checks a presented challenge in constant time.
    ///
    /// An unconfigured (empty) challenge accepts any input. An uninitialized
    /// provisioner rejects every input.
    #[must_use]
    pub fn verify_challenge_password(&self, candidate: &str) -> bool {
        let Some(state) = &self.state else {
            return false;
        };
        let secret = state.secret.0.as_bytes();
        if secret.is_empty() {
            return true;
        }
        secret.ct_eq(candidate.as_bytes()).into()
    }

    /// Returns the SCEP capabilities.
    #[must_use]
    pub fn capabilities(&self) -> &[String] {
        &self.capabilities
    }

    /// Returns true when the CA should include its roots in the chain.
    #[must_use]
    pub const fn should_include_roots_in_chain(&self) -> bool {
        self.include_roots
    }

    /// Returns the resolved content-encryption algorithm once initialized.
    #[must_use]
    pub fn content_encryption_algorithm(&self) -> Option<ContentEncryptionAlgorithm> {
        self.state.as_ref().map(|state| state.encryption_algorithm)
    }

    /// Returns the initialized state or a config error.
    fn state(&self) -> Result<&ScepState, ProvisionerError> {
        self.state.as_ref().ok_or_else(|| {
            ProvisionerError::Config(format!("provisioner {:?} is not initialized", self.id()))
        })
    }
}

impl ProvisionerInterface for ScepProvisioner {
    fn id(&self) -> String {
        if self.id.is_empty() { self.id_for_token() } else { self.id.clone() }
    }

    fn id_for_token(&self) -> String {
        format!("scep/{}", self.name)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn provisioner_type(&self) -> ProvisionerType {
        ProvisionerType::Scep
    }

    fn token_id(&self, _token: &str) -> Result<String, ProvisionerError> {
        Err(ProvisionerError::Unsupported(
            "scep provisioner does not implement GetTokenID".to_string(),
        ))
    }

    fn default_tls_cert_duration(&self) -> Result<Duration, ProvisionerError> {
        Ok(self.state()?.claimer.default_tls_cert_duration())
    }

    fn init(&mut self, config: &InitConfig) -> Result<(), ProvisionerError> {
        if self.state.is_some() {
            return Err(ProvisionerError::Config(format!(
                "provisioner {:?} is already initialized",
                self.id()
            )));
        }
        if self.provisioner_type.is_empty() {
            return Err(ProvisionerError::Config("provisioner type cannot be empty".to_string()));
        }
        if !matches!(self.provisioner_type.parse::<ProvisionerType>(), Ok(ProvisionerType::Scep)) {
            return Err(ProvisionerError::Config(format!(
                "provisioner type {:?} does not match {:?}",
                self.provisioner_type,
                ProvisionerType::Scep.as_str()
            )));
        }
        if self.name.is_empty() {
            return Err(ProvisionerError::Config("provisioner name cannot be empty".to_string()));
        }
        let claimer = Claimer::new(self.claims.as_ref(), &config.claims)?;

        let minimum_public_key_length = match self.minimum_public_key_length {
            0 => DEFAULT_MINIMUM_PUBLIC_KEY_LENGTH,
            configured => configured,
        };
        if minimum_public_key_length % 8 != 0 {
            return Err(ProvisionerError::Config(format!(
                "only minimum public keys exactly divisible by 8 are supported; \
                 {minimum_public_key_length} is not exactly divisible by 8"
            )));
        }

        let encryption_algorithm = match self.encryption_algorithm_identifier {
            None => ContentEncryptionAlgorithm::default(),
            Some(identifier) => ContentEncryptionAlgorithm::from_identifier(identifier)
                .ok_or_else(|| {
                    ProvisionerError::Config(format!(
                        "only encryption algorithm identifiers from 0 to 4 are valid; \
                         {identifier} is not valid"
                    ))
                })?,
        };

        let secret = std::mem::replace(&mut self.challenge_password, REDACTED_CHALLENGE.to_string());
        self.minimum_public_key_length = minimum_public_key_length;
        self.state = Some(ScepState {
            claimer,
            secret: ChallengeSecret(secret),
            encryption_algorithm,
        });
        Ok(())
    }

    fn authorize_sign(&self, _token: &str) -> Result<Vec<PolicyElement>, ProvisionerError> {
        let state = self.state()?;
        Ok(vec![
            // modifiers
            PolicyElement::provisioner_extension(ProvisionerType::Scep, self.name.clone(), ""),
            PolicyElement::force_common_name(self.force_cn),
            PolicyElement::default_duration(state.claimer.default_tls_cert_duration()),
            // validators
            PolicyElement::public_key_minimum_length(self.minimum_public_key_length),
            PolicyElement::validity(
                state.claimer.min_tls_cert_duration(),
                state.claimer.max_tls_cert_duration(),
            ),
        ])
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Serde predicate for omitting false flags.
#[allow(clippy::trivially_copy_pass_by_ref, reason = "Signature is dictated by serde.")]
const fn is_false(value: &bool) -> bool {
    !*value
}

/// Serde predicate for omitting unset lengths.
#[allow(clippy::trivially_copy_pass_by_ref, reason = "Signature is dictated by serde.")]
const fn is_zero(value: &u32) -> bool {
    *value == 0
}

/// Emits the redaction placeholder in place of any challenge value.
fn serialize_redacted<S>(_value: &str, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(REDACTED_CHALLENGE)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
