// crates/issuance-identity/src/identity.rs
// ============================================================================
// Module: Enrollment Identity Documents
// Description: User and device identity records decoded from JSON documents.
// Purpose: Reject malformed or incomplete identity documents with precise errors.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Identity documents are small JSON objects supplied by enrolling clients.
//! Decoding and validation are separate failure classes: a document that is
//! not well-formed JSON yields [`IdentityError::Decode`], while a well-formed
//! document with an empty required field yields
//! [`IdentityError::MissingField`]. Absent and `null` fields both count as
//! empty. Field values are copied verbatim; no normalization is applied.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use thiserror::Error;

use crate::client_id::ClientId;
use crate::client_id::parse_client_id;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Identity parsing errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - Messages echo rejected literals but never secret material.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// The identity document is not well-formed JSON.
    #[error("failed decoding {document}: {reason}")]
    Decode {
        /// Document kind being decoded.
        document: &'static str,
        /// Underlying decoder message.
        reason: String,
    },
    /// A required field is empty or absent.
    #[error("invalid {document}: {field} must not be empty")]
    MissingField {
        /// Document kind being validated.
        document: &'static str,
        /// JSON field name that was empty.
        field: &'static str,
    },
    /// The client ID is not a parseable URI.
    #[error("invalid Wire client ID URI {input:?}: error parsing {input}: {reason}")]
    InvalidUri {
        /// Raw client ID input.
        input: String,
        /// Underlying URI parser message.
        reason: String,
    },
    /// The client ID URI uses an unexpected scheme.
    #[error("invalid Wire client ID scheme {found:?}; expected {expected:?}")]
    InvalidScheme {
        /// Scheme found in the URI.
        found: String,
        /// Scheme required for client IDs.
        expected: &'static str,
    },
    /// The client ID user-info does not split into username and device ID.
    #[error("invalid Wire client ID username {0:?}")]
    InvalidUsername(String),
}

// ============================================================================
// SECTION: Identity Records
// ============================================================================

/// Human end-user identity.
///
/// # Invariants
/// - All fields are non-empty when produced by [`parse_user_id`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserId {
    /// Display name of the user.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    /// Domain the user belongs to.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub domain: String,
    /// Handle URI identifying the user.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub handle: String,
}

impl UserId {
    /// Document label used in error messages.
    const DOCUMENT: &'static str = "user ID";

    /// Ensures every required field is populated.
    fn validate(&self) -> Result<(), IdentityError> {
        require_non_empty(Self::DOCUMENT, "name", &self.name)?;
        require_non_empty(Self::DOCUMENT, "domain", &self.domain)?;
        require_non_empty(Self::DOCUMENT, "handle", &self.handle)
    }
}

/// Device or client identity enrolling for a certificate.
///
/// # Invariants
/// - All fields are non-empty when produced by [`parse_device_id`].
/// - `client_id` is kept as written; call [`DeviceId::client_id`] to decompose it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceId {
    /// Display name of the device.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    /// Domain the device belongs to.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub domain: String,
    /// Client ID URI (`scheme://username!deviceid@domain`).
    #[serde(rename = "client-id", default, deserialize_with = "null_as_empty")]
    pub client_id: String,
    /// Handle URI of the owning user.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub handle: String,
}

impl DeviceId {
    /// Document label used in error messages.
    const DOCUMENT: &'static str = "device ID";

    /// Ensures every required field is populated.
    fn validate(&self) -> Result<(), IdentityError> {
        require_non_empty(Self::DOCUMENT, "name", &self.name)?;
        require_non_empty(Self::DOCUMENT, "domain", &self.domain)?;
        require_non_empty(Self::DOCUMENT, "client-id", &self.client_id)?;
        require_non_empty(Self::DOCUMENT, "handle", &self.handle)
    }

    /// Decomposes the embedded client ID URI.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError`] when the client ID is not a valid client ID URI.
    pub fn client_id(&self) -> Result<ClientId, IdentityError> {
        parse_client_id(&self.client_id)
    }
}

// ============================================================================
// SECTION: Parsers
// ============================================================================

/// Parses a user identity document.
///
/// # Errors
///
/// Returns [`IdentityError::Decode`] for malformed JSON and
/// [`IdentityError::MissingField`] when `name`, `domain`, or `handle` is empty.
pub fn parse_user_id(data: &[u8]) -> Result<UserId, IdentityError> {
    let user: UserId = decode(UserId::DOCUMENT, data)?;
    user.validate()?;
    Ok(user)
}

/// Parses a device identity document.
///
/// # Errors
///
/// Returns [`IdentityError::Decode`] for malformed JSON and
/// [`IdentityError::MissingField`] when `name`, `domain`, `client-id`, or
/// `handle` is empty.
pub fn parse_device_id(data: &[u8]) -> Result<DeviceId, IdentityError> {
    let device: DeviceId = decode(DeviceId::DOCUMENT, data)?;
    device.validate()?;
    Ok(device)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Decodes a JSON identity document.
fn decode<T>(document: &'static str, data: &[u8]) -> Result<T, IdentityError>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_slice(data).map_err(|err| IdentityError::Decode {
        document,
        reason: err.to_string(),
    })
}

/// Decodes a string field, reading `null` as empty.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Rejects empty field values.
fn require_non_empty(
    document: &'static str,
    field: &'static str,
    value: &str,
) -> Result<(), IdentityError> {
    if value.is_empty() {
        return Err(IdentityError::MissingField {
            document,
            field,
        });
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
