// crates/issuance-identity/src/client_id.rs
// ============================================================================
// Module: Client ID URIs
// Description: Decomposition of `wireapp://username!deviceid@domain` URIs.
// Purpose: Validate client ID scheme and user-info shape with diagnosable errors.
// Dependencies: percent-encoding, serde, url
// ============================================================================

//! ## Overview
//! A client ID packs a username, a device identifier, and a domain into one
//! URI. Parsing fails closed at each step: the input must be a URI with a
//! scheme, the scheme must be [`CLIENT_ID_SCHEME`], and the user-info must
//! split on [`CLIENT_ID_SEPARATOR`] into exactly two non-empty parts.
//! The user-info is percent-decoded before it is split, so handles such as
//! `%40alice` surface as `@alice`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use percent_encoding::percent_decode_str;
use serde::Deserialize;
use serde::Serialize;
use url::Url;

use crate::identity::IdentityError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// URI scheme required for client IDs.
pub const CLIENT_ID_SCHEME: &str = "wireapp";
/// Separator between the username and device ID in the URI user-info.
pub const CLIENT_ID_SEPARATOR: char = '!';

// ============================================================================
// SECTION: Client ID
// ============================================================================

/// Decomposed client ID URI.
///
/// # Invariants
/// - `scheme` equals [`CLIENT_ID_SCHEME`].
/// - `username` and `device_id` are non-empty and contain no separator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId {
    /// URI scheme.
    pub scheme: String,
    /// User part of the user-info component.
    pub username: String,
    /// Device part of the user-info component.
    pub device_id: String,
    /// URI host, with the port when one is given.
    pub domain: String,
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}://{}{}{}@{}",
            self.scheme, self.username, CLIENT_ID_SEPARATOR, self.device_id, self.domain
        )
    }
}

impl FromStr for ClientId {
    type Err = IdentityError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        parse_client_id(value)
    }
}

/// Parses a client ID URI.
///
/// # Errors
///
/// Returns [`IdentityError::InvalidUri`] when the input is not a URI with a
/// scheme, [`IdentityError::InvalidScheme`] when the scheme is not
/// [`CLIENT_ID_SCHEME`], and [`IdentityError::InvalidUsername`] when the
/// user-info is not `username!deviceid`.
pub fn parse_client_id(input: &str) -> Result<ClientId, IdentityError> {
    let uri = Url::parse(input).map_err(|err| IdentityError::InvalidUri {
        input: input.to_string(),
        reason: uri_failure_reason(err),
    })?;
    if uri.scheme() != CLIENT_ID_SCHEME {
        return Err(IdentityError::InvalidScheme {
            found: uri.scheme().to_string(),
            expected: CLIENT_ID_SCHEME,
        });
    }
    let user_info = decode_user_info(uri.username());
    let (username, device_id) = split_user_info(&user_info)
        .ok_or_else(|| IdentityError::InvalidUsername(user_info.to_string()))?;
    Ok(ClientId {
        scheme: uri.scheme().to_string(),
        username: username.to_string(),
        device_id: device_id.to_string(),
        domain: authority_host(&uri),
    })
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Splits `username!deviceid` into exactly two non-empty parts.
fn split_user_info(user_info: &str) -> Option<(&str, &str)> {
    let (username, device_id) = user_info.split_once(CLIENT_ID_SEPARATOR)?;
    if username.is_empty() || device_id.is_empty() || device_id.contains(CLIENT_ID_SEPARATOR) {
        return None;
    }
    Some((username, device_id))
}

/// Percent-decodes the user-info, keeping the raw text when it is not UTF-8.
fn decode_user_info(raw: &str) -> Cow<'_, str> {
    percent_decode_str(raw).decode_utf8().unwrap_or(Cow::Borrowed(raw))
}

/// Returns `host[:port]` from the URI authority.
fn authority_host(uri: &Url) -> String {
    let host = uri.host_str().unwrap_or_default();
    match uri.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

/// Maps URI parser failures to operator-facing causes.
fn uri_failure_reason(err: url::ParseError) -> String {
    match err {
        url::ParseError::RelativeUrlWithoutBase => "scheme is missing".to_string(),
        other => other.to_string(),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
