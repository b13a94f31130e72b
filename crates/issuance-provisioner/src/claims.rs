// crates/issuance-provisioner/src/claims.rs
// ============================================================================
// Module: Certificate Duration Claims
// Description: Claim overrides and the claimer that resolves effective limits.
// Purpose: Merge per-provisioner duration claims over global defaults once.
// Dependencies: humantime, serde, thiserror
// ============================================================================

//! ## Overview
//! [`Claims`] carries optional certificate-duration overrides as they appear
//! in configuration documents. [`Claimer`] merges a provisioner's overrides
//! over the global claims and validates the result, so every duration it
//! reports is present and internally consistent.
//! Invariants:
//! - `0 < min <= default <= max` for resolved TLS certificate durations.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Global default minimum TLS certificate duration.
pub const DEFAULT_MIN_TLS_CERT_DURATION: Duration = Duration::from_secs(5 * 60);
/// Global default maximum TLS certificate duration.
pub const DEFAULT_MAX_TLS_CERT_DURATION: Duration = Duration::from_secs(24 * 60 * 60);
/// Global default TLS certificate duration.
pub const DEFAULT_TLS_CERT_DURATION: Duration = Duration::from_secs(24 * 60 * 60);

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Claim resolution errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClaimsError {
    /// A resolved duration is missing or zero.
    #[error("claims: {0} must be greater than 0")]
    NonPositive(&'static str),
    /// The minimum duration exceeds the maximum.
    #[error("claims: MinTLSCertDuration cannot be greater than MaxTLSCertDuration")]
    MinAboveMax,
    /// The default duration is below the minimum.
    #[error("claims: DefaultTLSCertDuration cannot be less than MinTLSCertDuration")]
    DefaultBelowMin,
    /// The maximum duration is below the default.
    #[error("claims: MaxTLSCertDuration cannot be less than DefaultTLSCertDuration")]
    MaxBelowDefault,
}

// ============================================================================
// SECTION: Claims
// ============================================================================

/// Certificate-duration claim overrides.
///
/// Durations use the humantime grammar (`"5m"`, `"24h"`, `"1h30m"`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Minimum TLS certificate duration.
    #[serde(
        rename = "minTLSCertDuration",
        default,
        with = "duration_format",
        skip_serializing_if = "Option::is_none"
    )]
    pub min_tls_cert_duration: Option<Duration>,
    /// Maximum TLS certificate duration.
    #[serde(
        rename = "maxTLSCertDuration",
        default,
        with = "duration_format",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_tls_cert_duration: Option<Duration>,
    /// Default TLS certificate duration.
    #[serde(
        rename = "defaultTLSCertDuration",
        default,
        with = "duration_format",
        skip_serializing_if = "Option::is_none"
    )]
    pub default_tls_cert_duration: Option<Duration>,
    /// Disables certificate renewal.
    #[serde(rename = "disableRenewal", default, skip_serializing_if = "Option::is_none")]
    pub disable_renewal: Option<bool>,
}

impl Claims {
    /// Returns the process-wide default claims.
    #[must_use]
    pub const fn global_defaults() -> Self {
        Self {
            min_tls_cert_duration: Some(DEFAULT_MIN_TLS_CERT_DURATION),
            max_tls_cert_duration: Some(DEFAULT_MAX_TLS_CERT_DURATION),
            default_tls_cert_duration: Some(DEFAULT_TLS_CERT_DURATION),
            disable_renewal: Some(false),
        }
    }

    /// Returns these claims with unset values taken from `base`.
    #[must_use]
    pub fn merged_over(&self, base: &Self) -> Self {
        Self {
            min_tls_cert_duration: self.min_tls_cert_duration.or(base.min_tls_cert_duration),
            max_tls_cert_duration: self.max_tls_cert_duration.or(base.max_tls_cert_duration),
            default_tls_cert_duration: self
                .default_tls_cert_duration
                .or(base.default_tls_cert_duration),
            disable_renewal: self.disable_renewal.or(base.disable_renewal),
        }
    }
}

// ============================================================================
// SECTION: Claimer
// ============================================================================

/// Resolved claims for a single provisioner.
///
/// # Invariants
/// - Durations satisfy `0 < min <= default <= max`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claimer {
    /// Merged claim record.
    claims: Claims,
    /// Resolved minimum TLS certificate duration.
    min_tls: Duration,
    /// Resolved maximum TLS certificate duration.
    max_tls: Duration,
    /// Resolved default TLS certificate duration.
    default_tls: Duration,
}

impl Claimer {
    /// Merges provisioner claims over global claims and validates the result.
    ///
    /// # Errors
    ///
    /// Returns [`ClaimsError`] when a duration is missing or the durations are
    /// inconsistent.
    pub fn new(provisioner: Option<&Claims>, global: &Claims) -> Result<Self, ClaimsError> {
        let claims = provisioner.map_or_else(|| global.clone(), |own| own.merged_over(global));
        let min_tls = positive("MinTLSCertDuration", claims.min_tls_cert_duration)?;
        let max_tls = positive("MaxTLSCertDuration", claims.max_tls_cert_duration)?;
        let default_tls = positive("DefaultTLSCertDuration", claims.default_tls_cert_duration)?;
        if min_tls > max_tls {
            return Err(ClaimsError::MinAboveMax);
        }
        if default_tls < min_tls {
            return Err(ClaimsError::DefaultBelowMin);
        }
        if max_tls < default_tls {
            return Err(ClaimsError::MaxBelowDefault);
        }
        Ok(Self {
            claims,
            min_tls,
            max_tls,
            default_tls,
        })
    }

    /// Returns the merged claim record.
    #[must_use]
    pub const fn claims(&self) -> &Claims {
        &self.claims
    }

    /// Returns the minimum TLS certificate duration.
    #[must_use]
    pub const fn min_tls_cert_duration(&self) -> Duration {
        self.min_tls
    }

    /// Returns the maximum TLS certificate duration.
    #[must_use]
    pub const fn max_tls_cert_duration(&self) -> Duration {
        self.max_tls
    }

    /// Returns the default TLS certificate duration.
    #[must_use]
    pub const fn default_tls_cert_duration(&self) -> Duration {
        self.default_tls
    }

    /// Returns true when certificate renewal is disabled.
    #[must_use]
    pub fn is_disable_renewal(&self) -> bool {
        self.claims.disable_renewal.unwrap_or(false)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Requires a present, non-zero duration.
fn positive(field: &'static str, value: Option<Duration>) -> Result<Duration, ClaimsError> {
    match value {
        Some(duration) if !duration.is_zero() => Ok(duration),
        _ => Err(ClaimsError::NonPositive(field)),
    }
}

/// Serde support for optional durations in humantime format.
mod duration_format {
    use std::time::Duration;

    use serde::Deserialize;
    use serde::Deserializer;
    use serde::Serializer;

    /// Serializes a duration as a humantime string.
    #[allow(
        clippy::ref_option,
        reason = "Signature is dictated by serde's `with` attribute."
    )]
    pub fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(duration) => {
                serializer.serialize_str(&humantime::format_duration(*duration).to_string())
            }
            None => serializer.serialize_none(),
        }
    }

    /// Deserializes a humantime string into a duration.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        raw.map(|text| humantime::parse_duration(&text).map_err(serde::de::Error::custom))
            .transpose()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
