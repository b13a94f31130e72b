// crates/issuance-provisioner/src/policy.rs
// ============================================================================
// Module: Sign Policy Elements
// Description: Certificate modifiers and validators produced by provisioners.
// Purpose: Express an issuance policy as an ordered, engine-agnostic pipeline.
// Dependencies: humantime, serde, thiserror, time
// ============================================================================

//! ## Overview
//! A provisioner answers each issuance request with an ordered sequence of
//! [`PolicyElement`] values. Modifiers shape the [`CertificateTemplate`];
//! validators accept or reject the finished template. The signing engine
//! consumes the sequence through [`PolicyElement::modify`] and
//! [`PolicyElement::validate`] without matching on concrete element types.
//! Invariants:
//! - Modifiers run in sequence order before any validator.
//! - The first violation stops the pipeline and is surfaced to the caller.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;

use crate::provisioner::ProvisionerType;
use crate::template::CertificateTemplate;
use crate::template::ProvisionerExtension;
use crate::template::PublicKeyInfo;
use crate::template::SignRequest;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Clock-skew tolerance added to the maximum certificate duration.
const MAX_DURATION_TOLERANCE: Duration = Duration::from_secs(60);

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Violations raised while applying policy elements to a template.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyViolation {
    /// Common name could not be forced because the template has no SANs.
    #[error("cannot force common name, DNS names, emails, IPs, and URIs are empty")]
    NoCommonNameSource,
    /// Template has no public key.
    #[error("certificate request is missing a public key")]
    MissingPublicKey,
    /// RSA key is shorter than the provisioner minimum.
    #[error("certificate request RSA key must be at least {bits} bits ({bytes} bytes)")]
    PublicKeyTooShort {
        /// Minimum length in bits.
        bits: u32,
        /// Minimum length in bytes.
        bytes: u32,
    },
    /// Validity bounds are not set on the template.
    #[error("certificate validity window is not set")]
    MissingValidity,
    /// Default duration overflows the representable time range.
    #[error("certificate validity window overflows the supported time range")]
    ValidityOverflow,
    /// `not_after` lies before the evaluation time.
    #[error("notAfter cannot be in the past")]
    NotAfterInPast,
    /// `not_after` lies before `not_before`.
    #[error("notAfter cannot be before notBefore")]
    NotAfterBeforeNotBefore,
    /// Requested duration is below the authorized minimum.
    #[error(
        "requested duration of {requested} is less than the authorized minimum certificate \
         duration of {minimum}"
    )]
    DurationTooShort {
        /// Requested duration (humantime).
        requested: String,
        /// Authorized minimum (humantime).
        minimum: String,
    },
    /// Requested duration is above the authorized maximum.
    #[error(
        "requested duration of {requested} is more than the authorized maximum certificate \
         duration of {maximum}"
    )]
    DurationTooLong {
        /// Requested duration (humantime).
        requested: String,
        /// Authorized maximum (humantime).
        maximum: String,
    },
}

// ============================================================================
// SECTION: Element Kinds
// ============================================================================

/// Capability tag of a policy element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyElementKind {
    /// Transforms or annotates the template.
    Modifier,
    /// Accepts or rejects the finished template.
    Validator,
}

/// Template modifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertificateModifier {
    /// Tags the certificate with the authorizing provisioner.
    ProvisionerExtension(ProvisionerExtension),
    /// Copies the first SAN into an empty common name when enabled.
    ForceCommonName {
        /// Whether forcing is enabled.
        force: bool,
    },
    /// Fills unset validity bounds with the provisioner default duration.
    DefaultDuration {
        /// Default certificate lifetime.
        duration: Duration,
    },
}

impl CertificateModifier {
    /// Returns the stable element name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ProvisionerExtension(_) => "provisioner_extension",
            Self::ForceCommonName {
                ..
            } => "force_common_name",
            Self::DefaultDuration {
                ..
            } => "default_duration",
        }
    }

    /// Returns a human-readable description of the modifier.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::ProvisionerExtension(extension) => {
                format!("tag certificate with provisioner {}/{}", extension.kind, extension.name)
            }
            Self::ForceCommonName {
                force,
            } => format!("force common name from SANs: {force}"),
            Self::DefaultDuration {
                duration,
            } => format!("default certificate duration {}", humantime::format_duration(*duration)),
        }
    }

    /// Applies the modifier to the template.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyViolation`] when the modification cannot be made.
    pub fn modify(
        &self,
        template: &mut CertificateTemplate,
        request: &SignRequest,
    ) -> Result<(), PolicyViolation> {
        match self {
            Self::ProvisionerExtension(extension) => {
                template.provisioner_extension = Some(extension.clone());
                Ok(())
            }
            Self::ForceCommonName {
                force,
            } => {
                if !*force || !template.subject.common_name.is_empty() {
                    return Ok(());
                }
                let common_name = template.first_san().ok_or(PolicyViolation::NoCommonNameSource)?;
                template.subject.common_name = common_name;
                Ok(())
            }
            Self::DefaultDuration {
                duration,
            } => {
                let not_before =
                    template.not_before.or(request.not_before).unwrap_or(request.now);
                template.not_before = Some(not_before);
                if template.not_after.is_none() {
                    let not_after = match request.not_after {
                        Some(requested) => requested,
                        None => add_duration(not_before, *duration)?,
                    };
                    template.not_after = Some(not_after);
                }
                Ok(())
            }
        }
    }
}

/// Template validators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertificateValidator {
    /// Requires RSA keys of at least the configured length.
    PublicKeyMinimumLength {
        /// Minimum key length in bits.
        bits: u32,
    },
    /// Requires the validity window to fall within authorized durations.
    Validity {
        /// Authorized minimum duration.
        min: Duration,
        /// Authorized maximum duration.
        max: Duration,
    },
}

impl CertificateValidator {
    /// Returns the stable element name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::PublicKeyMinimumLength {
                ..
            } => "public_key_minimum_length",
            Self::Validity {
                ..
            } => "validity",
        }
    }

    /// Returns a human-readable description of the validator.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::PublicKeyMinimumLength {
                bits,
            } => format!("RSA public keys must be at least {bits} bits"),
            Self::Validity {
                min,
                max,
            } => format!(
                "certificate duration between {} and {}",
                humantime::format_duration(*min),
                humantime::format_duration(*max)
            ),
        }
    }

    /// Validates the finished template.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyViolation`] when the template is rejected.
    pub fn validate(
        &self,
        template: &CertificateTemplate,
        request: &SignRequest,
    ) -> Result<(), PolicyViolation> {
        match self {
            Self::PublicKeyMinimumLength {
                bits,
            } => validate_public_key_length(*bits, template.public_key.as_ref()),
            Self::Validity {
                min,
                max,
            } => validate_validity(*min, *max, template, request.now),
        }
    }
}

// ============================================================================
// SECTION: Policy Element
// ============================================================================

/// A single entry of a provisioner's sign policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyElement {
    /// Template modifier.
    Modifier(CertificateModifier),
    /// Template validator.
    Validator(CertificateValidator),
}

/// Serializable description of a policy element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyElementSummary {
    /// Capability tag.
    pub kind: PolicyElementKind,
    /// Stable element name.
    pub name: &'static str,
    /// Human-readable description.
    pub description: String,
}

impl PolicyElement {
    /// Creates a provisioner-extension modifier.
    #[must_use]
    pub fn provisioner_extension(
        kind: ProvisionerType,
        name: impl Into<String>,
        credential_id: impl Into<String>,
    ) -> Self {
        Self::Modifier(CertificateModifier::ProvisionerExtension(ProvisionerExtension {
            kind,
            name: name.into(),
            credential_id: credential_id.into(),
        }))
    }

    /// Creates a force-common-name modifier.
    #[must_use]
    pub const fn force_common_name(force: bool) -> Self {
        Self::Modifier(CertificateModifier::ForceCommonName {
            force,
        })
    }

    /// Creates a default-duration modifier.
    #[must_use]
    pub const fn default_duration(duration: Duration) -> Self {
        Self::Modifier(CertificateModifier::DefaultDuration {
            duration,
        })
    }

    /// Creates a minimum public key length validator.
    #[must_use]
    pub const fn public_key_minimum_length(bits: u32) -> Self {
        Self::Validator(CertificateValidator::PublicKeyMinimumLength {
            bits,
        })
    }

    /// Creates a validity-window validator.
    #[must_use]
    pub const fn validity(min: Duration, max: Duration) -> Self {
        Self::Validator(CertificateValidator::Validity {
            min,
            max,
        })
    }

    /// Returns the capability tag.
    #[must_use]
    pub const fn kind(&self) -> PolicyElementKind {
        match self {
            Self::Modifier(_) => PolicyElementKind::Modifier,
            Self::Validator(_) => PolicyElementKind::Validator,
        }
    }

    /// Returns the stable element name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Modifier(modifier) => modifier.name(),
            Self::Validator(validator) => validator.name(),
        }
    }

    /// Returns a human-readable description.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Modifier(modifier) => modifier.describe(),
            Self::Validator(validator) => validator.describe(),
        }
    }

    /// Returns a serializable summary.
    #[must_use]
    pub fn summary(&self) -> PolicyElementSummary {
        PolicyElementSummary {
            kind: self.kind(),
            name: self.name(),
            description: self.describe(),
        }
    }

    /// Applies the element when it is a modifier; validators are no-ops.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyViolation`] when the modifier fails.
    pub fn modify(
        &self,
        template: &mut CertificateTemplate,
        request: &SignRequest,
    ) -> Result<(), PolicyViolation> {
        match self {
            Self::Modifier(modifier) => modifier.modify(template, request),
            Self::Validator(_) => Ok(()),
        }
    }

    /// Checks the template when the element is a validator; modifiers are no-ops.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyViolation`] when the validator rejects the template.
    pub fn validate(
        &self,
        template: &CertificateTemplate,
        request: &SignRequest,
    ) -> Result<(), PolicyViolation> {
        match self {
            Self::Modifier(_) => Ok(()),
            Self::Validator(validator) => validator.validate(template, request),
        }
    }
}

/// Runs a policy pipeline: all modifiers in order, then all validators in order.
///
/// # Errors
///
/// Returns the first [`PolicyViolation`] raised by any element.
pub fn apply_policy(
    elements: &[PolicyElement],
    template: &mut CertificateTemplate,
    request: &SignRequest,
) -> Result<(), PolicyViolation> {
    for element in elements {
        element.modify(template, request)?;
    }
    for element in elements {
        element.validate(template, request)?;
    }
    Ok(())
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Adds a standard duration to a timestamp without panicking.
fn add_duration(start: OffsetDateTime, duration: Duration) -> Result<OffsetDateTime, PolicyViolation> {
    let span =
        time::Duration::try_from(duration).map_err(|_| PolicyViolation::ValidityOverflow)?;
    start.checked_add(span).ok_or(PolicyViolation::ValidityOverflow)
}

/// Drops sub-second precision.
fn truncate_to_second(value: OffsetDateTime) -> OffsetDateTime {
    value.replace_nanosecond(0).unwrap_or(value)
}

/// Returns a standard duration in nanoseconds as a signed value.
fn signed_nanos(duration: Duration) -> i128 {
    i128::try_from(duration.as_nanos()).unwrap_or(i128::MAX)
}

/// Formats a signed duration in humantime form.
fn format_span(span: time::Duration) -> String {
    let standard = Duration::try_from(span).unwrap_or_default();
    humantime::format_duration(standard).to_string()
}

/// Checks the RSA key length against the configured minimum.
fn validate_public_key_length(
    min_bits: u32,
    key: Option<&PublicKeyInfo>,
) -> Result<(), PolicyViolation> {
    match key {
        None => Err(PolicyViolation::MissingPublicKey),
        Some(PublicKeyInfo::Rsa {
            bits,
        }) => {
            let min_bytes = min_bits / 8;
            if bits.div_ceil(8) < min_bytes {
                return Err(PolicyViolation::PublicKeyTooShort {
                    bits: min_bits,
                    bytes: min_bytes,
                });
            }
            Ok(())
        }
        Some(PublicKeyInfo::Ecdsa {
            ..
        } | PublicKeyInfo::Ed25519) => Ok(()),
    }
}

/// Checks the validity window against the authorized durations.
fn validate_validity(
    min: Duration,
    max: Duration,
    template: &CertificateTemplate,
    now: OffsetDateTime,
) -> Result<(), PolicyViolation> {
    let (Some(not_before), Some(not_after)) = (template.not_before, template.not_after) else {
        return Err(PolicyViolation::MissingValidity);
    };
    let not_before = truncate_to_second(not_before);
    let not_after = truncate_to_second(not_after);
    if not_after < truncate_to_second(now) {
        return Err(PolicyViolation::NotAfterInPast);
    }
    if not_after < not_before {
        return Err(PolicyViolation::NotAfterBeforeNotBefore);
    }
    let requested = not_after - not_before;
    let requested_nanos = requested.whole_nanoseconds();
    if requested_nanos < signed_nanos(min) {
        return Err(PolicyViolation::DurationTooShort {
            requested: format_span(requested),
            minimum: humantime::format_duration(min).to_string(),
        });
    }
    if requested_nanos > signed_nanos(max.saturating_add(MAX_DURATION_TOLERANCE)) {
        return Err(PolicyViolation::DurationTooLong {
            requested: format_span(requested),
            maximum: humantime::format_duration(max).to_string(),
        });
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
