// crates/issuance-identity/src/lib.rs
// ============================================================================
// Module: Issuance Identity Library
// Description: Public API surface for enrollment identity parsing.
// Purpose: Turn untrusted identity strings into validated structured records.
// Dependencies: crate::{client_id, identity}
// ============================================================================

//! ## Overview
//! `issuance-identity` decodes the identity documents presented by enrolling
//! users and devices, and decomposes client ID URIs of the form
//! `wireapp://username!deviceid@domain`. Every rejection carries the offending
//! field name or literal value so operators can diagnose misconfigured
//! clients.
//!
//! Security posture: all inputs arrive from protocol messages and are
//! untrusted. Parsers are pure and hold no state, so they are safe to call
//! concurrently.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod client_id;
pub mod identity;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use client_id::CLIENT_ID_SCHEME;
pub use client_id::CLIENT_ID_SEPARATOR;
pub use client_id::ClientId;
pub use client_id::parse_client_id;
pub use identity::DeviceId;
pub use identity::IdentityError;
pub use identity::UserId;
pub use identity::parse_device_id;
pub use identity::parse_user_id;
