// crates/issuance-identity/tests/identity_documents.rs
// ============================================================================
// Module: Identity Document Tests
// Description: Validate user and device identity document parsing.
// Purpose: Ensure decode and empty-field failures are distinct and fail closed.
// Dependencies: issuance-identity
// ============================================================================

//! Identity document parsing tests for user and device records.

use issuance_identity::DeviceId;
use issuance_identity::IdentityError;
use issuance_identity::UserId;
use issuance_identity::parse_device_id;
use issuance_identity::parse_user_id;

type TestResult = Result<(), String>;

/// Client ID used across device fixtures.
const CLIENT_ID: &str = "wireapp://CzbfFjDOQrenCbDxVmgnFw!594930e9d50bb175@wire.com";
/// Handle used across fixtures.
const HANDLE: &str = "wireapp://%40alice_wire@wire.com";

fn expect_missing(result: Result<impl Sized, IdentityError>, field: &str) -> TestResult {
    match result {
        Err(IdentityError::MissingField {
            field: actual, ..
        }) if actual == field => Ok(()),
        Err(other) => Err(format!("expected missing {field}, got {other}")),
        Ok(_) => Err(format!("expected missing {field}, got success")),
    }
}

fn expect_decode(result: Result<impl Sized, IdentityError>) -> TestResult {
    match result {
        Err(IdentityError::Decode {
            ..
        }) => Ok(()),
        Err(other) => Err(format!("expected decode error, got {other}")),
        Ok(_) => Err("expected decode error, got success".to_string()),
    }
}

#[test]
fn user_id_parses_verbatim() -> TestResult {
    let doc = format!(r#"{{"name": "Alice Smith", "domain": "wire.com", "handle": "{HANDLE}"}}"#);
    let user = parse_user_id(doc.as_bytes()).map_err(|err| err.to_string())?;
    let expected = UserId {
        name: "Alice Smith".to_string(),
        domain: "wire.com".to_string(),
        handle: HANDLE.to_string(),
    };
    if user != expected {
        return Err(format!("unexpected user id: {user:?}"));
    }
    Ok(())
}

#[test]
fn user_id_rejects_malformed_json() -> TestResult {
    expect_decode(parse_user_id(br#"{"name": }"#))
}

#[test]
fn user_id_rejects_empty_fields() -> TestResult {
    expect_missing(
        parse_user_id(
            format!(r#"{{"name": "", "domain": "wire.com", "handle": "{HANDLE}"}}"#).as_bytes(),
        ),
        "name",
    )?;
    expect_missing(
        parse_user_id(
            format!(r#"{{"name": "Alice Smith", "domain": "", "handle": "{HANDLE}"}}"#).as_bytes(),
        ),
        "domain",
    )?;
    expect_missing(
        parse_user_id(br#"{"name": "Alice Smith", "domain": "wire.com", "handle": ""}"#),
        "handle",
    )
}

#[test]
fn user_id_treats_absent_field_as_empty() -> TestResult {
    expect_missing(parse_user_id(br#"{"name": "Alice Smith", "domain": "wire.com"}"#), "handle")
}

#[test]
fn null_field_is_treated_as_empty() -> TestResult {
    expect_missing(
        parse_user_id(
            format!(r#"{{"name": null, "domain": "wire.com", "handle": "{HANDLE}"}}"#).as_bytes(),
        ),
        "name",
    )?;
    expect_missing(
        parse_device_id(
            format!(
                r#"{{"name": "d", "domain": "wire.com", "client-id": null, "handle": "{HANDLE}"}}"#
            )
            .as_bytes(),
        ),
        "client-id",
    )
}

#[test]
fn non_string_field_is_a_decode_error() -> TestResult {
    expect_decode(parse_user_id(br#"{"name": 7, "domain": "wire.com", "handle": "h"}"#))
}

#[test]
fn device_id_parses_verbatim() -> TestResult {
    let doc = format!(
        r#"{{"name": "device", "domain": "wire.com", "client-id": "{CLIENT_ID}", "handle": "{HANDLE}"}}"#
    );
    let device = parse_device_id(doc.as_bytes()).map_err(|err| err.to_string())?;
    let expected = DeviceId {
        name: "device".to_string(),
        domain: "wire.com".to_string(),
        client_id: CLIENT_ID.to_string(),
        handle: HANDLE.to_string(),
    };
    if device != expected {
        return Err(format!("unexpected device id: {device:?}"));
    }
    let client = device.client_id().map_err(|err| err.to_string())?;
    if client.device_id != "594930e9d50bb175" {
        return Err(format!("unexpected embedded client id: {client}"));
    }
    Ok(())
}

#[test]
fn device_id_rejects_malformed_json() -> TestResult {
    expect_decode(parse_device_id(br#"{"name": }"#))
}

#[test]
fn device_id_rejects_empty_fields() -> TestResult {
    let cases = [
        ("name", ["", "wire.com", CLIENT_ID, HANDLE]),
        ("domain", ["device", "", CLIENT_ID, HANDLE]),
        ("client-id", ["device", "wire.com", "", HANDLE]),
        ("handle", ["device", "wire.com", CLIENT_ID, ""]),
    ];
    for (field, [name, domain, client_id, handle]) in cases {
        let doc = format!(
            r#"{{"name": "{name}", "domain": "{domain}", "client-id": "{client_id}", "handle": "{handle}"}}"#
        );
        expect_missing(parse_device_id(doc.as_bytes()), field)?;
    }
    Ok(())
}

#[test]
fn missing_field_message_names_field() -> TestResult {
    let err = parse_device_id(
        format!(r#"{{"name": "device", "domain": "wire.com", "client-id": "", "handle": "{HANDLE}"}}"#)
            .as_bytes(),
    )
    .err()
    .ok_or("expected failure")?;
    if err.to_string() != "invalid device ID: client-id must not be empty" {
        return Err(format!("unexpected message: {err}"));
    }
    Ok(())
}
