// crates/issuance-provisioner/tests/scep_init.rs
// =============================================================================
// Module: SCEP Init Tests
// Description: Validate SCEP init-time checks, defaults, and secret handling.
// Purpose: Ensure invalid configurations fail closed and secrets never leak.
// =============================================================================

//! SCEP provisioner initialization tests.

use std::time::Duration;

use issuance_provisioner::Claims;
use issuance_provisioner::ContentEncryptionAlgorithm;
use issuance_provisioner::InitConfig;
use issuance_provisioner::ProvisionerError;
use issuance_provisioner::ProvisionerInterface;
use issuance_provisioner::ProvisionerType;
use issuance_provisioner::ScepProvisioner;
use issuance_provisioner::scep::REDACTED_CHALLENGE;
use serde_json::json;

mod common;

type TestResult = Result<(), String>;

fn init_error(document: serde_json::Value) -> Result<ProvisionerError, String> {
    let mut provisioner = common::decode_scep(document)?;
    match provisioner.init(&InitConfig::default()) {
        Err(err) => Ok(err),
        Ok(()) => Err("expected init to fail".to_string()),
    }
}

fn expect_init_error(document: serde_json::Value, expected: &str) -> TestResult {
    let err = init_error(document)?;
    if err.to_string() != expected {
        return Err(format!("expected `{expected}`, got `{err}`"));
    }
    Ok(())
}

#[test]
fn init_rejects_empty_type() -> TestResult {
    let mut document = common::scep_document("scep");
    document["type"] = json!("");
    expect_init_error(document, "provisioner type cannot be empty")
}

#[test]
fn init_rejects_mismatched_type() -> TestResult {
    let mut document = common::scep_document("scep");
    document["type"] = json!("JWK");
    expect_init_error(document, r#"provisioner type "JWK" does not match "SCEP""#)?;
    let mut provisioner = ScepProvisioner::new("built");
    provisioner.provisioner_type = "bogus".to_string();
    match provisioner.init(&InitConfig::default()) {
        Err(ProvisionerError::Config(_)) if !provisioner.is_initialized() => Ok(()),
        other => Err(format!("unexpected result: {other:?}")),
    }
}

#[test]
fn init_accepts_lower_case_type() -> TestResult {
    let mut document = common::scep_document("scep");
    document["type"] = json!("scep");
    common::initialized_scep(document).map(|_| ())
}

#[test]
fn init_rejects_empty_name() -> TestResult {
    expect_init_error(common::scep_document(""), "provisioner name cannot be empty")
}

#[test]
fn init_defaults_minimum_public_key_length() -> TestResult {
    let provisioner = common::initialized_scep(common::scep_document("scep"))?;
    if provisioner.minimum_public_key_length != 2048 {
        return Err(format!(
            "expected default 2048, got {}",
            provisioner.minimum_public_key_length
        ));
    }
    Ok(())
}

#[test]
fn init_keeps_configured_minimum_public_key_length() -> TestResult {
    let mut document = common::scep_document("scep");
    document["minimumPublicKeyLength"] = json!(3072);
    let provisioner = common::initialized_scep(document)?;
    if provisioner.minimum_public_key_length != 3072 {
        return Err("configured minimum length was not kept".to_string());
    }
    Ok(())
}

#[test]
fn init_rejects_minimum_length_not_divisible_by_eight() -> TestResult {
    let mut document = common::scep_document("scep");
    document["minimumPublicKeyLength"] = json!(2047);
    expect_init_error(
        document,
        "only minimum public keys exactly divisible by 8 are supported; 2047 is not exactly \
         divisible by 8",
    )
}

#[test]
fn init_defaults_encryption_algorithm_to_aes256_cbc() -> TestResult {
    let provisioner = common::initialized_scep(common::scep_document("scep"))?;
    if provisioner.content_encryption_algorithm() != Some(ContentEncryptionAlgorithm::Aes256Cbc) {
        return Err("default encryption algorithm should be AES-256-CBC".to_string());
    }
    Ok(())
}

#[test]
fn init_accepts_every_valid_encryption_identifier() -> TestResult {
    for identifier in 0 ..= 4_i64 {
        let mut document = common::scep_document("scep");
        document["encryptionAlgorithmIdentifier"] = json!(identifier);
        let provisioner = common::initialized_scep(document)?;
        let resolved = provisioner
            .content_encryption_algorithm()
            .map(|algorithm| i64::from(algorithm.identifier()));
        if resolved != Some(identifier) {
            return Err(format!("identifier {identifier} resolved to {resolved:?}"));
        }
    }
    Ok(())
}

#[test]
fn init_rejects_out_of_range_encryption_identifiers() -> TestResult {
    for identifier in [5_i64, -1, 42] {
        let mut document = common::scep_document("scep");
        document["encryptionAlgorithmIdentifier"] = json!(identifier);
        expect_init_error(
            document,
            &format!(
                "only encryption algorithm identifiers from 0 to 4 are valid; {identifier} is \
                 not valid"
            ),
        )?;
    }
    Ok(())
}

#[test]
fn init_propagates_claimer_errors() -> TestResult {
    let mut document = common::scep_document("scep");
    document["claims"] = json!({ "defaultTLSCertDuration": "1m" });
    let err = init_error(document)?;
    if !matches!(err, ProvisionerError::Claims(_)) {
        return Err(format!("expected claims error, got {err}"));
    }
    if err.to_string() != "claims: DefaultTLSCertDuration cannot be less than MinTLSCertDuration" {
        return Err(format!("unexpected claims message: {err}"));
    }
    Ok(())
}

#[test]
fn init_merges_provisioner_claims_over_global_claims() -> TestResult {
    let mut document = common::scep_document("scep");
    document["claims"] = json!({ "defaultTLSCertDuration": "12h" });
    let provisioner = common::initialized_scep(document)?;
    let default = provisioner.default_tls_cert_duration().map_err(|err| err.to_string())?;
    if default != Duration::from_secs(12 * 60 * 60) {
        return Err(format!("unexpected default duration {default:?}"));
    }
    let claimer = provisioner.claimer().ok_or("missing claimer")?;
    if claimer.max_tls_cert_duration() != Duration::from_secs(24 * 60 * 60) {
        return Err("global maximum should be inherited".to_string());
    }
    Ok(())
}

#[test]
fn init_uses_supplied_global_claims() -> TestResult {
    let mut provisioner = common::decode_scep(common::scep_document("scep"))?;
    let init = InitConfig {
        claims: Claims {
            min_tls_cert_duration: Some(Duration::from_secs(60)),
            max_tls_cert_duration: Some(Duration::from_secs(7 * 24 * 60 * 60)),
            default_tls_cert_duration: Some(Duration::from_secs(48 * 60 * 60)),
            disable_renewal: Some(true),
        },
    };
    provisioner.init(&init).map_err(|err| err.to_string())?;
    let claimer = provisioner.claimer().ok_or("missing claimer")?;
    if claimer.default_tls_cert_duration() != Duration::from_secs(48 * 60 * 60) {
        return Err("global default duration not applied".to_string());
    }
    if !claimer.is_disable_renewal() {
        return Err("disable renewal not applied".to_string());
    }
    Ok(())
}

#[test]
fn init_redacts_challenge_and_keeps_secret() -> TestResult {
    let provisioner = common::initialized_scep(common::scep_document("scep"))?;
    if provisioner.challenge_password != REDACTED_CHALLENGE {
        return Err("public challenge should be redacted".to_string());
    }
    if provisioner.challenge_password() != Some("s3cret") {
        return Err("secret challenge should be retained".to_string());
    }
    Ok(())
}

#[test]
fn init_redacts_empty_challenge() -> TestResult {
    let mut document = common::scep_document("scep");
    document["challenge"] = json!("");
    let provisioner = common::initialized_scep(document)?;
    if provisioner.challenge_password != REDACTED_CHALLENGE {
        return Err("empty challenge should still be replaced by the placeholder".to_string());
    }
    if provisioner.challenge_password() != Some("") {
        return Err("empty secret should be retained".to_string());
    }
    Ok(())
}

#[test]
fn failed_init_leaves_provisioner_unchanged() -> TestResult {
    let mut document = common::scep_document("scep");
    document["encryptionAlgorithmIdentifier"] = json!(9);
    let mut provisioner = common::decode_scep(document)?;
    if provisioner.init(&InitConfig::default()).is_ok() {
        return Err("expected init to fail".to_string());
    }
    if provisioner.is_initialized() || provisioner.challenge_password != "s3cret" {
        return Err("failed init must not commit state".to_string());
    }
    if provisioner.minimum_public_key_length != 0 {
        return Err("failed init must not default the key length".to_string());
    }
    Ok(())
}

#[test]
fn second_init_is_rejected() -> TestResult {
    let mut provisioner = common::initialized_scep(common::scep_document("scep"))?;
    match provisioner.init(&InitConfig::default()) {
        Err(ProvisionerError::Config(message)) if message.contains("already initialized") => {
            Ok(())
        }
        other => Err(format!("expected re-init rejection, got {other:?}")),
    }
}

#[test]
fn serialization_never_contains_the_secret() -> TestResult {
    let uninitialized = common::decode_scep(common::scep_document("scep"))?;
    let initialized = common::initialized_scep(common::scep_document("scep"))?;
    for provisioner in [&uninitialized, &initialized] {
        let json = serde_json::to_string(provisioner).map_err(|err| err.to_string())?;
        if json.contains("s3cret") {
            return Err(format!("serialized form leaked the secret: {json}"));
        }
        if !json.contains(REDACTED_CHALLENGE) {
            return Err(format!("serialized form lacks the placeholder: {json}"));
        }
        let debug = format!("{provisioner:?}");
        if debug.contains("s3cret") {
            return Err("debug output leaked the secret".to_string());
        }
    }
    Ok(())
}

#[test]
fn serialization_uses_document_field_names() -> TestResult {
    let mut document = common::scep_document("scep");
    document["forceCN"] = json!(true);
    document["includeRoots"] = json!(true);
    document["capabilities"] = json!(["AES", "POSTPKIOperation"]);
    let provisioner = common::initialized_scep(document)?;
    let value = serde_json::to_value(&provisioner).map_err(|err| err.to_string())?;
    let expected = json!({
        "type": "SCEP",
        "name": "scep",
        "forceCN": true,
        "challenge": REDACTED_CHALLENGE,
        "capabilities": ["AES", "POSTPKIOperation"],
        "includeRoots": true,
        "minimumPublicKeyLength": 2048,
    });
    if value != expected {
        return Err(format!("unexpected serialized form: {value}"));
    }
    Ok(())
}

#[test]
fn verify_challenge_password_compares_secret() -> TestResult {
    let provisioner = common::initialized_scep(common::scep_document("scep"))?;
    if !provisioner.verify_challenge_password("s3cret") {
        return Err("correct challenge rejected".to_string());
    }
    for wrong in ["", "s3cre", "s3cret!", REDACTED_CHALLENGE] {
        if provisioner.verify_challenge_password(wrong) {
            return Err(format!("wrong challenge {wrong:?} accepted"));
        }
    }
    Ok(())
}

#[test]
fn verify_challenge_password_accepts_any_input_without_secret() -> TestResult {
    let mut document = common::scep_document("scep");
    document["challenge"] = json!("");
    let provisioner = common::initialized_scep(document)?;
    if !provisioner.verify_challenge_password("anything") {
        return Err("unconfigured challenge should accept any input".to_string());
    }
    Ok(())
}

#[test]
fn uninitialized_provisioner_fails_closed() -> TestResult {
    let provisioner = common::decode_scep(common::scep_document("scep"))?;
    if provisioner.verify_challenge_password("s3cret") {
        return Err("uninitialized provisioner accepted a challenge".to_string());
    }
    if provisioner.challenge_password().is_some() {
        return Err("uninitialized provisioner exposed a secret".to_string());
    }
    if !matches!(provisioner.default_tls_cert_duration(), Err(ProvisionerError::Config(_))) {
        return Err("default duration should require init".to_string());
    }
    Ok(())
}

#[test]
fn identity_accessors_follow_name() -> TestResult {
    let provisioner = common::initialized_scep(common::scep_document("scep-devices"))?;
    if provisioner.id() != "scep/scep-devices" || provisioner.id_for_token() != "scep/scep-devices"
    {
        return Err(format!("unexpected id {}", provisioner.id()));
    }
    if provisioner.provisioner_type() != ProvisionerType::Scep {
        return Err("unexpected provisioner type".to_string());
    }
    if provisioner.encrypted_key().is_some() {
        return Err("SCEP has no encrypted key".to_string());
    }
    let mut explicit = ScepProvisioner::new("named");
    explicit.id = "custom-id".to_string();
    if explicit.id() != "custom-id" {
        return Err("explicit id should win".to_string());
    }
    Ok(())
}

#[test]
fn token_id_is_unsupported() -> TestResult {
    let provisioner = common::initialized_scep(common::scep_document("scep"))?;
    match provisioner.token_id("token") {
        Err(ProvisionerError::Unsupported(message))
            if message == "scep provisioner does not implement GetTokenID" =>
        {
            Ok(())
        }
        other => Err(format!("unexpected token id result: {other:?}")),
    }
}

#[test]
fn options_and_capabilities_pass_through() -> TestResult {
    let mut document = common::scep_document("scep");
    document["options"] = json!({ "x509": { "templateFile": "scep.tpl" } });
    document["capabilities"] = json!(["AES"]);
    document["includeRoots"] = json!(true);
    let provisioner = common::initialized_scep(document)?;
    if provisioner.options().and_then(|options| options.get("x509")).is_none() {
        return Err("options not preserved".to_string());
    }
    if provisioner.capabilities() != ["AES".to_string()] {
        return Err("capabilities not preserved".to_string());
    }
    if !provisioner.should_include_roots_in_chain() {
        return Err("includeRoots not preserved".to_string());
    }
    Ok(())
}
