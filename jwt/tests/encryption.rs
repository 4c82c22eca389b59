//! Encrypted-token round trips and decryption-key handling.

use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Duration;
use sentinel_jwt::{JwtTokenHandler, SecurityTokenDescriptor, TokenValidationParameters};
use sentinel_tokens::{
    EncryptingCredentials, EncryptionAlgorithm, InMemoryReplayCache, SecurityKey,
    SignatureAlgorithm, SigningCredentials, TokenError,
};

const ISSUER: &str = "https://idp.example";
const AUDIENCE: &str = "api";

fn signing_key() -> Arc<SecurityKey> {
    Arc::new(SecurityKey::symmetric([1u8; 32]).with_key_id("SIGN"))
}

fn encryption_key(secret: [u8; 32]) -> Arc<SecurityKey> {
    Arc::new(SecurityKey::symmetric(secret).with_key_id("ENC"))
}

fn issue_encrypted(enc_key: Arc<SecurityKey>) -> String {
    JwtTokenHandler::new()
        .create_token(&SecurityTokenDescriptor {
            issuer: Some(ISSUER.to_string()),
            audience: Some(AUDIENCE.to_string()),
            signing_credentials: Some(SigningCredentials::new(
                signing_key(),
                SignatureAlgorithm::Hs256,
            )),
            encrypting_credentials: Some(
                EncryptingCredentials::direct(enc_key, EncryptionAlgorithm::A256Gcm).unwrap(),
            ),
            ..SecurityTokenDescriptor::default()
        })
        .unwrap()
}

fn params(enc_key: Arc<SecurityKey>) -> TokenValidationParameters {
    TokenValidationParameters::new()
        .with_issuer(ISSUER)
        .with_audience(AUDIENCE)
        .with_signing_key(signing_key())
        .with_decryption_key(enc_key)
}

#[test]
fn encrypted_token_round_trips() {
    let enc_key = encryption_key([9u8; 32]);
    let token = issue_encrypted(Arc::clone(&enc_key));

    // Five segments with an empty encrypted-key segment under direct use.
    let segments: Vec<&str> = token.split('.').collect();
    assert_eq!(segments.len(), 5);
    assert!(segments[1].is_empty());

    let handler = JwtTokenHandler::new();
    let (principal, validated) = handler.validate_token(&token, &params(enc_key)).unwrap();
    assert_eq!(principal.find_first("iss").unwrap().value_str(), Some(ISSUER));

    let inner = validated.claims_token().unwrap();
    assert!(inner.signing_key().is_some());
}

#[test]
fn wrong_decryption_key_fails_across_all_candidates() {
    let token = issue_encrypted(encryption_key([9u8; 32]));

    let mut p = params(encryption_key([10u8; 32]));
    p.token_decryption_keys = vec![encryption_key([11u8; 32])];

    match JwtTokenHandler::new().validate_token(&token, &p) {
        Err(TokenError::DecryptionFailed { keys_attempted }) => {
            assert!(keys_attempted.contains("ENC"));
        }
        other => panic!("expected DecryptionFailed, got {other:?}"),
    }
}

#[test]
fn no_decryption_keys_is_its_own_failure() {
    let token = issue_encrypted(encryption_key([9u8; 32]));

    let p = TokenValidationParameters::new()
        .with_issuer(ISSUER)
        .with_audience(AUDIENCE)
        .with_signing_key(signing_key());
    assert!(matches!(
        JwtTokenHandler::new().validate_token(&token, &p),
        Err(TokenError::NoDecryptionKeys)
    ));
}

#[test]
fn tampered_ciphertext_fails_authentication() {
    let enc_key = encryption_key([9u8; 32]);
    let token = issue_encrypted(Arc::clone(&enc_key));

    let mut segments: Vec<String> = token.split('.').map(str::to_string).collect();
    let mut ciphertext = URL_SAFE_NO_PAD.decode(&segments[3]).unwrap();
    ciphertext[0] ^= 0x01;
    segments[3] = URL_SAFE_NO_PAD.encode(ciphertext);
    let tampered = segments.join(".");

    assert!(matches!(
        JwtTokenHandler::new().validate_token(&tampered, &params(enc_key)),
        Err(TokenError::DecryptionFailed { .. })
    ));
}

#[test]
fn tampered_outer_header_breaks_the_aad_binding() {
    let enc_key = encryption_key([9u8; 32]);
    let token = issue_encrypted(Arc::clone(&enc_key));

    let mut segments: Vec<String> = token.split('.').map(str::to_string).collect();
    let mut header: serde_json::Map<String, serde_json::Value> =
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(&segments[0]).unwrap()).unwrap();
    header.insert("extra".to_string(), serde_json::Value::Bool(true));
    segments[0] = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header).unwrap());
    let tampered = segments.join(".");

    assert!(matches!(
        JwtTokenHandler::new().validate_token(&tampered, &params(enc_key)),
        Err(TokenError::DecryptionFailed { .. })
    ));
}

#[test]
fn key_wrap_algorithms_are_rejected() {
    let enc_key = encryption_key([9u8; 32]);
    let token = issue_encrypted(Arc::clone(&enc_key));

    // Rewrite the outer header to declare a wrapped key. The AAD check
    // never runs: the alg gate fires first.
    let mut segments: Vec<String> = token.split('.').map(str::to_string).collect();
    segments[0] = URL_SAFE_NO_PAD.encode(br#"{"alg":"RSA-OAEP","enc":"A256GCM"}"#);
    let rewritten = segments.join(".");

    match JwtTokenHandler::new().validate_token(&rewritten, &params(enc_key)) {
        Err(TokenError::KeyWrapNotSupported(alg)) => assert_eq!(alg, "RSA-OAEP"),
        other => panic!("expected KeyWrapNotSupported, got {other:?}"),
    }
}

#[test]
fn replay_and_bootstrap_track_the_presented_envelope() {
    let enc_key = encryption_key([9u8; 32]);
    let token = issue_encrypted(Arc::clone(&enc_key));
    let handler = JwtTokenHandler::new();

    let mut p = params(enc_key);
    p.token_replay_cache = Some(Arc::new(InMemoryReplayCache::new(Duration::hours(24))));
    p.save_signin_token = true;

    // The five-segment outer form is what the cache and the identity
    // retain, not the decrypted inner token.
    let (principal, _) = handler.validate_token(&token, &p).unwrap();
    assert_eq!(
        principal.primary().unwrap().bootstrap_token(),
        Some(token.as_str())
    );
    assert!(matches!(
        handler.validate_token(&token, &p),
        Err(TokenError::ReplayDetected)
    ));
}

#[test]
fn resolver_controls_decryption_candidates() {
    let enc_key = encryption_key([9u8; 32]);
    let token = issue_encrypted(Arc::clone(&enc_key));

    let mut p = params(encryption_key([10u8; 32]));
    let resolved = Arc::clone(&enc_key);
    p.token_decryption_key_resolver = Some(Arc::new(move |_, _, kid, _| {
        assert_eq!(kid, Some("ENC"));
        vec![Arc::clone(&resolved)]
    }));

    JwtTokenHandler::new().validate_token(&token, &p).unwrap();
}
