//! End-to-end create/validate round trips over signed tokens.

use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use sentinel_jwt::{JwtTokenHandler, SecurityTokenDescriptor, TokenValidationParameters};
use sentinel_tokens::{
    SecurityKey, SignatureAlgorithm, SigningCredentials, TokenError,
};

const ISSUER: &str = "https://idp.example";
const AUDIENCE: &str = "https://api.example";

fn signing_key(secret: [u8; 32]) -> Arc<SecurityKey> {
    Arc::new(SecurityKey::symmetric(secret).with_key_id("K1"))
}

fn descriptor(key: Arc<SecurityKey>) -> SecurityTokenDescriptor {
    SecurityTokenDescriptor {
        issuer: Some(ISSUER.to_string()),
        audience: Some(AUDIENCE.to_string()),
        signing_credentials: Some(SigningCredentials::new(key, SignatureAlgorithm::Hs256)),
        ..SecurityTokenDescriptor::default()
    }
}

fn params(key: Arc<SecurityKey>) -> TokenValidationParameters {
    TokenValidationParameters::new()
        .with_issuer(ISSUER)
        .with_audience(AUDIENCE)
        .with_signing_key(key)
}

#[test]
fn hs256_token_round_trips_and_projects_issuer() {
    let key = signing_key([11u8; 32]);
    let handler = JwtTokenHandler::new();

    let token = handler.create_token(&descriptor(Arc::clone(&key))).unwrap();
    assert!(handler.can_read_token(&token));

    let (principal, validated) = handler.validate_token(&token, &params(key)).unwrap();

    let iss = principal.find_first("iss").unwrap();
    assert_eq!(iss.value_str(), Some(ISSUER));
    assert_eq!(iss.issuer(), ISSUER);

    let jws = validated.claims_token().unwrap();
    assert!(jws.signing_key().is_some());
    assert_eq!(jws.signing_key().unwrap().key_id(), Some("K1"));
    assert_eq!(handler.write_token(&validated), token);
}

#[test]
fn flipping_one_signature_byte_invalidates_the_token() {
    let key = signing_key([11u8; 32]);
    let handler = JwtTokenHandler::new();
    let token = handler.create_token(&descriptor(Arc::clone(&key))).unwrap();

    let (head, signature) = token.rsplit_once('.').unwrap();
    let mut bytes = URL_SAFE_NO_PAD.decode(signature).unwrap();
    bytes[0] ^= 0x01;
    let tampered = format!("{head}.{}", URL_SAFE_NO_PAD.encode(bytes));

    assert!(matches!(
        handler.validate_token(&tampered, &params(key)),
        Err(TokenError::InvalidSignature { .. })
    ));
}

#[test]
fn tampered_payload_invalidates_the_token() {
    let key = signing_key([11u8; 32]);
    let handler = JwtTokenHandler::new();
    let token = handler.create_token(&descriptor(Arc::clone(&key))).unwrap();

    let segments: Vec<&str> = token.split('.').collect();
    let mut claims: serde_json::Map<String, serde_json::Value> =
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(segments[1]).unwrap()).unwrap();
    claims.insert("admin".to_string(), serde_json::Value::Bool(true));
    let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());
    let forged = format!("{}.{}.{}", segments[0], forged_payload, segments[2]);

    assert!(matches!(
        handler.validate_token(&forged, &params(key)),
        Err(TokenError::InvalidSignature { .. })
    ));
}

#[test]
fn es256_token_round_trips() {
    let private = Arc::new(
        SecurityKey::ec_p256_private(&[42u8; 32])
            .unwrap()
            .with_key_id("EC1"),
    );
    let handler = JwtTokenHandler::new();

    let mut d = descriptor(Arc::clone(&private));
    d.signing_credentials = Some(SigningCredentials::new(
        Arc::clone(&private),
        SignatureAlgorithm::Es256,
    ));
    let token = handler.create_token(&d).unwrap();

    let (principal, _) = handler.validate_token(&token, &params(private)).unwrap();
    assert_eq!(principal.find_first("aud").unwrap().value_str(), Some(AUDIENCE));
}

#[test]
fn audience_match_is_case_sensitive_end_to_end() {
    let key = signing_key([11u8; 32]);
    let handler = JwtTokenHandler::new();
    let token = handler.create_token(&descriptor(Arc::clone(&key))).unwrap();

    let wrong_case = TokenValidationParameters::new()
        .with_issuer(ISSUER)
        .with_audience(AUDIENCE.to_uppercase())
        .with_signing_key(key);
    assert!(matches!(
        handler.validate_token(&token, &wrong_case),
        Err(TokenError::InvalidAudience { .. })
    ));
}

#[test]
fn wrong_issuer_is_rejected_after_audience_passes() {
    let key = signing_key([11u8; 32]);
    let handler = JwtTokenHandler::new();
    let token = handler.create_token(&descriptor(Arc::clone(&key))).unwrap();

    let p = TokenValidationParameters::new()
        .with_issuer("https://other-idp.example")
        .with_audience(AUDIENCE)
        .with_signing_key(key);
    assert!(matches!(
        handler.validate_token(&token, &p),
        Err(TokenError::InvalidIssuer { .. })
    ));
}
