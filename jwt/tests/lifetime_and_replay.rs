//! Lifetime windows, clock skew and single-use token tracking.

use std::sync::Arc;

use chrono::{Duration, Utc};
use sentinel_jwt::{JwtTokenHandler, SecurityTokenDescriptor, TokenValidationParameters};
use sentinel_tokens::{
    InMemoryReplayCache, SecurityKey, SignatureAlgorithm, SigningCredentials, TokenError,
};

const ISSUER: &str = "https://idp.example";
const AUDIENCE: &str = "api";

fn key() -> Arc<SecurityKey> {
    Arc::new(SecurityKey::symmetric([5u8; 32]).with_key_id("K1"))
}

fn issue(expires_in: Duration) -> String {
    let now = Utc::now();
    JwtTokenHandler::new()
        .create_token(&SecurityTokenDescriptor {
            issuer: Some(ISSUER.to_string()),
            audience: Some(AUDIENCE.to_string()),
            not_before: Some(now - Duration::hours(2)),
            issued_at: Some(now - Duration::hours(2)),
            expires: Some(now + expires_in),
            signing_credentials: Some(SigningCredentials::new(key(), SignatureAlgorithm::Hs256)),
            ..SecurityTokenDescriptor::default()
        })
        .unwrap()
}

fn params() -> TokenValidationParameters {
    TokenValidationParameters::new()
        .with_issuer(ISSUER)
        .with_audience(AUDIENCE)
        .with_signing_key(key())
}

#[test]
fn just_expired_token_passes_within_skew() {
    let token = issue(Duration::seconds(-1));
    let p = params().with_clock_skew(Duration::minutes(5));
    JwtTokenHandler::new().validate_token(&token, &p).unwrap();
}

#[test]
fn just_expired_token_fails_with_zero_skew() {
    let token = issue(Duration::seconds(-5));
    let p = params().with_clock_skew(Duration::zero());
    assert!(matches!(
        JwtTokenHandler::new().validate_token(&token, &p),
        Err(TokenError::Expired { .. })
    ));
}

#[test]
fn not_yet_valid_token_is_rejected() {
    let now = Utc::now();
    let token = JwtTokenHandler::new()
        .create_token(&SecurityTokenDescriptor {
            issuer: Some(ISSUER.to_string()),
            audience: Some(AUDIENCE.to_string()),
            not_before: Some(now + Duration::hours(1)),
            expires: Some(now + Duration::hours(2)),
            signing_credentials: Some(SigningCredentials::new(key(), SignatureAlgorithm::Hs256)),
            ..SecurityTokenDescriptor::default()
        })
        .unwrap();

    let p = params().with_clock_skew(Duration::zero());
    assert!(matches!(
        JwtTokenHandler::new().validate_token(&token, &p),
        Err(TokenError::NotYetValid { .. })
    ));
}

#[test]
fn missing_exp_is_rejected_unless_waived() {
    let token = JwtTokenHandler::new()
        .with_set_default_times(false)
        .create_token(&SecurityTokenDescriptor {
            issuer: Some(ISSUER.to_string()),
            audience: Some(AUDIENCE.to_string()),
            signing_credentials: Some(SigningCredentials::new(key(), SignatureAlgorithm::Hs256)),
            ..SecurityTokenDescriptor::default()
        })
        .unwrap();

    assert!(matches!(
        JwtTokenHandler::new().validate_token(&token, &params()),
        Err(TokenError::NoExpiration)
    ));

    let mut waived = params();
    waived.require_expiration_time = false;
    JwtTokenHandler::new()
        .validate_token(&token, &waived)
        .unwrap();
}

#[test]
fn second_presentation_is_rejected_as_replay() {
    let token = issue(Duration::hours(1));
    let handler = JwtTokenHandler::new();

    let mut p = params();
    p.token_replay_cache = Some(Arc::new(InMemoryReplayCache::new(Duration::hours(24))));

    handler.validate_token(&token, &p).unwrap();
    assert!(matches!(
        handler.validate_token(&token, &p),
        Err(TokenError::ReplayDetected)
    ));
}

#[test]
fn untrackable_token_is_rejected_not_waved_through() {
    // Cache ceiling below the token lifetime: the cache refuses it.
    let token = issue(Duration::hours(10));
    let mut p = params();
    p.token_replay_cache = Some(Arc::new(InMemoryReplayCache::new(Duration::hours(1))));

    assert!(matches!(
        JwtTokenHandler::new().validate_token(&token, &p),
        Err(TokenError::ReplayAddFailed)
    ));
}

#[test]
fn lifetime_override_delegate_replaces_the_built_in_step() {
    let token = issue(Duration::seconds(-5));

    let mut p = params().with_clock_skew(Duration::zero());
    p.lifetime_validator = Some(Arc::new(|_nbf, exp, _, _| {
        assert!(exp.is_some());
        Ok(())
    }));
    JwtTokenHandler::new().validate_token(&token, &p).unwrap();
}
