//! Validation policy and the default per-step validators.
//!
//! Every pipeline step can be replaced with a delegate; when a delegate
//! is installed the built-in logic for that step does not run at all,
//! and the delegate's verdict is final.

use std::sync::Arc;

use chrono::{Duration, Utc};
use sentinel_tokens::{SecurityKey, TokenError, TokenReplayCache, TokenResult};
use tracing::debug;

use crate::token::{JwsToken, JwtToken};

/// Resolves candidate keys for signature or decryption, given the raw
/// token, its parsed form and the declared key id. The result is used
/// verbatim, even when empty.
pub type KeyResolver = Arc<
    dyn Fn(&str, &JwtToken, Option<&str>, &TokenValidationParameters) -> Vec<Arc<SecurityKey>>
        + Send
        + Sync,
>;

/// Replaces signature validation wholesale: takes the raw token and
/// returns the verified token with its signing key stamped.
pub type SignatureValidator =
    Arc<dyn Fn(&str, &TokenValidationParameters) -> TokenResult<JwsToken> + Send + Sync>;

/// Replaces lifetime validation: receives `nbf` and `exp` in unix
/// seconds as found in the token.
pub type LifetimeValidator = Arc<
    dyn Fn(Option<i64>, Option<i64>, &JwsToken, &TokenValidationParameters) -> TokenResult<()>
        + Send
        + Sync,
>;

/// Replaces audience validation: receives the token's audiences.
pub type AudienceValidator =
    Arc<dyn Fn(&[&str], &JwsToken, &TokenValidationParameters) -> TokenResult<()> + Send + Sync>;

/// Replaces issuer validation: returns the issuer string to attribute
/// projected claims to.
pub type IssuerValidator = Arc<
    dyn Fn(Option<&str>, &JwsToken, &TokenValidationParameters) -> TokenResult<String>
        + Send
        + Sync,
>;

/// Replaces signing-key trust validation, run against the key that
/// verified the signature.
pub type IssuerSigningKeyValidator =
    Arc<dyn Fn(&SecurityKey, &TokenValidationParameters) -> TokenResult<()> + Send + Sync>;

/// Policy inputs for one validation run.
#[derive(Clone, Default)]
pub struct TokenValidationParameters {
    /// Single accepted issuer.
    pub valid_issuer: Option<String>,
    /// Additional accepted issuers.
    pub valid_issuers: Vec<String>,
    /// Single accepted audience.
    pub valid_audience: Option<String>,
    /// Additional accepted audiences.
    pub valid_audiences: Vec<String>,

    /// Primary signing key, tried before the key list.
    pub issuer_signing_key: Option<Arc<SecurityKey>>,
    /// Further signing keys.
    pub issuer_signing_keys: Vec<Arc<SecurityKey>>,
    /// Signing-key resolver; when set, its result is used verbatim.
    pub issuer_signing_key_resolver: Option<KeyResolver>,

    /// Primary decryption key, tried before the key list.
    pub token_decryption_key: Option<Arc<SecurityKey>>,
    /// Further decryption keys.
    pub token_decryption_keys: Vec<Arc<SecurityKey>>,
    /// Decryption-key resolver; when set, its result is used verbatim.
    pub token_decryption_key_resolver: Option<KeyResolver>,

    /// Allowed clock skew for `nbf` and `exp`.
    pub clock_skew: Duration,
    /// Reject tokens with an empty signature segment.
    pub require_signed_tokens: bool,
    /// Reject tokens without an `exp` claim.
    pub require_expiration_time: bool,
    /// Run the lifetime step.
    pub validate_lifetime: bool,
    /// Run the audience step.
    pub validate_audience: bool,
    /// Run the issuer step.
    pub validate_issuer: bool,
    /// Recursively validate the `actort` claim.
    pub validate_actor: bool,
    /// Run the signing-key trust step.
    pub validate_issuer_signing_key: bool,
    /// Run lifetime, audience, issuer and replay checks on tokens that
    /// were accepted without a signature. When false such tokens skip
    /// those steps and go straight to claims projection.
    pub validate_unsigned_claims: bool,
    /// Retain the raw token on the projected identity.
    pub save_signin_token: bool,

    /// Single-use token tracking; absent means no replay check.
    pub token_replay_cache: Option<Arc<dyn TokenReplayCache>>,
    /// Policy for validating the `actort` token. Falls back to these
    /// parameters when absent.
    pub actor_validation_parameters: Option<Arc<TokenValidationParameters>>,

    /// Step override: signature.
    pub signature_validator: Option<SignatureValidator>,
    /// Step override: lifetime.
    pub lifetime_validator: Option<LifetimeValidator>,
    /// Step override: audience.
    pub audience_validator: Option<AudienceValidator>,
    /// Step override: issuer.
    pub issuer_validator: Option<IssuerValidator>,
    /// Step override: signing-key trust.
    pub issuer_signing_key_validator: Option<IssuerSigningKeyValidator>,
}

impl TokenValidationParameters {
    /// Defaults: every built-in step enabled, signed tokens required,
    /// five minutes of clock skew, no keys configured.
    pub fn new() -> Self {
        Self {
            clock_skew: Duration::minutes(5),
            require_signed_tokens: true,
            require_expiration_time: true,
            validate_lifetime: true,
            validate_audience: true,
            validate_issuer: true,
            validate_actor: false,
            validate_issuer_signing_key: false,
            validate_unsigned_claims: true,
            ..Self::default()
        }
    }

    /// Set the accepted issuer.
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.valid_issuer = Some(issuer.into());
        self
    }

    /// Set the accepted audience.
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.valid_audience = Some(audience.into());
        self
    }

    /// Set the primary signing key.
    pub fn with_signing_key(mut self, key: Arc<SecurityKey>) -> Self {
        self.issuer_signing_key = Some(key);
        self
    }

    /// Set the primary decryption key.
    pub fn with_decryption_key(mut self, key: Arc<SecurityKey>) -> Self {
        self.token_decryption_key = Some(key);
        self
    }

    /// Set the allowed clock skew.
    pub fn with_clock_skew(mut self, skew: Duration) -> Self {
        self.clock_skew = skew;
        self
    }

    /// All configured signing keys: the primary key first, then the
    /// list, in order.
    pub fn signing_keys(&self) -> Vec<Arc<SecurityKey>> {
        let mut keys = Vec::with_capacity(1 + self.issuer_signing_keys.len());
        if let Some(key) = &self.issuer_signing_key {
            keys.push(Arc::clone(key));
        }
        keys.extend(self.issuer_signing_keys.iter().cloned());
        keys
    }

    /// All configured decryption keys: the primary key first, then the
    /// list, in order.
    pub fn decryption_keys(&self) -> Vec<Arc<SecurityKey>> {
        let mut keys = Vec::with_capacity(1 + self.token_decryption_keys.len());
        if let Some(key) = &self.token_decryption_key {
            keys.push(Arc::clone(key));
        }
        keys.extend(self.token_decryption_keys.iter().cloned());
        keys
    }

    /// Non-blank configured audiences.
    pub fn configured_audiences(&self) -> Vec<&str> {
        self.valid_audience
            .iter()
            .map(String::as_str)
            .chain(self.valid_audiences.iter().map(String::as_str))
            .filter(|a| !a.is_empty())
            .collect()
    }

    /// Non-blank configured issuers.
    pub fn configured_issuers(&self) -> Vec<&str> {
        self.valid_issuer
            .iter()
            .map(String::as_str)
            .chain(self.valid_issuers.iter().map(String::as_str))
            .filter(|i| !i.is_empty())
            .collect()
    }
}

impl std::fmt::Debug for TokenValidationParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenValidationParameters")
            .field("valid_issuer", &self.valid_issuer)
            .field("valid_audience", &self.valid_audience)
            .field("signing_keys", &self.signing_keys().len())
            .field("decryption_keys", &self.decryption_keys().len())
            .field("clock_skew", &self.clock_skew)
            .field("require_signed_tokens", &self.require_signed_tokens)
            .field("require_expiration_time", &self.require_expiration_time)
            .field("validate_lifetime", &self.validate_lifetime)
            .field("validate_audience", &self.validate_audience)
            .field("validate_issuer", &self.validate_issuer)
            .field("validate_actor", &self.validate_actor)
            .finish_non_exhaustive()
    }
}

/// Default lifetime check: `nbf <= now + skew` and `exp > now - skew`.
pub fn validate_lifetime(
    nbf: Option<i64>,
    exp: Option<i64>,
    params: &TokenValidationParameters,
) -> TokenResult<()> {
    if params.require_expiration_time && exp.is_none() {
        return Err(TokenError::NoExpiration);
    }

    let now = Utc::now().timestamp();
    let skew = params.clock_skew.num_seconds();

    if let Some(nbf) = nbf {
        if nbf > now + skew {
            return Err(TokenError::NotYetValid { nbf, now });
        }
    }
    if let Some(exp) = exp {
        if exp <= now - skew {
            return Err(TokenError::Expired { exp, now });
        }
    }
    Ok(())
}

/// Default audience check: ordinal, case-sensitive match of any
/// non-blank token audience against any non-blank configured audience.
pub fn validate_audience(
    audiences: &[&str],
    params: &TokenValidationParameters,
) -> TokenResult<()> {
    let configured = params.configured_audiences();
    if configured.is_empty() {
        return Err(TokenError::NoValidAudiences);
    }

    let matched = audiences
        .iter()
        .filter(|a| !a.is_empty())
        .any(|a| configured.contains(a));
    if matched {
        Ok(())
    } else {
        Err(TokenError::InvalidAudience {
            audiences: audiences.join(", "),
        })
    }
}

/// Default issuer check: ordinal match against the configured issuers.
/// Returns the matched issuer so projected claims can be attributed to
/// it.
pub fn validate_issuer(
    issuer: Option<&str>,
    params: &TokenValidationParameters,
) -> TokenResult<String> {
    let issuer = issuer.unwrap_or_default();
    if issuer.is_empty() {
        return Err(TokenError::InvalidIssuer {
            issuer: String::new(),
        });
    }

    let configured = params.configured_issuers();
    if configured.is_empty() {
        return Err(TokenError::NoValidIssuers);
    }
    if configured.contains(&issuer) {
        Ok(issuer.to_string())
    } else {
        Err(TokenError::InvalidIssuer {
            issuer: issuer.to_string(),
        })
    }
}

/// Default replay check against the configured cache. A token without
/// `exp` cannot be tracked and is rejected outright.
pub fn validate_token_replay(
    raw_token: &str,
    expires: Option<i64>,
    params: &TokenValidationParameters,
) -> TokenResult<()> {
    let Some(cache) = &params.token_replay_cache else {
        return Ok(());
    };

    let Some(expires) = expires else {
        return Err(TokenError::NoExpiration);
    };
    let expires_at = chrono::DateTime::from_timestamp(expires, 0)
        .ok_or_else(|| TokenError::malformed("exp is out of range"))?;

    if cache.try_find(raw_token) {
        debug!("token found in replay cache");
        return Err(TokenError::ReplayDetected);
    }
    if !cache.try_add(raw_token, expires_at) {
        return Err(TokenError::ReplayAddFailed);
    }
    Ok(())
}

/// Default signing-key trust check: a key that verified a signature is
/// trusted unless it never materialized from its descriptor.
pub fn validate_issuer_signing_key(key: &SecurityKey) -> TokenResult<()> {
    match key.material() {
        sentinel_tokens::KeyMaterial::Unresolved { .. } => Err(TokenError::InvalidSigningKey(
            format!("{} never materialized", key.describe()),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> TokenValidationParameters {
        TokenValidationParameters::new()
    }

    #[test]
    fn expired_within_skew_is_accepted() {
        let now = Utc::now().timestamp();
        let p = params().with_clock_skew(Duration::minutes(5));
        assert!(validate_lifetime(None, Some(now - 1), &p).is_ok());
    }

    #[test]
    fn expired_with_zero_skew_is_rejected() {
        let now = Utc::now().timestamp();
        let p = params().with_clock_skew(Duration::zero());
        assert!(matches!(
            validate_lifetime(None, Some(now - 1), &p),
            Err(TokenError::Expired { .. })
        ));
    }

    #[test]
    fn nbf_in_the_future_is_rejected() {
        let now = Utc::now().timestamp();
        let p = params().with_clock_skew(Duration::zero());
        assert!(matches!(
            validate_lifetime(Some(now + 600), Some(now + 900), &p),
            Err(TokenError::NotYetValid { .. })
        ));
    }

    #[test]
    fn missing_exp_is_rejected_when_required() {
        let p = params();
        assert!(matches!(
            validate_lifetime(None, None, &p),
            Err(TokenError::NoExpiration)
        ));

        let mut relaxed = params();
        relaxed.require_expiration_time = false;
        assert!(validate_lifetime(None, None, &relaxed).is_ok());
    }

    #[test]
    fn audience_match_is_case_sensitive() {
        let p = params().with_audience("api");
        assert!(validate_audience(&["api"], &p).is_ok());
        assert!(matches!(
            validate_audience(&["API"], &p),
            Err(TokenError::InvalidAudience { .. })
        ));
    }

    #[test]
    fn blank_audiences_are_ignored_on_both_sides() {
        let mut p = params();
        p.valid_audience = Some(String::new());
        p.valid_audiences = vec!["portal".to_string(), String::new()];
        assert!(validate_audience(&["", "portal"], &p).is_ok());
        assert!(matches!(
            validate_audience(&[""], &p),
            Err(TokenError::InvalidAudience { .. })
        ));
    }

    #[test]
    fn no_configured_audience_is_a_distinct_failure() {
        assert!(matches!(
            validate_audience(&["api"], &params()),
            Err(TokenError::NoValidAudiences)
        ));
    }

    #[test]
    fn issuer_check_returns_the_validated_issuer() {
        let p = params().with_issuer("https://idp.example");
        assert_eq!(
            validate_issuer(Some("https://idp.example"), &p).unwrap(),
            "https://idp.example"
        );
        assert!(matches!(
            validate_issuer(Some("https://other.example"), &p),
            Err(TokenError::InvalidIssuer { .. })
        ));
        assert!(matches!(
            validate_issuer(Some("https://idp.example"), &params()),
            Err(TokenError::NoValidIssuers)
        ));
    }

    #[test]
    fn replay_check_rejects_second_presentation() {
        use sentinel_tokens::InMemoryReplayCache;

        let mut p = params();
        p.token_replay_cache = Some(Arc::new(InMemoryReplayCache::new(Duration::hours(2))));
        let exp = Utc::now().timestamp() + 600;

        assert!(validate_token_replay("tok", Some(exp), &p).is_ok());
        assert!(matches!(
            validate_token_replay("tok", Some(exp), &p),
            Err(TokenError::ReplayDetected)
        ));
        assert!(matches!(
            validate_token_replay("other", None, &p),
            Err(TokenError::NoExpiration)
        ));
    }
}
