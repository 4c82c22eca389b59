//! Token creation and the validation pipeline.
//!
//! The pipeline is strictly ordered and fail-fast: decrypt, signature,
//! lifetime, audience, issuer, replay, actor, key trust, projection.
//! The first failing step surfaces its error and nothing later runs.

use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use sentinel_tokens::{
    crypto, EncryptingCredentials, SecurityKey, SignatureAlgorithm, SigningCredentials,
    TokenError, TokenResult, DIRECT_KEY_USE_ALG,
};
use serde_json::{Map, Value};
use tracing::debug;

use crate::claims::{
    claim_types, Claim, ClaimTypeMaps, ClaimsIdentity, ClaimsPrincipal,
    SHORT_CLAIM_TYPE_PROPERTY,
};
use crate::codec;
use crate::constants::{claim_names, DEFAULT_MAX_TOKEN_SIZE, DEFAULT_TOKEN_LIFETIME_MINUTES};
use crate::header::JwtHeader;
use crate::payload::JwtPayload;
use crate::token::{JweToken, JwsToken, JwtToken};
use crate::validation::{self, TokenValidationParameters};

/// Delegation chains are capped at one level: a token may carry an
/// actor, the actor may not.
const MAX_ACTOR_DEPTH: usize = 1;

/// Everything needed to mint a token.
#[derive(Debug, Clone, Default)]
pub struct SecurityTokenDescriptor {
    /// Value of the `iss` claim.
    pub issuer: Option<String>,
    /// Value of the `aud` claim.
    pub audience: Option<String>,
    /// Identity whose claims seed the payload. Explicit registered
    /// claims below win over subject claims of the same name.
    pub subject: Option<ClaimsIdentity>,
    /// Extra payload claims, merged after the subject's.
    pub claims: Map<String, Value>,
    /// Value of the `nbf` claim.
    pub not_before: Option<DateTime<Utc>>,
    /// Value of the `exp` claim.
    pub expires: Option<DateTime<Utc>>,
    /// Value of the `iat` claim.
    pub issued_at: Option<DateTime<Utc>>,
    /// Key and algorithm for the signature; absent mints an unsigned
    /// token with an empty signature segment.
    pub signing_credentials: Option<SigningCredentials>,
    /// When set, the signed token is wrapped in an encrypted envelope.
    pub encrypting_credentials: Option<EncryptingCredentials>,
}

/// Creates, reads and validates compact tokens.
///
/// The handler is stateless apart from configuration and is safe to
/// share across threads.
#[derive(Debug, Clone)]
pub struct JwtTokenHandler {
    maps: ClaimTypeMaps,
    max_token_size: usize,
    token_lifetime: Duration,
    set_default_times: bool,
}

impl Default for JwtTokenHandler {
    fn default() -> Self {
        Self {
            maps: ClaimTypeMaps::default(),
            max_token_size: DEFAULT_MAX_TOKEN_SIZE,
            token_lifetime: Duration::minutes(DEFAULT_TOKEN_LIFETIME_MINUTES),
            set_default_times: true,
        }
    }
}

impl JwtTokenHandler {
    /// A handler with the default claim-type maps and limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the claim-type translation tables.
    pub fn with_claim_type_maps(mut self, maps: ClaimTypeMaps) -> Self {
        self.maps = maps;
        self
    }

    /// Cap accepted token length in bytes.
    pub fn with_max_token_size(mut self, max: usize) -> Self {
        self.max_token_size = max;
        self
    }

    /// Lifetime applied when a descriptor has no explicit `exp`.
    pub fn with_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.token_lifetime = lifetime;
        self
    }

    /// Whether missing `exp`/`nbf`/`iat` are filled at creation.
    pub fn with_set_default_times(mut self, set: bool) -> Self {
        self.set_default_times = set;
        self
    }

    /// The claim-type translation tables in force.
    pub fn claim_type_maps(&self) -> &ClaimTypeMaps {
        &self.maps
    }

    /// Whether `token` is structurally plausible: within the size cap
    /// and shaped like a signed or encrypted compact token.
    pub fn can_read_token(&self, token: &str) -> bool {
        codec::can_read_token(token, self.max_token_size)
    }

    /// Parse a token without any validation.
    pub fn read_token(&self, token: &str) -> TokenResult<JwtToken> {
        codec::parse(token, self.max_token_size)
    }

    /// The compact form of a parsed token.
    pub fn write_token(&self, token: &JwtToken) -> String {
        token.raw_data()
    }

    /// Mint a token from a descriptor.
    pub fn create_token(&self, descriptor: &SecurityTokenDescriptor) -> TokenResult<String> {
        let payload = self.build_payload(descriptor)?;
        let signed = self.sign_payload(&payload, descriptor.signing_credentials.as_ref())?;
        match &descriptor.encrypting_credentials {
            Some(credentials) => self.encrypt_token(&signed, credentials),
            None => Ok(signed),
        }
    }

    /// Validate a token end to end and project its claims.
    ///
    /// Returns the principal and the parsed token with its decrypted
    /// content and verified signing key filled in.
    pub fn validate_token(
        &self,
        token: &str,
        params: &TokenValidationParameters,
    ) -> TokenResult<(ClaimsPrincipal, JwtToken)> {
        self.validate_token_at_depth(token, params, 0)
    }

    fn validate_token_at_depth(
        &self,
        token: &str,
        params: &TokenValidationParameters,
        depth: usize,
    ) -> TokenResult<(ClaimsPrincipal, JwtToken)> {
        let parsed = codec::parse(token, self.max_token_size)?;

        let (jws, validated) = match parsed {
            JwtToken::Jws(jws) => {
                let jws = self.validate_signature(token, jws, params)?;
                (jws.clone(), JwtToken::Jws(jws))
            }
            JwtToken::Jwe(mut jwe) => {
                let inner = self.decrypt_token(&jwe, params)?;
                let inner_raw = inner.raw_data();
                let inner = self.validate_signature(&inner_raw, inner, params)?;
                jwe.set_inner(inner.clone());
                (inner, JwtToken::Jwe(jwe))
            }
        };

        let principal = self.validate_token_payload(&jws, token, params, depth)?;
        Ok((principal, validated))
    }

    /// Signature step: resolve candidate keys and scan them over the
    /// raw signing input.
    fn validate_signature(
        &self,
        raw: &str,
        mut jws: JwsToken,
        params: &TokenValidationParameters,
    ) -> TokenResult<JwsToken> {
        if let Some(validator) = &params.signature_validator {
            return validator(raw, params);
        }

        if !jws.is_signed() {
            if params.require_signed_tokens {
                return Err(TokenError::NotSigned);
            }
            debug!("accepting unsigned token, signed tokens not required");
            return Ok(jws);
        }

        let alg_value = jws.header().alg().unwrap_or_default().to_string();
        let alg = SignatureAlgorithm::parse(&alg_value)?;
        let kid = jws.header().kid().map(str::to_string);
        let x5t = jws.header().x5t().map(str::to_string);

        let keys = match &params.issuer_signing_key_resolver {
            // The resolver's verdict is final, an empty result included.
            Some(resolver) => {
                let view = JwtToken::Jws(jws.clone());
                resolver(raw, &view, kid.as_deref(), params)
            }
            None => {
                let configured = params.signing_keys();
                match direct_key_match(&configured, kid.as_deref(), x5t.as_deref()) {
                    Some(key) => vec![key],
                    None => configured,
                }
            }
        };

        let signing_input = jws.signing_input();
        let can_match_key = kid.is_some() || x5t.is_some();
        let mut key_matched = false;
        let mut attempted: Vec<String> = Vec::new();

        for key in &keys {
            if let Some(kid) = kid.as_deref() {
                if key.key_id() == Some(kid) {
                    key_matched = true;
                }
            }
            if let Some(x5t) = x5t.as_deref() {
                if key.x5t() == Some(x5t) {
                    key_matched = true;
                }
            }
            match crypto::verify(key, alg, signing_input.as_bytes(), jws.signature()) {
                Ok(true) => {
                    jws.set_signing_key(Arc::clone(key));
                    return Ok(jws);
                }
                Ok(false) => {
                    debug!(key = %key.describe(), "signature did not verify under key");
                }
                Err(err) => {
                    debug!(key = %key.describe(), %err, "key skipped during signature scan");
                }
            }
            attempted.push(key.describe());
        }

        if attempted.is_empty() {
            return Err(TokenError::NoSigningKeys);
        }
        let keys_attempted = attempted.join(", ");
        if can_match_key && !key_matched {
            return Err(TokenError::SignatureKeyNotFound {
                kid: kid.or(x5t).unwrap_or_default(),
                keys_attempted,
            });
        }
        Err(TokenError::InvalidSignature { keys_attempted })
    }

    /// Decryption step: direct key use only, scanning symmetric
    /// candidates until one authenticates the ciphertext.
    fn decrypt_token(
        &self,
        jwe: &JweToken,
        params: &TokenValidationParameters,
    ) -> TokenResult<JwsToken> {
        let header = jwe.header();
        let enc_value = header
            .enc()
            .ok_or_else(|| TokenError::malformed("encrypted token is missing 'enc'"))?;
        let enc = sentinel_tokens::EncryptionAlgorithm::parse(enc_value)?;

        let alg = header.alg().unwrap_or_default();
        if alg != DIRECT_KEY_USE_ALG {
            return Err(TokenError::KeyWrapNotSupported(alg.to_string()));
        }

        let kid = header.kid().map(str::to_string);
        let x5t = header.x5t().map(str::to_string);
        let keys = match &params.token_decryption_key_resolver {
            Some(resolver) => {
                let view = JwtToken::Jwe(jwe.clone());
                resolver(jwe.raw_data(), &view, kid.as_deref(), params)
            }
            None => {
                let configured = params.decryption_keys();
                match direct_key_match(&configured, kid.as_deref(), x5t.as_deref()) {
                    Some(key) => vec![key],
                    None => configured,
                }
            }
        };
        if keys.is_empty() {
            return Err(TokenError::NoDecryptionKeys);
        }

        // The AAD is the ASCII bytes of the outer header exactly as it
        // appeared on the wire.
        let aad = jwe.raw_header().as_bytes();
        let mut attempted: Vec<String> = Vec::new();

        for key in &keys {
            let Some(secret) = key.symmetric_bytes() else {
                debug!(
                    key = %key.describe(),
                    "skipping non-symmetric decryption candidate under direct key use"
                );
                continue;
            };
            match crypto::aead::decrypt(secret, enc, jwe.iv(), jwe.ciphertext(), jwe.tag(), aad) {
                Ok(plaintext) => {
                    let inner = String::from_utf8(plaintext).map_err(|_| {
                        TokenError::malformed("decrypted content is not valid UTF-8")
                    })?;
                    let parsed = codec::parse(&inner, self.max_token_size)?;
                    let JwtToken::Jws(inner_jws) = parsed else {
                        return Err(TokenError::malformed(
                            "decrypted content is not a signed token",
                        ));
                    };
                    return Ok(inner_jws);
                }
                Err(err) => {
                    debug!(key = %key.describe(), %err, "decryption candidate failed");
                    attempted.push(key.describe());
                }
            }
        }

        Err(TokenError::DecryptionFailed {
            keys_attempted: attempted.join(", "),
        })
    }

    /// The claim checks that run after the cryptographic steps. `raw`
    /// is the compact form the caller presented, so for an encrypted
    /// token the replay cache and the bootstrap token carry the outer
    /// envelope, not the decrypted inner token.
    fn validate_token_payload(
        &self,
        jws: &JwsToken,
        raw: &str,
        params: &TokenValidationParameters,
        depth: usize,
    ) -> TokenResult<ClaimsPrincipal> {
        let payload = jws.payload();
        let run_claim_checks = jws.is_signed() || params.validate_unsigned_claims;

        if params.validate_lifetime && run_claim_checks {
            match &params.lifetime_validator {
                Some(validator) => validator(payload.nbf(), payload.exp(), jws, params)?,
                None => validation::validate_lifetime(payload.nbf(), payload.exp(), params)?,
            }
        }

        if params.validate_audience && run_claim_checks {
            let audiences = payload.aud();
            match &params.audience_validator {
                Some(validator) => validator(&audiences, jws, params)?,
                None => validation::validate_audience(&audiences, params)?,
            }
        }

        let issuer = if params.validate_issuer && run_claim_checks {
            match &params.issuer_validator {
                Some(validator) => validator(payload.iss(), jws, params)?,
                None => validation::validate_issuer(payload.iss(), params)?,
            }
        } else {
            payload.iss().unwrap_or_default().to_string()
        };

        if run_claim_checks {
            validation::validate_token_replay(raw, payload.exp(), params)?;
        }

        let actor_identity = match payload.actort() {
            Some(actor_token) if params.validate_actor => {
                if depth >= MAX_ACTOR_DEPTH {
                    return Err(TokenError::InvalidActor(
                        "delegation is nested deeper than one level".to_string(),
                    ));
                }
                let actor_params = params
                    .actor_validation_parameters
                    .as_deref()
                    .unwrap_or(params);
                let (actor_principal, _) =
                    self.validate_token_at_depth(actor_token, actor_params, depth + 1)?;
                actor_principal.primary().cloned()
            }
            _ => None,
        };

        if params.validate_issuer_signing_key {
            if let Some(key) = jws.signing_key() {
                match &params.issuer_signing_key_validator {
                    Some(validator) => validator(key, params)?,
                    None => validation::validate_issuer_signing_key(key)?,
                }
            }
        }

        let mut identity = self.create_claims_identity(jws, &issuer)?;
        if let Some(actor) = actor_identity {
            identity.set_actor(actor);
        }
        if params.save_signin_token {
            identity.set_bootstrap_token(raw);
        }
        Ok(ClaimsPrincipal::from_identity(identity))
    }

    /// Project payload claims into an identity, applying the inbound
    /// filter and type map. Array values flatten into one claim per
    /// element.
    fn create_claims_identity(&self, jws: &JwsToken, issuer: &str) -> TokenResult<ClaimsIdentity> {
        let mut identity = ClaimsIdentity::new();
        let mut actor_claims = 0usize;
        for (name, value) in jws.payload().claims() {
            if self.maps.inbound_filter.contains(name) {
                continue;
            }
            let mapped = self.maps.inbound.get(name);
            let claim_type = mapped.map(String::as_str).unwrap_or(name);

            let values: Vec<&Value> = match value {
                Value::Array(items) => items.iter().collect(),
                other => vec![other],
            };
            for item in values {
                if claim_type == claim_types::ACTOR {
                    actor_claims += 1;
                    if actor_claims > 1 {
                        return Err(TokenError::InvalidActor(
                            "token carries more than one delegation claim".to_string(),
                        ));
                    }
                }
                let mut claim = Claim::with_issuer(claim_type, item.clone(), issuer);
                if mapped.is_some() {
                    claim.set_property(SHORT_CLAIM_TYPE_PROPERTY, name);
                }
                identity.add_claim(claim);
            }
        }
        Ok(identity)
    }

    fn build_payload(&self, descriptor: &SecurityTokenDescriptor) -> TokenResult<JwtPayload> {
        let mut payload = JwtPayload::new();

        if let Some(subject) = &descriptor.subject {
            for claim in subject.claims() {
                if claim.claim_type() == claim_types::ACTOR {
                    continue;
                }
                // Outbound table first, then the wire name stashed at
                // projection time, so a claim translated by a
                // non-default inbound map still round-trips.
                let name = self
                    .maps
                    .outbound
                    .get(claim.claim_type())
                    .map(String::as_str)
                    .unwrap_or_else(|| claim.original_name());
                payload.add_claim(name, claim.value().clone());
            }
            if let Some(actor) = subject.actor() {
                let actor_token = self.create_actor_value(actor)?;
                payload.set_claim(claim_names::ACTORT, Value::String(actor_token));
            }
        }

        for (name, value) in &descriptor.claims {
            payload.set_claim(name, value.clone());
        }

        if let Some(issuer) = &descriptor.issuer {
            payload.set_claim(claim_names::ISS, Value::String(issuer.clone()));
        }
        if let Some(audience) = &descriptor.audience {
            payload.set_claim(claim_names::AUD, Value::String(audience.clone()));
        }

        let now = Utc::now();
        let expires = descriptor.expires.or_else(|| {
            self.set_default_times
                .then(|| now + self.token_lifetime)
        });
        let not_before = descriptor
            .not_before
            .or_else(|| self.set_default_times.then_some(now));
        let issued_at = descriptor
            .issued_at
            .or_else(|| self.set_default_times.then_some(now));

        if let (Some(nbf), Some(exp)) = (not_before, expires) {
            if nbf >= exp {
                return Err(TokenError::argument(format!(
                    "not-before {nbf} must precede expiration {exp}"
                )));
            }
        }

        if let Some(exp) = expires {
            payload.set_claim(claim_names::EXP, Value::from(exp.timestamp()));
        }
        if let Some(nbf) = not_before {
            payload.set_claim(claim_names::NBF, Value::from(nbf.timestamp()));
        }
        if let Some(iat) = issued_at {
            payload.set_claim(claim_names::IAT, Value::from(iat.timestamp()));
        }
        Ok(payload)
    }

    /// The `actort` value: the actor's retained raw token if it has
    /// one, otherwise a freshly minted unsigned token of its claims.
    fn create_actor_value(&self, actor: &ClaimsIdentity) -> TokenResult<String> {
        if actor.actor().is_some() {
            return Err(TokenError::InvalidActor(
                "delegation is nested deeper than one level".to_string(),
            ));
        }
        if let Some(raw) = actor.bootstrap_token() {
            return Ok(raw.to_string());
        }
        let descriptor = SecurityTokenDescriptor {
            subject: Some(actor.clone()),
            ..SecurityTokenDescriptor::default()
        };
        let handler = self.clone().with_set_default_times(false);
        handler.create_token(&descriptor)
    }

    fn sign_payload(
        &self,
        payload: &JwtPayload,
        credentials: Option<&SigningCredentials>,
    ) -> TokenResult<String> {
        let header = JwtHeader::for_signing(credentials);
        let signing_input = format!("{}.{}", header.encode()?, payload.encode()?);
        let signature = match credentials {
            Some(credentials) => {
                let bytes = crypto::sign(
                    credentials.key(),
                    credentials.algorithm(),
                    signing_input.as_bytes(),
                )?;
                URL_SAFE_NO_PAD.encode(bytes)
            }
            None => String::new(),
        };
        Ok(format!("{signing_input}.{signature}"))
    }

    /// Wrap a signed token in an encrypted envelope under direct key
    /// use. The outer header's wire bytes become the AAD.
    fn encrypt_token(
        &self,
        inner: &str,
        credentials: &EncryptingCredentials,
    ) -> TokenResult<String> {
        let header = JwtHeader::for_encrypting(credentials);
        let raw_header = header.encode()?;

        let secret = credentials
            .key()
            .symmetric_bytes()
            .ok_or_else(|| TokenError::argument("direct key use requires a symmetric key"))?;
        let sealed = crypto::aead::encrypt(
            secret,
            credentials.enc(),
            inner.as_bytes(),
            raw_header.as_bytes(),
        )?;

        Ok(format!(
            "{raw_header}..{}.{}.{}",
            URL_SAFE_NO_PAD.encode(&sealed.iv),
            URL_SAFE_NO_PAD.encode(&sealed.ciphertext),
            URL_SAFE_NO_PAD.encode(&sealed.tag)
        ))
    }
}

/// First key whose id matches the token's `kid`, then first whose
/// thumbprint matches `x5t`. Ordinal comparison, declaration order.
fn direct_key_match(
    keys: &[Arc<SecurityKey>],
    kid: Option<&str>,
    x5t: Option<&str>,
) -> Option<Arc<SecurityKey>> {
    if let Some(kid) = kid.filter(|k| !k.is_empty()) {
        if let Some(key) = keys.iter().find(|key| key.key_id() == Some(kid)) {
            return Some(Arc::clone(key));
        }
    }
    if let Some(x5t) = x5t.filter(|t| !t.is_empty()) {
        if let Some(key) = keys.iter().find(|key| key.x5t() == Some(x5t)) {
            return Some(Arc::clone(key));
        }
    }
    None
}
