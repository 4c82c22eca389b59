//! Error taxonomy for token creation and validation.
//!
//! One variant per independent failure category so callers can log and
//! react per category. Variants carry structured fields; the message is
//! only formatted when the error is displayed, which keeps the success
//! path free of any error construction cost.

use thiserror::Error;

/// Token operation result type.
pub type TokenResult<T> = Result<T, TokenError>;

/// Coarse failure category of a [`TokenError`].
///
/// `SignatureKeyNotFound` is the only category that suggests a retry
/// after refreshing the signing-key set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureCategory {
    /// Malformed caller input, never retried.
    Argument,
    /// Bad segment count, base64url or JSON in the compact serialization.
    Structure,
    /// Token carries no signature but one was required.
    NotSigned,
    /// A key id was declared but no configured key matched it.
    SignatureKeyNotFound,
    /// Keys were attempted, none produced a valid signature.
    InvalidSignature,
    /// No signing keys were available at all.
    NoSigningKeys,
    /// JWE decryption failed across all candidate keys.
    Decryption,
    /// Lifetime window violations.
    Lifetime,
    /// Audience mismatch or audience misconfiguration.
    Audience,
    /// Issuer mismatch or issuer misconfiguration.
    Issuer,
    /// Token replay detected or not trackable.
    Replay,
    /// Delegation (actor) claim problems.
    Actor,
    /// The resolved signing key itself failed the trust policy.
    SigningKeyTrust,
    /// Unsupported algorithm or key/algorithm combination.
    NotSupported,
    /// A crypto primitive failed to execute.
    Crypto,
}

/// Errors produced while reading, creating or validating tokens.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Caller-supplied input was malformed.
    #[error("invalid argument: {0}")]
    Argument(String),

    /// The compact serialization could not be decoded.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// The token has an empty signature segment but signed tokens are required.
    #[error("token is not signed and signed tokens are required")]
    NotSigned,

    /// The token declared a key id but none of the attempted keys carried it.
    /// A signing-key refresh may resolve this.
    #[error("no signing key matched kid '{kid}'; keys attempted: [{keys_attempted}]")]
    SignatureKeyNotFound {
        /// Key id declared in the token header.
        kid: String,
        /// Descriptors of the keys that were attempted.
        keys_attempted: String,
    },

    /// Keys were attempted but none verified the signature.
    #[error("signature validation failed; keys attempted: [{keys_attempted}]")]
    InvalidSignature {
        /// Descriptors of the keys that were attempted, diagnostics only.
        keys_attempted: String,
    },

    /// No signing keys were configured or resolved.
    #[error("no signing keys were available to validate the signature")]
    NoSigningKeys,

    /// The JWE declared a key-management algorithm other than `dir`.
    #[error("key management algorithm '{0}' is not supported, only 'dir' is")]
    KeyWrapNotSupported(String),

    /// All candidate decryption keys were exhausted.
    #[error("unable to decrypt token; keys attempted: [{keys_attempted}]")]
    DecryptionFailed {
        /// Descriptors of the keys that were attempted, diagnostics only.
        keys_attempted: String,
    },

    /// No decryption keys were configured or resolved.
    #[error("no decryption keys were available")]
    NoDecryptionKeys,

    /// `nbf` lies in the future beyond the allowed clock skew.
    #[error("token is not yet valid: nbf {nbf} is after {now} (+skew)")]
    NotYetValid {
        /// The token's not-before instant, unix seconds.
        nbf: i64,
        /// Validation instant, unix seconds.
        now: i64,
    },

    /// `exp` lies in the past beyond the allowed clock skew.
    #[error("token expired: exp {exp} is before {now} (-skew)")]
    Expired {
        /// The token's expiration instant, unix seconds.
        exp: i64,
        /// Validation instant, unix seconds.
        now: i64,
    },

    /// The token carries no `exp` claim but one is required.
    #[error("token has no expiration time and one is required")]
    NoExpiration,

    /// No token audience matched a configured valid audience.
    #[error("audience validation failed; token audiences: [{audiences}]")]
    InvalidAudience {
        /// Audiences found in the token.
        audiences: String,
    },

    /// Audience validation is enabled but no valid audience is configured.
    #[error("audience validation is enabled but no valid audience is configured")]
    NoValidAudiences,

    /// The token issuer matched no configured valid issuer.
    #[error("issuer validation failed for issuer '{issuer}'")]
    InvalidIssuer {
        /// Issuer found in the token.
        issuer: String,
    },

    /// Issuer validation is enabled but no valid issuer is configured.
    #[error("issuer validation is enabled but no valid issuer is configured")]
    NoValidIssuers,

    /// The token was found in the replay cache.
    #[error("token was already presented once and rejected as a replay")]
    ReplayDetected,

    /// The replay cache refused to track the token.
    #[error("token could not be added to the replay cache")]
    ReplayAddFailed,

    /// The delegation claim was structurally invalid or nested too deep.
    #[error("invalid actor token: {0}")]
    InvalidActor(String),

    /// The resolved signing key failed the caller's key-trust policy.
    #[error("the resolved signing key is not trusted: {0}")]
    InvalidSigningKey(String),

    /// The algorithm is unknown or incompatible with the supplied key.
    #[error("unsupported algorithm or key/algorithm combination: {0}")]
    UnsupportedAlgorithm(String),

    /// A platform crypto primitive failed.
    #[error("cryptographic operation failed: {0}")]
    Crypto(String),
}

impl TokenError {
    /// The coarse category this error belongs to.
    pub fn category(&self) -> FailureCategory {
        match self {
            TokenError::Argument(_) => FailureCategory::Argument,
            TokenError::Malformed(_) => FailureCategory::Structure,
            TokenError::NotSigned => FailureCategory::NotSigned,
            TokenError::SignatureKeyNotFound { .. } => FailureCategory::SignatureKeyNotFound,
            TokenError::InvalidSignature { .. } => FailureCategory::InvalidSignature,
            TokenError::NoSigningKeys => FailureCategory::NoSigningKeys,
            TokenError::KeyWrapNotSupported(_) => FailureCategory::NotSupported,
            TokenError::DecryptionFailed { .. } | TokenError::NoDecryptionKeys => {
                FailureCategory::Decryption
            }
            TokenError::NotYetValid { .. }
            | TokenError::Expired { .. }
            | TokenError::NoExpiration => FailureCategory::Lifetime,
            TokenError::InvalidAudience { .. } | TokenError::NoValidAudiences => {
                FailureCategory::Audience
            }
            TokenError::InvalidIssuer { .. } | TokenError::NoValidIssuers => {
                FailureCategory::Issuer
            }
            TokenError::ReplayDetected | TokenError::ReplayAddFailed => FailureCategory::Replay,
            TokenError::InvalidActor(_) => FailureCategory::Actor,
            TokenError::InvalidSigningKey(_) => FailureCategory::SigningKeyTrust,
            TokenError::UnsupportedAlgorithm(_) => FailureCategory::NotSupported,
            TokenError::Crypto(_) => FailureCategory::Crypto,
        }
    }

    /// Create an argument error.
    pub fn argument(msg: impl Into<String>) -> Self {
        TokenError::Argument(msg.into())
    }

    /// Create a structure error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        TokenError::Malformed(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifetime_variants_share_a_category() {
        let errors = [
            TokenError::NotYetValid { nbf: 10, now: 0 },
            TokenError::Expired { exp: 0, now: 10 },
            TokenError::NoExpiration,
        ];
        for e in errors {
            assert_eq!(e.category(), FailureCategory::Lifetime);
        }
    }

    #[test]
    fn key_not_found_is_its_own_category() {
        let e = TokenError::SignatureKeyNotFound {
            kid: "K1".into(),
            keys_attempted: "K2".into(),
        };
        assert_eq!(e.category(), FailureCategory::SignatureKeyNotFound);
        assert_ne!(
            e.category(),
            TokenError::InvalidSignature {
                keys_attempted: "K2".into()
            }
            .category()
        );
    }
}
