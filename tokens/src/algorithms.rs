//! JOSE algorithm identifiers used in token headers.

use crate::error::TokenError;

/// Key-management algorithm for JWE: the configured symmetric key is used
/// directly as the content-encryption key. No other key-management
/// algorithm is supported.
pub const DIRECT_KEY_USE_ALG: &str = "dir";

/// Signature algorithms supported by the crypto invocation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureAlgorithm {
    /// HMAC with SHA-256.
    Hs256,
    /// HMAC with SHA-384.
    Hs384,
    /// HMAC with SHA-512.
    Hs512,
    /// RSA PKCS#1 v1.5 with SHA-256.
    Rs256,
    /// RSA PKCS#1 v1.5 with SHA-384.
    Rs384,
    /// ECDSA over P-256 with SHA-256.
    Es256,
    /// ECDSA over P-384 with SHA-384.
    Es384,
}

impl SignatureAlgorithm {
    /// The JOSE `alg` header value.
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureAlgorithm::Hs256 => "HS256",
            SignatureAlgorithm::Hs384 => "HS384",
            SignatureAlgorithm::Hs512 => "HS512",
            SignatureAlgorithm::Rs256 => "RS256",
            SignatureAlgorithm::Rs384 => "RS384",
            SignatureAlgorithm::Es256 => "ES256",
            SignatureAlgorithm::Es384 => "ES384",
        }
    }

    /// Parse an `alg` header value.
    ///
    /// Accepts the JOSE short names and, for compatibility with callers
    /// that configure credentials with WS-security URIs, the long URI
    /// aliases. The URI form never appears in emitted headers.
    pub fn parse(s: &str) -> Result<Self, TokenError> {
        match s {
            "HS256" => Ok(SignatureAlgorithm::Hs256),
            "HS384" => Ok(SignatureAlgorithm::Hs384),
            "HS512" => Ok(SignatureAlgorithm::Hs512),
            "RS256" => Ok(SignatureAlgorithm::Rs256),
            "RS384" => Ok(SignatureAlgorithm::Rs384),
            "ES256" => Ok(SignatureAlgorithm::Es256),
            "ES384" => Ok(SignatureAlgorithm::Es384),
            "http://www.w3.org/2001/04/xmldsig-more#hmac-sha256" => Ok(SignatureAlgorithm::Hs256),
            "http://www.w3.org/2001/04/xmldsig-more#hmac-sha384" => Ok(SignatureAlgorithm::Hs384),
            "http://www.w3.org/2001/04/xmldsig-more#hmac-sha512" => Ok(SignatureAlgorithm::Hs512),
            "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256" => Ok(SignatureAlgorithm::Rs256),
            "http://www.w3.org/2001/04/xmldsig-more#rsa-sha384" => Ok(SignatureAlgorithm::Rs384),
            "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha256" => Ok(SignatureAlgorithm::Es256),
            "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha384" => Ok(SignatureAlgorithm::Es384),
            other => Err(TokenError::UnsupportedAlgorithm(other.to_string())),
        }
    }

    /// Whether the algorithm uses symmetric key material.
    pub fn is_symmetric(&self) -> bool {
        matches!(
            self,
            SignatureAlgorithm::Hs256 | SignatureAlgorithm::Hs384 | SignatureAlgorithm::Hs512
        )
    }
}

impl std::fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content-encryption (AEAD) algorithms for JWE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncryptionAlgorithm {
    /// AES-128-GCM.
    A128Gcm,
    /// AES-256-GCM.
    A256Gcm,
}

impl EncryptionAlgorithm {
    /// The JOSE `enc` header value.
    pub fn as_str(&self) -> &'static str {
        match self {
            EncryptionAlgorithm::A128Gcm => "A128GCM",
            EncryptionAlgorithm::A256Gcm => "A256GCM",
        }
    }

    /// Parse an `enc` header value.
    pub fn parse(s: &str) -> Result<Self, TokenError> {
        match s {
            "A128GCM" => Ok(EncryptionAlgorithm::A128Gcm),
            "A256GCM" => Ok(EncryptionAlgorithm::A256Gcm),
            other => Err(TokenError::UnsupportedAlgorithm(other.to_string())),
        }
    }

    /// Required content-encryption key length in bytes.
    pub fn key_len(&self) -> usize {
        match self {
            EncryptionAlgorithm::A128Gcm => 16,
            EncryptionAlgorithm::A256Gcm => 32,
        }
    }
}

impl std::fmt::Display for EncryptionAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alg_round_trips_through_header_value() {
        for alg in [
            SignatureAlgorithm::Hs256,
            SignatureAlgorithm::Rs256,
            SignatureAlgorithm::Es384,
        ] {
            assert_eq!(SignatureAlgorithm::parse(alg.as_str()).unwrap(), alg);
        }
    }

    #[test]
    fn uri_aliases_map_to_short_names() {
        let alg =
            SignatureAlgorithm::parse("http://www.w3.org/2001/04/xmldsig-more#hmac-sha256")
                .unwrap();
        assert_eq!(alg, SignatureAlgorithm::Hs256);
        assert_eq!(alg.as_str(), "HS256");
    }

    #[test]
    fn unknown_alg_is_rejected() {
        assert!(SignatureAlgorithm::parse("none").is_err());
        assert!(EncryptionAlgorithm::parse("A192GCM").is_err());
    }
}
