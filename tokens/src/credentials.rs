//! Credential types pairing a key with the algorithms it is used with.

use std::sync::Arc;

use crate::algorithms::{EncryptionAlgorithm, SignatureAlgorithm, DIRECT_KEY_USE_ALG};
use crate::error::{TokenError, TokenResult};
use crate::keys::SecurityKey;

/// A key and the signature algorithm used with it.
///
/// The key is referenced, not copied; the same `Arc<SecurityKey>` can
/// back credentials and validation parameters at once.
#[derive(Debug, Clone)]
pub struct SigningCredentials {
    key: Arc<SecurityKey>,
    algorithm: SignatureAlgorithm,
}

impl SigningCredentials {
    /// Pair a key with a signature algorithm.
    pub fn new(key: Arc<SecurityKey>, algorithm: SignatureAlgorithm) -> Self {
        Self { key, algorithm }
    }

    /// The signing key.
    pub fn key(&self) -> &Arc<SecurityKey> {
        &self.key
    }

    /// The signature algorithm.
    pub fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }
}

/// A key, a key-management algorithm and a content-encryption algorithm.
///
/// Only direct key use is supported: the symmetric key is the
/// content-encryption key, and the encrypted-key segment stays empty.
#[derive(Debug, Clone)]
pub struct EncryptingCredentials {
    key: Arc<SecurityKey>,
    enc: EncryptionAlgorithm,
}

impl EncryptingCredentials {
    /// Pair a symmetric key with a content-encryption algorithm using the
    /// `dir` key-management algorithm.
    ///
    /// Fails when the key is not symmetric or its length does not match
    /// the content-encryption algorithm.
    pub fn direct(key: Arc<SecurityKey>, enc: EncryptionAlgorithm) -> TokenResult<Self> {
        let Some(bytes) = key.symmetric_bytes() else {
            return Err(TokenError::argument(
                "direct key use requires a symmetric key",
            ));
        };
        if bytes.len() != enc.key_len() {
            return Err(TokenError::argument(format!(
                "{} requires a {}-byte key, got {} bytes",
                enc,
                enc.key_len(),
                bytes.len()
            )));
        }
        Ok(Self { key, enc })
    }

    /// The content-encryption key.
    pub fn key(&self) -> &Arc<SecurityKey> {
        &self.key
    }

    /// The key-management algorithm, always `dir`.
    pub fn alg(&self) -> &'static str {
        DIRECT_KEY_USE_ALG
    }

    /// The content-encryption algorithm.
    pub fn enc(&self) -> EncryptionAlgorithm {
        self.enc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_credentials_enforce_key_length() {
        let short = Arc::new(SecurityKey::symmetric([0u8; 16]));
        assert!(EncryptingCredentials::direct(short.clone(), EncryptionAlgorithm::A256Gcm).is_err());
        assert!(EncryptingCredentials::direct(short, EncryptionAlgorithm::A128Gcm).is_ok());
    }

    #[test]
    fn direct_credentials_reject_asymmetric_keys() {
        let key = Arc::new(SecurityKey::ec_p256_private(&[1u8; 32]).unwrap());
        assert!(EncryptingCredentials::direct(key, EncryptionAlgorithm::A128Gcm).is_err());
    }
}
