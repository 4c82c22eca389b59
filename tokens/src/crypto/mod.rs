//! Crypto invocation layer.
//!
//! Binds a key and an algorithm to the underlying primitive and rejects
//! key/algorithm confusion before any crypto runs. Every call acquires
//! its primitive state locally and releases it on return; nothing here
//! is cached across calls, so concurrent invocations on shared keys are
//! safe.

pub mod aead;
pub mod ecdsa;
pub mod hmac;
pub mod rsa_pkcs1;

use crate::algorithms::SignatureAlgorithm;
use crate::error::{TokenError, TokenResult};
use crate::keys::{KeyMaterial, SecurityKey};

pub use aead::EncryptionResult;

/// Sign `data` with `key` under `alg`.
pub fn sign(key: &SecurityKey, alg: SignatureAlgorithm, data: &[u8]) -> TokenResult<Vec<u8>> {
    match (key.material(), alg) {
        (KeyMaterial::Symmetric(secret), a) if a.is_symmetric() => hmac::sign(secret, a, data),
        (
            KeyMaterial::Rsa {
                private: Some(private),
                ..
            },
            SignatureAlgorithm::Rs256 | SignatureAlgorithm::Rs384,
        ) => rsa_pkcs1::sign(private, alg, data),
        (KeyMaterial::Rsa { private: None, .. }, SignatureAlgorithm::Rs256 | SignatureAlgorithm::Rs384) => {
            Err(TokenError::Crypto("RSA key has no private half".to_string()))
        }
        (KeyMaterial::Ec(ec), SignatureAlgorithm::Es256 | SignatureAlgorithm::Es384) => {
            check_curve(ec, alg)?;
            ecdsa::sign(ec, data)
        }
        (material, alg) => Err(confusion(material, alg)),
    }
}

/// Verify `signature` over `data` with `key` under `alg`.
///
/// `Ok(false)` is a signature mismatch; `Err` is an operational failure
/// (wrong key kind, unsupported algorithm, primitive failure). The
/// multi-candidate key scan treats both as "try the next key".
pub fn verify(
    key: &SecurityKey,
    alg: SignatureAlgorithm,
    data: &[u8],
    signature: &[u8],
) -> TokenResult<bool> {
    match (key.material(), alg) {
        (KeyMaterial::Symmetric(secret), a) if a.is_symmetric() => {
            hmac::verify(secret, a, data, signature)
        }
        (KeyMaterial::Rsa { public, .. }, SignatureAlgorithm::Rs256 | SignatureAlgorithm::Rs384) => {
            rsa_pkcs1::verify(public, alg, data, signature)
        }
        (KeyMaterial::X509 { public, .. }, SignatureAlgorithm::Rs256 | SignatureAlgorithm::Rs384) => {
            rsa_pkcs1::verify(public, alg, data, signature)
        }
        (KeyMaterial::Ec(ec), SignatureAlgorithm::Es256 | SignatureAlgorithm::Es384) => {
            check_curve(ec, alg)?;
            ecdsa::verify(ec, data, signature)
        }
        (material, alg) => Err(confusion(material, alg)),
    }
}

fn check_curve(ec: &crate::keys::EcKey, alg: SignatureAlgorithm) -> TokenResult<()> {
    let matches = matches!(
        (ec, alg),
        (crate::keys::EcKey::P256 { .. }, SignatureAlgorithm::Es256)
            | (crate::keys::EcKey::P384 { .. }, SignatureAlgorithm::Es384)
    );
    if matches {
        Ok(())
    } else {
        Err(TokenError::UnsupportedAlgorithm(format!(
            "curve does not match {alg}"
        )))
    }
}

fn confusion(material: &KeyMaterial, alg: SignatureAlgorithm) -> TokenError {
    TokenError::UnsupportedAlgorithm(format!("{alg} cannot be used with {material:?}"))
}
