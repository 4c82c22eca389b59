//! ECDSA signing and verification for the ES* algorithms.
//!
//! Signatures use the fixed-size raw `r || s` encoding the compact
//! serialization requires, not DER.

use p256::ecdsa::signature::{Signer, Verifier};

use crate::error::TokenResult;
use crate::keys::EcKey;

/// Sign the input with an EC private key. The curve selects the hash.
pub fn sign(key: &EcKey, data: &[u8]) -> TokenResult<Vec<u8>> {
    match key {
        EcKey::P256 {
            signing: Some(signing),
            ..
        } => {
            let sig: p256::ecdsa::Signature = signing.sign(data);
            Ok(sig.to_bytes().to_vec())
        }
        EcKey::P384 {
            signing: Some(signing),
            ..
        } => {
            let sig: p384::ecdsa::Signature = signing.sign(data);
            Ok(sig.to_bytes().to_vec())
        }
        _ => Err(crate::error::TokenError::Crypto(
            "EC key has no private half".to_string(),
        )),
    }
}

/// Verify a raw `r || s` signature. `Ok(false)` on mismatch or on bytes
/// that do not even parse as a signature.
pub fn verify(key: &EcKey, data: &[u8], signature: &[u8]) -> TokenResult<bool> {
    match key {
        EcKey::P256 { verifying, .. } => {
            let Ok(sig) = p256::ecdsa::Signature::from_slice(signature) else {
                return Ok(false);
            };
            Ok(verifying.verify(data, &sig).is_ok())
        }
        EcKey::P384 { verifying, .. } => {
            let Ok(sig) = p384::ecdsa::Signature::from_slice(signature) else {
                return Ok(false);
            };
            Ok(verifying.verify(data, &sig).is_ok())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{KeyMaterial, SecurityKey};

    fn p256_pair() -> EcKey {
        let key = SecurityKey::ec_p256_private(&[42u8; 32]).unwrap();
        match key.material() {
            KeyMaterial::Ec(ec) => ec.clone(),
            _ => unreachable!(),
        }
    }

    #[test]
    fn raw_signature_round_trip() {
        let key = p256_pair();
        let sig = sign(&key, b"header.payload").unwrap();
        assert_eq!(sig.len(), 64);
        assert!(verify(&key, b"header.payload", &sig).unwrap());
        assert!(!verify(&key, b"header.tampered", &sig).unwrap());
    }

    #[test]
    fn garbage_signature_is_a_mismatch_not_an_error() {
        let key = p256_pair();
        assert!(!verify(&key, b"data", &[0u8; 10]).unwrap());
    }
}
