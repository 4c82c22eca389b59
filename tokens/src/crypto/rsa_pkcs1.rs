//! RSA PKCS#1 v1.5 signing and verification for the RS* algorithms.

use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Sha256, Sha384};

use crate::algorithms::SignatureAlgorithm;
use crate::error::{TokenError, TokenResult};

/// Sign the input with an RSA private key.
pub fn sign(private: &RsaPrivateKey, alg: SignatureAlgorithm, data: &[u8]) -> TokenResult<Vec<u8>> {
    match alg {
        SignatureAlgorithm::Rs256 => {
            let key = SigningKey::<Sha256>::new(private.clone());
            Ok(key.sign(data).to_vec())
        }
        SignatureAlgorithm::Rs384 => {
            let key = SigningKey::<Sha384>::new(private.clone());
            Ok(key.sign(data).to_vec())
        }
        other => Err(TokenError::UnsupportedAlgorithm(format!(
            "{other} is not an RSA algorithm"
        ))),
    }
}

/// Verify an RSA signature. `Ok(false)` on mismatch.
pub fn verify(
    public: &RsaPublicKey,
    alg: SignatureAlgorithm,
    data: &[u8],
    signature: &[u8],
) -> TokenResult<bool> {
    let sig = match Signature::try_from(signature) {
        Ok(sig) => sig,
        Err(_) => return Ok(false),
    };
    match alg {
        SignatureAlgorithm::Rs256 => {
            let key = VerifyingKey::<Sha256>::new(public.clone());
            Ok(key.verify(data, &sig).is_ok())
        }
        SignatureAlgorithm::Rs384 => {
            let key = VerifyingKey::<Sha384>::new(public.clone());
            Ok(key.verify(data, &sig).is_ok())
        }
        other => Err(TokenError::UnsupportedAlgorithm(format!(
            "{other} is not an RSA algorithm"
        ))),
    }
}
