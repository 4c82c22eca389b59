//! HMAC-SHA2 signing and verification for the HS* algorithms.

use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha384, Sha512};

use crate::algorithms::SignatureAlgorithm;
use crate::error::{TokenError, TokenResult};

type HmacSha256 = Hmac<Sha256>;
type HmacSha384 = Hmac<Sha384>;
type HmacSha512 = Hmac<Sha512>;

/// MAC the input with the secret for the given HS* algorithm.
pub fn sign(secret: &[u8], alg: SignatureAlgorithm, data: &[u8]) -> TokenResult<Vec<u8>> {
    match alg {
        SignatureAlgorithm::Hs256 => {
            let mut mac = HmacSha256::new_from_slice(secret)
                .map_err(|_| TokenError::Crypto("invalid HMAC key".to_string()))?;
            mac.update(data);
            Ok(mac.finalize().into_bytes().to_vec())
        }
        SignatureAlgorithm::Hs384 => {
            let mut mac = HmacSha384::new_from_slice(secret)
                .map_err(|_| TokenError::Crypto("invalid HMAC key".to_string()))?;
            mac.update(data);
            Ok(mac.finalize().into_bytes().to_vec())
        }
        SignatureAlgorithm::Hs512 => {
            let mut mac = HmacSha512::new_from_slice(secret)
                .map_err(|_| TokenError::Crypto("invalid HMAC key".to_string()))?;
            mac.update(data);
            Ok(mac.finalize().into_bytes().to_vec())
        }
        other => Err(TokenError::UnsupportedAlgorithm(format!(
            "{other} is not an HMAC algorithm"
        ))),
    }
}

/// Verify a MAC in constant time. `Ok(false)` means the bytes simply do
/// not match; `Err` means the operation could not run at all.
pub fn verify(
    secret: &[u8],
    alg: SignatureAlgorithm,
    data: &[u8],
    signature: &[u8],
) -> TokenResult<bool> {
    match alg {
        SignatureAlgorithm::Hs256 => {
            let mut mac = HmacSha256::new_from_slice(secret)
                .map_err(|_| TokenError::Crypto("invalid HMAC key".to_string()))?;
            mac.update(data);
            Ok(mac.verify_slice(signature).is_ok())
        }
        SignatureAlgorithm::Hs384 => {
            let mut mac = HmacSha384::new_from_slice(secret)
                .map_err(|_| TokenError::Crypto("invalid HMAC key".to_string()))?;
            mac.update(data);
            Ok(mac.verify_slice(signature).is_ok())
        }
        SignatureAlgorithm::Hs512 => {
            let mut mac = HmacSha512::new_from_slice(secret)
                .map_err(|_| TokenError::Crypto("invalid HMAC key".to_string()))?;
            mac.update(data);
            Ok(mac.verify_slice(signature).is_ok())
        }
        other => Err(TokenError::UnsupportedAlgorithm(format!(
            "{other} is not an HMAC algorithm"
        ))),
    }
}
