//! AES-GCM authenticated encryption with detached tags for JWE content.

use aes_gcm::aead::generic_array::typenum::{U12, U16};
use aes_gcm::aead::{AeadCore, AeadInPlace, KeyInit};
use aes_gcm::{Aes128Gcm, Aes256Gcm, Nonce, Tag};
use rand::RngCore;

use crate::algorithms::EncryptionAlgorithm;
use crate::error::{TokenError, TokenResult};

/// Output of an AEAD encryption: nonce, ciphertext and integrity tag,
/// carried as the separate segments the compact serialization needs.
#[derive(Debug, Clone)]
pub struct EncryptionResult {
    /// Random 96-bit nonce.
    pub iv: Vec<u8>,
    /// Ciphertext, same length as the plaintext.
    pub ciphertext: Vec<u8>,
    /// 128-bit authentication tag.
    pub tag: Vec<u8>,
}

/// AEAD-encrypt the plaintext under the given content-encryption key.
pub fn encrypt(
    key: &[u8],
    enc: EncryptionAlgorithm,
    plaintext: &[u8],
    aad: &[u8],
) -> TokenResult<EncryptionResult> {
    check_key_len(key, enc)?;
    match enc {
        EncryptionAlgorithm::A128Gcm => seal::<Aes128Gcm>(key, plaintext, aad),
        EncryptionAlgorithm::A256Gcm => seal::<Aes256Gcm>(key, plaintext, aad),
    }
}

/// AEAD-decrypt a ciphertext. Fails closed: a bad tag yields an error and
/// no plaintext bytes ever escape.
pub fn decrypt(
    key: &[u8],
    enc: EncryptionAlgorithm,
    iv: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
    aad: &[u8],
) -> TokenResult<Vec<u8>> {
    check_key_len(key, enc)?;
    if iv.len() != 12 || tag.len() != 16 {
        return Err(TokenError::Crypto(
            "invalid nonce or tag length".to_string(),
        ));
    }
    match enc {
        EncryptionAlgorithm::A128Gcm => open::<Aes128Gcm>(key, iv, ciphertext, tag, aad),
        EncryptionAlgorithm::A256Gcm => open::<Aes256Gcm>(key, iv, ciphertext, tag, aad),
    }
}

fn check_key_len(key: &[u8], enc: EncryptionAlgorithm) -> TokenResult<()> {
    if key.len() != enc.key_len() {
        return Err(TokenError::Crypto(format!(
            "{} requires a {}-byte key, got {} bytes",
            enc,
            enc.key_len(),
            key.len()
        )));
    }
    Ok(())
}

fn seal<A>(key: &[u8], plaintext: &[u8], aad: &[u8]) -> TokenResult<EncryptionResult>
where
    A: KeyInit + AeadInPlace + AeadCore<NonceSize = U12, TagSize = U16>,
{
    let cipher = A::new_from_slice(key)
        .map_err(|_| TokenError::Crypto("invalid AES key".to_string()))?;

    let mut nonce_bytes = [0u8; 12];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(nonce, aad, &mut buffer)
        .map_err(|_| TokenError::Crypto("AEAD encryption failed".to_string()))?;

    Ok(EncryptionResult {
        iv: nonce_bytes.to_vec(),
        ciphertext: buffer,
        tag: tag.to_vec(),
    })
}

fn open<A>(key: &[u8], iv: &[u8], ciphertext: &[u8], tag: &[u8], aad: &[u8]) -> TokenResult<Vec<u8>>
where
    A: KeyInit + AeadInPlace + AeadCore<NonceSize = U12, TagSize = U16>,
{
    let cipher = A::new_from_slice(key)
        .map_err(|_| TokenError::Crypto("invalid AES key".to_string()))?;

    let mut buffer = ciphertext.to_vec();
    cipher
        .decrypt_in_place_detached(
            Nonce::from_slice(iv),
            aad,
            &mut buffer,
            Tag::from_slice(tag),
        )
        .map_err(|_| TokenError::Crypto("AEAD tag verification failed".to_string()))?;

    Ok(buffer)
}
