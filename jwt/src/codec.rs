//! Compact-serialization reader.
//!
//! Structure checks are strictly syntactic: segment count, base64url
//! alphabet, JSON object header and payload. No signature or decryption
//! work happens here.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use sentinel_tokens::{TokenError, TokenResult};

use crate::constants::{
    JWE_SEGMENT_COUNT, JWE_SHAPE, JWS_SEGMENT_COUNT, JWS_SHAPE, MAX_SEGMENT_COUNT,
};
use crate::header::JwtHeader;
use crate::payload::JwtPayload;
use crate::token::{JweToken, JwsToken, JwtToken};

/// Whether `token` is well-formed enough to hand to the parser: within
/// the size cap, three or five segments, base64url alphabet throughout.
pub fn can_read_token(token: &str, max_size: usize) -> bool {
    if token.is_empty() || token.len() > max_size {
        return false;
    }
    match segment_count(token) {
        JWS_SEGMENT_COUNT => JWS_SHAPE.is_match(token),
        JWE_SEGMENT_COUNT => JWE_SHAPE.is_match(token),
        _ => false,
    }
}

/// Parse a compact token into its structural form.
pub fn parse(token: &str, max_size: usize) -> TokenResult<JwtToken> {
    if token.is_empty() {
        return Err(TokenError::argument("token is empty"));
    }
    if token.len() > max_size {
        return Err(TokenError::argument(format!(
            "token is {} bytes, the cap is {max_size}",
            token.len()
        )));
    }

    let segments: Vec<&str> = token.splitn(MAX_SEGMENT_COUNT + 1, '.').collect();
    match segments.len() {
        JWS_SEGMENT_COUNT => {
            if !JWS_SHAPE.is_match(token) {
                return Err(TokenError::malformed(
                    "token does not match the signed compact form",
                ));
            }
            parse_jws(&segments).map(JwtToken::Jws)
        }
        JWE_SEGMENT_COUNT => {
            if !JWE_SHAPE.is_match(token) {
                return Err(TokenError::malformed(
                    "token does not match the encrypted compact form",
                ));
            }
            parse_jwe(token, &segments).map(JwtToken::Jwe)
        }
        n => Err(TokenError::malformed(format!(
            "token has {n} segments, expected {JWS_SEGMENT_COUNT} or {JWE_SEGMENT_COUNT}"
        ))),
    }
}

/// Parse a three-segment token known to match the signed shape.
pub(crate) fn parse_jws(segments: &[&str]) -> TokenResult<JwsToken> {
    let header = JwtHeader::decode(segments[0])?;
    let payload = JwtPayload::decode(segments[1])?;
    let signature = if segments[2].is_empty() {
        Vec::new()
    } else {
        decode_segment(segments[2], "signature")?
    };
    Ok(JwsToken::new(
        header,
        payload,
        segments[0].to_string(),
        segments[1].to_string(),
        segments[2].to_string(),
        signature,
    ))
}

fn parse_jwe(token: &str, segments: &[&str]) -> TokenResult<JweToken> {
    let header = JwtHeader::decode(segments[0])?;
    let encrypted_key = if segments[1].is_empty() {
        Vec::new()
    } else {
        decode_segment(segments[1], "encrypted key")?
    };
    let iv = decode_segment(segments[2], "initialization vector")?;
    let ciphertext = decode_segment(segments[3], "ciphertext")?;
    let tag = decode_segment(segments[4], "authentication tag")?;
    Ok(JweToken::new(
        header,
        token.to_string(),
        segments[0].to_string(),
        encrypted_key,
        iv,
        ciphertext,
        tag,
    ))
}

fn segment_count(token: &str) -> usize {
    // Bounded split so a token of ten thousand dots costs nothing.
    token.splitn(MAX_SEGMENT_COUNT + 1, '.').count()
}

fn decode_segment(segment: &str, what: &str) -> TokenResult<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| TokenError::malformed(format!("{what} segment is not valid base64url")))
}
