//! Parsed token structures.
//!
//! A [`JwsToken`] keeps both the decoded header/payload and the raw
//! segments it was parsed from; verification always runs over the raw
//! bytes, never over a re-serialization.

use std::sync::Arc;

use sentinel_tokens::SecurityKey;

use crate::header::JwtHeader;
use crate::payload::JwtPayload;

/// A signed (or unsigned) compact token.
#[derive(Debug, Clone)]
pub struct JwsToken {
    header: JwtHeader,
    payload: JwtPayload,
    raw_header: String,
    raw_payload: String,
    raw_signature: String,
    signature: Vec<u8>,
    signing_key: Option<Arc<SecurityKey>>,
}

impl JwsToken {
    pub(crate) fn new(
        header: JwtHeader,
        payload: JwtPayload,
        raw_header: String,
        raw_payload: String,
        raw_signature: String,
        signature: Vec<u8>,
    ) -> Self {
        Self {
            header,
            payload,
            raw_header,
            raw_payload,
            raw_signature,
            signature,
            signing_key: None,
        }
    }

    /// The decoded header.
    pub fn header(&self) -> &JwtHeader {
        &self.header
    }

    /// The decoded claim set.
    pub fn payload(&self) -> &JwtPayload {
        &self.payload
    }

    /// The raw header segment, exactly as parsed.
    pub fn raw_header(&self) -> &str {
        &self.raw_header
    }

    /// The raw payload segment, exactly as parsed.
    pub fn raw_payload(&self) -> &str {
        &self.raw_payload
    }

    /// The raw signature segment; empty for unsigned tokens.
    pub fn raw_signature(&self) -> &str {
        &self.raw_signature
    }

    /// The decoded signature bytes.
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// Whether the token carries a signature.
    pub fn is_signed(&self) -> bool {
        !self.raw_signature.is_empty()
    }

    /// The exact bytes the signature covers: `header.payload` in ASCII.
    pub fn signing_input(&self) -> String {
        format!("{}.{}", self.raw_header, self.raw_payload)
    }

    /// The full compact form, reassembled from the raw segments.
    pub fn raw_data(&self) -> String {
        format!(
            "{}.{}.{}",
            self.raw_header, self.raw_payload, self.raw_signature
        )
    }

    /// The key that verified this token's signature, stamped after a
    /// successful validation.
    pub fn signing_key(&self) -> Option<&Arc<SecurityKey>> {
        self.signing_key.as_ref()
    }

    pub(crate) fn set_signing_key(&mut self, key: Arc<SecurityKey>) {
        self.signing_key = Some(key);
    }
}

/// An encrypted compact token.
///
/// The inner token is populated once decryption succeeds; it is always
/// a signed-form token, since the only supported enclosed content is a
/// nested JWS.
#[derive(Debug, Clone)]
pub struct JweToken {
    header: JwtHeader,
    raw: String,
    raw_header: String,
    encrypted_key: Vec<u8>,
    iv: Vec<u8>,
    ciphertext: Vec<u8>,
    tag: Vec<u8>,
    inner: Option<Box<JwsToken>>,
}

impl JweToken {
    pub(crate) fn new(
        header: JwtHeader,
        raw: String,
        raw_header: String,
        encrypted_key: Vec<u8>,
        iv: Vec<u8>,
        ciphertext: Vec<u8>,
        tag: Vec<u8>,
    ) -> Self {
        Self {
            header,
            raw,
            raw_header,
            encrypted_key,
            iv,
            ciphertext,
            tag,
            inner: None,
        }
    }

    /// The decoded outer header.
    pub fn header(&self) -> &JwtHeader {
        &self.header
    }

    /// The full compact form, exactly as parsed.
    pub fn raw_data(&self) -> &str {
        &self.raw
    }

    /// The raw outer header segment. Its ASCII bytes are the AAD for
    /// content decryption.
    pub fn raw_header(&self) -> &str {
        &self.raw_header
    }

    /// The decoded encrypted-key segment; empty under direct key use.
    pub fn encrypted_key(&self) -> &[u8] {
        &self.encrypted_key
    }

    /// The decoded initialization vector.
    pub fn iv(&self) -> &[u8] {
        &self.iv
    }

    /// The decoded ciphertext.
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// The decoded authentication tag.
    pub fn tag(&self) -> &[u8] {
        &self.tag
    }

    /// The decrypted nested token, if decryption has run.
    pub fn inner(&self) -> Option<&JwsToken> {
        self.inner.as_deref()
    }

    pub(crate) fn set_inner(&mut self, inner: JwsToken) {
        self.inner = Some(Box::new(inner));
    }
}

/// Either form of a parsed compact token.
#[derive(Debug, Clone)]
pub enum JwtToken {
    /// A three-segment signed token.
    Jws(JwsToken),
    /// A five-segment encrypted token.
    Jwe(JweToken),
}

impl JwtToken {
    /// The outermost header.
    pub fn header(&self) -> &JwtHeader {
        match self {
            JwtToken::Jws(token) => token.header(),
            JwtToken::Jwe(token) => token.header(),
        }
    }

    /// The claim set, if reachable: directly for a signed token, from
    /// the nested token for a decrypted one.
    pub fn payload(&self) -> Option<&JwtPayload> {
        match self {
            JwtToken::Jws(token) => Some(token.payload()),
            JwtToken::Jwe(token) => token.inner().map(JwsToken::payload),
        }
    }

    /// The full compact form.
    pub fn raw_data(&self) -> String {
        match self {
            JwtToken::Jws(token) => token.raw_data(),
            JwtToken::Jwe(token) => token.raw_data().to_string(),
        }
    }

    /// The signed token that claims were read from: the token itself,
    /// or the decrypted nested token.
    pub fn claims_token(&self) -> Option<&JwsToken> {
        match self {
            JwtToken::Jws(token) => Some(token),
            JwtToken::Jwe(token) => token.inner(),
        }
    }
}
