//! Compact-serialization shapes and well-known parameter names.

use once_cell::sync::Lazy;
use regex::Regex;

/// Dot-separated segments in a signed token.
pub const JWS_SEGMENT_COUNT: usize = 3;

/// Dot-separated segments in an encrypted token.
pub const JWE_SEGMENT_COUNT: usize = 5;

/// Upper bound on segments any compact token may carry.
pub const MAX_SEGMENT_COUNT: usize = JWE_SEGMENT_COUNT;

/// Default cap on accepted token length in bytes.
pub const DEFAULT_MAX_TOKEN_SIZE: usize = 1024 * 250;

/// Default token lifetime in minutes when the caller supplies no `exp`.
pub const DEFAULT_TOKEN_LIFETIME_MINUTES: i64 = 60;

/// Shape of a signed token: two non-empty base64url segments and a
/// possibly-empty signature segment.
pub static JWS_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9\-_]+\.[A-Za-z0-9\-_]+\.([A-Za-z0-9\-_]+)?$")
        .expect("literal pattern compiles")
});

/// Shape of an encrypted token: five base64url segments, of which the
/// encrypted-key segment may be empty under direct key use.
pub static JWE_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9\-_]+\.([A-Za-z0-9\-_]+)?\.[A-Za-z0-9\-_]+\.[A-Za-z0-9\-_]+\.[A-Za-z0-9\-_]+$",
    )
    .expect("literal pattern compiles")
});

/// JOSE header parameter names.
pub mod header_names {
    /// Signature or key-management algorithm.
    pub const ALG: &str = "alg";
    /// Content-encryption algorithm, JWE only.
    pub const ENC: &str = "enc";
    /// Key id of the key intended to process the token.
    pub const KID: &str = "kid";
    /// Certificate thumbprint of the key intended to process the token.
    pub const X5T: &str = "x5t";
    /// Media type of the token itself.
    pub const TYP: &str = "typ";
    /// Media type of the enclosed content, JWE only.
    pub const CTY: &str = "cty";
}

/// Registered claim names used by the pipeline.
pub mod claim_names {
    /// Issuer.
    pub const ISS: &str = "iss";
    /// Subject.
    pub const SUB: &str = "sub";
    /// Audience, a string or an array of strings.
    pub const AUD: &str = "aud";
    /// Expiration, unix seconds.
    pub const EXP: &str = "exp";
    /// Not-before, unix seconds.
    pub const NBF: &str = "nbf";
    /// Issued-at, unix seconds.
    pub const IAT: &str = "iat";
    /// Token id.
    pub const JTI: &str = "jti";
    /// Delegated actor: a nested compact token.
    pub const ACTORT: &str = "actort";
}

/// `typ` value stamped on emitted headers.
pub const HEADER_TYP_JWT: &str = "JWT";

/// `cty` value stamped on encrypted tokens carrying a nested signed token.
pub const CONTENT_TYPE_JWT: &str = "JWT";
