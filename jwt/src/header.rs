//! JOSE header: an ordered map of parameters with typed accessors for
//! the names the pipeline cares about.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use sentinel_tokens::{EncryptingCredentials, SigningCredentials, TokenError, TokenResult};
use serde_json::{Map, Value};

use crate::constants::{header_names, CONTENT_TYPE_JWT, HEADER_TYP_JWT};

/// The protected header of a compact token.
///
/// Parameter order is preserved so an emitted header round-trips
/// byte-for-byte through encode/decode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JwtHeader {
    params: Map<String, Value>,
}

impl JwtHeader {
    /// Header for a signed token. Without credentials the algorithm is
    /// `none` and the token is emitted with an empty signature segment.
    pub fn for_signing(credentials: Option<&SigningCredentials>) -> Self {
        let mut params = Map::new();
        match credentials {
            Some(credentials) => {
                params.insert(
                    header_names::ALG.to_string(),
                    Value::String(credentials.algorithm().as_str().to_string()),
                );
                if let Some(kid) = credentials.key().key_id() {
                    params.insert(header_names::KID.to_string(), Value::String(kid.to_string()));
                }
                if let Some(x5t) = credentials.key().x5t() {
                    params.insert(header_names::X5T.to_string(), Value::String(x5t.to_string()));
                }
            }
            None => {
                params.insert(
                    header_names::ALG.to_string(),
                    Value::String("none".to_string()),
                );
            }
        }
        params.insert(
            header_names::TYP.to_string(),
            Value::String(HEADER_TYP_JWT.to_string()),
        );
        Self { params }
    }

    /// Outer header for an encrypted token wrapping a signed one.
    pub fn for_encrypting(credentials: &EncryptingCredentials) -> Self {
        let mut params = Map::new();
        params.insert(
            header_names::ALG.to_string(),
            Value::String(credentials.alg().to_string()),
        );
        params.insert(
            header_names::ENC.to_string(),
            Value::String(credentials.enc().as_str().to_string()),
        );
        if let Some(kid) = credentials.key().key_id() {
            params.insert(header_names::KID.to_string(), Value::String(kid.to_string()));
        }
        params.insert(
            header_names::TYP.to_string(),
            Value::String(HEADER_TYP_JWT.to_string()),
        );
        params.insert(
            header_names::CTY.to_string(),
            Value::String(CONTENT_TYPE_JWT.to_string()),
        );
        Self { params }
    }

    /// Decode a base64url header segment. `alg` is required; everything
    /// else is optional and carried through untouched.
    pub fn decode(segment: &str) -> TokenResult<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(segment)
            .map_err(|_| TokenError::malformed("header segment is not valid base64url"))?;
        let params: Map<String, Value> = serde_json::from_slice(&bytes)
            .map_err(|err| TokenError::malformed(format!("header is not a JSON object: {err}")))?;
        let header = Self { params };
        if header.alg().is_none() {
            return Err(TokenError::malformed("header is missing 'alg'"));
        }
        Ok(header)
    }

    /// Encode as a base64url segment.
    pub fn encode(&self) -> TokenResult<String> {
        let json = serde_json::to_vec(&self.params)
            .map_err(|err| TokenError::malformed(format!("header did not serialize: {err}")))?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }

    /// Add or replace a parameter before the header is encoded.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.params.insert(name.into(), value);
    }

    fn str_param(&self, name: &str) -> Option<&str> {
        self.params.get(name).and_then(Value::as_str)
    }

    /// The `alg` parameter.
    pub fn alg(&self) -> Option<&str> {
        self.str_param(header_names::ALG)
    }

    /// The `enc` parameter.
    pub fn enc(&self) -> Option<&str> {
        self.str_param(header_names::ENC)
    }

    /// The `kid` parameter.
    pub fn kid(&self) -> Option<&str> {
        self.str_param(header_names::KID)
    }

    /// The `x5t` parameter.
    pub fn x5t(&self) -> Option<&str> {
        self.str_param(header_names::X5T)
    }

    /// The `typ` parameter.
    pub fn typ(&self) -> Option<&str> {
        self.str_param(header_names::TYP)
    }

    /// The `cty` parameter.
    pub fn cty(&self) -> Option<&str> {
        self.str_param(header_names::CTY)
    }

    /// All parameters, in insertion order.
    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }
}
