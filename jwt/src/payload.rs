//! Token payload: an ordered JSON map of claims with typed accessors
//! for the registered names.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use sentinel_tokens::{TokenError, TokenResult};
use serde_json::{Map, Value};

use crate::constants::claim_names;

/// The claim set of a token.
///
/// Claims with the same name merge into a JSON array rather than
/// overwrite, matching how multi-valued claims (roles, audiences) are
/// carried on the wire.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JwtPayload {
    claims: Map<String, Value>,
}

impl JwtPayload {
    /// An empty claim set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a base64url payload segment.
    pub fn decode(segment: &str) -> TokenResult<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(segment)
            .map_err(|_| TokenError::malformed("payload segment is not valid base64url"))?;
        let claims: Map<String, Value> = serde_json::from_slice(&bytes)
            .map_err(|err| TokenError::malformed(format!("payload is not a JSON object: {err}")))?;
        Ok(Self { claims })
    }

    /// Encode as a base64url segment.
    pub fn encode(&self) -> TokenResult<String> {
        let json = serde_json::to_vec(&self.claims)
            .map_err(|err| TokenError::malformed(format!("payload did not serialize: {err}")))?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }

    /// Add a claim, merging with any claim of the same name into an
    /// array.
    pub fn add_claim(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.claims.get_mut(&name) {
            Some(Value::Array(existing)) => existing.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                self.claims.insert(name, value);
            }
        }
    }

    /// Set a claim, replacing any existing value outright. Registered
    /// claims supplied explicitly at creation go through here so they
    /// win over subject claims of the same name.
    pub fn set_claim(&mut self, name: impl Into<String>, value: Value) {
        self.claims.insert(name.into(), value);
    }

    /// Remove a claim, returning its value.
    pub fn remove_claim(&mut self, name: &str) -> Option<Value> {
        self.claims.shift_remove(name)
    }

    /// All claims, in insertion order.
    pub fn claims(&self) -> &Map<String, Value> {
        &self.claims
    }

    fn str_claim(&self, name: &str) -> Option<&str> {
        self.claims.get(name).and_then(Value::as_str)
    }

    fn seconds_claim(&self, name: &str) -> Option<i64> {
        match self.claims.get(name)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// The `iss` claim.
    pub fn iss(&self) -> Option<&str> {
        self.str_claim(claim_names::ISS)
    }

    /// The `sub` claim.
    pub fn sub(&self) -> Option<&str> {
        self.str_claim(claim_names::SUB)
    }

    /// The `jti` claim.
    pub fn jti(&self) -> Option<&str> {
        self.str_claim(claim_names::JTI)
    }

    /// The `actort` claim: a nested compact token.
    pub fn actort(&self) -> Option<&str> {
        self.str_claim(claim_names::ACTORT)
    }

    /// The `aud` claim, normalized to a list. A single string becomes a
    /// one-element list; non-string entries are dropped.
    pub fn aud(&self) -> Vec<&str> {
        match self.claims.get(claim_names::AUD) {
            Some(Value::String(s)) => vec![s.as_str()],
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// The `exp` claim in unix seconds.
    pub fn exp(&self) -> Option<i64> {
        self.seconds_claim(claim_names::EXP)
    }

    /// The `nbf` claim in unix seconds.
    pub fn nbf(&self) -> Option<i64> {
        self.seconds_claim(claim_names::NBF)
    }

    /// The `iat` claim in unix seconds.
    pub fn iat(&self) -> Option<i64> {
        self.seconds_claim(claim_names::IAT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn same_name_claims_merge_into_an_array() {
        let mut payload = JwtPayload::new();
        payload.add_claim("role", json!("reader"));
        payload.add_claim("role", json!("writer"));
        payload.add_claim("role", json!("admin"));

        assert_eq!(
            payload.claims().get("role"),
            Some(&json!(["reader", "writer", "admin"]))
        );
    }

    #[test]
    fn set_claim_replaces_instead_of_merging() {
        let mut payload = JwtPayload::new();
        payload.add_claim("iss", json!("from-subject"));
        payload.set_claim("iss", json!("explicit"));
        assert_eq!(payload.iss(), Some("explicit"));
    }

    #[test]
    fn aud_normalizes_string_and_array_forms() {
        let mut single = JwtPayload::new();
        single.set_claim("aud", json!("api"));
        assert_eq!(single.aud(), vec!["api"]);

        let mut multi = JwtPayload::new();
        multi.set_claim("aud", json!(["api", "portal"]));
        assert_eq!(multi.aud(), vec!["api", "portal"]);

        assert!(JwtPayload::new().aud().is_empty());
    }

    #[test]
    fn numeric_dates_accept_number_and_string_forms() {
        let mut payload = JwtPayload::new();
        payload.set_claim("exp", json!(1700000000));
        payload.set_claim("nbf", json!("1690000000"));
        assert_eq!(payload.exp(), Some(1700000000));
        assert_eq!(payload.nbf(), Some(1690000000));
    }

    #[test]
    fn encode_decode_round_trip_preserves_order() {
        let mut payload = JwtPayload::new();
        payload.set_claim("iss", json!("issuer"));
        payload.set_claim("zeta", json!(1));
        payload.set_claim("alpha", json!(2));

        let decoded = JwtPayload::decode(&payload.encode().unwrap()).unwrap();
        assert_eq!(decoded, payload);
        let names: Vec<_> = decoded.claims().keys().cloned().collect();
        assert_eq!(names, ["iss", "zeta", "alpha"]);
    }
}
