//! JWKS materialization: turning raw RFC 7517 key descriptors into
//! concrete [`SecurityKey`]s.
//!
//! Conversion is per-descriptor: one bad key never aborts the batch.
//! Failures are collected alongside the materialized keys, naming the
//! missing fields, so a caller can log exactly which descriptors were
//! unusable.

use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{TokenError, TokenResult};
use crate::keys::SecurityKey;

/// A single raw key descriptor from a JWKS document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JsonWebKey {
    /// Key type: `RSA`, `EC` or `oct`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kty: Option<String>,
    /// Public key use; anything other than empty or `sig` is skipped.
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub use_: Option<String>,
    /// Key id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    /// Intended algorithm, carried through unvalidated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    /// Certificate thumbprint hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x5t: Option<String>,
    /// Certificate chain, base64 DER, leaf first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x5c: Option<Vec<String>>,
    /// RSA modulus, base64url.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    /// RSA exponent, base64url.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
    /// EC curve name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,
    /// EC x coordinate, base64url.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    /// EC y coordinate, base64url.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    /// Symmetric key bytes, base64url.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k: Option<String>,
    /// Any parameters not modeled above.
    #[serde(flatten)]
    pub additional: serde_json::Map<String, serde_json::Value>,
}

/// Why one descriptor failed to materialize.
#[derive(Debug, Clone)]
pub struct KeyConversionFailure {
    /// Position of the descriptor in the key set.
    pub index: usize,
    /// The descriptor's key id, if it had one.
    pub kid: Option<String>,
    /// One entry per problem, naming missing fields where applicable.
    pub reasons: Vec<String>,
}

/// Result of materializing a key set: usable keys plus per-descriptor
/// diagnostics for everything that could not be converted.
#[derive(Debug, Clone, Default)]
pub struct KeySetConversion {
    /// Materialized keys, in descriptor order.
    pub keys: Vec<Arc<SecurityKey>>,
    /// Conversion failures, in descriptor order.
    pub failures: Vec<KeyConversionFailure>,
}

/// An ordered collection of raw key descriptors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JsonWebKeySet {
    /// The raw descriptors.
    #[serde(default)]
    pub keys: Vec<JsonWebKey>,
    /// When true (the default), descriptors that cannot be converted or
    /// are not for signature use are excluded from the returned key
    /// list. When false they are retained as opaque placeholders with
    /// the diagnostics attached.
    #[serde(skip)]
    pub skip_unresolved: bool,
}

impl JsonWebKeySet {
    /// Parse a JWKS JSON document.
    pub fn from_json(json: &str) -> TokenResult<Self> {
        if json.is_empty() {
            return Err(TokenError::argument("key set JSON is empty"));
        }
        let mut set: JsonWebKeySet = serde_json::from_str(json)
            .map_err(|err| TokenError::argument(format!("key set JSON did not parse: {err}")))?;
        set.skip_unresolved = true;
        Ok(set)
    }

    /// Materialize every signature-use descriptor into a [`SecurityKey`].
    pub fn signing_keys(&self) -> KeySetConversion {
        let mut out = KeySetConversion::default();
        for (index, descriptor) in self.keys.iter().enumerate() {
            match convert(descriptor) {
                Ok(Some(key)) => out.keys.push(Arc::new(key)),
                Ok(None) => {
                    // Not for signature use; a diagnostic, not a failure.
                    let reason = format!(
                        "key use '{}' is not 'sig'",
                        descriptor.use_.as_deref().unwrap_or_default()
                    );
                    debug!(index, %reason, "skipping non-signing key-set entry");
                    self.keep_placeholder(&mut out, index, descriptor, vec![reason]);
                }
                Err(reasons) => {
                    debug!(index, ?reasons, "key-set entry did not materialize");
                    out.failures.push(KeyConversionFailure {
                        index,
                        kid: descriptor.kid.clone(),
                        reasons: reasons.clone(),
                    });
                    self.keep_placeholder(&mut out, index, descriptor, reasons);
                }
            }
        }
        out
    }

    fn keep_placeholder(
        &self,
        out: &mut KeySetConversion,
        _index: usize,
        descriptor: &JsonWebKey,
        reasons: Vec<String>,
    ) {
        if !self.skip_unresolved {
            let raw = serde_json::to_value(descriptor).unwrap_or(serde_json::Value::Null);
            out.keys
                .push(Arc::new(SecurityKey::unresolved(descriptor.kid.clone(), raw, reasons)));
        }
    }
}

/// `Ok(None)` means the descriptor is valid but not for signature use.
fn convert(descriptor: &JsonWebKey) -> Result<Option<SecurityKey>, Vec<String>> {
    if let Some(use_) = &descriptor.use_ {
        if !use_.is_empty() && use_ != "sig" {
            return Ok(None);
        }
    }

    let key = match descriptor.kty.as_deref() {
        Some("RSA") => convert_rsa(descriptor)?,
        Some("EC") => convert_ec(descriptor)?,
        Some("oct") => convert_oct(descriptor)?,
        Some(other) => return Err(vec![format!("unknown key type '{other}'")]),
        None => return Err(vec!["missing field: kty".to_string()]),
    };

    let key = match &descriptor.kid {
        Some(kid) => key.with_key_id(kid.clone()),
        None => key,
    };
    let key = match &descriptor.x5t {
        Some(x5t) => key.with_x5t(x5t.clone()),
        None => key,
    };
    Ok(Some(key))
}

fn convert_rsa(descriptor: &JsonWebKey) -> Result<SecurityKey, Vec<String>> {
    let mut missing = Vec::new();
    if descriptor.n.as_deref().unwrap_or_default().is_empty() {
        missing.push("n".to_string());
    }
    if descriptor.e.as_deref().unwrap_or_default().is_empty() {
        missing.push("e".to_string());
    }
    if !missing.is_empty() {
        return Err(vec![format!("missing fields: {}", missing.join(", "))]);
    }

    let n = decode_field(descriptor.n.as_deref(), "n")?;
    let e = decode_field(descriptor.e.as_deref(), "e")?;

    // A certificate-backed key is preferred when the chain is present.
    if let Some(x5c) = descriptor.x5c.as_ref().filter(|c| !c.is_empty()) {
        use base64::engine::general_purpose::STANDARD;
        let der = STANDARD
            .decode(&x5c[0])
            .map_err(|_| vec!["x5c entry is not valid base64".to_string()])?;
        return SecurityKey::x509(der, &n, &e).map_err(|err| vec![err.to_string()]);
    }

    SecurityKey::rsa_public(&n, &e).map_err(|err| vec![err.to_string()])
}

fn convert_ec(descriptor: &JsonWebKey) -> Result<SecurityKey, Vec<String>> {
    let mut missing = Vec::new();
    for (name, value) in [
        ("crv", &descriptor.crv),
        ("x", &descriptor.x),
        ("y", &descriptor.y),
    ] {
        if value.as_deref().unwrap_or_default().is_empty() {
            missing.push(name.to_string());
        }
    }
    if !missing.is_empty() {
        return Err(vec![format!("missing fields: {}", missing.join(", "))]);
    }

    let x = decode_field(descriptor.x.as_deref(), "x")?;
    let y = decode_field(descriptor.y.as_deref(), "y")?;
    let result = match descriptor.crv.as_deref() {
        Some("P-256") => SecurityKey::ec_p256_public(&x, &y),
        Some("P-384") => SecurityKey::ec_p384_public(&x, &y),
        Some(other) => return Err(vec![format!("unknown curve '{other}'")]),
        None => unreachable!("crv checked above"),
    };
    result.map_err(|err| vec![err.to_string()])
}

fn convert_oct(descriptor: &JsonWebKey) -> Result<SecurityKey, Vec<String>> {
    let k = decode_field(descriptor.k.as_deref(), "k")?;
    Ok(SecurityKey::symmetric(k))
}

fn decode_field(value: Option<&str>, name: &str) -> Result<Vec<u8>, Vec<String>> {
    let Some(value) = value.filter(|v| !v.is_empty()) else {
        return Err(vec![format!("missing field: {name}")]);
    };
    URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|_| vec![format!("field '{name}' is not valid base64url")])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyMaterial;

    const MIXED_SET: &str = r#"{
        "keys": [
            {"kty": "oct", "kid": "sym-1", "k": "AAECAwQFBgcICQoLDA0ODw"},
            {"kty": "RSA", "kid": "rsa-broken", "e": "AQAB"},
            {"kty": "EC", "kid": "ec-broken", "crv": "P-256", "x": "AQ"},
            {"kty": "oct", "kid": "enc-only", "use": "enc", "k": "AAECAwQFBgcICQoLDA0ODw"}
        ]
    }"#;

    #[test]
    fn one_bad_descriptor_does_not_abort_the_batch() {
        let set = JsonWebKeySet::from_json(MIXED_SET).unwrap();
        let conversion = set.signing_keys();

        assert_eq!(conversion.keys.len(), 1);
        assert_eq!(conversion.keys[0].key_id(), Some("sym-1"));
        assert_eq!(conversion.failures.len(), 2);
    }

    #[test]
    fn failures_name_the_missing_fields() {
        let set = JsonWebKeySet::from_json(MIXED_SET).unwrap();
        let conversion = set.signing_keys();

        let rsa = &conversion.failures[0];
        assert_eq!(rsa.kid.as_deref(), Some("rsa-broken"));
        assert!(rsa.reasons[0].contains('n'));

        let ec = &conversion.failures[1];
        assert_eq!(ec.kid.as_deref(), Some("ec-broken"));
        assert!(ec.reasons[0].contains('y'));
    }

    #[test]
    fn unresolved_keys_can_be_retained_as_placeholders() {
        let mut set = JsonWebKeySet::from_json(MIXED_SET).unwrap();
        set.skip_unresolved = false;
        let conversion = set.signing_keys();

        // 1 usable + 2 failed + 1 non-sig placeholder
        assert_eq!(conversion.keys.len(), 4);
        let placeholder = conversion
            .keys
            .iter()
            .find(|k| k.key_id() == Some("rsa-broken"))
            .unwrap();
        assert!(matches!(
            placeholder.material(),
            KeyMaterial::Unresolved { .. }
        ));
    }
}
