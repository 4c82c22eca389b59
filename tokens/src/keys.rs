//! Security key model.
//!
//! A [`SecurityKey`] wraps key material of one of the supported kinds and
//! an optional key id / certificate thumbprint used for resolution
//! against a token's header hints. Keys are shared by reference
//! (`Arc<SecurityKey>`) between credentials and validation parameters and
//! are immutable for the duration of a call.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use p256::ecdsa as ecdsa256;
use p384::ecdsa as ecdsa384;
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::{TokenError, TokenResult};

/// Elliptic-curve key material for one of the supported curves.
#[derive(Clone)]
pub enum EcKey {
    /// P-256 (ES256).
    P256 {
        /// Public verification key.
        verifying: ecdsa256::VerifyingKey,
        /// Private signing key, present only for locally held keys.
        signing: Option<ecdsa256::SigningKey>,
    },
    /// P-384 (ES384).
    P384 {
        /// Public verification key.
        verifying: ecdsa384::VerifyingKey,
        /// Private signing key, present only for locally held keys.
        signing: Option<ecdsa384::SigningKey>,
    },
}

/// The key material held by a [`SecurityKey`].
#[derive(Clone)]
pub enum KeyMaterial {
    /// Raw symmetric bytes, zeroized on drop.
    Symmetric(Zeroizing<Vec<u8>>),
    /// RSA key, public half always present.
    Rsa {
        /// Public key.
        public: RsaPublicKey,
        /// Private key, present only for locally held keys.
        private: Option<Box<RsaPrivateKey>>,
    },
    /// Elliptic-curve key.
    Ec(EcKey),
    /// Certificate-backed RSA public key. The certificate itself is kept
    /// as opaque DER; chain validation belongs to an external validator.
    X509 {
        /// DER bytes of the leaf certificate.
        der: Vec<u8>,
        /// base64url(SHA-256(der)), matched against the `x5t` header hint.
        thumbprint: String,
        /// RSA public key extracted from the descriptor.
        public: RsaPublicKey,
    },
    /// A key-set descriptor that could not be materialized. Retained only
    /// when the key set is asked to keep unresolved entries; every crypto
    /// operation on it fails.
    Unresolved {
        /// The raw descriptor, for diagnostics.
        descriptor: serde_json::Value,
        /// Why materialization failed.
        reasons: Vec<String>,
    },
}

impl std::fmt::Debug for KeyMaterial {
    // Key material never appears in logs or error messages.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyMaterial::Symmetric(bytes) => write!(f, "Symmetric({} bytes)", bytes.len()),
            KeyMaterial::Rsa { private, .. } => {
                write!(f, "Rsa(private: {})", private.is_some())
            }
            KeyMaterial::Ec(EcKey::P256 { signing, .. }) => {
                write!(f, "EcP256(private: {})", signing.is_some())
            }
            KeyMaterial::Ec(EcKey::P384 { signing, .. }) => {
                write!(f, "EcP384(private: {})", signing.is_some())
            }
            KeyMaterial::X509 { thumbprint, .. } => write!(f, "X509({thumbprint})"),
            KeyMaterial::Unresolved { reasons, .. } => write!(f, "Unresolved({reasons:?})"),
        }
    }
}

/// Key material plus resolution hints.
#[derive(Debug, Clone)]
pub struct SecurityKey {
    key_id: Option<String>,
    x5t: Option<String>,
    material: KeyMaterial,
}

impl SecurityKey {
    /// Create a symmetric key from raw bytes.
    pub fn symmetric(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            key_id: None,
            x5t: None,
            material: KeyMaterial::Symmetric(Zeroizing::new(bytes.into())),
        }
    }

    /// Create an RSA public key from big-endian modulus and exponent bytes.
    pub fn rsa_public(n: &[u8], e: &[u8]) -> TokenResult<Self> {
        let public = RsaPublicKey::new(BigUint::from_bytes_be(n), BigUint::from_bytes_be(e))
            .map_err(|err| TokenError::argument(format!("invalid RSA components: {err}")))?;
        Ok(Self::from_material(KeyMaterial::Rsa {
            public,
            private: None,
        }))
    }

    /// Create an RSA key pair from a private key.
    pub fn rsa_private(private: RsaPrivateKey) -> Self {
        Self::from_material(KeyMaterial::Rsa {
            public: private.to_public_key(),
            private: Some(Box::new(private)),
        })
    }

    /// Create a P-256 public key from raw affine coordinates (32 bytes each).
    pub fn ec_p256_public(x: &[u8], y: &[u8]) -> TokenResult<Self> {
        if x.len() != 32 || y.len() != 32 {
            return Err(TokenError::argument(
                "P-256 coordinates must be 32 bytes each",
            ));
        }
        let point = p256::EncodedPoint::from_affine_coordinates(
            p256::FieldBytes::from_slice(x),
            p256::FieldBytes::from_slice(y),
            false,
        );
        let verifying = ecdsa256::VerifyingKey::from_encoded_point(&point)
            .map_err(|_| TokenError::argument("point is not on the P-256 curve"))?;
        Ok(Self::from_material(KeyMaterial::Ec(EcKey::P256 {
            verifying,
            signing: None,
        })))
    }

    /// Create a P-256 key pair from a 32-byte private scalar.
    pub fn ec_p256_private(scalar: &[u8]) -> TokenResult<Self> {
        let signing = ecdsa256::SigningKey::from_slice(scalar)
            .map_err(|_| TokenError::argument("invalid P-256 private scalar"))?;
        let verifying = *signing.verifying_key();
        Ok(Self::from_material(KeyMaterial::Ec(EcKey::P256 {
            verifying,
            signing: Some(signing),
        })))
    }

    /// Create a P-384 public key from raw affine coordinates (48 bytes each).
    pub fn ec_p384_public(x: &[u8], y: &[u8]) -> TokenResult<Self> {
        if x.len() != 48 || y.len() != 48 {
            return Err(TokenError::argument(
                "P-384 coordinates must be 48 bytes each",
            ));
        }
        let point = p384::EncodedPoint::from_affine_coordinates(
            p384::FieldBytes::from_slice(x),
            p384::FieldBytes::from_slice(y),
            false,
        );
        let verifying = ecdsa384::VerifyingKey::from_encoded_point(&point)
            .map_err(|_| TokenError::argument("point is not on the P-384 curve"))?;
        Ok(Self::from_material(KeyMaterial::Ec(EcKey::P384 {
            verifying,
            signing: None,
        })))
    }

    /// Create a P-384 key pair from a 48-byte private scalar.
    pub fn ec_p384_private(scalar: &[u8]) -> TokenResult<Self> {
        let signing = ecdsa384::SigningKey::from_slice(scalar)
            .map_err(|_| TokenError::argument("invalid P-384 private scalar"))?;
        let verifying = *signing.verifying_key();
        Ok(Self::from_material(KeyMaterial::Ec(EcKey::P384 {
            verifying,
            signing: Some(signing),
        })))
    }

    /// Create a certificate-backed key from DER certificate bytes and RSA
    /// components. The thumbprint is base64url(SHA-256(der)).
    pub fn x509(der: Vec<u8>, n: &[u8], e: &[u8]) -> TokenResult<Self> {
        let public = RsaPublicKey::new(BigUint::from_bytes_be(n), BigUint::from_bytes_be(e))
            .map_err(|err| TokenError::argument(format!("invalid RSA components: {err}")))?;
        let thumbprint = certificate_thumbprint(&der);
        Ok(Self {
            key_id: None,
            x5t: Some(thumbprint.clone()),
            material: KeyMaterial::X509 {
                der,
                thumbprint,
                public,
            },
        })
    }

    /// Wrap an unresolvable key-set descriptor as an opaque placeholder.
    pub(crate) fn unresolved(
        key_id: Option<String>,
        descriptor: serde_json::Value,
        reasons: Vec<String>,
    ) -> Self {
        Self {
            key_id,
            x5t: None,
            material: KeyMaterial::Unresolved {
                descriptor,
                reasons,
            },
        }
    }

    fn from_material(material: KeyMaterial) -> Self {
        Self {
            key_id: None,
            x5t: None,
            material,
        }
    }

    /// Attach a key id used during resolution against the `kid` hint.
    #[must_use]
    pub fn with_key_id(mut self, kid: impl Into<String>) -> Self {
        self.key_id = Some(kid.into());
        self
    }

    /// Attach an explicit certificate thumbprint for `x5t` matching.
    #[must_use]
    pub fn with_x5t(mut self, x5t: impl Into<String>) -> Self {
        self.x5t = Some(x5t.into());
        self
    }

    /// Key id, if any.
    pub fn key_id(&self) -> Option<&str> {
        self.key_id.as_deref()
    }

    /// Certificate thumbprint, if any.
    pub fn x5t(&self) -> Option<&str> {
        match (&self.x5t, &self.material) {
            (Some(x5t), _) => Some(x5t),
            (None, KeyMaterial::X509 { thumbprint, .. }) => Some(thumbprint),
            _ => None,
        }
    }

    /// The wrapped key material.
    pub fn material(&self) -> &KeyMaterial {
        &self.material
    }

    /// Whether this key holds symmetric material usable as a
    /// content-encryption key.
    pub fn is_symmetric(&self) -> bool {
        matches!(self.material, KeyMaterial::Symmetric(_))
    }

    /// Raw symmetric bytes, if this is a symmetric key.
    pub fn symmetric_bytes(&self) -> Option<&[u8]> {
        match &self.material {
            KeyMaterial::Symmetric(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Short description for key-scan diagnostics. Names the kind and key
    /// id only, never material or failure specifics.
    pub fn describe(&self) -> String {
        let kind = match &self.material {
            KeyMaterial::Symmetric(b) => format!("Symmetric-{}", b.len() * 8),
            KeyMaterial::Rsa { .. } => "Rsa".to_string(),
            KeyMaterial::Ec(EcKey::P256 { .. }) => "EcP256".to_string(),
            KeyMaterial::Ec(EcKey::P384 { .. }) => "EcP384".to_string(),
            KeyMaterial::X509 { .. } => "X509".to_string(),
            KeyMaterial::Unresolved { .. } => "Unresolved".to_string(),
        };
        match &self.key_id {
            Some(kid) => format!("{kind}, KeyId: {kid}"),
            None => kind,
        }
    }
}

/// base64url(SHA-256(der)) thumbprint over certificate bytes.
pub fn certificate_thumbprint(der: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(der))
}
